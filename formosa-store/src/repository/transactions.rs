use crate::{
    entity::{AgentId, SessionId, TransactionId, transaction::Transaction},
    error::StoreError,
    repository::decimal,
};
use sqlx::{Row, SqliteConnection, sqlite::SqliteRow};
use std::str::FromStr;

fn from_row(row: &SqliteRow) -> Result<Transaction, StoreError> {
    Ok(Transaction {
        id: TransactionId::new(row.try_get::<String, _>("id")?),
        agent_id: AgentId::new(row.try_get::<String, _>("agent_id")?),
        session_id: row
            .try_get::<Option<String>, _>("session_id")?
            .map(SessionId::new),
        ticker: row.try_get("ticker")?,
        company_name: row.try_get("company_name")?,
        action: FromStr::from_str(&row.try_get::<String, _>("action")?)?,
        quantity: row.try_get("quantity")?,
        price: decimal(row, "price")?,
        total_amount: decimal(row, "total_amount")?,
        commission: decimal(row, "commission")?,
        status: FromStr::from_str(&row.try_get::<String, _>("status")?)?,
        execution_time: row.try_get("execution_time")?,
        decision_reason: row.try_get("decision_reason")?,
        created_at: row.try_get("created_at")?,
    })
}

pub async fn insert(
    conn: &mut SqliteConnection,
    transaction: &Transaction,
) -> Result<(), StoreError> {
    sqlx::query(
        "INSERT INTO transactions \
         (id, agent_id, session_id, ticker, company_name, action, quantity, price, \
          total_amount, commission, status, execution_time, decision_reason, created_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(transaction.id.as_str())
    .bind(transaction.agent_id.as_str())
    .bind(transaction.session_id.as_ref().map(SessionId::as_str))
    .bind(&transaction.ticker)
    .bind(&transaction.company_name)
    .bind(transaction.action.as_str())
    .bind(transaction.quantity)
    .bind(transaction.price.to_string())
    .bind(transaction.total_amount.to_string())
    .bind(transaction.commission.to_string())
    .bind(transaction.status.as_str())
    .bind(transaction.execution_time)
    .bind(&transaction.decision_reason)
    .bind(transaction.created_at)
    .execute(conn)
    .await?;
    Ok(())
}

/// Full trade history of one agent in chronological order.
pub async fn list_for_agent(
    conn: &mut SqliteConnection,
    agent_id: &AgentId,
) -> Result<Vec<Transaction>, StoreError> {
    sqlx::query("SELECT * FROM transactions WHERE agent_id = ? ORDER BY created_at, id")
        .bind(agent_id.as_str())
        .fetch_all(conn)
        .await?
        .iter()
        .map(from_row)
        .collect()
}

/// Trades issued from one session, in issue order.
pub async fn list_for_session(
    conn: &mut SqliteConnection,
    session_id: &SessionId,
) -> Result<Vec<Transaction>, StoreError> {
    sqlx::query("SELECT * FROM transactions WHERE session_id = ? ORDER BY created_at, id")
        .bind(session_id.as_str())
        .fetch_all(conn)
        .await?
        .iter()
        .map(from_row)
        .collect()
}
