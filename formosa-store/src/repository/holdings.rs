use crate::{
    entity::{AgentId, holding::Holding},
    error::StoreError,
    repository::decimal,
};
use sqlx::{Row, SqliteConnection, sqlite::SqliteRow};

fn from_row(row: &SqliteRow) -> Result<Holding, StoreError> {
    Ok(Holding {
        agent_id: AgentId::new(row.try_get::<String, _>("agent_id")?),
        ticker: row.try_get("ticker")?,
        company_name: row.try_get("company_name")?,
        quantity: row.try_get("quantity")?,
        average_cost: decimal(row, "average_cost")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

/// Insert or replace the `(agent_id, ticker)` position.
pub async fn upsert(conn: &mut SqliteConnection, holding: &Holding) -> Result<(), StoreError> {
    sqlx::query(
        "INSERT INTO agent_holdings \
         (agent_id, ticker, company_name, quantity, average_cost, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?) \
         ON CONFLICT(agent_id, ticker) DO UPDATE SET \
         company_name = excluded.company_name, quantity = excluded.quantity, \
         average_cost = excluded.average_cost, updated_at = excluded.updated_at",
    )
    .bind(holding.agent_id.as_str())
    .bind(&holding.ticker)
    .bind(&holding.company_name)
    .bind(holding.quantity)
    .bind(holding.average_cost.to_string())
    .bind(holding.created_at)
    .bind(holding.updated_at)
    .execute(conn)
    .await?;
    Ok(())
}

pub async fn fetch(
    conn: &mut SqliteConnection,
    agent_id: &AgentId,
    ticker: &str,
) -> Result<Option<Holding>, StoreError> {
    sqlx::query("SELECT * FROM agent_holdings WHERE agent_id = ? AND ticker = ?")
        .bind(agent_id.as_str())
        .bind(ticker)
        .fetch_optional(conn)
        .await?
        .map(|row| from_row(&row))
        .transpose()
}

pub async fn list_for_agent(
    conn: &mut SqliteConnection,
    agent_id: &AgentId,
) -> Result<Vec<Holding>, StoreError> {
    sqlx::query("SELECT * FROM agent_holdings WHERE agent_id = ? ORDER BY ticker")
        .bind(agent_id.as_str())
        .fetch_all(conn)
        .await?
        .iter()
        .map(from_row)
        .collect()
}
