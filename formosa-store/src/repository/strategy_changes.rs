use crate::{
    entity::{AgentId, SessionId, StrategyChangeId, strategy_change::StrategyChange},
    error::StoreError,
    repository::{opt_json, to_json_text},
};
use sqlx::{Row, SqliteConnection, sqlite::SqliteRow};
use std::str::FromStr;

fn from_row(row: &SqliteRow) -> Result<StrategyChange, StoreError> {
    Ok(StrategyChange {
        id: StrategyChangeId::new(row.try_get::<String, _>("id")?),
        agent_id: AgentId::new(row.try_get::<String, _>("agent_id")?),
        session_id: row
            .try_get::<Option<String>, _>("session_id")?
            .map(SessionId::new),
        trigger_reason: row.try_get("trigger_reason")?,
        change_summary: row.try_get("change_summary")?,
        new_strategy: row.try_get("new_strategy")?,
        change_type: FromStr::from_str(&row.try_get::<String, _>("change_type")?)?,
        performance_snapshot: opt_json(row, "performance_snapshot")?,
        created_at: row.try_get("created_at")?,
    })
}

pub async fn insert(
    conn: &mut SqliteConnection,
    change: &StrategyChange,
) -> Result<(), StoreError> {
    sqlx::query(
        "INSERT INTO strategy_changes \
         (id, agent_id, session_id, trigger_reason, change_summary, new_strategy, \
          change_type, performance_snapshot, created_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(change.id.as_str())
    .bind(change.agent_id.as_str())
    .bind(change.session_id.as_ref().map(SessionId::as_str))
    .bind(&change.trigger_reason)
    .bind(&change.change_summary)
    .bind(&change.new_strategy)
    .bind(change.change_type.as_str())
    .bind(
        change
            .performance_snapshot
            .as_ref()
            .map(to_json_text)
            .transpose()?,
    )
    .bind(change.created_at)
    .execute(conn)
    .await?;
    Ok(())
}

/// Newest-first change history of one agent.
pub async fn list_for_agent(
    conn: &mut SqliteConnection,
    agent_id: &AgentId,
    limit: i64,
) -> Result<Vec<StrategyChange>, StoreError> {
    sqlx::query(
        "SELECT * FROM strategy_changes WHERE agent_id = ? ORDER BY created_at DESC LIMIT ?",
    )
    .bind(agent_id.as_str())
    .bind(limit)
    .fetch_all(conn)
    .await?
    .iter()
    .map(from_row)
    .collect()
}
