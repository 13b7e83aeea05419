use crate::{
    entity::{AgentId, SessionId, session::Session},
    error::StoreError,
    repository::{json, opt_json, to_json_text},
};
use chrono::{DateTime, Utc};
use sqlx::{Row, SqliteConnection, sqlite::SqliteRow};
use std::str::FromStr;

fn from_row(row: &SqliteRow) -> Result<Session, StoreError> {
    Ok(Session {
        id: SessionId::new(row.try_get::<String, _>("id")?),
        agent_id: AgentId::new(row.try_get::<String, _>("agent_id")?),
        mode: FromStr::from_str(&row.try_get::<String, _>("mode")?)?,
        status: FromStr::from_str(&row.try_get::<String, _>("status")?)?,
        start_time: row.try_get("start_time")?,
        end_time: row.try_get("end_time")?,
        execution_time_ms: row.try_get("execution_time_ms")?,
        initial_input: opt_json(row, "initial_input")?,
        final_output: opt_json(row, "final_output")?,
        tools_called: json(row, "tools_called")?,
        error_message: row.try_get("error_message")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

pub async fn insert(conn: &mut SqliteConnection, session: &Session) -> Result<(), StoreError> {
    sqlx::query(
        "INSERT INTO agent_sessions \
         (id, agent_id, mode, status, start_time, end_time, execution_time_ms, \
          initial_input, final_output, tools_called, error_message, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(session.id.as_str())
    .bind(session.agent_id.as_str())
    .bind(session.mode.as_str())
    .bind(session.status.as_str())
    .bind(session.start_time)
    .bind(session.end_time)
    .bind(session.execution_time_ms)
    .bind(
        session
            .initial_input
            .as_ref()
            .map(to_json_text)
            .transpose()?,
    )
    .bind(
        session
            .final_output
            .as_ref()
            .map(to_json_text)
            .transpose()?,
    )
    .bind(to_json_text(&session.tools_called)?)
    .bind(&session.error_message)
    .bind(session.created_at)
    .bind(session.updated_at)
    .execute(conn)
    .await?;
    Ok(())
}

pub async fn fetch(
    conn: &mut SqliteConnection,
    id: &SessionId,
) -> Result<Option<Session>, StoreError> {
    sqlx::query("SELECT * FROM agent_sessions WHERE id = ?")
        .bind(id.as_str())
        .fetch_optional(conn)
        .await?
        .map(|row| from_row(&row))
        .transpose()
}

pub async fn fetch_required(
    conn: &mut SqliteConnection,
    id: &SessionId,
) -> Result<Session, StoreError> {
    fetch(conn, id)
        .await?
        .ok_or_else(|| StoreError::not_found("session", id.as_str()))
}

/// Write back the mutable lifecycle columns of an existing session row.
pub async fn update(conn: &mut SqliteConnection, session: &Session) -> Result<(), StoreError> {
    let result = sqlx::query(
        "UPDATE agent_sessions SET status = ?, end_time = ?, execution_time_ms = ?, \
         final_output = ?, tools_called = ?, error_message = ?, updated_at = ? WHERE id = ?",
    )
    .bind(session.status.as_str())
    .bind(session.end_time)
    .bind(session.execution_time_ms)
    .bind(
        session
            .final_output
            .as_ref()
            .map(to_json_text)
            .transpose()?,
    )
    .bind(to_json_text(&session.tools_called)?)
    .bind(&session.error_message)
    .bind(session.updated_at)
    .bind(session.id.as_str())
    .execute(conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(StoreError::not_found("session", session.id.as_str()));
    }
    Ok(())
}

/// Latest sessions of one agent, newest first.
pub async fn list_for_agent(
    conn: &mut SqliteConnection,
    agent_id: &AgentId,
    limit: i64,
) -> Result<Vec<Session>, StoreError> {
    sqlx::query("SELECT * FROM agent_sessions WHERE agent_id = ? ORDER BY start_time DESC LIMIT ?")
        .bind(agent_id.as_str())
        .bind(limit)
        .fetch_all(conn)
        .await?
        .iter()
        .map(from_row)
        .collect()
}

/// RUNNING sessions that started at or before the cutoff. Fed to the timeout sweeper.
pub async fn running_older_than(
    conn: &mut SqliteConnection,
    cutoff: DateTime<Utc>,
) -> Result<Vec<Session>, StoreError> {
    sqlx::query("SELECT * FROM agent_sessions WHERE status = 'RUNNING' AND start_time <= ?")
        .bind(cutoff)
        .fetch_all(conn)
        .await?
        .iter()
        .map(from_row)
        .collect()
}
