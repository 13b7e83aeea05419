use crate::{
    entity::{
        AgentId,
        agent::{Agent, AgentUpdate},
    },
    error::StoreError,
    repository::{decimal, json, to_json_text},
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{Row, SqliteConnection, sqlite::SqliteRow};
use std::str::FromStr;

fn from_row(row: &SqliteRow) -> Result<Agent, StoreError> {
    Ok(Agent {
        id: AgentId::new(row.try_get::<String, _>("id")?),
        name: row.try_get("name")?,
        description: row.try_get("description")?,
        ai_model: row.try_get("ai_model")?,
        provider: row.try_get("provider")?,
        color_theme: row.try_get("color_theme")?,
        initial_funds: decimal(row, "initial_funds")?,
        current_funds: decimal(row, "current_funds")?,
        current_mode: FromStr::from_str(&row.try_get::<String, _>("current_mode")?)?,
        status: FromStr::from_str(&row.try_get::<String, _>("status")?)?,
        investment_preferences: json(row, "investment_preferences")?,
        max_position_size: decimal(row, "max_position_size")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
        last_active_at: row.try_get("last_active_at")?,
    })
}

pub async fn insert(conn: &mut SqliteConnection, agent: &Agent) -> Result<(), StoreError> {
    sqlx::query(
        "INSERT INTO agents \
         (id, name, description, ai_model, provider, color_theme, initial_funds, \
          current_funds, current_mode, status, investment_preferences, max_position_size, \
          created_at, updated_at, last_active_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(agent.id.as_str())
    .bind(&agent.name)
    .bind(&agent.description)
    .bind(&agent.ai_model)
    .bind(&agent.provider)
    .bind(&agent.color_theme)
    .bind(agent.initial_funds.to_string())
    .bind(agent.current_funds.to_string())
    .bind(agent.current_mode.as_str())
    .bind(agent.status.as_str())
    .bind(to_json_text(&agent.investment_preferences)?)
    .bind(agent.max_position_size.to_string())
    .bind(agent.created_at)
    .bind(agent.updated_at)
    .bind(agent.last_active_at)
    .execute(conn)
    .await?;
    Ok(())
}

pub async fn fetch(
    conn: &mut SqliteConnection,
    id: &AgentId,
) -> Result<Option<Agent>, StoreError> {
    sqlx::query("SELECT * FROM agents WHERE id = ?")
        .bind(id.as_str())
        .fetch_optional(conn)
        .await?
        .map(|row| from_row(&row))
        .transpose()
}

/// Fetch, surfacing a typed NotFound for absent agents.
pub async fn fetch_required(
    conn: &mut SqliteConnection,
    id: &AgentId,
) -> Result<Agent, StoreError> {
    fetch(conn, id)
        .await?
        .ok_or_else(|| StoreError::not_found("agent", id.as_str()))
}

pub async fn list(conn: &mut SqliteConnection) -> Result<Vec<Agent>, StoreError> {
    sqlx::query("SELECT * FROM agents ORDER BY created_at")
        .fetch_all(conn)
        .await?
        .iter()
        .map(from_row)
        .collect()
}

/// Apply the provided field updates, leaving `None` fields untouched.
pub async fn update(
    conn: &mut SqliteConnection,
    id: &AgentId,
    update: &AgentUpdate,
    now: DateTime<Utc>,
) -> Result<Agent, StoreError> {
    let mut agent = fetch_required(&mut *conn, id).await?;

    if let Some(name) = &update.name {
        agent.name = name.clone();
    }
    if let Some(description) = &update.description {
        agent.description = description.clone();
    }
    if let Some(ai_model) = &update.ai_model {
        agent.ai_model = ai_model.clone();
    }
    if let Some(color_theme) = &update.color_theme {
        agent.color_theme = color_theme.clone();
    }
    if let Some(preferences) = &update.investment_preferences {
        agent.investment_preferences = preferences.clone();
    }
    if let Some(max_position_size) = update.max_position_size {
        agent.max_position_size = max_position_size;
    }
    if let Some(mode) = update.current_mode {
        agent.current_mode = mode;
    }
    if let Some(status) = update.status {
        agent.status = status;
    }
    agent.updated_at = now;

    sqlx::query(
        "UPDATE agents SET name = ?, description = ?, ai_model = ?, color_theme = ?, \
         investment_preferences = ?, max_position_size = ?, current_mode = ?, status = ?, \
         updated_at = ? WHERE id = ?",
    )
    .bind(&agent.name)
    .bind(&agent.description)
    .bind(&agent.ai_model)
    .bind(&agent.color_theme)
    .bind(to_json_text(&agent.investment_preferences)?)
    .bind(agent.max_position_size.to_string())
    .bind(agent.current_mode.as_str())
    .bind(agent.status.as_str())
    .bind(agent.updated_at)
    .bind(id.as_str())
    .execute(conn)
    .await?;

    Ok(agent)
}

/// Persist a new cash balance. Callers validate the balance before writing.
pub async fn update_funds(
    conn: &mut SqliteConnection,
    id: &AgentId,
    current_funds: Decimal,
    now: DateTime<Utc>,
) -> Result<(), StoreError> {
    let result = sqlx::query("UPDATE agents SET current_funds = ?, updated_at = ? WHERE id = ?")
        .bind(current_funds.to_string())
        .bind(now)
        .bind(id.as_str())
        .execute(conn)
        .await?;

    if result.rows_affected() == 0 {
        return Err(StoreError::not_found("agent", id.as_str()));
    }
    Ok(())
}

pub async fn touch_last_active(
    conn: &mut SqliteConnection,
    id: &AgentId,
    now: DateTime<Utc>,
) -> Result<(), StoreError> {
    sqlx::query("UPDATE agents SET last_active_at = ?, updated_at = ? WHERE id = ?")
        .bind(now)
        .bind(now)
        .bind(id.as_str())
        .execute(conn)
        .await?;
    Ok(())
}

/// Cascade delete. Returns false when the agent did not exist.
pub async fn delete(conn: &mut SqliteConnection, id: &AgentId) -> Result<bool, StoreError> {
    let result = sqlx::query("DELETE FROM agents WHERE id = ?")
        .bind(id.as_str())
        .execute(conn)
        .await?;
    Ok(result.rows_affected() > 0)
}
