use super::{AgentId, AgentMode, AgentStatus, ColumnDef};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Persistent user-defined trading agent: identity, capital, mode and strategy.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Agent {
    pub id: AgentId,
    pub name: String,
    pub description: String,
    /// Model catalog key (`ai_model_configs.model_key`).
    pub ai_model: String,
    /// Provider label denormalised from the catalog for display.
    pub provider: String,
    /// UI card colour as an `"r, g, b"` string.
    pub color_theme: String,
    pub initial_funds: Decimal,
    /// Live cash balance. Never negative.
    pub current_funds: Decimal,
    pub current_mode: AgentMode,
    pub status: AgentStatus,
    /// Preferred tickers or free-form preference text.
    pub investment_preferences: Vec<String>,
    /// Maximum single-position share of the portfolio, percent.
    pub max_position_size: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_active_at: Option<DateTime<Utc>>,
}

impl Agent {
    pub const TABLE: &'static str = "agents";

    pub const COLUMNS: &'static [ColumnDef] = &[
        ColumnDef::new("id", true),
        ColumnDef::new("name", true),
        ColumnDef::new("description", true),
        ColumnDef::new("ai_model", true),
        ColumnDef::new("provider", true),
        ColumnDef::new("color_theme", true),
        ColumnDef::new("initial_funds", true),
        ColumnDef::new("current_funds", true),
        ColumnDef::new("current_mode", true),
        ColumnDef::new("status", true),
        ColumnDef::new("investment_preferences", true),
        ColumnDef::new("max_position_size", true),
        ColumnDef::new("created_at", true),
        ColumnDef::new("updated_at", true),
        ColumnDef::new("last_active_at", false),
    ];
}

/// Mutable agent fields accepted by the update operation. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct AgentUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub ai_model: Option<String>,
    pub color_theme: Option<String>,
    pub investment_preferences: Option<Vec<String>>,
    pub max_position_size: Option<Decimal>,
    pub current_mode: Option<AgentMode>,
    pub status: Option<AgentStatus>,
}
