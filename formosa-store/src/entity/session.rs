use super::{AgentId, AgentMode, ColumnDef, SessionId, SessionStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One bounded execution of an agent in one mode.
///
/// Lifecycle: PENDING → RUNNING → one terminal status. `execution_time_ms` is derived
/// from `end_time − start_time` when the terminal transition lands. JSON payloads keep
/// non-ASCII text unescaped.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Session {
    pub id: SessionId,
    pub agent_id: AgentId,
    pub mode: AgentMode,
    pub status: SessionStatus,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub execution_time_ms: Option<i64>,
    pub initial_input: Option<serde_json::Value>,
    pub final_output: Option<serde_json::Value>,
    /// Names of tools invoked during the run, in call order.
    pub tools_called: Vec<String>,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Session {
    pub const TABLE: &'static str = "agent_sessions";

    pub const COLUMNS: &'static [ColumnDef] = &[
        ColumnDef::new("id", true),
        ColumnDef::new("agent_id", true),
        ColumnDef::new("mode", true),
        ColumnDef::new("status", true),
        ColumnDef::new("start_time", true),
        ColumnDef::new("end_time", false),
        ColumnDef::new("execution_time_ms", false),
        ColumnDef::new("initial_input", false),
        ColumnDef::new("final_output", false),
        ColumnDef::new("tools_called", true),
        ColumnDef::new("error_message", false),
        ColumnDef::new("created_at", true),
        ColumnDef::new("updated_at", true),
    ];
}
