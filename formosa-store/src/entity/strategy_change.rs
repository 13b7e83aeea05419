use super::{AgentId, ColumnDef, SessionId, StrategyChangeId, StrategyChangeKind};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One recorded adjustment to an agent's strategy, kept as an append-only audit trail.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct StrategyChange {
    pub id: StrategyChangeId,
    pub agent_id: AgentId,
    pub session_id: Option<SessionId>,
    pub trigger_reason: String,
    pub change_summary: String,
    /// Strategy text appended to the agent's instructions from the next run onwards.
    pub new_strategy: String,
    pub change_type: StrategyChangeKind,
    /// Performance metrics at the moment of the change.
    pub performance_snapshot: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

impl StrategyChange {
    pub const TABLE: &'static str = "strategy_changes";

    pub const COLUMNS: &'static [ColumnDef] = &[
        ColumnDef::new("id", true),
        ColumnDef::new("agent_id", true),
        ColumnDef::new("session_id", false),
        ColumnDef::new("trigger_reason", true),
        ColumnDef::new("change_summary", true),
        ColumnDef::new("new_strategy", true),
        ColumnDef::new("change_type", true),
        ColumnDef::new("performance_snapshot", false),
        ColumnDef::new("created_at", true),
    ];
}
