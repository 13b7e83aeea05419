use formosa_store::entity::{AgentMode, agent::Agent};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

fn default_color_theme() -> String {
    "34, 197, 94".to_string()
}

fn default_initial_funds() -> Decimal {
    Decimal::from(1_000_000)
}

fn default_max_position_size() -> Decimal {
    Decimal::from(50)
}

/// `POST /api/agents` body.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateAgentRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub ai_model: Option<String>,
    #[serde(default = "default_color_theme")]
    pub color_theme: String,
    #[serde(default = "default_initial_funds")]
    pub initial_funds: Decimal,
    #[serde(default = "default_max_position_size")]
    pub max_position_size: Decimal,
    #[serde(default)]
    pub investment_preferences: Vec<String>,
}

/// `PUT /api/agents/{id}` body. Absent fields stay untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateAgentRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub ai_model: Option<String>,
    pub color_theme: Option<String>,
    pub investment_preferences: Option<Vec<String>>,
    pub max_position_size: Option<Decimal>,
}

/// `POST /api/agents/{id}/start` body.
#[derive(Debug, Clone, Deserialize)]
pub struct StartAgentRequest {
    pub mode: Option<String>,
}

/// Agent list envelope.
#[derive(Debug, Clone, Serialize)]
pub struct AgentListResponse {
    pub agents: Vec<Agent>,
    pub total: usize,
}

/// `202 Accepted` body of a started execution.
#[derive(Debug, Clone, Serialize)]
pub struct StartAgentResponse {
    pub session_id: formosa_store::entity::SessionId,
    pub mode: AgentMode,
    pub status: &'static str,
}

/// `200 OK` body of a stop request.
#[derive(Debug, Clone, Serialize)]
pub struct StopAgentResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<formosa_store::entity::SessionId>,
    pub stopped: bool,
}

/// Query parameters of the history endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<i64>,
    pub order: Option<String>,
}
