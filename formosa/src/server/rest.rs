use crate::{
    engine::{agents::NewAgent, session::SessionDetail, trading::PortfolioSnapshot},
    server::{
        AppState,
        dto::{
            AgentListResponse, CreateAgentRequest, HistoryQuery, StartAgentRequest,
            StartAgentResponse, StopAgentResponse, UpdateAgentRequest,
        },
        error::ApiError,
    },
};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use formosa_store::entity::{
    AgentId, AgentMode, SessionId, agent::{Agent, AgentUpdate}, model_config::ModelConfig,
};
use std::str::FromStr;
use tracing::error;

pub async fn create_agent(
    State(state): State<AppState>,
    Json(request): Json<CreateAgentRequest>,
) -> Result<(StatusCode, Json<Agent>), ApiError> {
    let ai_model = request
        .ai_model
        .unwrap_or_else(|| state.config.default_ai_model.clone());

    let agent = state
        .agents
        .create_agent(NewAgent {
            name: request.name,
            description: request.description,
            ai_model,
            color_theme: request.color_theme,
            initial_funds: request.initial_funds,
            max_position_size: request.max_position_size,
            investment_preferences: request.investment_preferences,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(agent)))
}

pub async fn list_agents(
    State(state): State<AppState>,
) -> Result<Json<AgentListResponse>, ApiError> {
    let agents = state.agents.list_agents().await?;
    let total = agents.len();
    Ok(Json(AgentListResponse { agents, total }))
}

pub async fn get_agent(
    State(state): State<AppState>,
    Path(agent_id): Path<String>,
) -> Result<Json<Agent>, ApiError> {
    let agent = state.agents.get_agent(&AgentId::new(&agent_id)).await?;
    Ok(Json(agent))
}

pub async fn update_agent(
    State(state): State<AppState>,
    Path(agent_id): Path<String>,
    Json(request): Json<UpdateAgentRequest>,
) -> Result<Json<Agent>, ApiError> {
    let agent = state
        .agents
        .update_agent(
            &AgentId::new(&agent_id),
            AgentUpdate {
                name: request.name,
                description: request.description,
                ai_model: request.ai_model,
                color_theme: request.color_theme,
                investment_preferences: request.investment_preferences,
                max_position_size: request.max_position_size,
                current_mode: None,
                status: None,
            },
        )
        .await?;
    Ok(Json(agent))
}

pub async fn delete_agent(
    State(state): State<AppState>,
    Path(agent_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.agents.delete_agent(&AgentId::new(&agent_id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `202 Accepted`: the reservation (single-flight check + session row) happens inline so
/// a busy agent answers 409 immediately; the execution itself runs in its own task.
pub async fn start_agent(
    State(state): State<AppState>,
    Path(agent_id): Path<String>,
    Json(request): Json<StartAgentRequest>,
) -> Result<(StatusCode, Json<StartAgentResponse>), ApiError> {
    let mode = match request.mode.as_deref() {
        None => AgentMode::Trading,
        Some(raw) => AgentMode::from_str(raw)
            .map_err(|_| ApiError::new(
                StatusCode::UNPROCESSABLE_ENTITY,
                format!("unknown mode '{raw}'"),
            ))?,
    };

    let ticket = state
        .trading
        .begin_execution(&AgentId::new(&agent_id), mode)
        .await?;

    let response = StartAgentResponse {
        session_id: ticket.session.id.clone(),
        mode,
        status: "accepted",
    };

    let trading = state.trading.clone();
    tokio::spawn(async move {
        if let Err(error) = trading.run_execution(ticket).await {
            error!(%error, "spawned execution failed");
        }
    });

    Ok((StatusCode::ACCEPTED, Json(response)))
}

pub async fn stop_agent(
    State(state): State<AppState>,
    Path(agent_id): Path<String>,
) -> Result<Json<StopAgentResponse>, ApiError> {
    let session_id = state.trading.stop_agent(&AgentId::new(&agent_id)).await?;
    Ok(Json(StopAgentResponse {
        stopped: session_id.is_some(),
        session_id,
    }))
}

pub async fn execution_history(
    State(state): State<AppState>,
    Path(agent_id): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let limit = query.limit.unwrap_or(20).clamp(1, 200);
    let sessions = state
        .trading
        .sessions()
        .history(&AgentId::new(&agent_id), limit)
        .await?;

    Ok(Json(serde_json::json!({
        "agent_id": agent_id,
        "total": sessions.len(),
        "sessions": sessions,
    })))
}

pub async fn session_detail(
    State(state): State<AppState>,
    Path((agent_id, session_id)): Path<(String, String)>,
) -> Result<Json<SessionDetail>, ApiError> {
    let detail = state
        .trading
        .sessions()
        .session_detail(&AgentId::new(&agent_id), &SessionId::new(&session_id))
        .await?;
    Ok(Json(detail))
}

pub async fn portfolio(
    State(state): State<AppState>,
    Path(agent_id): Path<String>,
) -> Result<Json<PortfolioSnapshot>, ApiError> {
    let snapshot = state
        .trading
        .portfolio_snapshot(&AgentId::new(&agent_id))
        .await?;
    Ok(Json(snapshot))
}

pub async fn performance_history(
    State(state): State<AppState>,
    Path(agent_id): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let agent_id = AgentId::new(&agent_id);
    // 404 for unknown agents rather than an empty series
    state.agents.get_agent(&agent_id).await?;

    let limit = query.limit.unwrap_or(30).clamp(1, 1000);
    let ascending = !matches!(query.order.as_deref(), Some("desc"));

    let history = state
        .trading
        .performance_history(&agent_id, limit, ascending)
        .await?;

    Ok(Json(serde_json::json!({
        "agent_id": agent_id,
        "total": history.len(),
        "history": history,
    })))
}

pub async fn list_models(
    State(state): State<AppState>,
) -> Result<Json<Vec<ModelConfig>>, ApiError> {
    Ok(Json(state.agents.list_models().await?))
}

pub async fn strategy_changes(
    State(state): State<AppState>,
    Path(agent_id): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let limit = query.limit.unwrap_or(20).clamp(1, 200);
    let changes = state
        .agents
        .strategy_changes(&AgentId::new(&agent_id), limit)
        .await?;

    Ok(Json(serde_json::json!({
        "agent_id": agent_id,
        "total": changes.len(),
        "changes": changes,
    })))
}
