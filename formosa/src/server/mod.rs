use crate::{
    config::Config,
    engine::{agents::AgentService, trading::TradingService},
    event::EventBus,
};
use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

/// HTTP error mapping to `{"detail": ...}` bodies.
pub mod error;

/// Request/response DTOs.
pub mod dto;

/// REST handlers: thin mappings from HTTP verbs to service calls.
pub mod rest;

/// WebSocket subscription endpoint.
pub mod ws;

/// Shared handler state.
#[derive(Debug, Clone)]
pub struct AppState {
    pub agents: AgentService,
    pub trading: TradingService,
    pub bus: EventBus,
    pub config: Arc<Config>,
}

/// Build the REST + WebSocket router.
pub fn router(state: AppState) -> Router {
    let cors = if state.config.cors_origins.iter().any(|origin| origin == "*") {
        CorsLayer::permissive()
    } else {
        CorsLayer::new().allow_origin(AllowOrigin::list(
            state
                .config
                .cors_origins
                .iter()
                .filter_map(|origin| origin.parse().ok()),
        ))
    };

    Router::new()
        .route("/api/agents", post(rest::create_agent).get(rest::list_agents))
        .route(
            "/api/agents/:id",
            get(rest::get_agent)
                .put(rest::update_agent)
                .delete(rest::delete_agent),
        )
        .route(
            "/api/agents/:id/strategy-changes",
            get(rest::strategy_changes),
        )
        .route("/api/agents/:id/start", post(rest::start_agent))
        .route("/api/agents/:id/stop", post(rest::stop_agent))
        .route(
            "/api/agent-execution/:agent_id/history",
            get(rest::execution_history),
        )
        .route(
            "/api/agent-execution/:agent_id/sessions/:session_id",
            get(rest::session_detail),
        )
        .route("/api/trading/agents/:id/portfolio", get(rest::portfolio))
        .route(
            "/api/trading/agents/:id/performance-history",
            get(rest::performance_history),
        )
        .route("/api/models", get(rest::list_models))
        .route("/ws", get(ws::ws_handler))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
