//! REST surface: thin handlers, HTTP status mapping, unicode-preserving bodies.

mod common;

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use common::{Harness, ScriptedProvider, StaticMarket};
use formosa::server::router;
use formosa_store::entity::{AgentMode, SessionId, SessionStatus};
use http_body_util::BodyExt;
use rust_decimal_macros::dec;
use tower::util::ServiceExt;

async fn harness() -> Harness {
    Harness::new(
        ScriptedProvider::silent(),
        StaticMarket::with_price("2330", dec!(500)),
    )
    .await
}

fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_agent_crud_round_trip() {
    let harness = harness().await;
    let app = router(harness.app_state());

    // Create
    let response = app
        .clone()
        .oneshot(post_json(
            "/api/agents",
            serde_json::json!({
                "name": "價值投資者",
                "description": "buy and hold",
                "ai_model": "gpt-4o-mini",
                "initial_funds": 1_000_000,
                "investment_preferences": ["2330"]
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let created = body_json(response).await;
    let agent_id = created["id"].as_str().unwrap().to_string();
    assert_eq!(created["name"], "價值投資者");
    assert_eq!(created["status"], "INACTIVE");

    // Read
    let response = app
        .clone()
        .oneshot(get(&format!("/api/agents/{agent_id}")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // List
    let response = app.clone().oneshot(get("/api/agents")).await.unwrap();
    let listed = body_json(response).await;
    assert_eq!(listed["total"], 1);

    // Update
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("PUT")
                .uri(format!("/api/agents/{agent_id}"))
                .header("content-type", "application/json")
                .body(Body::from(
                    serde_json::json!({"description": "momentum now"}).to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["description"], "momentum now");

    // Delete, then 404
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri(format!("/api/agents/{agent_id}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app
        .clone()
        .oneshot(get(&format!("/api/agents/{agent_id}")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_validation_and_not_found_mapping() {
    let harness = harness().await;
    let app = router(harness.app_state());

    // Bad RGB theme -> 422
    let response = app
        .clone()
        .oneshot(post_json(
            "/api/agents",
            serde_json::json!({"name": "x", "color_theme": "green"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body_json(response).await["detail"].is_string());

    // Unknown model key -> 404
    let response = app
        .clone()
        .oneshot(post_json(
            "/api/agents",
            serde_json::json!({"name": "x", "ai_model": "gpt-99-ultra"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    // Unknown agent -> 404
    let response = app
        .clone()
        .oneshot(get("/api/agents/ghost"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    // Unknown mode -> 422
    let harness_agent = harness.seed_agent("agent_mode").await;
    let response = app
        .clone()
        .oneshot(post_json(
            &format!("/api/agents/{}/start", harness_agent.id),
            serde_json::json!({"mode": "SCALPING"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_start_is_accepted_and_busy_conflicts() {
    let harness = harness().await;
    let app = router(harness.app_state());
    let agent = harness.seed_agent("agent_409").await;

    // Hold the reservation so the HTTP start collides
    let ticket = harness
        .trading
        .begin_execution(&agent.id, AgentMode::Trading)
        .await
        .unwrap();

    let response = app
        .clone()
        .oneshot(post_json(
            &format!("/api/agents/{}/start", agent.id),
            serde_json::json!({"mode": "TRADING"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);

    drop(ticket);

    // After release the start is accepted
    let response = app
        .clone()
        .oneshot(post_json(
            &format!("/api/agents/{}/start", agent.id),
            serde_json::json!({"mode": "TRADING"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    let accepted = body_json(response).await;
    assert_eq!(accepted["status"], "accepted");
    assert!(accepted["session_id"].is_string());
}

#[tokio::test]
async fn test_stop_without_running_session_is_ok() {
    let harness = harness().await;
    let app = router(harness.app_state());
    let agent = harness.seed_agent("agent_stop").await;

    let response = app
        .clone()
        .oneshot(post_json(
            &format!("/api/agents/{}/stop", agent.id),
            serde_json::json!({}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["stopped"], false);

    // Unknown agent still 404s
    let response = app
        .clone()
        .oneshot(post_json("/api/agents/ghost/stop", serde_json::json!({})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_session_detail_preserves_unicode() {
    let harness = harness().await;
    let app = router(harness.app_state());
    let agent = harness.seed_agent("agent_unicode").await;

    let sessions = harness.trading.sessions().clone();
    let session = sessions
        .create_session(
            SessionId::new("sess_unicode"),
            &agent.id,
            AgentMode::Trading,
            serde_json::json!({"mode": "TRADING"}),
        )
        .await
        .unwrap();
    sessions
        .update_session_status(
            &session.id,
            SessionStatus::Completed,
            formosa::engine::session::SessionUpdate {
                final_output: Some(serde_json::json!({"summary": "摘要（500字內）"})),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let response = app
        .clone()
        .oneshot(get(&format!(
            "/api/agent-execution/{}/sessions/{}",
            agent.id, session.id
        )))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let raw = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(raw.contains("摘要（500字內）"), "body: {raw}");
    assert!(!raw.contains("\\u"), "body escaped: {raw}");
}

#[tokio::test]
async fn test_history_portfolio_and_performance_endpoints() {
    let harness = harness().await;
    let app = router(harness.app_state());
    let agent = harness.seed_agent("agent_views").await;

    // One executed trade through the engine gives history substance
    let ticket = harness
        .trading
        .begin_execution(&agent.id, AgentMode::Trading)
        .await
        .unwrap();
    let outcome = harness
        .trading
        .execute_trade_atomic(&formosa::engine::trading::TradeRequest {
            agent_id: agent.id.clone(),
            ticker: "2330".into(),
            action: formosa_store::entity::TradeAction::Buy,
            quantity: 1000,
            price: dec!(500),
            decision_reason: "entry".into(),
            company_name: "TSMC".into(),
        })
        .await;
    assert!(outcome.success);
    drop(ticket);

    let response = app
        .clone()
        .oneshot(get(&format!(
            "/api/agent-execution/{}/history?limit=5",
            agent.id
        )))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let history = body_json(response).await;
    assert_eq!(history["total"], 1);
    assert_eq!(history["sessions"][0]["trade_count"], 1);
    assert_eq!(history["sessions"][0]["filled_count"], 1);

    let response = app
        .clone()
        .oneshot(get(&format!("/api/trading/agents/{}/portfolio", agent.id)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let portfolio = body_json(response).await;
    assert_eq!(portfolio["holdings"][0]["quantity"], 1000);

    let response = app
        .clone()
        .oneshot(get(&format!(
            "/api/trading/agents/{}/performance-history?limit=10&order=desc",
            agent.id
        )))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let performance = body_json(response).await;
    assert_eq!(performance["total"], 1);

    // Unknown agent 404s rather than returning an empty series
    let response = app
        .clone()
        .oneshot(get("/api/trading/agents/ghost/performance-history"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_models_endpoint_lists_seeded_catalog() {
    let harness = harness().await;
    let app = router(harness.app_state());

    let response = app.clone().oneshot(get("/api/models")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let models = body_json(response).await;
    assert!(
        models
            .as_array()
            .unwrap()
            .iter()
            .any(|model| model["model_key"] == "gpt-4o-mini")
    );
}
