//! Derived-metrics recompute: idempotence and degraded mark-to-market behaviour.

mod common;

use chrono::Utc;
use common::{Harness, ScriptedProvider, StaticMarket};
use formosa::engine::{metrics, trading::TradeRequest};
use formosa_store::{
    entity::{AgentMode, TradeAction},
    repository,
};
use rust_decimal_macros::dec;

#[tokio::test]
async fn test_recompute_is_idempotent() {
    let market = StaticMarket::with_price("2330", dec!(530));
    let harness = Harness::new(ScriptedProvider::silent(), market.clone()).await;
    let agent = harness.seed_agent("agent_idem").await;

    let ticket = harness
        .trading
        .begin_execution(&agent.id, AgentMode::Trading)
        .await
        .unwrap();
    let outcome = harness
        .trading
        .execute_trade_atomic(&TradeRequest {
            agent_id: agent.id.clone(),
            ticker: "2330".into(),
            action: TradeAction::Buy,
            quantity: 1000,
            price: dec!(500),
            decision_reason: "entry".into(),
            company_name: "TSMC".into(),
        })
        .await;
    assert!(outcome.success);
    drop(ticket);

    let today = Utc::now().date_naive();
    let now = Utc::now();

    let mut conn = harness.store.acquire().await.unwrap();
    let agent_row = repository::agents::fetch_required(&mut conn, &agent.id)
        .await
        .unwrap();

    let first = metrics::recompute_daily(
        &mut conn,
        market.as_ref(),
        &agent_row,
        agent_row.current_funds,
        today,
        now,
    )
    .await
    .unwrap();

    let second = metrics::recompute_daily(
        &mut conn,
        market.as_ref(),
        &agent_row,
        agent_row.current_funds,
        today,
        now,
    )
    .await
    .unwrap();

    assert_eq!(first, second, "same-date recompute must regenerate identically");

    let stored = repository::performance::fetch(&mut conn, &agent.id, today)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.total_value, second.total_value);
    assert_eq!(stored.unrealized_pnl, dec!(30_000)); // (530-500) x 1000
}

#[tokio::test]
async fn test_price_fetch_failure_contributes_zero_unrealized() {
    // Market knows no prices at all: every quote fails
    let market = std::sync::Arc::new(StaticMarket::default());
    let harness = Harness::new(ScriptedProvider::silent(), market.clone()).await;
    let agent = harness.seed_agent("agent_degraded").await;

    let ticket = harness
        .trading
        .begin_execution(&agent.id, AgentMode::Trading)
        .await
        .unwrap();
    let outcome = harness
        .trading
        .execute_trade_atomic(&TradeRequest {
            agent_id: agent.id.clone(),
            ticker: "2330".into(),
            action: TradeAction::Buy,
            quantity: 1000,
            price: dec!(500),
            decision_reason: "entry".into(),
            company_name: "TSMC".into(),
        })
        .await;
    assert!(outcome.success, "quote outage must not fail the trade");
    drop(ticket);

    let mut conn = harness.store.acquire().await.unwrap();
    let performance = repository::performance::fetch(
        &mut conn,
        &agent.id,
        Utc::now().date_naive(),
    )
    .await
    .unwrap()
    .unwrap();

    // Position carried at cost: zero unrealized, total value = cash + cost basis
    assert_eq!(performance.unrealized_pnl, dec!(0));
    assert_eq!(performance.total_value, dec!(999_287.5));
}

#[tokio::test]
async fn test_ratios_stay_null_until_enough_history() {
    let market = StaticMarket::with_price("2330", dec!(500));
    let harness = Harness::new(ScriptedProvider::silent(), market.clone()).await;
    let agent = harness.seed_agent("agent_sparse").await;

    let today = Utc::now().date_naive();
    let now = Utc::now();
    let mut conn = harness.store.acquire().await.unwrap();
    let agent_row = repository::agents::fetch_required(&mut conn, &agent.id)
        .await
        .unwrap();

    let performance = metrics::recompute_daily(
        &mut conn,
        market.as_ref(),
        &agent_row,
        agent_row.current_funds,
        today,
        now,
    )
    .await
    .unwrap();

    // A single value point: no drawdown, no return series, no ratios
    assert_eq!(performance.max_drawdown, None);
    assert_eq!(performance.daily_return, None);
    assert_eq!(performance.sharpe_ratio, None);
    assert_eq!(performance.sortino_ratio, None);
    assert_eq!(performance.calmar_ratio, None);
}
