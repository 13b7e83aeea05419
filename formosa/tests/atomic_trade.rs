//! Atomic trade semantics: the four-step write commits together or not at all.

mod common;

use common::{Harness, ScriptedProvider, StaticMarket, final_turn, tool_call, turn_with_calls};
use formosa::engine::trading::TradeRequest;
use formosa_store::{
    entity::{AgentMode, SessionStatus, TradeAction, TransactionStatus},
    repository,
};
use rust_decimal_macros::dec;

fn buy_request(agent_id: &str, quantity: i64, price: rust_decimal::Decimal) -> TradeRequest {
    TradeRequest {
        agent_id: agent_id.into(),
        ticker: "2330".into(),
        action: TradeAction::Buy,
        quantity,
        price,
        decision_reason: "test".into(),
        company_name: "TSMC".into(),
    }
}

#[tokio::test]
async fn test_happy_path_buy_through_full_execution() {
    // The LLM issues one BUY 2330 x 1000 @ 500, then finishes
    let provider = ScriptedProvider::new([
        turn_with_calls(vec![tool_call(
            "call_1",
            "buy_stock",
            serde_json::json!({
                "ticker": "2330",
                "quantity": 1000,
                "price": 500,
                "decision_reason": "entry",
                "company_name": "TSMC"
            }),
        )]),
        final_turn(r#"{"summary": "bought one lot of TSMC"}"#),
    ]);
    let market = StaticMarket::with_price("2330", dec!(500));
    let harness = Harness::new(provider, market).await;
    let agent = harness.seed_agent("agent_buy").await;

    let output = harness
        .trading
        .execute_single_mode(&agent.id, AgentMode::Trading)
        .await
        .unwrap();
    assert!(output.success);
    assert_eq!(output.tools_called, vec!["buy_stock"]);

    let mut conn = harness.store.acquire().await.unwrap();

    // Holding: 1000 shares @ 500
    let holding = repository::holdings::fetch(&mut conn, &agent.id, "2330")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(holding.quantity, 1000);
    assert_eq!(holding.average_cost, dec!(500));

    // Funds: 1,000,000 - 500,000 - 712.5
    let reloaded = repository::agents::fetch_required(&mut conn, &agent.id)
        .await
        .unwrap();
    assert_eq!(reloaded.current_funds, dec!(499_287.5));

    // One EXECUTED transaction with the derived commission
    let trades = repository::transactions::list_for_agent(&mut conn, &agent.id)
        .await
        .unwrap();
    assert_eq!(trades.len(), 1);
    assert_eq!(trades[0].status, TransactionStatus::Executed);
    assert_eq!(trades[0].commission, dec!(712.5));
    assert_eq!(trades[0].total_amount, dec!(500_000));

    // Session COMPLETED with a measured duration
    let session_id = trades[0].session_id.clone().unwrap();
    let session = repository::sessions::fetch_required(&mut conn, &session_id)
        .await
        .unwrap();
    assert_eq!(session.status, SessionStatus::Completed);
    assert!(session.execution_time_ms.unwrap() > 0);
    assert!(session.end_time.unwrap() >= session.start_time);

    // Performance row for today exists and reconciles
    let performance = repository::performance::fetch(
        &mut conn,
        &agent.id,
        chrono::Utc::now().date_naive(),
    )
    .await
    .unwrap()
    .unwrap();
    assert_eq!(performance.cash_balance, dec!(499_287.5));
    assert_eq!(performance.total_value, dec!(999_287.5));
    assert_eq!(performance.total_trades, 1);
}

#[tokio::test]
async fn test_insufficient_funds_rolls_back_every_step() {
    let provider = ScriptedProvider::silent();
    let market = StaticMarket::with_price("2330", dec!(500));
    let harness = Harness::new(provider, market).await;
    let agent = harness.seed_agent("agent_poor").await;

    // Hold a reservation so the trade resolves a session
    let ticket = harness
        .trading
        .begin_execution(&agent.id, AgentMode::Trading)
        .await
        .unwrap();

    // 3000 x 500 = 1.5M > 1M: funds step fails after transaction + holding writes
    let outcome = harness
        .trading
        .execute_trade_atomic(&buy_request(agent.id.as_str(), 3000, dec!(500)))
        .await;
    assert!(!outcome.success);
    assert!(outcome.error.unwrap().contains("insufficient funds"));

    let mut conn = harness.store.acquire().await.unwrap();
    let trades = repository::transactions::list_for_agent(&mut conn, &agent.id)
        .await
        .unwrap();
    assert!(trades.is_empty(), "transaction row must roll back");

    let holding = repository::holdings::fetch(&mut conn, &agent.id, "2330")
        .await
        .unwrap();
    assert!(holding.is_none(), "holding upsert must roll back");

    let reloaded = repository::agents::fetch_required(&mut conn, &agent.id)
        .await
        .unwrap();
    assert_eq!(reloaded.current_funds, dec!(1_000_000), "funds unchanged");

    let performance = repository::performance::fetch(
        &mut conn,
        &agent.id,
        chrono::Utc::now().date_naive(),
    )
    .await
    .unwrap();
    assert!(performance.is_none(), "no performance row for the failed event");

    drop(conn);
    drop(ticket);
}

#[tokio::test]
async fn test_oversell_is_rejected_without_state_change() {
    let provider = ScriptedProvider::silent();
    let market = StaticMarket::with_price("2330", dec!(500));
    let harness = Harness::new(provider, market).await;
    let agent = harness.seed_agent("agent_oversell").await;

    let ticket = harness
        .trading
        .begin_execution(&agent.id, AgentMode::Trading)
        .await
        .unwrap();

    // Establish 1000 shares, then try to sell 2000
    let bought = harness
        .trading
        .execute_trade_atomic(&buy_request(agent.id.as_str(), 1000, dec!(500)))
        .await;
    assert!(bought.success);

    let outcome = harness
        .trading
        .execute_trade_atomic(&TradeRequest {
            action: TradeAction::Sell,
            quantity: 2000,
            ..buy_request(agent.id.as_str(), 2000, dec!(530))
        })
        .await;
    assert!(!outcome.success);
    assert!(outcome.error.unwrap().contains("insufficient holdings"));

    // Prior state intact: one trade, 1000 shares, funds reflect only the buy
    let mut conn = harness.store.acquire().await.unwrap();
    let trades = repository::transactions::list_for_agent(&mut conn, &agent.id)
        .await
        .unwrap();
    assert_eq!(trades.len(), 1);

    let holding = repository::holdings::fetch(&mut conn, &agent.id, "2330")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(holding.quantity, 1000);

    let reloaded = repository::agents::fetch_required(&mut conn, &agent.id)
        .await
        .unwrap();
    assert_eq!(reloaded.current_funds, dec!(499_287.5));

    drop(conn);
    drop(ticket);
}

#[tokio::test]
async fn test_invalid_inputs_rejected_before_any_write() {
    let provider = ScriptedProvider::silent();
    let market = StaticMarket::with_price("2330", dec!(500));
    let harness = Harness::new(provider, market).await;
    let agent = harness.seed_agent("agent_invalid").await;

    let ticket = harness
        .trading
        .begin_execution(&agent.id, AgentMode::Trading)
        .await
        .unwrap();

    for request in [
        buy_request(agent.id.as_str(), 0, dec!(500)),
        buy_request(agent.id.as_str(), -1000, dec!(500)),
        buy_request(agent.id.as_str(), 1500, dec!(500)),
        buy_request(agent.id.as_str(), 1000, dec!(0)),
    ] {
        let outcome = harness.trading.execute_trade_atomic(&request).await;
        assert!(!outcome.success, "request should be rejected: {request:?}");
    }

    let mut conn = harness.store.acquire().await.unwrap();
    let trades = repository::transactions::list_for_agent(&mut conn, &agent.id)
        .await
        .unwrap();
    assert!(trades.is_empty());

    drop(conn);
    drop(ticket);
}

#[tokio::test]
async fn test_trade_without_running_session_is_rejected() {
    let provider = ScriptedProvider::silent();
    let market = StaticMarket::with_price("2330", dec!(500));
    let harness = Harness::new(provider, market).await;
    let agent = harness.seed_agent("agent_no_session").await;

    // No reservation exists for the agent
    let outcome = harness
        .trading
        .execute_trade_atomic(&buy_request(agent.id.as_str(), 1000, dec!(500)))
        .await;

    assert!(!outcome.success);
    assert!(outcome.error.unwrap().contains("no running session"));
}

#[tokio::test]
async fn test_fifo_realized_pnl_scenario() {
    let provider = ScriptedProvider::silent();
    let market = StaticMarket::with_price("2330", dec!(530));
    let harness = Harness::new(provider, market).await;
    let agent = harness.seed_agent("agent_fifo").await;

    let ticket = harness
        .trading
        .begin_execution(&agent.id, AgentMode::Trading)
        .await
        .unwrap();

    // BUY 1000 @ 500, BUY 1000 @ 520, SELL 1500 @ 530
    for (action, quantity, price) in [
        (TradeAction::Buy, 1000, dec!(500)),
        (TradeAction::Buy, 1000, dec!(520)),
        (TradeAction::Sell, 1500, dec!(530)),
    ] {
        let outcome = harness
            .trading
            .execute_trade_atomic(&TradeRequest {
                action,
                quantity,
                price,
                ..buy_request(agent.id.as_str(), quantity, price)
            })
            .await;
        assert!(outcome.success, "{action} {quantity} failed: {outcome:?}");
    }

    let mut conn = harness.store.acquire().await.unwrap();

    let performance = repository::performance::fetch(
        &mut conn,
        &agent.id,
        chrono::Utc::now().date_naive(),
    )
    .await
    .unwrap()
    .unwrap();

    // (530-500)·1000 + (530-520)·500, before commissions
    assert_eq!(performance.realized_pnl, dec!(35_000));
    assert_eq!(performance.winning_trades_correct, 1);
    assert_eq!(performance.total_trades, 3);
    assert_eq!(performance.sell_trades_count, 1);

    // Holding keeps the buy-averaged cost; a sell never re-averages
    let holding = repository::holdings::fetch(&mut conn, &agent.id, "2330")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(holding.quantity, 500);
    assert_eq!(holding.average_cost, dec!(510));

    drop(conn);
    drop(ticket);
}
