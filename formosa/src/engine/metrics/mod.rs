use crate::error::FormosaError;
use chrono::{DateTime, NaiveDate, Utc};
use formosa_market::{MarketData, Ticker};
use formosa_store::{
    entity::{TradeAction, TransactionStatus, agent::Agent, performance::DailyPerformance},
    repository,
};
use itertools::Itertools;
use rust_decimal::{Decimal, prelude::ToPrimitive};
use sqlx::SqliteConnection;
use tracing::warn;

pub mod drawdown;
pub mod fifo;
pub mod ratio;

/// History depth consulted when rebuilding the value series.
const HISTORY_DEPTH: i64 = 5000;

/// Decimal places kept on stored ratio metrics.
const RATIO_DP: u32 = 6;

fn to_decimal(value: f64) -> Option<Decimal> {
    Decimal::from_f64_retain(value).map(|value| value.round_dp(RATIO_DP))
}

/// Recompute and upsert the agent's [`DailyPerformance`] row for `date`.
///
/// Runs on every successful trade (inside the trade's transactional scope) and on
/// demand. The recompute is idempotent: identical inputs regenerate an identical row.
/// A failed price fetch downgrades that holding to its average cost, so it contributes
/// zero unrealized P&L instead of failing the run.
pub async fn recompute_daily(
    conn: &mut SqliteConnection,
    market: &dyn MarketData,
    agent: &Agent,
    cash: Decimal,
    date: NaiveDate,
    now: DateTime<Utc>,
) -> Result<DailyPerformance, FormosaError> {
    let transactions = repository::transactions::list_for_agent(&mut *conn, &agent.id).await?;
    let executed: Vec<_> = transactions
        .iter()
        .filter(|transaction| transaction.status == TransactionStatus::Executed)
        .collect();

    let holdings = repository::holdings::list_for_agent(&mut *conn, &agent.id).await?;

    // Mark-to-market every open position
    let mut unrealized_pnl = Decimal::ZERO;
    let mut market_value = Decimal::ZERO;
    for holding in holdings.iter().filter(|holding| holding.quantity > 0) {
        let quantity = Decimal::from(holding.quantity);
        match market.stock_price(&Ticker::new(&holding.ticker)).await {
            Ok(quote) => {
                unrealized_pnl += (quote.price - holding.average_cost) * quantity;
                market_value += quote.price * quantity;
            }
            Err(error) => {
                // Zero unrealized contribution; carry the position at cost
                warn!(ticker = %holding.ticker, %error, "price fetch failed, using cost basis");
                market_value += holding.average_cost * quantity;
            }
        }
    }

    let total_value = cash + market_value;
    let total_return = if agent.initial_funds > Decimal::ZERO {
        (total_value - agent.initial_funds) / agent.initial_funds * Decimal::ONE_HUNDRED
    } else {
        Decimal::ZERO
    };

    let fifo = fifo::match_trades(executed.iter().copied());
    let total_trades = executed.len() as i64;
    let sell_trades_count = executed
        .iter()
        .filter(|transaction| transaction.action == TradeAction::Sell)
        .count() as i64;

    // Published win_rate stays "sell completion rate"; FIFO winners are tracked apart
    let win_rate = (total_trades > 0).then(|| {
        Decimal::from(sell_trades_count) / Decimal::from(total_trades) * Decimal::ONE_HUNDRED
    });

    // Total-value series: persisted history strictly before `date`, then today
    let history =
        repository::performance::history(&mut *conn, &agent.id, HISTORY_DEPTH, true).await?;
    let mut series: Vec<Decimal> = history
        .iter()
        .filter(|row| row.date < date)
        .map(|row| row.total_value)
        .collect();

    let daily_return = series.last().and_then(|previous| {
        (*previous > Decimal::ZERO)
            .then(|| (total_value - previous) / previous * Decimal::ONE_HUNDRED)
    });

    series.push(total_value);

    let max_drawdown = drawdown::max_drawdown(&series);

    // Daily fractional returns feed the risk ratios
    let returns: Vec<f64> = series
        .iter()
        .tuple_windows()
        .filter_map(|(previous, current)| {
            let previous = previous.to_f64()?;
            let current = current.to_f64()?;
            (previous != 0.0).then(|| (current - previous) / previous)
        })
        .collect();

    let sharpe_ratio = ratio::sharpe_ratio(&returns, 0.0).and_then(to_decimal);
    let sortino_ratio = ratio::sortino_ratio(&returns, 0.0).and_then(to_decimal);
    let calmar_ratio = if returns.is_empty() {
        None
    } else {
        let mean_return = returns.iter().sum::<f64>() / returns.len() as f64;
        ratio::calmar_ratio(mean_return, max_drawdown.and_then(|value| value.to_f64()))
            .and_then(to_decimal)
    };

    let performance = DailyPerformance {
        agent_id: agent.id.clone(),
        date,
        total_value,
        cash_balance: cash,
        unrealized_pnl,
        realized_pnl: fifo.realized_pnl,
        total_return,
        daily_return,
        win_rate,
        max_drawdown,
        sharpe_ratio,
        sortino_ratio,
        calmar_ratio,
        total_trades,
        sell_trades_count,
        winning_trades_correct: fifo.winning_sells,
        created_at: now,
        updated_at: now,
    };

    repository::performance::upsert(&mut *conn, &performance).await?;

    Ok(performance)
}
