use crate::{
    entity::{AgentId, performance::DailyPerformance},
    error::StoreError,
    repository::{decimal, opt_decimal},
};
use chrono::NaiveDate;
use sqlx::{Row, SqliteConnection, sqlite::SqliteRow};

fn from_row(row: &SqliteRow) -> Result<DailyPerformance, StoreError> {
    Ok(DailyPerformance {
        agent_id: AgentId::new(row.try_get::<String, _>("agent_id")?),
        date: row.try_get("date")?,
        total_value: decimal(row, "total_value")?,
        cash_balance: decimal(row, "cash_balance")?,
        unrealized_pnl: decimal(row, "unrealized_pnl")?,
        realized_pnl: decimal(row, "realized_pnl")?,
        total_return: decimal(row, "total_return")?,
        daily_return: opt_decimal(row, "daily_return")?,
        win_rate: opt_decimal(row, "win_rate")?,
        max_drawdown: opt_decimal(row, "max_drawdown")?,
        sharpe_ratio: opt_decimal(row, "sharpe_ratio")?,
        sortino_ratio: opt_decimal(row, "sortino_ratio")?,
        calmar_ratio: opt_decimal(row, "calmar_ratio")?,
        total_trades: row.try_get("total_trades")?,
        sell_trades_count: row.try_get("sell_trades_count")?,
        winning_trades_correct: row.try_get("winning_trades_correct")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

/// Insert or regenerate the `(agent_id, date)` snapshot idempotently.
pub async fn upsert(
    conn: &mut SqliteConnection,
    performance: &DailyPerformance,
) -> Result<(), StoreError> {
    sqlx::query(
        "INSERT INTO agent_performance \
         (agent_id, date, total_value, cash_balance, unrealized_pnl, realized_pnl, \
          total_return, daily_return, win_rate, max_drawdown, sharpe_ratio, sortino_ratio, \
          calmar_ratio, total_trades, sell_trades_count, winning_trades_correct, \
          created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?) \
         ON CONFLICT(agent_id, date) DO UPDATE SET \
         total_value = excluded.total_value, cash_balance = excluded.cash_balance, \
         unrealized_pnl = excluded.unrealized_pnl, realized_pnl = excluded.realized_pnl, \
         total_return = excluded.total_return, daily_return = excluded.daily_return, \
         win_rate = excluded.win_rate, max_drawdown = excluded.max_drawdown, \
         sharpe_ratio = excluded.sharpe_ratio, sortino_ratio = excluded.sortino_ratio, \
         calmar_ratio = excluded.calmar_ratio, total_trades = excluded.total_trades, \
         sell_trades_count = excluded.sell_trades_count, \
         winning_trades_correct = excluded.winning_trades_correct, \
         updated_at = excluded.updated_at",
    )
    .bind(performance.agent_id.as_str())
    .bind(performance.date)
    .bind(performance.total_value.to_string())
    .bind(performance.cash_balance.to_string())
    .bind(performance.unrealized_pnl.to_string())
    .bind(performance.realized_pnl.to_string())
    .bind(performance.total_return.to_string())
    .bind(performance.daily_return.map(|value| value.to_string()))
    .bind(performance.win_rate.map(|value| value.to_string()))
    .bind(performance.max_drawdown.map(|value| value.to_string()))
    .bind(performance.sharpe_ratio.map(|value| value.to_string()))
    .bind(performance.sortino_ratio.map(|value| value.to_string()))
    .bind(performance.calmar_ratio.map(|value| value.to_string()))
    .bind(performance.total_trades)
    .bind(performance.sell_trades_count)
    .bind(performance.winning_trades_correct)
    .bind(performance.created_at)
    .bind(performance.updated_at)
    .execute(conn)
    .await?;
    Ok(())
}

pub async fn fetch(
    conn: &mut SqliteConnection,
    agent_id: &AgentId,
    date: NaiveDate,
) -> Result<Option<DailyPerformance>, StoreError> {
    sqlx::query("SELECT * FROM agent_performance WHERE agent_id = ? AND date = ?")
        .bind(agent_id.as_str())
        .bind(date)
        .fetch_optional(conn)
        .await?
        .map(|row| from_row(&row))
        .transpose()
}

/// Performance history ordered by date. `ascending = false` lists newest first.
pub async fn history(
    conn: &mut SqliteConnection,
    agent_id: &AgentId,
    limit: i64,
    ascending: bool,
) -> Result<Vec<DailyPerformance>, StoreError> {
    let query = if ascending {
        "SELECT * FROM agent_performance WHERE agent_id = ? ORDER BY date ASC LIMIT ?"
    } else {
        "SELECT * FROM agent_performance WHERE agent_id = ? ORDER BY date DESC LIMIT ?"
    };

    sqlx::query(query)
        .bind(agent_id.as_str())
        .bind(limit)
        .fetch_all(conn)
        .await?
        .iter()
        .map(from_row)
        .collect()
}
