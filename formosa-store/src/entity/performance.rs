use super::{AgentId, ColumnDef};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Daily derived performance snapshot of one agent. Unique on `(agent_id, date)` and
/// regenerated idempotently by the derived-metrics engine.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct DailyPerformance {
    pub agent_id: AgentId,
    pub date: NaiveDate,
    /// `cash_balance + Σ quantity × current_price`.
    pub total_value: Decimal,
    pub cash_balance: Decimal,
    pub unrealized_pnl: Decimal,
    /// FIFO-matched realized P&L, before commissions.
    pub realized_pnl: Decimal,
    /// Percentage return over initial funds.
    pub total_return: Decimal,
    /// Percentage return over the previous day's total value, when available.
    pub daily_return: Option<Decimal>,
    /// Published as "sell completion rate": sell trades ÷ total trades × 100.
    pub win_rate: Option<Decimal>,
    /// Peak-to-trough percentage decline of the total-value series. None with < 2 points.
    pub max_drawdown: Option<Decimal>,
    /// Annualised (√252); None with < 20 daily returns.
    pub sharpe_ratio: Option<Decimal>,
    pub sortino_ratio: Option<Decimal>,
    pub calmar_ratio: Option<Decimal>,
    pub total_trades: i64,
    pub sell_trades_count: i64,
    /// Sell trades whose FIFO-matched proceeds beat their matched cost.
    pub winning_trades_correct: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DailyPerformance {
    pub const TABLE: &'static str = "agent_performance";

    pub const COLUMNS: &'static [ColumnDef] = &[
        ColumnDef::new("agent_id", true),
        ColumnDef::new("date", true),
        ColumnDef::new("total_value", true),
        ColumnDef::new("cash_balance", true),
        ColumnDef::new("unrealized_pnl", true),
        ColumnDef::new("realized_pnl", true),
        ColumnDef::new("total_return", true),
        ColumnDef::new("daily_return", false),
        ColumnDef::new("win_rate", false),
        ColumnDef::new("max_drawdown", false),
        ColumnDef::new("sharpe_ratio", false),
        ColumnDef::new("sortino_ratio", false),
        ColumnDef::new("calmar_ratio", false),
        ColumnDef::new("total_trades", true),
        ColumnDef::new("sell_trades_count", true),
        ColumnDef::new("winning_trades_correct", true),
        ColumnDef::new("created_at", true),
        ColumnDef::new("updated_at", true),
    ];
}
