use super::{AgentId, ColumnDef, SessionId, TradeAction, TransactionId, TransactionStatus};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Commission rate applied to both sides of every trade.
pub const COMMISSION_RATE: Decimal = Decimal::from_parts(1425, 0, 0, false, 6);

/// One trade record. EXECUTED rows are immutable and form the authoritative trade log
/// from which holdings and funds derive.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Transaction {
    pub id: TransactionId,
    pub agent_id: AgentId,
    /// Session the trade was issued from. Set whenever the trade came from a run.
    pub session_id: Option<SessionId>,
    pub ticker: String,
    pub company_name: String,
    pub action: TradeAction,
    /// Shares. Positive, whole board lots (multiples of 1000).
    pub quantity: i64,
    pub price: Decimal,
    /// `quantity × price`.
    pub total_amount: Decimal,
    /// `total_amount × 0.001425`.
    pub commission: Decimal,
    pub status: TransactionStatus,
    pub execution_time: Option<DateTime<Utc>>,
    pub decision_reason: String,
    pub created_at: DateTime<Utc>,
}

impl Transaction {
    pub const TABLE: &'static str = "transactions";

    pub const COLUMNS: &'static [ColumnDef] = &[
        ColumnDef::new("id", true),
        ColumnDef::new("agent_id", true),
        ColumnDef::new("session_id", false),
        ColumnDef::new("ticker", true),
        ColumnDef::new("company_name", true),
        ColumnDef::new("action", true),
        ColumnDef::new("quantity", true),
        ColumnDef::new("price", true),
        ColumnDef::new("total_amount", true),
        ColumnDef::new("commission", true),
        ColumnDef::new("status", true),
        ColumnDef::new("execution_time", false),
        ColumnDef::new("decision_reason", true),
        ColumnDef::new("created_at", true),
    ];

    /// Signed cash delta this transaction applies to the agent's funds.
    pub fn funds_change(&self) -> Decimal {
        match self.action {
            TradeAction::Buy => -(self.total_amount + self.commission),
            TradeAction::Sell => self.total_amount - self.commission,
        }
    }
}
