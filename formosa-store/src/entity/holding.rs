use super::{AgentId, ColumnDef};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Current position of one agent in one ticker. Unique on `(agent_id, ticker)`.
///
/// Invariants: `quantity ≥ 0`; a zero quantity carries a zero average cost.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Holding {
    pub agent_id: AgentId,
    pub ticker: String,
    pub company_name: String,
    pub quantity: i64,
    pub average_cost: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Holding {
    pub const TABLE: &'static str = "agent_holdings";

    pub const COLUMNS: &'static [ColumnDef] = &[
        ColumnDef::new("agent_id", true),
        ColumnDef::new("ticker", true),
        ColumnDef::new("company_name", true),
        ColumnDef::new("quantity", true),
        ColumnDef::new("average_cost", true),
        ColumnDef::new("created_at", true),
        ColumnDef::new("updated_at", true),
    ];

    /// Cost basis of the position.
    pub fn cost_basis(&self) -> Decimal {
        Decimal::from(self.quantity) * self.average_cost
    }
}
