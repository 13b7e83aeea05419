#![forbid(unsafe_code)]
#![warn(
    unused,
    clippy::cognitive_complexity,
    unused_crate_dependencies,
    unused_extern_crates,
    clippy::unused_self,
    clippy::useless_let_if_seq,
    missing_debug_implementations,
    rust_2018_idioms,
    rust_2024_compatibility
)]
#![allow(clippy::type_complexity, clippy::too_many_arguments, type_alias_bounds)]

//! # Formosa-Market
//! Market data gateway over an external Taiwan stock market tool provider.
//!
//! The external provider is a subprocess speaking the `formosa-integration` stdio RPC
//! protocol. This crate wraps it in typed operations (quotes, financial statements,
//! trading-day checks, margin, institutional flows, dividends) behind the [`MarketData`]
//! trait seam, so the engine and agent runtime never observe the transport.

use async_trait::async_trait;
use chrono::NaiveDate;
use derive_more::{Display, From};
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

use crate::error::MarketError;

/// All [`Error`](std::error::Error)s generated in Formosa-Market.
pub mod error;

/// Typed market data payloads returned by the gateway.
pub mod quote;

/// [`MarketData`] implementation delegating to an external tool provider subprocess.
pub mod gateway;

/// Taiwan stock ticker code (eg/ "2330").
#[derive(
    Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize, Display, From,
)]
pub struct Ticker(pub SmolStr);

impl Ticker {
    pub fn new<S: AsRef<str>>(ticker: S) -> Self {
        Self(SmolStr::new(ticker.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl From<&str> for Ticker {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Read-only market data operations consumed by the engine and agent runtime.
///
/// Implementations must be cheap to share across tasks. Single-quote failures are surfaced
/// as errors here; callers decide whether a failed mark-to-market contribution is fatal
/// (the derived-metrics engine treats it as a zero contribution).
#[async_trait]
pub trait MarketData: Send + Sync {
    /// Current quote for a ticker.
    async fn stock_price(&self, ticker: &Ticker) -> Result<quote::Quote, MarketError>;

    /// Financial statement summary for a ticker.
    async fn company_financials(&self, ticker: &Ticker)
    -> Result<serde_json::Value, MarketError>;

    /// Whether the exchange is open on the provided date.
    async fn is_trading_day(&self, date: NaiveDate) -> Result<bool, MarketError>;

    /// Holiday schedule detail for the provided date.
    async fn holiday_info(&self, date: NaiveDate) -> Result<serde_json::Value, MarketError>;

    /// Margin trading balances for a ticker.
    async fn margin_info(&self, ticker: &Ticker) -> Result<serde_json::Value, MarketError>;

    /// Foreign institutional buy/sell flows for a ticker.
    async fn foreign_flows(&self, ticker: &Ticker) -> Result<serde_json::Value, MarketError>;

    /// Dividend history for a ticker.
    async fn dividends(&self, ticker: &Ticker) -> Result<serde_json::Value, MarketError>;
}
