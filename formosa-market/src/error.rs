use crate::Ticker;
use formosa_integration::error::IntegrationError;
use thiserror::Error;

/// All market data gateway errors generated in `formosa-market`.
#[derive(Debug, Error)]
pub enum MarketError {
    #[error("market provider: {0}")]
    Provider(#[from] IntegrationError),

    #[error("quote for '{ticker}' missing field '{field}' in payload: {payload}")]
    MalformedQuote {
        ticker: Ticker,
        field: &'static str,
        payload: String,
    },

    #[error("market provider replied with unusable payload: {0}")]
    Unusable(String),
}

impl MarketError {
    /// Transient failures were already retried inside the integration layer; what remains
    /// transient here is an exhausted retry budget.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Provider(IntegrationError::Exhausted { .. })
                | Self::Provider(IntegrationError::Timeout { .. })
        )
    }
}
