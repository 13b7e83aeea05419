use formosa_integration::error::IntegrationError;
use formosa_llm::error::LlmError;
use formosa_market::error::MarketError;
use formosa_store::{entity::AgentId, error::StoreError};
use rust_decimal::Decimal;
use thiserror::Error;

/// All errors generated in Formosa core.
///
/// Kinds map onto HTTP semantics at the REST boundary: NotFound → 404, AgentBusy → 409,
/// Validation → 422, everything else → 500.
#[derive(Debug, Error)]
pub enum FormosaError {
    #[error("{entity} '{id}' not found")]
    NotFound { entity: &'static str, id: String },

    #[error("agent '{0}' already has an active session")]
    AgentBusy(AgentId),

    #[error("validation: {0}")]
    Validation(String),

    #[error("configuration: {0}")]
    Configuration(String),

    #[error("insufficient funds: required {required}, available {available}")]
    InsufficientFunds {
        required: Decimal,
        available: Decimal,
    },

    #[error("insufficient holdings for '{ticker}': selling {requested}, holding {held}")]
    InsufficientHoldings {
        ticker: String,
        requested: i64,
        held: i64,
    },

    #[error("market data: {0}")]
    Market(#[from] MarketError),

    #[error("tool provider: {0}")]
    Integration(#[from] IntegrationError),

    #[error("llm: {0}")]
    Llm(#[from] LlmError),

    #[error("store: {0}")]
    Store(StoreError),

    #[error("execution cancelled")]
    Cancelled,

    #[error("execution timeout")]
    Timeout,

    #[error("JoinError: {0}")]
    JoinError(String),
}

impl FormosaError {
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            id: id.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }
}

impl From<StoreError> for FormosaError {
    fn from(error: StoreError) -> Self {
        match error {
            // Typed NotFound keeps its HTTP semantics instead of collapsing into a 500
            StoreError::NotFound { entity, id } => Self::NotFound { entity, id },
            other => Self::Store(other),
        }
    }
}

impl From<sqlx::Error> for FormosaError {
    fn from(error: sqlx::Error) -> Self {
        Self::from(StoreError::from(error))
    }
}

impl From<tokio::task::JoinError> for FormosaError {
    fn from(value: tokio::task::JoinError) -> Self {
        Self::JoinError(format!("{value:?}"))
    }
}
