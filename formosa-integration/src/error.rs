use smol_str::SmolStr;
use thiserror::Error;

/// All subprocess transport related errors generated in `formosa-integration`.
#[derive(Debug, Error)]
pub enum IntegrationError {
    #[error("provider process spawn failed: {0}")]
    Spawn(std::io::Error),

    #[error("provider process stdio unavailable: {0}")]
    Stdio(&'static str),

    #[error("provider transport IO: {0}")]
    Transport(#[from] std::io::Error),

    #[error("provider closed its stdout stream")]
    Closed,

    #[error("deserialising provider response: {error} for payload: {payload}")]
    Deserialise {
        error: serde_json::Error,
        payload: String,
    },

    #[error("serialising provider request: {0}")]
    Serialise(serde_json::Error),

    #[error("tool call '{tool}' timed out after {timeout_ms}ms")]
    Timeout { tool: SmolStr, timeout_ms: u64 },

    #[error("provider returned error for tool '{tool}': {message}")]
    Provider { tool: SmolStr, message: String },

    #[error("retries exhausted after {attempts} attempts: {last}")]
    Exhausted {
        attempts: u32,
        last: Box<IntegrationError>,
    },
}

impl IntegrationError {
    /// Transient errors are eligible for retry; the rest fail fast.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Timeout { .. } | Self::Transport(_) | Self::Closed
        )
    }
}
