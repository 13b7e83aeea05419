use thiserror::Error;

/// All LLM client errors generated in `formosa-llm`.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("unknown model provider prefix '{0}'")]
    UnknownProvider(String),

    #[error("model configuration: {0}")]
    Configuration(String),

    #[error("HTTP transport: {0}")]
    Http(#[from] reqwest::Error),

    #[error("provider returned status {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("deserialising provider response: {error} for payload: {payload}")]
    Deserialise {
        error: serde_json::Error,
        payload: String,
    },

    #[error("provider response contained no choices")]
    EmptyResponse,
}
