use crate::error::FormosaError;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use std::sync::OnceLock;
use tracing::error;

static DEBUG_ERRORS: OnceLock<bool> = OnceLock::new();

/// Enable cause chains in server-error response bodies. Production leaves this off so
/// bodies never leak backtraces or filesystem paths.
pub fn set_debug_errors(enabled: bool) {
    let _ = DEBUG_ERRORS.set(enabled);
}

fn debug_errors() -> bool {
    DEBUG_ERRORS.get().copied().unwrap_or(false)
}

/// HTTP-facing error: a status code and a `{"detail": ...}` body.
///
/// Server-class errors are logged in full and reduced to a generic detail so response
/// bodies never leak backtraces or filesystem paths.
#[derive(Debug, Clone)]
pub struct ApiError {
    pub status: StatusCode,
    pub detail: String,
}

impl ApiError {
    pub fn new(status: StatusCode, detail: impl Into<String>) -> Self {
        Self {
            status,
            detail: detail.into(),
        }
    }
}

impl From<FormosaError> for ApiError {
    fn from(error: FormosaError) -> Self {
        match &error {
            FormosaError::NotFound { .. } => Self::new(StatusCode::NOT_FOUND, error.to_string()),
            FormosaError::AgentBusy(_) => Self::new(StatusCode::CONFLICT, error.to_string()),
            FormosaError::Validation(_) => {
                Self::new(StatusCode::UNPROCESSABLE_ENTITY, error.to_string())
            }
            FormosaError::InsufficientFunds { .. }
            | FormosaError::InsufficientHoldings { .. } => {
                Self::new(StatusCode::UNPROCESSABLE_ENTITY, error.to_string())
            }
            _ => {
                error!(%error, "internal server error");
                if debug_errors() {
                    Self::new(StatusCode::INTERNAL_SERVER_ERROR, error.to_string())
                } else {
                    Self::new(StatusCode::INTERNAL_SERVER_ERROR, "internal server error")
                }
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(serde_json::json!({"detail": self.detail})),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use formosa_store::entity::AgentId;

    #[test]
    fn test_error_kinds_map_to_http_statuses() {
        let cases: Vec<(FormosaError, StatusCode)> = vec![
            (
                FormosaError::not_found("agent", "a1"),
                StatusCode::NOT_FOUND,
            ),
            (
                FormosaError::AgentBusy(AgentId::new("a1")),
                StatusCode::CONFLICT,
            ),
            (
                FormosaError::validation("bad quantity"),
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (
                FormosaError::configuration("missing env"),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (error, expected) in cases {
            assert_eq!(ApiError::from(error).status, expected);
        }
    }

    #[test]
    fn test_server_errors_do_not_leak_internals() {
        let api = ApiError::from(FormosaError::configuration(
            "could not read /etc/formosa/secrets.toml",
        ));
        assert_eq!(api.detail, "internal server error");
    }
}
