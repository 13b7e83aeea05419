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

//! # Formosa-Integration
//! Low-level framework for composing external tool integrations.
//!
//! Utilised by other Formosa crates to talk to out-of-process tool providers (market data,
//! agent memory, web research) over a stdio RPC transport. It is:
//! * **Scoped**: every spawned provider is owned by its handle and killed on drop.
//! * **Robust**: per-call timeouts with exponential backoff retry on transient failures.
//!
//! ## Core abstractions:
//! - **ToolProcess** owning a spawned provider subprocess with piped stdio.
//! - **ToolProcessClient** providing typed `call_tool(name, args) -> ToolContent` dispatch.
//! - **RetryPolicy** describing bounded exponential backoff with jitter.

use serde::{Deserialize, Serialize};

/// All [`Error`](std::error::Error)s generated in Formosa-Integration.
pub mod error;

/// Subprocess lifecycle: spawning a tool provider with piped stdio, scoped kill on drop.
pub mod process;

/// Typed request/response dispatch over a [`process::ToolProcess`] transport.
pub mod client;

/// Bounded exponential backoff with jitter for transient failures.
pub mod retry;

/// Result content of a tool invocation.
///
/// Providers reply with content whose first element is either structured JSON or raw text.
/// [`ToolContent::parse`] attempts the structured interpretation first and falls through to
/// raw text, carrying a success flag either way.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub enum ToolContent {
    /// Structured JSON payload.
    Json(serde_json::Value),
    /// Raw text payload with an explicit success flag.
    Text { text: String, success: bool },
}

impl ToolContent {
    /// Interpret a raw provider payload, preferring structured JSON.
    pub fn parse(raw: &str) -> Self {
        match serde_json::from_str::<serde_json::Value>(raw) {
            Ok(value) if value.is_object() || value.is_array() => Self::Json(value),
            _ => Self::Text {
                text: raw.to_string(),
                success: true,
            },
        }
    }

    /// View the content as a JSON value, wrapping raw text if required.
    pub fn into_value(self) -> serde_json::Value {
        match self {
            Self::Json(value) => value,
            Self::Text { text, success } => serde_json::json!({
                "success": success,
                "text": text,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_content_parse_structured_json() {
        let content = ToolContent::parse(r#"{"price": 500.0, "ticker": "2330"}"#);
        assert_eq!(
            content,
            ToolContent::Json(serde_json::json!({"price": 500.0, "ticker": "2330"}))
        );
    }

    #[test]
    fn test_tool_content_parse_raw_text_fallthrough() {
        let content = ToolContent::parse("market closed today");
        assert_eq!(
            content,
            ToolContent::Text {
                text: "market closed today".to_string(),
                success: true,
            }
        );
    }

    #[test]
    fn test_tool_content_parse_scalar_json_is_text() {
        // Bare scalars are provider chatter, not structured results
        let content = ToolContent::parse("42");
        assert_eq!(
            content,
            ToolContent::Text {
                text: "42".to_string(),
                success: true,
            }
        );
    }

    #[test]
    fn test_tool_content_into_value_preserves_unicode() {
        let content = ToolContent::parse(r#"{"summary": "摘要（500字內）"}"#);
        let value = content.into_value();
        assert_eq!(value["summary"], "摘要（500字內）");
    }
}
