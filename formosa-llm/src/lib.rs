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

//! # Formosa-LLM
//! Provider-agnostic LLM chat client with tool-calling support.
//!
//! Models are addressed as `{prefix}/{model}` (eg/ `openai/gpt-4o-mini`,
//! `gemini/gemini-2.0-flash`); each prefix maps to an OpenAI-compatible chat-completions
//! endpoint. The [`ChatProvider`] trait is the seam the agent runtime binds to, so tests
//! can script conversations without a network.

use crate::error::LlmError;
use async_trait::async_trait;

/// All [`Error`](std::error::Error)s generated in Formosa-LLM.
pub mod error;

/// Chat wire types: messages, tool calls, requests and responses.
pub mod chat;

/// Tool catalog types: schemas and invokers bound to their dependencies.
pub mod tool;

/// OpenAI-compatible HTTP chat client.
pub mod client;

/// One conversational turn against a model that may either answer or request tool calls.
#[async_trait]
pub trait ChatProvider: Send + Sync {
    async fn chat(&self, request: chat::ChatRequest) -> Result<chat::ChatResponse, LlmError>;
}
