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

//! # Formosa
//! Formosa is a multi-tenant orchestrator for LLM trading agents operating on a simulated
//! Taiwan stock market.
//! * **Concurrent**: one task per in-flight agent execution; a per-agent single-flight
//!   registry guarantees at most one active session per agent.
//! * **Atomic**: every trade mutates transaction log, holdings, cash and daily performance
//!   inside one transactional scope that commits or rolls back as a unit.
//! * **Observable**: session, trade and portfolio events fan out to WebSocket subscribers.
//!
//! ## Overview
//! Users create agents through the REST surface, then trigger bounded executions in
//! TRADING or REBALANCING mode. Each execution composes instructions, a mode-driven tool
//! set, sub-analyst agents and an LLM client, runs the tool-calling loop under a
//! wall-clock deadline with cooperative cancellation, and records every outcome on the
//! session row.
//!
//! At a high level, it provides a few major components:
//! * `TradingService` owning the single-flight registry and the atomic trade primitive.
//! * `SessionService` owning the session lifecycle state machine and timeout sweeping.
//! * `AgentRuntime` composing instructions + tools + sub-agents + LLM per execution.
//! * `EventBus` broadcasting typed JSON events to WebSocket subscribers.
//! * A derived-metrics engine recomputing FIFO realized P&L, drawdown and risk ratios.

/// Process configuration read from the environment.
pub mod config;

/// Defines all possible errors in Formosa core.
pub mod error;

/// Provides default Formosa Tracing logging initialisers.
pub mod logging;

/// Typed WebSocket event fan-out.
pub mod event;

/// Trading engine: single-flight registry, session lifecycle, atomic trades and derived
/// metrics.
pub mod engine;

/// Agent runtime composition: instructions, tool sets, sub-agents and the LLM loop.
pub mod runtime;

/// REST + WebSocket surface mapping HTTP verbs to service calls.
pub mod server;

/// Utilities for wiring and running a full orchestrator process.
pub mod system;
