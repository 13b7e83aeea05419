/// Agent CRUD and model catalog facade.
pub mod agents;

/// Cooperative cancellation token checked between LLM turns and after tool calls.
pub mod cancel;

/// Per-agent single-flight registry: at most one active session per agent.
pub mod registry;

/// Session lifecycle state machine, timestamping and timeout sweeping.
pub mod session;

/// Trade execution: validation, the four-step atomic write, portfolio views.
pub mod trading;

/// Derived-metrics engine: FIFO realized P&L, drawdown, risk ratios, daily snapshots.
pub mod metrics;
