use chrono::{DateTime, Utc};
use formosa_store::entity::AgentId;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Discriminator of one WebSocket event.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WsMessageKind {
    AgentStatus,
    TradeExecution,
    StrategyChange,
    PortfolioUpdate,
    PerformanceUpdate,
    Error,
    ExecutionStarted,
    ExecutionCompleted,
    ExecutionFailed,
    ExecutionStopped,
    Pong,
}

/// One WebSocket event: `{type, agent_id?, timestamp, data}`.
///
/// `timestamp` is filled in server-side at broadcast when absent, rendered as ISO-8601
/// UTC. Serialisation preserves non-ASCII text unescaped.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct WsMessage {
    #[serde(rename = "type")]
    pub kind: WsMessageKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<AgentId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
    pub data: serde_json::Value,
}

impl WsMessage {
    pub fn new(kind: WsMessageKind, agent_id: Option<AgentId>, data: serde_json::Value) -> Self {
        Self {
            kind,
            agent_id,
            timestamp: None,
            data,
        }
    }
}

#[derive(Debug)]
struct Connection {
    id: u64,
    tx: mpsc::UnboundedSender<String>,
}

/// Process-global WebSocket connection set with typed broadcast.
///
/// Delivery is at-most-once, best-effort and unordered across connections; a connection
/// whose send fails is evicted eagerly. No replay on reconnect.
#[derive(Debug, Clone, Default)]
pub struct EventBus {
    connections: Arc<Mutex<Vec<Connection>>>,
    next_id: Arc<AtomicU64>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a connection after the WS handshake; the receiver feeds the socket writer.
    pub fn connect(&self) -> (u64, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.connections.lock().push(Connection { id, tx });
        debug!(connection = id, "websocket subscriber connected");
        (id, rx)
    }

    /// Remove a connection explicitly (socket closed by the peer).
    pub fn disconnect(&self, id: u64) {
        self.connections.lock().retain(|connection| connection.id != id);
    }

    pub fn connection_count(&self) -> usize {
        self.connections.lock().len()
    }

    /// Serialise once, stamp a server-side timestamp if absent, send to a snapshot of the
    /// connection set and evict every connection whose send fails.
    pub fn broadcast(&self, mut message: WsMessage) {
        if message.timestamp.is_none() {
            message.timestamp = Some(Utc::now());
        }

        let payload = match serde_json::to_string(&message) {
            Ok(payload) => payload,
            Err(error) => {
                warn!(%error, "failed to serialise websocket event");
                return;
            }
        };

        // Snapshot the senders so the set cannot be mutated mid-traversal
        let snapshot: Vec<(u64, mpsc::UnboundedSender<String>)> = self
            .connections
            .lock()
            .iter()
            .map(|connection| (connection.id, connection.tx.clone()))
            .collect();

        let mut dead = Vec::new();
        for (id, tx) in snapshot {
            if tx.send(payload.clone()).is_err() {
                dead.push(id);
            }
        }

        if !dead.is_empty() {
            debug!(evicted = dead.len(), "evicting dead websocket connections");
            self.connections
                .lock()
                .retain(|connection| !dead.contains(&connection.id));
        }
    }

    pub fn emit_agent_status(&self, agent_id: &AgentId, data: serde_json::Value) {
        self.broadcast(WsMessage::new(
            WsMessageKind::AgentStatus,
            Some(agent_id.clone()),
            data,
        ));
    }

    pub fn emit_trade_execution(&self, agent_id: &AgentId, data: serde_json::Value) {
        self.broadcast(WsMessage::new(
            WsMessageKind::TradeExecution,
            Some(agent_id.clone()),
            data,
        ));
    }

    pub fn emit_portfolio_update(&self, agent_id: &AgentId, data: serde_json::Value) {
        self.broadcast(WsMessage::new(
            WsMessageKind::PortfolioUpdate,
            Some(agent_id.clone()),
            data,
        ));
    }

    pub fn emit_strategy_change(&self, agent_id: &AgentId, data: serde_json::Value) {
        self.broadcast(WsMessage::new(
            WsMessageKind::StrategyChange,
            Some(agent_id.clone()),
            data,
        ));
    }

    pub fn emit_error(&self, agent_id: &AgentId, message: &str) {
        self.broadcast(WsMessage::new(
            WsMessageKind::Error,
            Some(agent_id.clone()),
            serde_json::json!({"message": message}),
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_broadcast_stamps_timestamp_and_preserves_unicode() {
        let bus = EventBus::new();
        let (_, mut rx) = bus.connect();

        bus.emit_trade_execution(
            &AgentId::new("agent_1"),
            serde_json::json!({"reason": "技術突破"}),
        );

        let payload = rx.recv().await.unwrap();
        assert!(payload.contains(r#""type":"trade_execution""#));
        assert!(payload.contains("技術突破"));
        assert!(!payload.contains("\\u"));
        assert!(payload.contains("timestamp"));
    }

    #[tokio::test]
    async fn test_failed_send_evicts_connection() {
        let bus = EventBus::new();
        let (_, rx_alive) = bus.connect();
        let (_, rx_dead) = bus.connect();
        assert_eq!(bus.connection_count(), 2);

        drop(rx_dead);
        bus.emit_error(&AgentId::new("agent_1"), "boom");

        assert_eq!(bus.connection_count(), 1);
        drop(rx_alive);
    }

    #[tokio::test]
    async fn test_disconnect_removes_connection() {
        let bus = EventBus::new();
        let (id, _rx) = bus.connect();
        bus.disconnect(id);
        assert_eq!(bus.connection_count(), 0);
    }
}
