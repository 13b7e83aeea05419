use crate::error::FormosaError;
use async_trait::async_trait;
use formosa_integration::client::ToolProcessClient;
use formosa_store::entity::AgentId;

/// Persistent decision memory of an agent.
///
/// A digest of past decisions is loaded before every run and a summary appended after a
/// successful one. Memory failures never fail the run; callers log and continue.
#[async_trait]
pub trait MemoryStore: Send + Sync {
    /// Bounded digest of the agent's most recent memories, empty when none exist.
    async fn load_digest(&self, agent_id: &AgentId, limit: usize) -> Result<String, FormosaError>;

    /// Append one run summary.
    async fn append_summary(&self, agent_id: &AgentId, summary: &str)
    -> Result<(), FormosaError>;

    /// Free-text search over the agent's memories.
    async fn search(&self, agent_id: &AgentId, query: &str) -> Result<String, FormosaError>;
}

/// Memory disabled: empty digests, appends dropped.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullMemoryStore;

#[async_trait]
impl MemoryStore for NullMemoryStore {
    async fn load_digest(&self, _: &AgentId, _: usize) -> Result<String, FormosaError> {
        Ok(String::new())
    }

    async fn append_summary(&self, _: &AgentId, _: &str) -> Result<(), FormosaError> {
        Ok(())
    }

    async fn search(&self, _: &AgentId, _: &str) -> Result<String, FormosaError> {
        Ok(String::new())
    }
}

/// Memory backed by an external provider subprocess.
#[derive(Debug, Clone)]
pub struct McpMemoryStore {
    client: ToolProcessClient,
}

impl McpMemoryStore {
    pub fn new(client: ToolProcessClient) -> Self {
        Self { client }
    }

    fn text_of(value: serde_json::Value) -> String {
        match value {
            serde_json::Value::String(text) => text,
            other => other
                .get("text")
                .and_then(serde_json::Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| other.to_string()),
        }
    }
}

#[async_trait]
impl MemoryStore for McpMemoryStore {
    async fn load_digest(&self, agent_id: &AgentId, limit: usize) -> Result<String, FormosaError> {
        let content = self
            .client
            .call_tool(
                "load_recent_memories",
                serde_json::json!({"agent_id": agent_id, "limit": limit}),
            )
            .await?;
        Ok(Self::text_of(content.into_value()))
    }

    async fn append_summary(
        &self,
        agent_id: &AgentId,
        summary: &str,
    ) -> Result<(), FormosaError> {
        self.client
            .call_tool(
                "record_memory",
                serde_json::json!({"agent_id": agent_id, "content": summary}),
            )
            .await?;
        Ok(())
    }

    async fn search(&self, agent_id: &AgentId, query: &str) -> Result<String, FormosaError> {
        let content = self
            .client
            .call_tool(
                "search_memories",
                serde_json::json!({"agent_id": agent_id, "query": query}),
            )
            .await?;
        Ok(Self::text_of(content.into_value()))
    }
}
