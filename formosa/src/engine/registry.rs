use crate::{engine::cancel::CancelToken, error::FormosaError};
use chrono::{DateTime, Utc};
use fnv::FnvHashMap;
use formosa_store::entity::{AgentId, SessionId};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::debug;

/// Handle of one in-flight agent execution.
#[derive(Debug, Clone)]
pub struct ExecutionHandle {
    pub session_id: SessionId,
    pub cancel: CancelToken,
    pub started_at: DateTime<Utc>,
}

/// Per-agent single-flight registry.
///
/// An entry present for an agent means an execution is active; a second acquisition for
/// the same agent fails with [`FormosaError::AgentBusy`]. `signal_stop` cancels the
/// handle but leaves the entry in place; the entry is released only when the guard held
/// by the running task drops (exception-safe release in the scope that acquired it).
#[derive(Debug, Clone, Default)]
pub struct ActiveAgents {
    inner: Arc<Mutex<FnvHashMap<AgentId, ExecutionHandle>>>,
}

impl ActiveAgents {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve the agent for one execution. Fails with `AgentBusy` if already reserved.
    pub fn acquire(
        &self,
        agent_id: &AgentId,
        handle: ExecutionHandle,
    ) -> Result<ActiveAgentGuard, FormosaError> {
        let mut inner = self.inner.lock();
        if inner.contains_key(agent_id) {
            return Err(FormosaError::AgentBusy(agent_id.clone()));
        }
        inner.insert(agent_id.clone(), handle);

        Ok(ActiveAgentGuard {
            registry: self.clone(),
            agent_id: agent_id.clone(),
        })
    }

    /// Signal cancellation of the agent's active execution, if any. Returns the session
    /// being cancelled. The registry entry stays until the execution returns.
    pub fn signal_stop(&self, agent_id: &AgentId) -> Option<SessionId> {
        let inner = self.inner.lock();
        inner.get(agent_id).map(|handle| {
            handle.cancel.cancel();
            handle.session_id.clone()
        })
    }

    /// Session currently running for the agent, if any.
    pub fn current_session(&self, agent_id: &AgentId) -> Option<SessionId> {
        self.inner
            .lock()
            .get(agent_id)
            .map(|handle| handle.session_id.clone())
    }

    pub fn is_active(&self, agent_id: &AgentId) -> bool {
        self.inner.lock().contains_key(agent_id)
    }

    fn release(&self, agent_id: &AgentId) {
        if self.inner.lock().remove(agent_id).is_some() {
            debug!(agent = %agent_id, "released single-flight registry entry");
        }
    }
}

/// RAII release of a registry entry: dropping the guard releases the agent regardless of
/// how the execution ended.
#[derive(Debug)]
pub struct ActiveAgentGuard {
    registry: ActiveAgents,
    agent_id: AgentId,
}

impl Drop for ActiveAgentGuard {
    fn drop(&mut self) {
        self.registry.release(&self.agent_id);
    }
}
