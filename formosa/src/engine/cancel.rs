use tokio::sync::watch;

/// Cooperative cancellation signal.
///
/// The runtime checks the token between LLM turns and after each tool call, and the
/// token propagates transitively into sub-agent runs. Cancellation never rolls back work
/// that already committed.
#[derive(Debug, Clone)]
pub struct CancelToken {
    tx: watch::Sender<bool>,
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

impl CancelToken {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self { tx }
    }

    /// Signal cancellation. Idempotent.
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }

    /// Resolve once cancellation is signalled.
    pub async fn cancelled(&self) {
        let mut rx = self.tx.subscribe();
        // Ignore a closed channel: sender alive as long as self
        let _ = rx.wait_for(|cancelled| *cancelled).await;
    }
}
