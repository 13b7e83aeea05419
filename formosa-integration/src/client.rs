use crate::{
    ToolContent,
    error::IntegrationError,
    process::{ToolProcess, ToolProcessConfig},
    retry::RetryPolicy,
};
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use std::{
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};
use tokio::sync::Mutex;
use tracing::warn;

/// Wire request sent to a tool provider.
#[derive(Debug, Clone, Serialize)]
struct ToolRequest<'a> {
    id: u64,
    method: &'static str,
    params: ToolRequestParams<'a>,
}

#[derive(Debug, Clone, Serialize)]
struct ToolRequestParams<'a> {
    name: &'a str,
    arguments: &'a serde_json::Value,
}

/// Wire response received from a tool provider.
#[derive(Debug, Clone, Deserialize)]
struct ToolResponse {
    #[allow(dead_code)]
    id: u64,
    #[serde(default)]
    result: Option<ToolResult>,
    #[serde(default)]
    error: Option<ToolResponseError>,
}

#[derive(Debug, Clone, Deserialize)]
struct ToolResult {
    #[serde(default)]
    content: Vec<ToolResultContent>,
}

#[derive(Debug, Clone, Deserialize)]
struct ToolResultContent {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Clone, Deserialize)]
struct ToolResponseError {
    message: String,
}

/// Client over one tool provider subprocess.
///
/// Calls are serialised over the single stdio transport; per-call timeout is bounded and
/// transient failures (timeout, transport) retry under the configured [`RetryPolicy`].
/// Cheap to clone.
#[derive(Debug, Clone)]
pub struct ToolProcessClient {
    process: Arc<Mutex<ToolProcess>>,
    request_id: Arc<AtomicU64>,
    pub call_timeout: Duration,
    pub retry: RetryPolicy,
}

impl ToolProcessClient {
    /// Spawn the provider and wrap it in a client with the provided call bounds.
    pub fn spawn(
        config: &ToolProcessConfig,
        call_timeout: Duration,
        retry: RetryPolicy,
    ) -> Result<Self, IntegrationError> {
        Ok(Self {
            process: Arc::new(Mutex::new(ToolProcess::spawn(config)?)),
            request_id: Arc::new(AtomicU64::new(0)),
            call_timeout,
            retry,
        })
    }

    /// Invoke a named tool, retrying transient failures with backoff.
    pub async fn call_tool(
        &self,
        name: &str,
        arguments: serde_json::Value,
    ) -> Result<ToolContent, IntegrationError> {
        let mut attempt = 0;
        loop {
            match self.call_tool_once(name, &arguments).await {
                Ok(content) => return Ok(content),
                Err(error) if error.is_transient() && attempt + 1 < self.retry.max_attempts => {
                    warn!(
                        tool = name,
                        attempt,
                        %error,
                        "transient tool call failure, backing off"
                    );
                    tokio::time::sleep(self.retry.delay(attempt)).await;
                    attempt += 1;
                }
                Err(error) if error.is_transient() => {
                    return Err(IntegrationError::Exhausted {
                        attempts: attempt + 1,
                        last: Box::new(error),
                    });
                }
                Err(error) => return Err(error),
            }
        }
    }

    async fn call_tool_once(
        &self,
        name: &str,
        arguments: &serde_json::Value,
    ) -> Result<ToolContent, IntegrationError> {
        let request = ToolRequest {
            id: self.request_id.fetch_add(1, Ordering::Relaxed),
            method: "call_tool",
            params: ToolRequestParams { name, arguments },
        };
        let line = serde_json::to_string(&request).map_err(IntegrationError::Serialise)?;

        let mut process = self.process.lock().await;

        let exchange = async {
            process.write_line(&line).await?;
            process.read_line().await
        };

        let payload = tokio::time::timeout(self.call_timeout, exchange)
            .await
            .map_err(|_| IntegrationError::Timeout {
                tool: SmolStr::new(name),
                timeout_ms: self.call_timeout.as_millis() as u64,
            })??;

        let response: ToolResponse =
            serde_json::from_str(&payload).map_err(|error| IntegrationError::Deserialise {
                error,
                payload: payload.clone(),
            })?;

        if let Some(error) = response.error {
            return Err(IntegrationError::Provider {
                tool: SmolStr::new(name),
                message: error.message,
            });
        }

        let raw = response
            .result
            .and_then(|result| result.content.into_iter().next())
            .map(|content| content.text)
            .unwrap_or_default();

        Ok(ToolContent::parse(&raw))
    }
}
