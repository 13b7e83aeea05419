use crate::{
    engine::{cancel::CancelToken, trading::TradingService},
    error::FormosaError,
    runtime::{
        memory::MemoryStore,
        registry::ToolRequirements,
        subagent::{SubAgentKind, SubAgentTool},
        tools::{MarketToolKind, dispatch_tool, engine_tools, market_tools},
    },
};
use formosa_llm::{
    ChatProvider,
    chat::{ChatMessage, ChatRequest},
    client::OpenAiCompatClient,
    tool::Tool,
};
use formosa_store::{
    entity::{AgentMode, SessionId, agent::Agent, model_config::ModelConfig},
    repository,
};
use serde::Serialize;
use std::{sync::Arc, time::Duration};
use tracing::{debug, info, warn};

/// Mode-to-capability mapping and the requirements record.
pub mod registry;

/// Instruction (system prompt) construction.
pub mod instruction;

/// Tool invokers bound to their engine dependencies.
pub mod tools;

/// Sub-analyst agents invoked as named tools.
pub mod subagent;

/// Persistent agent memory seam.
pub mod memory;

/// How one bounded run ended.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunOutcome {
    Completed,
    Cancelled,
    DeadlineExceeded,
    Failed,
}

/// Result record of one bounded execution.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RuntimeOutput {
    pub final_output: serde_json::Value,
    pub tools_called: Vec<String>,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip)]
    pub outcome: RunOutcome,
}

impl RuntimeOutput {
    fn completed(final_output: serde_json::Value, tools_called: Vec<String>) -> Self {
        Self {
            final_output,
            tools_called,
            success: true,
            error: None,
            outcome: RunOutcome::Completed,
        }
    }

    fn cancelled(tools_called: Vec<String>) -> Self {
        Self {
            final_output: serde_json::json!({"summary": "execution cancelled by request"}),
            tools_called,
            success: false,
            error: None,
            outcome: RunOutcome::Cancelled,
        }
    }

    fn deadline_exceeded(tools_called: Vec<String>) -> Self {
        Self {
            final_output: serde_json::json!({"summary": "execution deadline exceeded"}),
            tools_called,
            success: false,
            error: Some("execution timeout".to_string()),
            outcome: RunOutcome::DeadlineExceeded,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        let error = error.into();
        Self {
            final_output: serde_json::json!({"summary": error}),
            tools_called: Vec::new(),
            success: false,
            error: Some(error),
            outcome: RunOutcome::Failed,
        }
    }
}

/// Builds one [`ChatProvider`] from a model catalog row.
///
/// The seam lets tests script conversations; production resolves the row's API key
/// environment variable and speaks to the provider endpoint.
pub trait ProviderFactory: Send + Sync {
    fn build(&self, model: &ModelConfig) -> Result<Arc<dyn ChatProvider>, FormosaError>;
}

/// Production factory: API key from the catalog row's environment variable.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvProviderFactory;

impl ProviderFactory for EnvProviderFactory {
    fn build(&self, model: &ModelConfig) -> Result<Arc<dyn ChatProvider>, FormosaError> {
        if model.api_key_env_var.is_empty() || model.full_model_name.is_empty() {
            return Err(FormosaError::configuration(format!(
                "model catalog row '{}' is incomplete",
                model.model_key
            )));
        }

        let api_key = std::env::var(&model.api_key_env_var).map_err(|_| {
            FormosaError::configuration(format!(
                "environment variable '{}' required by model '{}' is not set",
                model.api_key_env_var, model.model_key
            ))
        })?;

        let client = OpenAiCompatClient::new(&model.qualified_name(), api_key)
            .map_err(|error| FormosaError::configuration(error.to_string()))?;
        Ok(Arc::new(client))
    }
}

/// One bounded agent execution: instructions + tools + sub-agents + LLM client, run
/// under a wall-clock deadline with cooperative cancellation.
pub struct AgentRuntime {
    agent: Agent,
    mode: AgentMode,
    session_id: SessionId,
    model: String,
    provider: Arc<dyn ChatProvider>,
    instructions: String,
    tools: Vec<Tool>,
    max_turns: usize,
    deadline: Duration,
    cancel: CancelToken,
    memory: Arc<dyn MemoryStore>,
    tools_called: Vec<String>,
}

impl std::fmt::Debug for AgentRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentRuntime")
            .field("agent", &self.agent.id)
            .field("mode", &self.mode)
            .field("session_id", &self.session_id)
            .field("model", &self.model)
            .field("tools", &self.tools.len())
            .finish_non_exhaustive()
    }
}

impl AgentRuntime {
    /// Compose one execution: model catalog lookup, LLM client, memory digest,
    /// instructions, and the mode-driven tool set.
    pub async fn initialize(
        service: TradingService,
        agent: Agent,
        mode: AgentMode,
        session_id: SessionId,
        cancel: CancelToken,
    ) -> Result<Self, FormosaError> {
        let model = {
            let mut conn = service.store.acquire().await?;
            repository::models::fetch(&mut conn, &agent.ai_model)
                .await?
                .ok_or_else(|| {
                    FormosaError::configuration(format!(
                        "unknown model key '{}' for agent '{}'",
                        agent.ai_model, agent.id
                    ))
                })?
        };
        if !model.is_enabled {
            return Err(FormosaError::configuration(format!(
                "model '{}' is disabled",
                model.model_key
            )));
        }

        let provider = service.providers.build(&model)?;
        let qualified = model.qualified_name();

        // Memory trouble degrades the digest, never the run
        let digest = match service.memory.load_digest(&agent.id, 10).await {
            Ok(digest) => digest,
            Err(error) => {
                warn!(agent = %agent.id, %error, "memory digest unavailable");
                String::new()
            }
        };

        let portfolio = service.portfolio_snapshot(&agent.id).await?;
        let instructions = instruction::build_instructions(&agent, mode, &portfolio, &digest);

        let requirements = ToolRequirements::for_mode(mode);
        let mut tools = engine_tools(&service, &agent.id, &session_id, &requirements);
        if requirements.casual_market_mcp {
            tools.extend(market_tools(&service.market, &MarketToolKind::ALL));
        }

        if !service.config.skip_agent_graph {
            let analysts = [
                (requirements.fundamental_agent, SubAgentKind::Fundamental),
                (requirements.technical_agent, SubAgentKind::Technical),
                (requirements.risk_agent, SubAgentKind::Risk),
                (requirements.sentiment_agent, SubAgentKind::Sentiment),
            ];
            for (enabled, kind) in analysts {
                if enabled {
                    tools.push(SubAgentTool::build(
                        kind,
                        Arc::clone(&provider),
                        qualified.clone(),
                        &service.market,
                        cancel.clone(),
                    ));
                }
            }
        }

        info!(
            agent = %agent.id,
            session = %session_id,
            %mode,
            model = %qualified,
            tools = tools.len(),
            "runtime initialised"
        );

        Ok(Self {
            agent,
            mode,
            session_id,
            model: qualified,
            provider,
            instructions,
            tools,
            max_turns: service.config.default_max_turns,
            deadline: service.config.default_agent_timeout,
            cancel,
            memory: Arc::clone(&service.memory),
            tools_called: Vec::new(),
        })
    }

    /// Run the LLM loop to completion, bounded by max turns and the wall-clock deadline.
    ///
    /// Terminates when the model stops requesting tools, the turn budget is exhausted,
    /// the deadline passes, or cancellation is observed. Trades already committed stay
    /// committed regardless of how the run ends.
    pub async fn run(&mut self) -> RuntimeOutput {
        let deadline = self.deadline;
        match tokio::time::timeout(deadline, self.run_loop()).await {
            Ok(output) => output,
            Err(_) => {
                warn!(
                    agent = %self.agent.id,
                    session = %self.session_id,
                    ?deadline,
                    "execution deadline exceeded"
                );
                RuntimeOutput::deadline_exceeded(self.tools_called.clone())
            }
        }
    }

    async fn run_loop(&mut self) -> RuntimeOutput {
        let mut messages = vec![
            ChatMessage::system(self.instructions.clone()),
            ChatMessage::user(match self.mode {
                AgentMode::Trading => "Begin your trading session now.",
                AgentMode::Rebalancing => "Begin your rebalancing review now.",
            }),
        ];

        for turn in 0..self.max_turns {
            if self.cancel.is_cancelled() {
                return RuntimeOutput::cancelled(self.tools_called.clone());
            }

            let response = match self
                .provider
                .chat(ChatRequest {
                    model: self.model.clone(),
                    messages: messages.clone(),
                    tools: self.tools.iter().map(|tool| tool.schema.clone()).collect(),
                })
                .await
            {
                Ok(response) => response,
                Err(error) => {
                    let mut output = RuntimeOutput::failed(error.to_string());
                    output.tools_called = self.tools_called.clone();
                    return output;
                }
            };

            // Cancellation observed during the model turn stops before any further tool call
            if self.cancel.is_cancelled() {
                return RuntimeOutput::cancelled(self.tools_called.clone());
            }

            if response.is_final() {
                let content = response.content.unwrap_or_default();
                let final_output = parse_final_output(&content);
                self.append_memory(&final_output).await;
                return RuntimeOutput::completed(final_output, self.tools_called.clone());
            }

            debug!(
                session = %self.session_id,
                turn,
                requested = response.tool_calls.len(),
                "dispatching tool calls"
            );

            messages.push(ChatMessage::assistant(
                response.content.clone(),
                response.tool_calls.clone(),
            ));

            for call in &response.tool_calls {
                self.tools_called.push(call.name.to_string());
                let result = dispatch_tool(&self.tools, call).await;
                messages.push(ChatMessage::tool_result(call.id.clone(), result));

                // Cooperative cancellation point after every tool call
                if self.cancel.is_cancelled() {
                    return RuntimeOutput::cancelled(self.tools_called.clone());
                }
            }
        }

        let final_output = serde_json::json!({
            "summary": format!("turn budget of {} exhausted", self.max_turns)
        });
        self.append_memory(&final_output).await;
        RuntimeOutput::completed(final_output, self.tools_called.clone())
    }

    async fn append_memory(&self, final_output: &serde_json::Value) {
        let summary = final_output
            .get("summary")
            .and_then(serde_json::Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| final_output.to_string());

        if let Err(error) = self.memory.append_summary(&self.agent.id, &summary).await {
            warn!(agent = %self.agent.id, %error, "failed to append session memory");
        }
    }
}

/// Interpret the model's final message: JSON object when it produced one, otherwise a
/// summary wrapper around the raw text.
fn parse_final_output(content: &str) -> serde_json::Value {
    match serde_json::from_str::<serde_json::Value>(content.trim()) {
        Ok(value) if value.is_object() => value,
        _ => serde_json::json!({"summary": content}),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_final_output_prefers_json_objects() {
        let parsed = parse_final_output(r#"{"summary": "摘要（500字內）", "trades": 1}"#);
        assert_eq!(parsed["summary"], "摘要（500字內）");
        assert_eq!(parsed["trades"], 1);

        let wrapped = parse_final_output("bought one lot of 2330");
        assert_eq!(wrapped["summary"], "bought one lot of 2330");
    }
}
