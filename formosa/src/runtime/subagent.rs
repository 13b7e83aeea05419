use crate::{
    engine::cancel::CancelToken,
    runtime::tools::{MarketToolKind, dispatch_tool, market_tools},
};
use async_trait::async_trait;
use formosa_llm::{
    ChatProvider,
    chat::{ChatMessage, ChatRequest},
    tool::{Tool, ToolError, ToolInvoker, ToolSchema},
};
use formosa_market::MarketData;
use std::sync::Arc;
use tracing::debug;

/// Turn budget of one sub-analyst consultation.
const SUB_AGENT_MAX_TURNS: usize = 4;

/// The four sub-analysts a main agent can consult by name.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum SubAgentKind {
    Fundamental,
    Technical,
    Risk,
    Sentiment,
}

impl SubAgentKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Fundamental => "fundamental_analysis",
            Self::Technical => "technical_analysis",
            Self::Risk => "risk_assessment",
            Self::Sentiment => "sentiment_analysis",
        }
    }

    fn description(&self) -> &'static str {
        match self {
            Self::Fundamental => {
                "Consult the fundamental analyst: valuation, financials and dividends"
            }
            Self::Technical => {
                "Consult the technical analyst: price action, trend and momentum"
            }
            Self::Risk => "Consult the risk analyst: position sizing, margin and downside",
            Self::Sentiment => {
                "Consult the sentiment analyst: institutional flows and market mood"
            }
        }
    }

    fn instructions(&self) -> &'static str {
        match self {
            Self::Fundamental => {
                "You are a fundamental analyst for Taiwan equities. Evaluate the company \
                 behind the question using financial statements and dividend history, and \
                 answer with a short valuation-driven assessment."
            }
            Self::Technical => {
                "You are a technical analyst for Taiwan equities. Evaluate recent price \
                 action for the question asked and answer with a short trend and momentum \
                 assessment."
            }
            Self::Risk => {
                "You are a risk analyst for Taiwan equities. Assess downside, margin \
                 pressure and concentration for the question asked and answer with a short \
                 risk verdict including a suggested position limit."
            }
            Self::Sentiment => {
                "You are a market sentiment analyst for Taiwan equities. Assess \
                 institutional flows and market mood for the question asked and answer \
                 with a short sentiment verdict."
            }
        }
    }

    /// Market data each analyst is allowed to pull.
    fn market_kinds(&self) -> &'static [MarketToolKind] {
        match self {
            Self::Fundamental => &[
                MarketToolKind::StockPrice,
                MarketToolKind::Financials,
                MarketToolKind::Dividends,
            ],
            Self::Technical => &[MarketToolKind::StockPrice],
            Self::Risk => &[MarketToolKind::StockPrice, MarketToolKind::MarginInfo],
            Self::Sentiment => &[MarketToolKind::StockPrice, MarketToolKind::ForeignFlows],
        }
    }
}

/// One sub-analyst: its own LLM+tool composition, invoked as a named tool by the main
/// runtime. Shares the parent's provider, deadline (transitively through the outer
/// timeout) and cancellation token.
pub struct SubAgentTool {
    kind: SubAgentKind,
    provider: Arc<dyn ChatProvider>,
    model: String,
    tools: Vec<Tool>,
    cancel: CancelToken,
}

impl std::fmt::Debug for SubAgentTool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubAgentTool")
            .field("kind", &self.kind)
            .field("model", &self.model)
            .field("tools", &self.tools.len())
            .finish_non_exhaustive()
    }
}

impl SubAgentTool {
    pub fn build(
        kind: SubAgentKind,
        provider: Arc<dyn ChatProvider>,
        model: String,
        market: &Arc<dyn MarketData>,
        cancel: CancelToken,
    ) -> Tool {
        let schema = ToolSchema::new(
            kind.name(),
            kind.description(),
            serde_json::json!({
                "type": "object",
                "properties": {
                    "query": {"type": "string", "description": "The question for the analyst"}
                },
                "required": ["query"]
            }),
        );

        Tool::new(
            schema,
            Arc::new(Self {
                kind,
                provider,
                model,
                tools: market_tools(market, kind.market_kinds()),
                cancel,
            }),
        )
    }
}

#[async_trait]
impl ToolInvoker for SubAgentTool {
    async fn invoke(&self, arguments: serde_json::Value) -> Result<serde_json::Value, ToolError> {
        let query = arguments
            .get("query")
            .and_then(serde_json::Value::as_str)
            .ok_or_else(|| ToolError::InvalidArguments("missing string field 'query'".into()))?;

        debug!(analyst = self.kind.name(), "sub-agent consultation");

        let mut messages = vec![
            ChatMessage::system(self.kind.instructions()),
            ChatMessage::user(query),
        ];

        for _ in 0..SUB_AGENT_MAX_TURNS {
            if self.cancel.is_cancelled() {
                return Err(ToolError::Invocation("execution cancelled".into()));
            }

            let response = self
                .provider
                .chat(ChatRequest {
                    model: self.model.clone(),
                    messages: messages.clone(),
                    tools: self.tools.iter().map(|tool| tool.schema.clone()).collect(),
                })
                .await
                .map_err(|error| ToolError::Invocation(error.to_string()))?;

            if response.is_final() {
                return Ok(serde_json::json!({
                    "analyst": self.kind.name(),
                    "analysis": response.content.unwrap_or_default(),
                }));
            }

            messages.push(ChatMessage::assistant(
                response.content.clone(),
                response.tool_calls.clone(),
            ));
            for call in &response.tool_calls {
                let result = dispatch_tool(&self.tools, call).await;
                messages.push(ChatMessage::tool_result(call.id.clone(), result));

                if self.cancel.is_cancelled() {
                    return Err(ToolError::Invocation("execution cancelled".into()));
                }
            }
        }

        Err(ToolError::Invocation(format!(
            "analyst '{}' exhausted its turn budget",
            self.kind.name()
        )))
    }
}
