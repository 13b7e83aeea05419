use crate::{
    engine::trading::{TradeRequest, TradingService},
    runtime::memory::MemoryStore,
};
use async_trait::async_trait;
use chrono::Utc;
use formosa_integration::client::ToolProcessClient;
use formosa_llm::{
    chat::ToolCall,
    tool::{Tool, ToolError, ToolInvoker, ToolSchema},
};
use formosa_market::{MarketData, Ticker};
use formosa_store::{
    entity::{
        AgentId, SessionId, StrategyChangeId, StrategyChangeKind, TradeAction,
        strategy_change::StrategyChange,
    },
    repository,
};
use rust_decimal::Decimal;
use std::{str::FromStr, sync::Arc};

fn str_arg<'a>(arguments: &'a serde_json::Value, key: &str) -> Result<&'a str, ToolError> {
    arguments
        .get(key)
        .and_then(serde_json::Value::as_str)
        .ok_or_else(|| ToolError::InvalidArguments(format!("missing string field '{key}'")))
}

fn opt_str_arg(arguments: &serde_json::Value, key: &str) -> String {
    arguments
        .get(key)
        .and_then(serde_json::Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn quantity_arg(arguments: &serde_json::Value, key: &str) -> Result<i64, ToolError> {
    arguments
        .get(key)
        .and_then(serde_json::Value::as_i64)
        .ok_or_else(|| ToolError::InvalidArguments(format!("missing integer field '{key}'")))
}

/// Accept JSON numbers and numeric strings; model output is inconsistent about which.
fn decimal_arg(arguments: &serde_json::Value, key: &str) -> Result<Decimal, ToolError> {
    let value = arguments
        .get(key)
        .ok_or_else(|| ToolError::InvalidArguments(format!("missing numeric field '{key}'")))?;

    let parsed = match value {
        serde_json::Value::Number(number) => Decimal::from_str(&number.to_string()).ok(),
        serde_json::Value::String(text) => Decimal::from_str(text.trim()).ok(),
        _ => None,
    };
    parsed.ok_or_else(|| ToolError::InvalidArguments(format!("field '{key}' is not numeric")))
}

fn ticker_schema(name: &str, description: &str) -> ToolSchema {
    ToolSchema::new(
        name,
        description,
        serde_json::json!({
            "type": "object",
            "properties": {
                "ticker": {"type": "string", "description": "Taiwan stock ticker code, e.g. 2330"}
            },
            "required": ["ticker"]
        }),
    )
}

/// Market-data tool kinds bound to the gateway.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum MarketToolKind {
    StockPrice,
    Financials,
    TradingDay,
    HolidayInfo,
    MarginInfo,
    ForeignFlows,
    Dividends,
}

impl MarketToolKind {
    pub const ALL: [Self; 7] = [
        Self::StockPrice,
        Self::Financials,
        Self::TradingDay,
        Self::HolidayInfo,
        Self::MarginInfo,
        Self::ForeignFlows,
        Self::Dividends,
    ];

    fn schema(&self) -> ToolSchema {
        match self {
            Self::StockPrice => ticker_schema(
                "get_taiwan_stock_price",
                "Current quote (price and company name) for a Taiwan stock",
            ),
            Self::Financials => ticker_schema(
                "get_company_financials",
                "Financial statement summary for a Taiwan stock",
            ),
            Self::TradingDay => ToolSchema::new(
                "check_trading_day",
                "Whether the Taiwan stock exchange is open on a date (defaults to today)",
                serde_json::json!({
                    "type": "object",
                    "properties": {
                        "date": {"type": "string", "description": "ISO date, e.g. 2025-11-03"}
                    }
                }),
            ),
            Self::HolidayInfo => ToolSchema::new(
                "get_holiday_info",
                "Exchange holiday schedule detail for a date (defaults to today)",
                serde_json::json!({
                    "type": "object",
                    "properties": {
                        "date": {"type": "string", "description": "ISO date, e.g. 2025-11-03"}
                    }
                }),
            ),
            Self::MarginInfo => ticker_schema(
                "get_margin_info",
                "Margin trading balances for a Taiwan stock",
            ),
            Self::ForeignFlows => ticker_schema(
                "get_foreign_flows",
                "Foreign institutional buy/sell flows for a Taiwan stock",
            ),
            Self::Dividends => {
                ticker_schema("get_dividends", "Dividend history for a Taiwan stock")
            }
        }
    }
}

/// One market-data tool bound to the gateway.
pub struct MarketTool {
    market: Arc<dyn MarketData>,
    kind: MarketToolKind,
}

#[async_trait]
impl ToolInvoker for MarketTool {
    async fn invoke(&self, arguments: serde_json::Value) -> Result<serde_json::Value, ToolError> {
        let result = match self.kind {
            MarketToolKind::StockPrice => {
                let ticker = Ticker::new(str_arg(&arguments, "ticker")?);
                self.market
                    .stock_price(&ticker)
                    .await
                    .map(|quote| serde_json::json!(quote))
            }
            MarketToolKind::Financials => {
                let ticker = Ticker::new(str_arg(&arguments, "ticker")?);
                self.market.company_financials(&ticker).await
            }
            MarketToolKind::TradingDay => {
                let date = match arguments.get("date").and_then(serde_json::Value::as_str) {
                    Some(raw) => raw.parse().map_err(|_| {
                        ToolError::InvalidArguments(format!("unparseable date '{raw}'"))
                    })?,
                    None => Utc::now().date_naive(),
                };
                self.market
                    .is_trading_day(date)
                    .await
                    .map(|open| serde_json::json!({"date": date, "is_trading_day": open}))
            }
            MarketToolKind::HolidayInfo => {
                let date = match arguments.get("date").and_then(serde_json::Value::as_str) {
                    Some(raw) => raw.parse().map_err(|_| {
                        ToolError::InvalidArguments(format!("unparseable date '{raw}'"))
                    })?,
                    None => Utc::now().date_naive(),
                };
                self.market.holiday_info(date).await
            }
            MarketToolKind::MarginInfo => {
                let ticker = Ticker::new(str_arg(&arguments, "ticker")?);
                self.market.margin_info(&ticker).await
            }
            MarketToolKind::ForeignFlows => {
                let ticker = Ticker::new(str_arg(&arguments, "ticker")?);
                self.market.foreign_flows(&ticker).await
            }
            MarketToolKind::Dividends => {
                let ticker = Ticker::new(str_arg(&arguments, "ticker")?);
                self.market.dividends(&ticker).await
            }
        };

        result.map_err(|error| ToolError::Invocation(error.to_string()))
    }
}

/// Build market tools for the provided kinds.
pub fn market_tools(market: &Arc<dyn MarketData>, kinds: &[MarketToolKind]) -> Vec<Tool> {
    kinds
        .iter()
        .map(|kind| {
            Tool::new(
                kind.schema(),
                Arc::new(MarketTool {
                    market: Arc::clone(market),
                    kind: *kind,
                }),
            )
        })
        .collect()
}

/// Buy or sell order tool bound to the atomic trade primitive.
struct TradeTool {
    service: TradingService,
    agent_id: AgentId,
    action: TradeAction,
}

impl TradeTool {
    fn schema(action: TradeAction) -> ToolSchema {
        let (name, description) = match action {
            TradeAction::Buy => ("buy_stock", "Place a BUY order for a Taiwan stock"),
            TradeAction::Sell => ("sell_stock", "Place a SELL order for a Taiwan stock"),
        };

        ToolSchema::new(
            name,
            description,
            serde_json::json!({
                "type": "object",
                "properties": {
                    "ticker": {"type": "string", "description": "Taiwan stock ticker code"},
                    "quantity": {"type": "integer", "description": "Shares, a positive multiple of 1000"},
                    "price": {"type": "number", "description": "Limit price per share in TWD"},
                    "decision_reason": {"type": "string", "description": "Why this order fits the strategy"},
                    "company_name": {"type": "string", "description": "Company name for the record"}
                },
                "required": ["ticker", "quantity", "price", "decision_reason"]
            }),
        )
    }
}

#[async_trait]
impl ToolInvoker for TradeTool {
    async fn invoke(&self, arguments: serde_json::Value) -> Result<serde_json::Value, ToolError> {
        let request = TradeRequest {
            agent_id: self.agent_id.clone(),
            ticker: str_arg(&arguments, "ticker")?.to_string(),
            action: self.action,
            quantity: quantity_arg(&arguments, "quantity")?,
            price: decimal_arg(&arguments, "price")?,
            decision_reason: opt_str_arg(&arguments, "decision_reason"),
            company_name: opt_str_arg(&arguments, "company_name"),
        };

        let outcome = self.service.execute_trade_atomic(&request).await;
        serde_json::to_value(outcome).map_err(|error| ToolError::Invocation(error.to_string()))
    }
}

/// Read-only portfolio status tool.
struct PortfolioTool {
    service: TradingService,
    agent_id: AgentId,
}

#[async_trait]
impl ToolInvoker for PortfolioTool {
    async fn invoke(&self, _: serde_json::Value) -> Result<serde_json::Value, ToolError> {
        let snapshot = self
            .service
            .portfolio_snapshot(&self.agent_id)
            .await
            .map_err(|error| ToolError::Invocation(error.to_string()))?;
        serde_json::to_value(snapshot).map_err(|error| ToolError::Invocation(error.to_string()))
    }
}

/// Memory search tool.
struct MemorySearchTool {
    memory: Arc<dyn MemoryStore>,
    agent_id: AgentId,
}

#[async_trait]
impl ToolInvoker for MemorySearchTool {
    async fn invoke(&self, arguments: serde_json::Value) -> Result<serde_json::Value, ToolError> {
        let query = str_arg(&arguments, "query")?;
        let found = self
            .memory
            .search(&self.agent_id, query)
            .await
            .map_err(|error| ToolError::Invocation(error.to_string()))?;
        Ok(serde_json::json!({"memories": found}))
    }
}

/// Web research tool delegating to the research provider subprocess.
struct ResearchTool {
    client: ToolProcessClient,
}

#[async_trait]
impl ToolInvoker for ResearchTool {
    async fn invoke(&self, arguments: serde_json::Value) -> Result<serde_json::Value, ToolError> {
        let query = str_arg(&arguments, "query")?;
        let content = self
            .client
            .call_tool("perplexity_search", serde_json::json!({"query": query}))
            .await
            .map_err(|error| ToolError::Invocation(error.to_string()))?;
        Ok(content.into_value())
    }
}

/// Record a strategy adjustment on the audit trail and broadcast it.
struct StrategyChangeTool {
    service: TradingService,
    agent_id: AgentId,
    session_id: SessionId,
}

#[async_trait]
impl ToolInvoker for StrategyChangeTool {
    async fn invoke(&self, arguments: serde_json::Value) -> Result<serde_json::Value, ToolError> {
        let change = StrategyChange {
            id: StrategyChangeId::random(),
            agent_id: self.agent_id.clone(),
            session_id: Some(self.session_id.clone()),
            trigger_reason: str_arg(&arguments, "trigger_reason")?.to_string(),
            change_summary: str_arg(&arguments, "change_summary")?.to_string(),
            new_strategy: str_arg(&arguments, "new_strategy")?.to_string(),
            change_type: StrategyChangeKind::Auto,
            performance_snapshot: arguments.get("performance_snapshot").cloned(),
            created_at: Utc::now(),
        };

        let mut conn = self
            .service
            .store
            .acquire()
            .await
            .map_err(|error| ToolError::Invocation(error.to_string()))?;
        repository::strategy_changes::insert(&mut conn, &change)
            .await
            .map_err(|error| ToolError::Invocation(error.to_string()))?;

        self.service.bus.emit_strategy_change(
            &self.agent_id,
            serde_json::json!({
                "change_id": &change.id,
                "change_summary": &change.change_summary,
                "trigger_reason": &change.trigger_reason,
            }),
        );

        Ok(serde_json::json!({"success": true, "change_id": change.id}))
    }
}

/// Assemble trade, portfolio, memory, research and strategy tools for one execution.
/// Market and sub-agent tools are appended by the runtime composition.
pub fn engine_tools(
    service: &TradingService,
    agent_id: &AgentId,
    session_id: &SessionId,
    requirements: &crate::runtime::registry::ToolRequirements,
) -> Vec<Tool> {
    let mut tools = Vec::new();

    if requirements.buy_sell_tools {
        for action in [TradeAction::Buy, TradeAction::Sell] {
            tools.push(Tool::new(
                TradeTool::schema(action),
                Arc::new(TradeTool {
                    service: service.clone(),
                    agent_id: agent_id.clone(),
                    action,
                }),
            ));
        }
    }

    if requirements.portfolio_tools {
        tools.push(Tool::new(
            ToolSchema::new(
                "get_portfolio_status",
                "Current holdings, cash balance and total portfolio value",
                serde_json::json!({"type": "object", "properties": {}}),
            ),
            Arc::new(PortfolioTool {
                service: service.clone(),
                agent_id: agent_id.clone(),
            }),
        ));
        tools.push(Tool::new(
            ToolSchema::new(
                "record_strategy_change",
                "Record an adjustment to your trading strategy with its rationale",
                serde_json::json!({
                    "type": "object",
                    "properties": {
                        "trigger_reason": {"type": "string"},
                        "change_summary": {"type": "string"},
                        "new_strategy": {"type": "string"},
                        "performance_snapshot": {"type": "object"}
                    },
                    "required": ["trigger_reason", "change_summary", "new_strategy"]
                }),
            ),
            Arc::new(StrategyChangeTool {
                service: service.clone(),
                agent_id: agent_id.clone(),
                session_id: session_id.clone(),
            }),
        ));
    }

    if requirements.memory_mcp {
        tools.push(Tool::new(
            ToolSchema::new(
                "search_memories",
                "Search notes recorded in previous sessions",
                serde_json::json!({
                    "type": "object",
                    "properties": {"query": {"type": "string"}},
                    "required": ["query"]
                }),
            ),
            Arc::new(MemorySearchTool {
                memory: Arc::clone(&service.memory),
                agent_id: agent_id.clone(),
            }),
        ));
    }

    if requirements.perplexity_mcp
        && let Some(client) = &service.research
    {
        tools.push(Tool::new(
            ToolSchema::new(
                "research_web",
                "Research recent news and market commentary on the web",
                serde_json::json!({
                    "type": "object",
                    "properties": {"query": {"type": "string"}},
                    "required": ["query"]
                }),
            ),
            Arc::new(ResearchTool {
                client: client.clone(),
            }),
        ));
    }

    tools
}

/// Dispatch one tool call, feeding failures back to the model as result text.
pub async fn dispatch_tool(tools: &[Tool], call: &ToolCall) -> String {
    let Some(tool) = tools.iter().find(|tool| tool.name() == call.name.as_str()) else {
        return serde_json::json!({
            "success": false,
            "error": format!("unknown tool '{}'", call.name)
        })
        .to_string();
    };

    match tool.invoker.invoke(call.arguments.clone()).await {
        Ok(value) => value.to_string(),
        Err(error) => serde_json::json!({"success": false, "error": error.to_string()}).to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_decimal_arg_accepts_numbers_and_strings() {
        let arguments = serde_json::json!({"price": 512.5, "as_text": "512.5", "bad": true});
        assert_eq!(decimal_arg(&arguments, "price").unwrap(), dec!(512.5));
        assert_eq!(decimal_arg(&arguments, "as_text").unwrap(), dec!(512.5));
        assert!(decimal_arg(&arguments, "bad").is_err());
        assert!(decimal_arg(&arguments, "missing").is_err());
    }

    #[test]
    fn test_market_tool_schemas_are_named() {
        let names: Vec<_> = MarketToolKind::ALL
            .iter()
            .map(|kind| kind.schema().name)
            .collect();
        assert!(names.contains(&"get_taiwan_stock_price".into()));
        assert!(names.contains(&"check_trading_day".into()));
        assert!(names.contains(&"get_holiday_info".into()));
        assert_eq!(names.len(), 7);
    }
}
