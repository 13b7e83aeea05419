//! Shared fixtures: an in-memory store, a static market, and a scripted chat provider
//! standing in for the LLM.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use formosa::{
    config::Config,
    engine::{agents::AgentService, session::SessionService, trading::TradingService},
    event::EventBus,
    runtime::{ProviderFactory, memory::NullMemoryStore},
    server::AppState,
};
use formosa_llm::{
    ChatProvider,
    chat::{ChatRequest, ChatResponse, ToolCall},
    error::LlmError,
};
use formosa_market::{MarketData, Ticker, error::MarketError, quote::Quote};
use formosa_store::{
    Store,
    entity::{AgentId, agent::Agent, model_config::ModelConfig},
    repository,
};
use parking_lot::Mutex;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::{
    collections::{HashMap, VecDeque},
    sync::Arc,
    time::Duration,
};

/// Market stub with fixed prices; unknown tickers fail like a provider outage.
#[derive(Debug, Default)]
pub struct StaticMarket {
    prices: Mutex<HashMap<String, Decimal>>,
}

impl StaticMarket {
    pub fn with_price(ticker: &str, price: Decimal) -> Arc<Self> {
        let market = Self::default();
        market.prices.lock().insert(ticker.to_string(), price);
        Arc::new(market)
    }

    pub fn set_price(&self, ticker: &str, price: Decimal) {
        self.prices.lock().insert(ticker.to_string(), price);
    }
}

#[async_trait]
impl MarketData for StaticMarket {
    async fn stock_price(&self, ticker: &Ticker) -> Result<Quote, MarketError> {
        self.prices
            .lock()
            .get(ticker.as_str())
            .map(|price| Quote {
                ticker: ticker.clone(),
                company_name: "Test Co".to_string(),
                price: *price,
            })
            .ok_or_else(|| MarketError::Unusable(format!("no quote for {ticker}")))
    }

    async fn company_financials(&self, _: &Ticker) -> Result<serde_json::Value, MarketError> {
        Ok(serde_json::json!({}))
    }

    async fn is_trading_day(&self, _: NaiveDate) -> Result<bool, MarketError> {
        Ok(true)
    }

    async fn holiday_info(&self, _: NaiveDate) -> Result<serde_json::Value, MarketError> {
        Ok(serde_json::json!({}))
    }

    async fn margin_info(&self, _: &Ticker) -> Result<serde_json::Value, MarketError> {
        Ok(serde_json::json!({}))
    }

    async fn foreign_flows(&self, _: &Ticker) -> Result<serde_json::Value, MarketError> {
        Ok(serde_json::json!({}))
    }

    async fn dividends(&self, _: &Ticker) -> Result<serde_json::Value, MarketError> {
        Ok(serde_json::json!({}))
    }
}

/// Scripted provider: plays queued responses, then finishes. A small pause keeps
/// execution times measurable.
#[derive(Debug, Default)]
pub struct ScriptedProvider {
    script: Mutex<VecDeque<ChatResponse>>,
    pub pause: Option<Duration>,
}

impl ScriptedProvider {
    pub fn new(responses: impl IntoIterator<Item = ChatResponse>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(responses.into_iter().collect()),
            pause: Some(Duration::from_millis(5)),
        })
    }

    pub fn silent() -> Arc<Self> {
        Self::new([])
    }
}

#[async_trait]
impl ChatProvider for ScriptedProvider {
    async fn chat(&self, _: ChatRequest) -> Result<ChatResponse, LlmError> {
        if let Some(pause) = self.pause {
            tokio::time::sleep(pause).await;
        }
        let next = self.script.lock().pop_front();
        Ok(next.unwrap_or(ChatResponse {
            content: Some(r#"{"summary": "session finished"}"#.to_string()),
            tool_calls: Vec::new(),
        }))
    }
}

/// Provider that gates each scripted response behind an explicit release.
#[derive(Debug)]
pub struct GatedProvider {
    script: Mutex<VecDeque<ChatResponse>>,
    gate: tokio::sync::Semaphore,
}

impl GatedProvider {
    pub fn new(responses: impl IntoIterator<Item = ChatResponse>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(responses.into_iter().collect()),
            gate: tokio::sync::Semaphore::new(0),
        })
    }

    /// Allow one pending chat call to proceed.
    pub fn release(&self) {
        self.gate.add_permits(1);
    }
}

#[async_trait]
impl ChatProvider for GatedProvider {
    async fn chat(&self, _: ChatRequest) -> Result<ChatResponse, LlmError> {
        let permit = self.gate.acquire().await.expect("gate closed");
        permit.forget();
        let next = self.script.lock().pop_front();
        Ok(next.unwrap_or(ChatResponse {
            content: Some(r#"{"summary": "session finished"}"#.to_string()),
            tool_calls: Vec::new(),
        }))
    }
}

/// Factory handing out one shared provider regardless of catalog row.
pub struct FixedFactory {
    provider: Arc<dyn ChatProvider>,
}

impl FixedFactory {
    pub fn new(provider: Arc<dyn ChatProvider>) -> Arc<Self> {
        Arc::new(Self { provider })
    }
}

impl ProviderFactory for FixedFactory {
    fn build(
        &self,
        _: &ModelConfig,
    ) -> Result<Arc<dyn ChatProvider>, formosa::error::FormosaError> {
        Ok(Arc::clone(&self.provider))
    }
}

/// Full service assembly over an in-memory store.
pub struct Harness {
    pub store: Store,
    pub trading: TradingService,
    pub agents: AgentService,
    pub bus: EventBus,
    pub config: Arc<Config>,
}

impl Harness {
    pub async fn new(provider: Arc<dyn ChatProvider>, market: Arc<dyn MarketData>) -> Self {
        Self::with_config(provider, market, test_config()).await
    }

    pub async fn with_config(
        provider: Arc<dyn ChatProvider>,
        market: Arc<dyn MarketData>,
        config: Config,
    ) -> Self {
        let store = Store::connect_in_memory().await.unwrap();
        store.migrate().await.unwrap();

        let config = Arc::new(config);
        let bus = EventBus::new();
        let sessions = SessionService::new(store.clone(), bus.clone());
        let trading = TradingService::new(
            store.clone(),
            market,
            bus.clone(),
            sessions,
            FixedFactory::new(provider),
            Arc::new(NullMemoryStore),
            None,
            Arc::clone(&config),
        );
        let agents = AgentService::new(store.clone(), bus.clone());

        Self {
            store,
            trading,
            agents,
            bus,
            config,
        }
    }

    pub fn app_state(&self) -> AppState {
        AppState {
            agents: self.agents.clone(),
            trading: self.trading.clone(),
            bus: self.bus.clone(),
            config: Arc::clone(&self.config),
        }
    }

    /// Seed an agent with one million TWD and no holdings.
    pub async fn seed_agent(&self, id: &str) -> Agent {
        let now = Utc::now();
        let agent = Agent {
            id: AgentId::new(id),
            name: format!("agent {id}"),
            description: String::new(),
            ai_model: "gpt-4o-mini".to_string(),
            provider: "OpenAI".to_string(),
            color_theme: "34, 197, 94".to_string(),
            initial_funds: dec!(1_000_000),
            current_funds: dec!(1_000_000),
            current_mode: formosa_store::entity::AgentMode::Trading,
            status: formosa_store::entity::AgentStatus::Active,
            investment_preferences: vec![],
            max_position_size: dec!(50),
            created_at: now,
            updated_at: now,
            last_active_at: None,
        };

        let mut conn = self.store.acquire().await.unwrap();
        repository::agents::insert(&mut conn, &agent).await.unwrap();
        agent
    }
}

pub fn test_config() -> Config {
    Config {
        skip_market_check: true,
        skip_agent_graph: true,
        ..Config::default()
    }
}

/// Convenience tool-call constructor for scripted responses.
pub fn tool_call(id: &str, name: &str, arguments: serde_json::Value) -> ToolCall {
    ToolCall {
        id: id.to_string(),
        name: name.into(),
        arguments,
    }
}

/// A turn that requests the provided tool calls.
pub fn turn_with_calls(calls: Vec<ToolCall>) -> ChatResponse {
    ChatResponse {
        content: None,
        tool_calls: calls,
    }
}

/// A final turn with the provided text content.
pub fn final_turn(content: &str) -> ChatResponse {
    ChatResponse {
        content: Some(content.to_string()),
        tool_calls: Vec::new(),
    }
}
