use crate::{
    config::Config,
    engine::{agents::AgentService, session::SessionService, trading::TradingService},
    error::FormosaError,
    event::EventBus,
    runtime::{
        EnvProviderFactory, ProviderFactory,
        memory::{McpMemoryStore, MemoryStore, NullMemoryStore},
    },
    server::{AppState, router},
};
use async_trait::async_trait;
use chrono::NaiveDate;
use formosa_integration::{client::ToolProcessClient, retry::RetryPolicy};
use formosa_market::{MarketData, Ticker, error::MarketError, gateway::McpMarketGateway, quote::Quote};
use formosa_store::Store;
use std::{sync::Arc, time::Duration};
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Per-call bound on external tool providers. Stays well inside the execution deadline.
const PROVIDER_CALL_TIMEOUT: Duration = Duration::from_secs(30);

/// Cadence of the session timeout sweeper.
const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Market data stand-in when no provider is configured: quotes fail (holdings are then
/// carried at cost) and every day counts as a trading day.
#[derive(Debug, Clone, Copy, Default)]
struct OfflineMarket;

#[async_trait]
impl MarketData for OfflineMarket {
    async fn stock_price(&self, _: &Ticker) -> Result<Quote, MarketError> {
        Err(MarketError::Unusable(
            "market provider not configured".to_string(),
        ))
    }

    async fn company_financials(&self, _: &Ticker) -> Result<serde_json::Value, MarketError> {
        Err(MarketError::Unusable(
            "market provider not configured".to_string(),
        ))
    }

    async fn is_trading_day(&self, _: NaiveDate) -> Result<bool, MarketError> {
        Ok(true)
    }

    async fn holiday_info(&self, _: NaiveDate) -> Result<serde_json::Value, MarketError> {
        Err(MarketError::Unusable(
            "market provider not configured".to_string(),
        ))
    }

    async fn margin_info(&self, _: &Ticker) -> Result<serde_json::Value, MarketError> {
        Err(MarketError::Unusable(
            "market provider not configured".to_string(),
        ))
    }

    async fn foreign_flows(&self, _: &Ticker) -> Result<serde_json::Value, MarketError> {
        Err(MarketError::Unusable(
            "market provider not configured".to_string(),
        ))
    }

    async fn dividends(&self, _: &Ticker) -> Result<serde_json::Value, MarketError> {
        Err(MarketError::Unusable(
            "market provider not configured".to_string(),
        ))
    }
}

/// Builder wiring store, market gateway, event bus and services into a runnable system.
#[derive(Debug)]
pub struct SystemBuilder {
    config: Config,
}

impl SystemBuilder {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub async fn build(self) -> Result<System, FormosaError> {
        let config = Arc::new(self.config);
        crate::server::error::set_debug_errors(config.debug);

        let store = Store::connect(&config.database_url).await?;
        store.migrate().await?;
        info!(url = %config.database_url, "store ready");

        let market: Arc<dyn MarketData> = match &config.market_provider {
            Some(provider) => {
                info!(command = %provider.command, "spawning market provider");
                Arc::new(McpMarketGateway::spawn(
                    provider,
                    PROVIDER_CALL_TIMEOUT,
                    RetryPolicy::default(),
                    config.skip_market_check,
                )?)
            }
            None => {
                warn!("no market provider configured, running offline");
                Arc::new(OfflineMarket)
            }
        };

        let memory: Arc<dyn MemoryStore> = match &config.memory_provider {
            Some(provider) => Arc::new(McpMemoryStore::new(ToolProcessClient::spawn(
                provider,
                PROVIDER_CALL_TIMEOUT,
                RetryPolicy::default(),
            )?)),
            None => Arc::new(NullMemoryStore),
        };

        let research = config
            .perplexity_provider
            .as_ref()
            .map(|provider| {
                ToolProcessClient::spawn(provider, PROVIDER_CALL_TIMEOUT, RetryPolicy::default())
            })
            .transpose()?;

        let bus = EventBus::new();
        let sessions = SessionService::new(store.clone(), bus.clone());
        let providers: Arc<dyn ProviderFactory> = Arc::new(EnvProviderFactory);

        let trading = TradingService::new(
            store.clone(),
            market,
            bus.clone(),
            sessions,
            providers,
            memory,
            research,
            Arc::clone(&config),
        );
        let agents = AgentService::new(store.clone(), bus.clone());

        Ok(System {
            state: AppState {
                agents,
                trading,
                bus,
                config,
            },
        })
    }
}

/// Initialised orchestrator, ready to serve.
#[derive(Debug)]
pub struct System {
    state: AppState,
}

impl System {
    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Spawn the periodic RUNNING→TIMEOUT sweeper.
    fn spawn_sweeper(&self) -> JoinHandle<()> {
        let sessions = self.state.trading.sessions().clone();
        let threshold = self.state.config.default_agent_timeout;

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(SWEEP_INTERVAL);
            // First tick fires immediately; skip it so fresh sessions are not swept early
            ticker.tick().await;
            loop {
                ticker.tick().await;
                match sessions.sweep_timeouts(threshold).await {
                    Ok(flipped) if !flipped.is_empty() => {
                        info!(count = flipped.len(), "timeout sweep flipped sessions");
                    }
                    Ok(_) => {}
                    Err(error) => warn!(%error, "timeout sweep failed"),
                }
            }
        })
    }

    /// Serve HTTP + WebSocket until SIGINT, then shut down gracefully.
    pub async fn run(self) -> Result<(), FormosaError> {
        let address = format!(
            "{}:{}",
            self.state.config.api_host, self.state.config.api_port
        );
        let listener = tokio::net::TcpListener::bind(&address)
            .await
            .map_err(|error| FormosaError::configuration(format!("bind {address}: {error}")))?;
        info!(%address, "serving");

        let sweeper = self.spawn_sweeper();
        let app = router(self.state);

        axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = tokio::signal::ctrl_c().await;
                info!("shutdown signal received");
            })
            .await
            .map_err(|error| FormosaError::configuration(error.to_string()))?;

        sweeper.abort();
        Ok(())
    }
}
