use crate::{
    config::Config,
    engine::{
        cancel::CancelToken,
        metrics,
        registry::{ActiveAgentGuard, ActiveAgents, ExecutionHandle},
        session::{SessionService, SessionUpdate},
    },
    error::FormosaError,
    event::{EventBus, WsMessage, WsMessageKind},
    runtime::{AgentRuntime, ProviderFactory, RunOutcome, RuntimeOutput, memory::MemoryStore},
};
use chrono::Utc;
use formosa_integration::client::ToolProcessClient;
use formosa_market::{MarketData, Ticker};
use formosa_store::{
    Store,
    entity::{
        AgentId, AgentMode, SessionId, SessionStatus, TradeAction, TransactionId,
        TransactionStatus, agent::Agent, holding::Holding, session::Session,
        transaction::{COMMISSION_RATE, Transaction},
    },
    repository,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, warn};

/// Validated inputs of one trade issued by a running agent.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct TradeRequest {
    pub agent_id: AgentId,
    pub ticker: String,
    pub action: TradeAction,
    pub quantity: i64,
    pub price: Decimal,
    pub decision_reason: String,
    pub company_name: String,
}

/// Outcome of the atomic trade primitive.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct TradeOutcome {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<TransactionId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<SessionId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TradeOutcome {
    fn executed(
        transaction_id: TransactionId,
        session_id: SessionId,
        message: String,
    ) -> Self {
        Self {
            success: true,
            transaction_id: Some(transaction_id),
            session_id: Some(session_id),
            message: Some(message),
            error: None,
        }
    }

    fn rejected(error: impl Into<String>) -> Self {
        Self {
            success: false,
            transaction_id: None,
            session_id: None,
            message: None,
            error: Some(error.into()),
        }
    }
}

/// Read-only view of one held position with its mark-to-market valuation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HoldingView {
    pub ticker: String,
    pub company_name: String,
    pub quantity: i64,
    pub average_cost: Decimal,
    /// Absent when the quote fetch failed; the position is then carried at cost.
    pub current_price: Option<Decimal>,
    pub market_value: Decimal,
    pub unrealized_pnl: Option<Decimal>,
}

/// Read-only portfolio snapshot: holdings + cash + total value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PortfolioSnapshot {
    pub agent_id: AgentId,
    pub cash_balance: Decimal,
    pub holdings: Vec<HoldingView>,
    pub total_value: Decimal,
}

/// Reservation of one agent execution: registry guard held, session row allocated.
#[derive(Debug)]
pub struct ExecutionTicket {
    pub agent: Agent,
    pub session: Session,
    pub mode: AgentMode,
    pub cancel: CancelToken,
    guard: ActiveAgentGuard,
}

/// Trading engine service: per-agent single-flight execution, the atomic trade
/// primitive, and portfolio views.
#[derive(Clone)]
pub struct TradingService {
    pub(crate) store: Store,
    pub(crate) market: Arc<dyn MarketData>,
    pub(crate) bus: EventBus,
    pub(crate) sessions: SessionService,
    pub(crate) registry: ActiveAgents,
    pub(crate) providers: Arc<dyn ProviderFactory>,
    pub(crate) memory: Arc<dyn MemoryStore>,
    pub(crate) research: Option<ToolProcessClient>,
    pub(crate) config: Arc<Config>,
}

impl std::fmt::Debug for TradingService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TradingService")
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}

impl TradingService {
    pub fn new(
        store: Store,
        market: Arc<dyn MarketData>,
        bus: EventBus,
        sessions: SessionService,
        providers: Arc<dyn ProviderFactory>,
        memory: Arc<dyn MemoryStore>,
        research: Option<ToolProcessClient>,
        config: Arc<Config>,
    ) -> Self {
        Self {
            store,
            market,
            bus,
            sessions,
            registry: ActiveAgents::new(),
            providers,
            memory,
            research,
            config,
        }
    }

    pub fn registry(&self) -> &ActiveAgents {
        &self.registry
    }

    pub fn sessions(&self) -> &SessionService {
        &self.sessions
    }

    /// Reserve the agent and open its session row. Fails fast with `NotFound` (no such
    /// agent) or `AgentBusy` (single-flight collision, no session row created).
    pub async fn begin_execution(
        &self,
        agent_id: &AgentId,
        mode: AgentMode,
    ) -> Result<ExecutionTicket, FormosaError> {
        let agent = {
            let mut conn = self.store.acquire().await?;
            repository::agents::fetch_required(&mut conn, agent_id).await?
        };

        let session_id = SessionId::random();
        let cancel = CancelToken::new();

        let guard = self.registry.acquire(
            agent_id,
            ExecutionHandle {
                session_id: session_id.clone(),
                cancel: cancel.clone(),
                started_at: Utc::now(),
            },
        )?;

        let session = self
            .sessions
            .create_session(
                session_id,
                agent_id,
                mode,
                serde_json::json!({"mode": mode, "trigger": "api"}),
            )
            .await?;

        Ok(ExecutionTicket {
            agent,
            session,
            mode,
            cancel,
            guard,
        })
    }

    /// Run a reserved execution to completion. The registry entry is released when this
    /// returns, after the session reached its terminal status.
    pub async fn run_execution(
        &self,
        ticket: ExecutionTicket,
    ) -> Result<RuntimeOutput, FormosaError> {
        let ExecutionTicket {
            agent,
            session,
            mode,
            cancel,
            guard,
        } = ticket;

        let result = self.run_execution_inner(&agent, &session, mode, cancel).await;

        if let Err(error) = &result {
            error!(agent = %agent.id, session = %session.id, %error, "execution failed");
        }

        // Terminal status is already persisted; releasing the agent comes last
        drop(guard);
        result
    }

    /// One-shot execution: reserve, run, release.
    pub async fn execute_single_mode(
        &self,
        agent_id: &AgentId,
        mode: AgentMode,
    ) -> Result<RuntimeOutput, FormosaError> {
        let ticket = self.begin_execution(agent_id, mode).await?;
        self.run_execution(ticket).await
    }

    async fn run_execution_inner(
        &self,
        agent: &Agent,
        session: &Session,
        mode: AgentMode,
        cancel: CancelToken,
    ) -> Result<RuntimeOutput, FormosaError> {
        self.sessions
            .update_session_status(&session.id, SessionStatus::Running, SessionUpdate::default())
            .await?;
        self.bus.broadcast(WsMessage::new(
            WsMessageKind::ExecutionStarted,
            Some(agent.id.clone()),
            serde_json::json!({"session_id": &session.id, "mode": mode}),
        ));

        // Trading-day gate; provider trouble degrades to a warning rather than a refusal
        if mode == AgentMode::Trading && !self.config.skip_market_check {
            match self.market.is_trading_day(Utc::now().date_naive()).await {
                Ok(true) => {}
                Ok(false) => {
                    let message = "market is closed today".to_string();
                    self.close_session(
                        &session.id,
                        SessionStatus::Failed,
                        SessionUpdate {
                            error_message: Some(message.clone()),
                            ..SessionUpdate::default()
                        },
                    )
                    .await?;
                    self.emit_execution_end(agent, session, WsMessageKind::ExecutionFailed);
                    return Ok(RuntimeOutput::failed(message));
                }
                Err(error) => {
                    warn!(%error, "trading-day check unavailable, proceeding");
                }
            }
        }

        let mut runtime = match AgentRuntime::initialize(
            self.clone(),
            agent.clone(),
            mode,
            session.id.clone(),
            cancel,
        )
        .await
        {
            Ok(runtime) => runtime,
            Err(error) => {
                self.close_session(
                    &session.id,
                    SessionStatus::Failed,
                    SessionUpdate {
                        error_message: Some(error.to_string()),
                        ..SessionUpdate::default()
                    },
                )
                .await?;
                self.emit_execution_end(agent, session, WsMessageKind::ExecutionFailed);
                return Err(error);
            }
        };

        let output = runtime.run().await;

        let (status, kind) = match output.outcome {
            RunOutcome::Completed => (SessionStatus::Completed, WsMessageKind::ExecutionCompleted),
            RunOutcome::Cancelled => (SessionStatus::Cancelled, WsMessageKind::ExecutionStopped),
            RunOutcome::DeadlineExceeded => (SessionStatus::Timeout, WsMessageKind::ExecutionFailed),
            RunOutcome::Failed => (SessionStatus::Failed, WsMessageKind::ExecutionFailed),
        };

        self.close_session(
            &session.id,
            status,
            SessionUpdate {
                final_output: Some(output.final_output.clone()),
                error_message: output.error.clone(),
                tools_called: Some(output.tools_called.clone()),
            },
        )
        .await?;
        self.emit_execution_end(agent, session, kind);

        {
            let mut conn = self.store.acquire().await?;
            repository::agents::touch_last_active(&mut conn, &agent.id, Utc::now()).await?;
        }

        info!(
            agent = %agent.id,
            session = %session.id,
            status = %status,
            tools = output.tools_called.len(),
            "execution finished"
        );

        Ok(output)
    }

    async fn close_session(
        &self,
        session_id: &SessionId,
        status: SessionStatus,
        update: SessionUpdate,
    ) -> Result<(), FormosaError> {
        self.sessions
            .update_session_status(session_id, status, update)
            .await?;
        Ok(())
    }

    fn emit_execution_end(&self, agent: &Agent, session: &Session, kind: WsMessageKind) {
        self.bus.broadcast(WsMessage::new(
            kind,
            Some(agent.id.clone()),
            serde_json::json!({"session_id": &session.id}),
        ));
    }

    /// Signal cancellation of the agent's active execution. The session transitions to
    /// CANCELLED when the runtime observes the signal; the registry entry is released on
    /// return of the execution, not here.
    pub async fn stop_agent(&self, agent_id: &AgentId) -> Result<Option<SessionId>, FormosaError> {
        let mut conn = self.store.acquire().await?;
        repository::agents::fetch_required(&mut conn, agent_id).await?;
        drop(conn);

        let stopped = self.registry.signal_stop(agent_id);
        if let Some(session_id) = &stopped {
            info!(agent = %agent_id, session = %session_id, "cancellation signalled");
        }
        Ok(stopped)
    }

    /// Pre-transaction validation. Failures reject the trade without touching the store.
    fn validate_trade(request: &TradeRequest) -> Result<(), FormosaError> {
        if request.quantity <= 0 {
            return Err(FormosaError::validation(
                "quantity must be a positive integer",
            ));
        }
        if request.quantity % 1000 != 0 {
            return Err(FormosaError::validation(
                "quantity must be a multiple of 1000 (whole board lots)",
            ));
        }
        if request.price <= Decimal::ZERO {
            return Err(FormosaError::validation("price must be positive"));
        }
        Ok(())
    }

    /// Atomic trade execution: transaction insert, holding upsert, funds change and
    /// daily-performance recompute commit or roll back as one unit.
    ///
    /// The trade binds to the agent's currently running session; with none resolvable
    /// the trade is rejected before any write.
    pub async fn execute_trade_atomic(&self, request: &TradeRequest) -> TradeOutcome {
        if let Err(error) = Self::validate_trade(request) {
            return TradeOutcome::rejected(error.to_string());
        }

        let Some(session_id) = self.registry.current_session(&request.agent_id) else {
            return TradeOutcome::rejected(format!(
                "no running session for agent '{}'",
                request.agent_id
            ));
        };

        match self.execute_trade_scope(request, &session_id).await {
            Ok(outcome) => outcome,
            Err(error) => {
                warn!(
                    agent = %request.agent_id,
                    ticker = %request.ticker,
                    %error,
                    "trade rolled back"
                );
                TradeOutcome::rejected(error.to_string())
            }
        }
    }

    /// The four-step write inside one transactional scope. Any `Err` rolls the whole
    /// scope back when the uncommitted transaction drops.
    async fn execute_trade_scope(
        &self,
        request: &TradeRequest,
        session_id: &SessionId,
    ) -> Result<TradeOutcome, FormosaError> {
        let now = Utc::now();
        let mut tx = self.store.begin().await?;

        let agent = repository::agents::fetch_required(&mut tx, &request.agent_id).await?;
        let held = repository::holdings::fetch(&mut tx, &request.agent_id, &request.ticker)
            .await?;

        // Step 1: transaction row
        let total_amount = Decimal::from(request.quantity) * request.price;
        let transaction = Transaction {
            id: TransactionId::random(),
            agent_id: request.agent_id.clone(),
            session_id: Some(session_id.clone()),
            ticker: request.ticker.clone(),
            company_name: request.company_name.clone(),
            action: request.action,
            quantity: request.quantity,
            price: request.price,
            total_amount,
            commission: total_amount * COMMISSION_RATE,
            status: TransactionStatus::Executed,
            execution_time: Some(now),
            decision_reason: request.decision_reason.clone(),
            created_at: now,
        };
        repository::transactions::insert(&mut tx, &transaction).await?;

        // Step 2: holding upsert
        let holding = apply_trade_to_holding(held, request, now)?;
        repository::holdings::upsert(&mut tx, &holding).await?;

        // Step 3: funds change
        let new_funds = agent.current_funds + transaction.funds_change();
        if new_funds < Decimal::ZERO {
            return Err(FormosaError::InsufficientFunds {
                required: -transaction.funds_change(),
                available: agent.current_funds,
            });
        }
        repository::agents::update_funds(&mut tx, &request.agent_id, new_funds, now).await?;

        // Step 4: today's performance snapshot
        let performance = metrics::recompute_daily(
            &mut tx,
            self.market.as_ref(),
            &agent,
            new_funds,
            now.date_naive(),
            now,
        )
        .await?;

        tx.commit().await?;

        info!(
            agent = %request.agent_id,
            session = %session_id,
            ticker = %request.ticker,
            action = %request.action,
            quantity = request.quantity,
            price = %request.price,
            "trade executed"
        );

        self.bus.emit_trade_execution(
            &request.agent_id,
            serde_json::json!({
                "transaction_id": &transaction.id,
                "session_id": session_id,
                "ticker": &transaction.ticker,
                "action": transaction.action,
                "quantity": transaction.quantity,
                "price": transaction.price,
                "total_amount": transaction.total_amount,
                "commission": transaction.commission,
            }),
        );
        self.bus.emit_portfolio_update(
            &request.agent_id,
            serde_json::json!({
                "cash_balance": performance.cash_balance,
                "total_value": performance.total_value,
                "unrealized_pnl": performance.unrealized_pnl,
            }),
        );

        Ok(TradeOutcome::executed(
            transaction.id,
            session_id.clone(),
            format!(
                "{} {} x {} @ {} executed",
                transaction.action, transaction.ticker, transaction.quantity, transaction.price
            ),
        ))
    }

    /// Persisted daily-performance rows ordered by date.
    pub async fn performance_history(
        &self,
        agent_id: &AgentId,
        limit: i64,
        ascending: bool,
    ) -> Result<Vec<formosa_store::entity::performance::DailyPerformance>, FormosaError> {
        let mut conn = self.store.acquire().await?;
        Ok(repository::performance::history(&mut conn, agent_id, limit, ascending).await?)
    }

    /// Current holdings + cash + mark-to-market total value.
    pub async fn portfolio_snapshot(
        &self,
        agent_id: &AgentId,
    ) -> Result<PortfolioSnapshot, FormosaError> {
        let (agent, holdings) = {
            let mut conn = self.store.acquire().await?;
            let agent = repository::agents::fetch_required(&mut conn, agent_id).await?;
            let holdings = repository::holdings::list_for_agent(&mut conn, agent_id).await?;
            (agent, holdings)
        };

        let mut views = Vec::with_capacity(holdings.len());
        let mut total_value = agent.current_funds;

        for holding in holdings.into_iter().filter(|holding| holding.quantity > 0) {
            let quantity = Decimal::from(holding.quantity);
            let (current_price, market_value, unrealized_pnl) =
                match self.market.stock_price(&Ticker::new(&holding.ticker)).await {
                    Ok(quote) => (
                        Some(quote.price),
                        quote.price * quantity,
                        Some((quote.price - holding.average_cost) * quantity),
                    ),
                    Err(error) => {
                        warn!(ticker = %holding.ticker, %error, "quote unavailable for portfolio");
                        (None, holding.average_cost * quantity, None)
                    }
                };

            total_value += market_value;
            views.push(HoldingView {
                ticker: holding.ticker,
                company_name: holding.company_name,
                quantity: holding.quantity,
                average_cost: holding.average_cost,
                current_price,
                market_value,
                unrealized_pnl,
            });
        }

        Ok(PortfolioSnapshot {
            agent_id: agent_id.clone(),
            cash_balance: agent.current_funds,
            holdings: views,
            total_value,
        })
    }
}

/// Apply one trade to the `(agent, ticker)` position.
///
/// BUY re-averages cost over the combined lot. SELL reduces quantity without touching
/// average cost, except that a fully closed position resets it to zero.
fn apply_trade_to_holding(
    held: Option<Holding>,
    request: &TradeRequest,
    now: chrono::DateTime<Utc>,
) -> Result<Holding, FormosaError> {
    let mut holding = held.unwrap_or(Holding {
        agent_id: request.agent_id.clone(),
        ticker: request.ticker.clone(),
        company_name: request.company_name.clone(),
        quantity: 0,
        average_cost: Decimal::ZERO,
        created_at: now,
        updated_at: now,
    });

    match request.action {
        TradeAction::Buy => {
            let old_quantity = Decimal::from(holding.quantity);
            let new_quantity = holding.quantity + request.quantity;
            holding.average_cost = (old_quantity * holding.average_cost
                + Decimal::from(request.quantity) * request.price)
                / Decimal::from(new_quantity);
            holding.quantity = new_quantity;
        }
        TradeAction::Sell => {
            if request.quantity > holding.quantity {
                return Err(FormosaError::InsufficientHoldings {
                    ticker: request.ticker.clone(),
                    requested: request.quantity,
                    held: holding.quantity,
                });
            }
            holding.quantity -= request.quantity;
            if holding.quantity == 0 {
                holding.average_cost = Decimal::ZERO;
            }
        }
    }

    if !request.company_name.is_empty() {
        holding.company_name = request.company_name.clone();
    }
    holding.updated_at = now;
    Ok(holding)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn request(action: TradeAction, quantity: i64, price: Decimal) -> TradeRequest {
        TradeRequest {
            agent_id: AgentId::new("agent_1"),
            ticker: "2330".into(),
            action,
            quantity,
            price,
            decision_reason: String::new(),
            company_name: "TSMC".into(),
        }
    }

    #[test]
    fn test_validate_trade_rejects_bad_inputs() {
        assert!(TradingService::validate_trade(&request(TradeAction::Buy, 0, dec!(500))).is_err());
        assert!(
            TradingService::validate_trade(&request(TradeAction::Buy, -1000, dec!(500))).is_err()
        );
        assert!(
            TradingService::validate_trade(&request(TradeAction::Buy, 1500, dec!(500))).is_err()
        );
        assert!(TradingService::validate_trade(&request(TradeAction::Buy, 1000, dec!(0))).is_err());
        assert!(
            TradingService::validate_trade(&request(TradeAction::Buy, 1000, dec!(500))).is_ok()
        );
    }

    #[test]
    fn test_buy_averages_cost_over_combined_lot() {
        let now = Utc::now();
        let first = apply_trade_to_holding(None, &request(TradeAction::Buy, 1000, dec!(500)), now)
            .unwrap();
        assert_eq!(first.quantity, 1000);
        assert_eq!(first.average_cost, dec!(500));

        let second = apply_trade_to_holding(
            Some(first),
            &request(TradeAction::Buy, 1000, dec!(520)),
            now,
        )
        .unwrap();
        assert_eq!(second.quantity, 2000);
        assert_eq!(second.average_cost, dec!(510));
    }

    #[test]
    fn test_sell_keeps_average_cost_until_flat() {
        let now = Utc::now();
        let bought = apply_trade_to_holding(None, &request(TradeAction::Buy, 2000, dec!(510)), now)
            .unwrap();

        let reduced = apply_trade_to_holding(
            Some(bought.clone()),
            &request(TradeAction::Sell, 1000, dec!(530)),
            now,
        )
        .unwrap();
        assert_eq!(reduced.quantity, 1000);
        assert_eq!(reduced.average_cost, dec!(510));

        let flat = apply_trade_to_holding(
            Some(reduced),
            &request(TradeAction::Sell, 1000, dec!(530)),
            now,
        )
        .unwrap();
        assert_eq!(flat.quantity, 0);
        assert_eq!(flat.average_cost, dec!(0));
    }

    #[test]
    fn test_oversell_is_insufficient_holdings() {
        let now = Utc::now();
        let bought = apply_trade_to_holding(None, &request(TradeAction::Buy, 1000, dec!(500)), now)
            .unwrap();

        let result = apply_trade_to_holding(
            Some(bought),
            &request(TradeAction::Sell, 2000, dec!(530)),
            now,
        );
        assert!(matches!(
            result,
            Err(FormosaError::InsufficientHoldings { held: 1000, requested: 2000, .. })
        ));
    }
}
