use crate::{error::FormosaError, event::EventBus};
use chrono::{Duration as ChronoDuration, Utc};
use formosa_store::{
    Store,
    entity::{
        AgentId, AgentMode, SessionId, SessionStatus, TransactionStatus,
        session::Session, transaction::Transaction,
    },
    repository,
};
use rust_decimal::Decimal;
use serde::Serialize;
use std::time::Duration;
use tracing::{info, warn};

/// Terminal update applied alongside a status transition.
#[derive(Debug, Clone, Default)]
pub struct SessionUpdate {
    pub final_output: Option<serde_json::Value>,
    pub error_message: Option<String>,
    pub tools_called: Option<Vec<String>>,
}

/// Aggregates over the trades of one session.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TradeAggregates {
    pub trade_count: i64,
    pub filled_count: i64,
    pub total_notional: Decimal,
}

/// One history row: the session plus its trade aggregates.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSummary {
    #[serde(flatten)]
    pub session: Session,
    #[serde(flatten)]
    pub aggregates: TradeAggregates,
}

/// Session detail: the row plus its trades.
#[derive(Debug, Clone, Serialize)]
pub struct SessionDetail {
    #[serde(flatten)]
    pub session: Session,
    pub trades: Vec<Transaction>,
}

/// Aggregate a session's trades, tolerating enum-or-string status/action values
/// compared case-insensitively.
pub fn trade_aggregates<'a>(
    trades: impl IntoIterator<Item = (&'a str, Decimal)>,
) -> TradeAggregates {
    let mut aggregates = TradeAggregates::default();
    for (status, amount) in trades {
        aggregates.trade_count += 1;
        if TransactionStatus::from_loose(status) == Some(TransactionStatus::Executed) {
            aggregates.filled_count += 1;
            aggregates.total_notional += amount;
        }
    }
    aggregates
}

/// Facade over the sessions table: lifecycle transitions, timestamping, timeout sweeping
/// and history queries. All datetimes are timezone-aware UTC end-to-end.
#[derive(Debug, Clone)]
pub struct SessionService {
    store: Store,
    bus: EventBus,
}

impl SessionService {
    pub fn new(store: Store, bus: EventBus) -> Self {
        Self { store, bus }
    }

    /// Allocate a PENDING session with `start_time = now` (UTC).
    pub async fn create_session(
        &self,
        id: SessionId,
        agent_id: &AgentId,
        mode: AgentMode,
        initial_input: serde_json::Value,
    ) -> Result<Session, FormosaError> {
        let now = Utc::now();
        let session = Session {
            id,
            agent_id: agent_id.clone(),
            mode,
            status: SessionStatus::Pending,
            start_time: now,
            end_time: None,
            execution_time_ms: None,
            initial_input: Some(initial_input),
            final_output: None,
            tools_called: Vec::new(),
            error_message: None,
            created_at: now,
            updated_at: now,
        };

        let mut conn = self.store.acquire().await?;
        repository::sessions::insert(&mut conn, &session).await?;
        Ok(session)
    }

    /// Transition a session. On the first terminal status, `end_time` is stamped (if
    /// unset) and `execution_time_ms` derived. Terminal sessions never reopen; a late
    /// transition attempt is ignored with a warning.
    pub async fn update_session_status(
        &self,
        id: &SessionId,
        status: SessionStatus,
        update: SessionUpdate,
    ) -> Result<Session, FormosaError> {
        let mut conn = self.store.acquire().await?;
        let mut session = repository::sessions::fetch_required(&mut conn, id).await?;

        if session.status.is_terminal() {
            warn!(
                session = %id,
                current = %session.status,
                requested = %status,
                "ignoring status transition on terminal session"
            );
            return Ok(session);
        }

        session.status = status;
        if let Some(final_output) = update.final_output {
            session.final_output = Some(final_output);
        }
        if let Some(error_message) = update.error_message {
            session.error_message = Some(error_message);
        }
        if let Some(tools_called) = update.tools_called {
            session.tools_called = tools_called;
        }

        let now = Utc::now();
        if status.is_terminal() {
            let end_time = *session.end_time.get_or_insert(now);
            session.execution_time_ms =
                Some((end_time - session.start_time).num_milliseconds());
        }
        session.updated_at = now;

        repository::sessions::update(&mut conn, &session).await?;

        if matches!(status, SessionStatus::Failed | SessionStatus::Timeout) {
            self.bus.emit_error(
                &session.agent_id,
                session
                    .error_message
                    .as_deref()
                    .unwrap_or("session ended abnormally"),
            );
        }

        Ok(session)
    }

    /// Flip RUNNING sessions older than the threshold to TIMEOUT. Returns the flipped
    /// session ids.
    pub async fn sweep_timeouts(
        &self,
        threshold: Duration,
    ) -> Result<Vec<SessionId>, FormosaError> {
        let cutoff = Utc::now()
            - ChronoDuration::from_std(threshold)
                .map_err(|error| FormosaError::configuration(error.to_string()))?;

        let stale = {
            let mut conn = self.store.acquire().await?;
            repository::sessions::running_older_than(&mut conn, cutoff).await?
        };

        let mut flipped = Vec::with_capacity(stale.len());
        for session in stale {
            info!(session = %session.id, agent = %session.agent_id, "sweeping timed-out session");
            self.update_session_status(
                &session.id,
                SessionStatus::Timeout,
                SessionUpdate {
                    error_message: Some("execution timeout".to_string()),
                    ..SessionUpdate::default()
                },
            )
            .await?;
            flipped.push(session.id);
        }

        Ok(flipped)
    }

    /// Latest sessions of one agent with their trade aggregates, newest first.
    pub async fn history(
        &self,
        agent_id: &AgentId,
        limit: i64,
    ) -> Result<Vec<SessionSummary>, FormosaError> {
        let mut conn = self.store.acquire().await?;
        let sessions = repository::sessions::list_for_agent(&mut conn, agent_id, limit).await?;

        let mut summaries = Vec::with_capacity(sessions.len());
        for session in sessions {
            let trades =
                repository::transactions::list_for_session(&mut conn, &session.id).await?;
            let aggregates = trade_aggregates(
                trades
                    .iter()
                    .map(|trade| (trade.status.as_str(), trade.total_amount)),
            );
            summaries.push(SessionSummary {
                session,
                aggregates,
            });
        }

        Ok(summaries)
    }

    /// Session detail including trades. The session must belong to the agent.
    pub async fn session_detail(
        &self,
        agent_id: &AgentId,
        session_id: &SessionId,
    ) -> Result<SessionDetail, FormosaError> {
        let mut conn = self.store.acquire().await?;
        let session = repository::sessions::fetch_required(&mut conn, session_id).await?;
        if &session.agent_id != agent_id {
            return Err(FormosaError::not_found("session", session_id.as_str()));
        }

        let trades = repository::transactions::list_for_session(&mut conn, session_id).await?;
        Ok(SessionDetail { session, trades })
    }
}
