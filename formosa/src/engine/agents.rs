use crate::{error::FormosaError, event::EventBus};
use chrono::Utc;
use formosa_store::{
    Store,
    entity::{
        AgentId, AgentMode, AgentStatus,
        agent::{Agent, AgentUpdate},
        model_config::ModelConfig,
        strategy_change::StrategyChange,
    },
    repository,
};
use rust_decimal::Decimal;
use tracing::info;

/// Fields of a new agent as accepted by the create operation.
#[derive(Debug, Clone, PartialEq)]
pub struct NewAgent {
    pub name: String,
    pub description: String,
    pub ai_model: String,
    pub color_theme: String,
    pub initial_funds: Decimal,
    pub max_position_size: Decimal,
    pub investment_preferences: Vec<String>,
}

/// Validate an `"r, g, b"` colour string with components in 0..=255.
pub fn validate_color_theme(value: &str) -> Result<(), FormosaError> {
    let components: Vec<&str> = value.split(',').map(str::trim).collect();
    if components.len() != 3 || components.iter().any(|part| part.parse::<u8>().is_err()) {
        return Err(FormosaError::validation(format!(
            "color_theme must be 'r, g, b' with components 0-255, got '{value}'"
        )));
    }
    Ok(())
}

fn validate_new_agent(new: &NewAgent) -> Result<(), FormosaError> {
    if new.name.is_empty() || new.name.chars().count() > 100 {
        return Err(FormosaError::validation(
            "name must be 1-100 characters",
        ));
    }
    if new.initial_funds <= Decimal::ZERO {
        return Err(FormosaError::validation("initial_funds must be positive"));
    }
    if new.max_position_size < Decimal::ONE || new.max_position_size > Decimal::ONE_HUNDRED {
        return Err(FormosaError::validation(
            "max_position_size must be between 1 and 100",
        ));
    }
    validate_color_theme(&new.color_theme)
}

/// CRUD facade over agents and the model catalog.
#[derive(Debug, Clone)]
pub struct AgentService {
    store: Store,
    bus: EventBus,
}

impl AgentService {
    pub fn new(store: Store, bus: EventBus) -> Self {
        Self { store, bus }
    }

    /// Create an agent. The model key must reference an enabled catalog row.
    pub async fn create_agent(&self, new: NewAgent) -> Result<Agent, FormosaError> {
        validate_new_agent(&new)?;

        let mut conn = self.store.acquire().await?;
        let model = repository::models::fetch(&mut conn, &new.ai_model)
            .await?
            .filter(|model| model.is_enabled)
            .ok_or_else(|| FormosaError::not_found("model", &new.ai_model))?;

        let now = Utc::now();
        let agent = Agent {
            id: AgentId::random(),
            name: new.name,
            description: new.description,
            ai_model: model.model_key.clone(),
            provider: model.provider.clone(),
            color_theme: new.color_theme,
            initial_funds: new.initial_funds,
            current_funds: new.initial_funds,
            current_mode: AgentMode::Trading,
            status: AgentStatus::Inactive,
            investment_preferences: new.investment_preferences,
            max_position_size: new.max_position_size,
            created_at: now,
            updated_at: now,
            last_active_at: None,
        };

        repository::agents::insert(&mut conn, &agent).await?;
        info!(agent = %agent.id, name = %agent.name, "created agent");

        self.bus.emit_agent_status(
            &agent.id,
            serde_json::json!({"status": agent.status, "name": &agent.name}),
        );

        Ok(agent)
    }

    pub async fn get_agent(&self, id: &AgentId) -> Result<Agent, FormosaError> {
        let mut conn = self.store.acquire().await?;
        Ok(repository::agents::fetch_required(&mut conn, id).await?)
    }

    pub async fn list_agents(&self) -> Result<Vec<Agent>, FormosaError> {
        let mut conn = self.store.acquire().await?;
        Ok(repository::agents::list(&mut conn).await?)
    }

    /// Update mutable fields. A changed model key is re-validated against the catalog.
    pub async fn update_agent(
        &self,
        id: &AgentId,
        update: AgentUpdate,
    ) -> Result<Agent, FormosaError> {
        if let Some(color_theme) = &update.color_theme {
            validate_color_theme(color_theme)?;
        }
        if let Some(max_position_size) = update.max_position_size
            && (max_position_size < Decimal::ONE || max_position_size > Decimal::ONE_HUNDRED)
        {
            return Err(FormosaError::validation(
                "max_position_size must be between 1 and 100",
            ));
        }

        let mut conn = self.store.acquire().await?;
        if let Some(ai_model) = &update.ai_model {
            repository::models::fetch(&mut conn, ai_model)
                .await?
                .filter(|model| model.is_enabled)
                .ok_or_else(|| FormosaError::not_found("model", ai_model))?;
        }

        Ok(repository::agents::update(&mut conn, id, &update, Utc::now()).await?)
    }

    /// Cascade delete: removes the agent and every session, transaction, holding,
    /// performance row and strategy change it owns.
    pub async fn delete_agent(&self, id: &AgentId) -> Result<(), FormosaError> {
        let mut conn = self.store.acquire().await?;
        if !repository::agents::delete(&mut conn, id).await? {
            return Err(FormosaError::not_found("agent", id.as_str()));
        }
        info!(agent = %id, "deleted agent and owned records");
        Ok(())
    }

    pub async fn list_models(&self) -> Result<Vec<ModelConfig>, FormosaError> {
        let mut conn = self.store.acquire().await?;
        Ok(repository::models::list_enabled(&mut conn).await?)
    }

    /// Strategy-change audit trail, newest first.
    pub async fn strategy_changes(
        &self,
        id: &AgentId,
        limit: i64,
    ) -> Result<Vec<StrategyChange>, FormosaError> {
        let mut conn = self.store.acquire().await?;
        repository::agents::fetch_required(&mut conn, id).await?;
        Ok(repository::strategy_changes::list_for_agent(&mut conn, id, limit).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_theme_validation() {
        assert!(validate_color_theme("34, 197, 94").is_ok());
        assert!(validate_color_theme("0,0,0").is_ok());
        assert!(validate_color_theme("255, 255, 255").is_ok());

        assert!(validate_color_theme("34, 197").is_err());
        assert!(validate_color_theme("34, 197, 300").is_err());
        assert!(validate_color_theme("green").is_err());
        assert!(validate_color_theme("").is_err());
    }
}
