use super::ColumnDef;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One row of the AI model catalog. Agents reference models by `model_key`; the runtime
/// resolves the key to a provider-prefixed identifier and API key environment variable.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ModelConfig {
    pub model_key: String,
    pub display_name: String,
    pub provider: String,
    /// LiteLLM-style prefix (eg/ `gemini/`). Empty for provider-native keys.
    pub litellm_prefix: Option<String>,
    pub full_model_name: String,
    pub api_key_env_var: String,
    pub is_enabled: bool,
    pub cost_per_1k_tokens: Option<Decimal>,
    pub display_order: i64,
}

impl ModelConfig {
    pub const TABLE: &'static str = "ai_model_configs";

    pub const COLUMNS: &'static [ColumnDef] = &[
        ColumnDef::new("model_key", true),
        ColumnDef::new("display_name", true),
        ColumnDef::new("provider", true),
        ColumnDef::new("litellm_prefix", false),
        ColumnDef::new("full_model_name", true),
        ColumnDef::new("api_key_env_var", true),
        ColumnDef::new("is_enabled", true),
        ColumnDef::new("cost_per_1k_tokens", false),
        ColumnDef::new("display_order", true),
    ];

    /// Fully-qualified model identifier handed to the LLM client.
    pub fn qualified_name(&self) -> String {
        match self.litellm_prefix.as_deref() {
            Some(prefix) if !prefix.is_empty() && !self.full_model_name.starts_with(prefix) => {
                format!("{prefix}{}", self.full_model_name)
            }
            _ => self.full_model_name.clone(),
        }
    }
}
