use formosa_integration::process::ToolProcessConfig;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Process configuration, read once at startup.
///
/// Every knob has a development-friendly default so a bare `formosa` launch works against
/// a local SQLite file with external tool providers disabled.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Config {
    pub database_url: String,
    pub api_host: String,
    pub api_port: u16,
    pub cors_origins: Vec<String>,
    pub log_level: String,
    pub default_ai_model: String,
    pub default_max_turns: usize,
    /// Wall-clock deadline of one agent execution.
    pub default_agent_timeout: Duration,
    /// Bypass the trading-day gate (useful on weekends and in tests).
    pub skip_market_check: bool,
    /// Omit sub-analyst agents from the tool set.
    pub skip_agent_graph: bool,
    pub debug: bool,
    pub market_provider: Option<ToolProcessConfig>,
    pub memory_provider: Option<ToolProcessConfig>,
    pub perplexity_provider: Option<ToolProcessConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: "sqlite://formosa.db".to_string(),
            api_host: "127.0.0.1".to_string(),
            api_port: 8000,
            cors_origins: vec!["*".to_string()],
            log_level: "info".to_string(),
            default_ai_model: "gpt-4o-mini".to_string(),
            default_max_turns: 10,
            default_agent_timeout: Duration::from_secs(300),
            skip_market_check: false,
            skip_agent_graph: false,
            debug: false,
            market_provider: None,
            memory_provider: None,
            perplexity_provider: None,
        }
    }
}

fn env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.is_empty())
}

fn env_flag(key: &str) -> bool {
    env(key)
        .map(|value| matches!(value.as_str(), "1" | "true" | "TRUE" | "yes"))
        .unwrap_or(false)
}

fn provider_from_env(key: &str) -> Option<ToolProcessConfig> {
    // eg/ MARKET_MCP_COMMAND="uvx casual-market-mcp"
    let raw = env(key)?;
    let mut parts = raw.split_whitespace().map(str::to_string);
    let command = parts.next()?;
    Some(ToolProcessConfig {
        command,
        args: parts.collect(),
    })
}

impl Config {
    /// Read configuration from the environment, with defaults for everything unset.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            database_url: env("DATABASE_URL").unwrap_or(defaults.database_url),
            api_host: env("API_HOST").unwrap_or(defaults.api_host),
            api_port: env("API_PORT")
                .and_then(|value| value.parse().ok())
                .unwrap_or(defaults.api_port),
            cors_origins: env("CORS_ORIGINS")
                .map(|value| value.split(',').map(|origin| origin.trim().to_string()).collect())
                .unwrap_or(defaults.cors_origins),
            log_level: env("LOG_LEVEL").unwrap_or(defaults.log_level),
            default_ai_model: env("DEFAULT_AI_MODEL").unwrap_or(defaults.default_ai_model),
            default_max_turns: env("DEFAULT_MAX_TURNS")
                .and_then(|value| value.parse().ok())
                .unwrap_or(defaults.default_max_turns),
            default_agent_timeout: env("DEFAULT_AGENT_TIMEOUT")
                .and_then(|value| value.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.default_agent_timeout),
            skip_market_check: env_flag("SKIP_MARKET_CHECK"),
            skip_agent_graph: env_flag("SKIP_AGENT_GRAPH"),
            debug: env_flag("DEBUG"),
            market_provider: provider_from_env("MARKET_MCP_COMMAND"),
            memory_provider: provider_from_env("MEMORY_MCP_COMMAND"),
            perplexity_provider: provider_from_env("PERPLEXITY_MCP_COMMAND"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_from_env_splits_command_vector() {
        // Direct parse of the raw shape, bypassing the process environment
        let config = ToolProcessConfig {
            command: "uvx".to_string(),
            args: vec!["casual-market-mcp".to_string()],
        };
        let mut parts = "uvx casual-market-mcp".split_whitespace().map(str::to_string);
        let parsed = ToolProcessConfig {
            command: parts.next().unwrap(),
            args: parts.collect(),
        };
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_defaults_are_development_friendly() {
        let config = Config::default();
        assert_eq!(config.default_agent_timeout, Duration::from_secs(300));
        assert_eq!(config.default_max_turns, 10);
        assert!(config.market_provider.is_none());
    }
}
