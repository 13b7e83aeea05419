use crate::error::StoreError;
use sqlx::SqliteConnection;

/// Embedded schema DDL. Statements are idempotent; cascade delete from `agents` is
/// enforced at schema level on every owned table.
const DDL: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS agents (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL,
        description TEXT NOT NULL DEFAULT '',
        ai_model TEXT NOT NULL,
        provider TEXT NOT NULL DEFAULT '',
        color_theme TEXT NOT NULL DEFAULT '34, 197, 94',
        initial_funds TEXT NOT NULL,
        current_funds TEXT NOT NULL,
        current_mode TEXT NOT NULL DEFAULT 'TRADING',
        status TEXT NOT NULL DEFAULT 'INACTIVE',
        investment_preferences TEXT NOT NULL DEFAULT '[]',
        max_position_size TEXT NOT NULL DEFAULT '50',
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        last_active_at TEXT
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS agent_sessions (
        id TEXT PRIMARY KEY,
        agent_id TEXT NOT NULL REFERENCES agents(id) ON DELETE CASCADE,
        mode TEXT NOT NULL,
        status TEXT NOT NULL DEFAULT 'PENDING',
        start_time TEXT NOT NULL,
        end_time TEXT,
        execution_time_ms INTEGER,
        initial_input TEXT,
        final_output TEXT,
        tools_called TEXT NOT NULL DEFAULT '[]',
        error_message TEXT,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS transactions (
        id TEXT PRIMARY KEY,
        agent_id TEXT NOT NULL REFERENCES agents(id) ON DELETE CASCADE,
        session_id TEXT REFERENCES agent_sessions(id) ON DELETE SET NULL,
        ticker TEXT NOT NULL,
        company_name TEXT NOT NULL DEFAULT '',
        action TEXT NOT NULL,
        quantity INTEGER NOT NULL,
        price TEXT NOT NULL,
        total_amount TEXT NOT NULL,
        commission TEXT NOT NULL,
        status TEXT NOT NULL DEFAULT 'PENDING',
        execution_time TEXT,
        decision_reason TEXT NOT NULL DEFAULT '',
        created_at TEXT NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_transactions_agent_created ON transactions (agent_id, created_at)",
    "CREATE INDEX IF NOT EXISTS idx_transactions_session ON transactions (session_id)",
    r#"
    CREATE TABLE IF NOT EXISTS agent_holdings (
        agent_id TEXT NOT NULL REFERENCES agents(id) ON DELETE CASCADE,
        ticker TEXT NOT NULL,
        company_name TEXT NOT NULL DEFAULT '',
        quantity INTEGER NOT NULL DEFAULT 0,
        average_cost TEXT NOT NULL DEFAULT '0',
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        PRIMARY KEY (agent_id, ticker)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS agent_performance (
        agent_id TEXT NOT NULL REFERENCES agents(id) ON DELETE CASCADE,
        date TEXT NOT NULL,
        total_value TEXT NOT NULL,
        cash_balance TEXT NOT NULL,
        unrealized_pnl TEXT NOT NULL DEFAULT '0',
        realized_pnl TEXT NOT NULL DEFAULT '0',
        total_return TEXT NOT NULL DEFAULT '0',
        daily_return TEXT,
        win_rate TEXT,
        max_drawdown TEXT,
        sharpe_ratio TEXT,
        sortino_ratio TEXT,
        calmar_ratio TEXT,
        total_trades INTEGER NOT NULL DEFAULT 0,
        sell_trades_count INTEGER NOT NULL DEFAULT 0,
        winning_trades_correct INTEGER NOT NULL DEFAULT 0,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        PRIMARY KEY (agent_id, date)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS ai_model_configs (
        model_key TEXT PRIMARY KEY,
        display_name TEXT NOT NULL,
        provider TEXT NOT NULL,
        litellm_prefix TEXT,
        full_model_name TEXT NOT NULL,
        api_key_env_var TEXT NOT NULL,
        is_enabled INTEGER NOT NULL DEFAULT 1,
        cost_per_1k_tokens TEXT,
        display_order INTEGER NOT NULL DEFAULT 0
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS strategy_changes (
        id TEXT PRIMARY KEY,
        agent_id TEXT NOT NULL REFERENCES agents(id) ON DELETE CASCADE,
        session_id TEXT REFERENCES agent_sessions(id) ON DELETE SET NULL,
        trigger_reason TEXT NOT NULL,
        change_summary TEXT NOT NULL,
        new_strategy TEXT NOT NULL,
        change_type TEXT NOT NULL DEFAULT 'AUTO',
        performance_snapshot TEXT,
        created_at TEXT NOT NULL
    )
    "#,
];

/// Default model catalog: `(model_key, display_name, provider, litellm_prefix,
/// full_model_name, api_key_env_var, cost_per_1k_tokens, display_order)`.
const SEED_MODELS: &[(&str, &str, &str, Option<&str>, &str, &str, &str, i64)] = &[
    (
        "gpt-4o-mini",
        "GPT-4o Mini",
        "OpenAI",
        None,
        "gpt-4o-mini",
        "OPENAI_API_KEY",
        "0.003",
        1,
    ),
    (
        "gpt-4.1-mini",
        "GPT-4.1 Mini",
        "OpenAI",
        None,
        "gpt-4.1-mini",
        "OPENAI_API_KEY",
        "0.008",
        2,
    ),
    (
        "gemini-2.0-flash",
        "Gemini 2.0 Flash",
        "Google",
        Some("gemini/"),
        "gemini-2.0-flash",
        "GEMINI_API_KEY",
        "0.001",
        3,
    ),
    (
        "gemini-2.5-pro",
        "Gemini 2.5 Pro",
        "Google",
        Some("gemini/"),
        "gemini-2.5-pro",
        "GEMINI_API_KEY",
        "0.005",
        4,
    ),
    (
        "claude-sonnet",
        "Claude Sonnet",
        "Anthropic",
        Some("anthropic/"),
        "claude-sonnet-4-20250514",
        "ANTHROPIC_API_KEY",
        "0.009",
        5,
    ),
];

/// Apply the schema DDL idempotently.
pub async fn apply(conn: &mut SqliteConnection) -> Result<(), StoreError> {
    for statement in DDL {
        sqlx::query(statement).execute(&mut *conn).await?;
    }
    Ok(())
}

/// Insert the default model catalog rows when the table is empty. Returns the number of
/// rows inserted.
pub async fn seed_model_catalog(conn: &mut SqliteConnection) -> Result<u64, StoreError> {
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM ai_model_configs")
        .fetch_one(&mut *conn)
        .await?;
    if count > 0 {
        return Ok(0);
    }

    let mut inserted = 0;
    for &(key, display, provider, prefix, full, env_var, cost, order) in SEED_MODELS {
        sqlx::query(
            "INSERT INTO ai_model_configs \
             (model_key, display_name, provider, litellm_prefix, full_model_name, \
              api_key_env_var, is_enabled, cost_per_1k_tokens, display_order) \
             VALUES (?, ?, ?, ?, ?, ?, 1, ?, ?)",
        )
        .bind(key)
        .bind(display)
        .bind(provider)
        .bind(prefix)
        .bind(full)
        .bind(env_var)
        .bind(cost)
        .bind(order)
        .execute(&mut *conn)
        .await?;
        inserted += 1;
    }

    Ok(inserted)
}
