use crate::{
    entity::model_config::ModelConfig,
    error::StoreError,
    repository::opt_decimal,
};
use sqlx::{Row, SqliteConnection, sqlite::SqliteRow};

fn from_row(row: &SqliteRow) -> Result<ModelConfig, StoreError> {
    Ok(ModelConfig {
        model_key: row.try_get("model_key")?,
        display_name: row.try_get("display_name")?,
        provider: row.try_get("provider")?,
        litellm_prefix: row.try_get("litellm_prefix")?,
        full_model_name: row.try_get("full_model_name")?,
        api_key_env_var: row.try_get("api_key_env_var")?,
        is_enabled: row.try_get::<i64, _>("is_enabled")? != 0,
        cost_per_1k_tokens: opt_decimal(row, "cost_per_1k_tokens")?,
        display_order: row.try_get("display_order")?,
    })
}

pub async fn fetch(
    conn: &mut SqliteConnection,
    model_key: &str,
) -> Result<Option<ModelConfig>, StoreError> {
    sqlx::query("SELECT * FROM ai_model_configs WHERE model_key = ?")
        .bind(model_key)
        .fetch_optional(conn)
        .await?
        .map(|row| from_row(&row))
        .transpose()
}

pub async fn list_enabled(conn: &mut SqliteConnection) -> Result<Vec<ModelConfig>, StoreError> {
    sqlx::query("SELECT * FROM ai_model_configs WHERE is_enabled = 1 ORDER BY display_order")
        .fetch_all(conn)
        .await?
        .iter()
        .map(from_row)
        .collect()
}
