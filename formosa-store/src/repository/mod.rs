use crate::error::StoreError;
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use sqlx::{Row, sqlite::SqliteRow};

pub mod agents;
pub mod holdings;
pub mod models;
pub mod performance;
pub mod sessions;
pub mod strategy_changes;
pub mod transactions;

/// Decode a NOT NULL decimal column persisted as text.
pub(crate) fn decimal(row: &SqliteRow, column: &'static str) -> Result<Decimal, StoreError> {
    let value: String = row.try_get(column)?;
    value
        .parse()
        .map_err(|_| StoreError::MalformedDecimal { column, value })
}

/// Decode a nullable decimal column persisted as text.
pub(crate) fn opt_decimal(
    row: &SqliteRow,
    column: &'static str,
) -> Result<Option<Decimal>, StoreError> {
    let value: Option<String> = row.try_get(column)?;
    value
        .map(|value| {
            value
                .parse()
                .map_err(|_| StoreError::MalformedDecimal { column, value })
        })
        .transpose()
}

/// Decode a NOT NULL JSON column.
pub(crate) fn json<T: DeserializeOwned>(
    row: &SqliteRow,
    column: &'static str,
) -> Result<T, StoreError> {
    let value: String = row.try_get(column)?;
    serde_json::from_str(&value).map_err(|error| StoreError::MalformedJson { column, error })
}

/// Decode a nullable JSON column.
pub(crate) fn opt_json(
    row: &SqliteRow,
    column: &'static str,
) -> Result<Option<serde_json::Value>, StoreError> {
    let value: Option<String> = row.try_get(column)?;
    value
        .map(|value| {
            serde_json::from_str(&value).map_err(|error| StoreError::MalformedJson { column, error })
        })
        .transpose()
}

/// Serialise a JSON value for persistence. `serde_json` leaves non-ASCII text unescaped,
/// which keeps the round-trip byte-identical for CJK payloads.
pub(crate) fn to_json_text(value: &impl serde::Serialize) -> Result<String, StoreError> {
    serde_json::to_string(value).map_err(|error| StoreError::MalformedJson {
        column: "<serialise>",
        error,
    })
}
