use thiserror::Error;

/// All persistence errors generated in `formosa-store`.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database: {0}")]
    Database(#[from] sqlx::Error),

    #[error("{entity} '{id}' not found")]
    NotFound { entity: &'static str, id: String },

    #[error("column '{column}' holds unparseable decimal '{value}'")]
    MalformedDecimal { column: &'static str, value: String },

    #[error("column '{column}' holds unparseable JSON: {error}")]
    MalformedJson {
        column: &'static str,
        error: serde_json::Error,
    },

    #[error("column '{column}' holds unknown enum value '{value}'")]
    UnknownVariant { column: &'static str, value: String },
}

impl StoreError {
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            id: id.into(),
        }
    }

    /// Unique constraint violations surface from concurrent upserts and duplicate creates.
    pub fn is_unique_violation(&self) -> bool {
        match self {
            Self::Database(sqlx::Error::Database(db)) => db.is_unique_violation(),
            _ => false,
        }
    }
}
