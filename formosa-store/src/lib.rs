#![forbid(unsafe_code)]
#![warn(
    unused,
    clippy::cognitive_complexity,
    unused_crate_dependencies,
    unused_extern_crates,
    clippy::unused_self,
    clippy::useless_let_if_seq,
    missing_debug_implementations,
    rust_2018_idioms,
    rust_2024_compatibility
)]
#![allow(clippy::type_complexity, clippy::too_many_arguments, type_alias_bounds)]

//! # Formosa-Store
//! Typed async persistence layer over a relational database (SQLite via `sqlx`).
//!
//! Owns the schema for agents, sessions, transactions, holdings, daily performance, the
//! AI model catalog and strategy changes, plus the repository operations over them.
//! * **Atomic**: mutation scopes are explicit `sqlx` transactions; nesting a scope maps
//!   to a SQL savepoint, so the trading engine's four-step trade write commits or rolls
//!   back as one unit.
//! * **Exact**: money columns are `rust_decimal::Decimal` end-to-end (persisted as text,
//!   never binary floats); timestamps are timezone-aware UTC.
//! * **Owned**: cascade delete from an agent removes every row it owns at schema level.

use crate::error::StoreError;
use sqlx::{
    Sqlite, SqlitePool, Transaction,
    pool::PoolConnection,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
};
use std::str::FromStr;
use tracing::info;

/// All [`Error`](std::error::Error)s generated in Formosa-Store.
pub mod error;

/// Persistent entity types and their column contracts.
pub mod entity;

/// Repository operations per entity. Internal helpers never commit themselves; the scope
/// that opened the transaction commits.
pub mod repository;

/// Embedded schema DDL and model catalog seed.
pub mod schema;

/// Handle over the database pool.
///
/// Cheap to clone; all repository operations borrow a connection or transaction obtained
/// from this handle.
#[derive(Debug, Clone)]
pub struct Store {
    pool: SqlitePool,
}

impl Store {
    /// Connect to the database at `url` (eg/ `sqlite://formosa.db`), creating the file if
    /// missing, with foreign-key enforcement on.
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(8)
            .connect_with(options)
            .await?;

        Ok(Self { pool })
    }

    /// Connect to a private in-memory database. Used by tests and ephemeral runs.
    pub async fn connect_in_memory() -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);

        // A single immortal connection keeps the in-memory database alive and visible
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        Ok(Self { pool })
    }

    /// Apply the embedded schema idempotently and seed the model catalog if empty.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        let mut conn = self.acquire().await?;
        schema::apply(&mut conn).await?;
        let seeded = schema::seed_model_catalog(&mut conn).await?;
        if seeded > 0 {
            info!(models = seeded, "seeded AI model catalog");
        }
        Ok(())
    }

    /// Borrow one pooled connection.
    pub async fn acquire(&self) -> Result<PoolConnection<Sqlite>, StoreError> {
        Ok(self.pool.acquire().await?)
    }

    /// Open an atomic mutation scope. Dropping the scope without commit rolls back.
    pub async fn begin(&self) -> Result<Transaction<'_, Sqlite>, StoreError> {
        Ok(self.pool.begin().await?)
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}
