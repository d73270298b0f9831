//! Relational storage for API keys and coverage measurements.
//!
//! The store is constructed once at process start ([`from_config`]) and handed to
//! every component as an `Arc<dyn CoverageStore>`. Each operation borrows a pooled
//! connection for its own duration only.

pub mod error;
pub mod models;
pub mod postgres;
pub mod repos;
pub mod sqlite;

pub use error::{StoreError, StoreResult};
pub use postgres::PostgresStore;
pub use repos::{ApiKeyRepo, MeasurementRepo};
pub use sqlite::SqliteStore;

use crate::config::DatabaseConfig;
use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;

/// Combined store used by the services.
#[async_trait]
pub trait CoverageStore: ApiKeyRepo + MeasurementRepo + Send + Sync {
    /// Create tables and indexes if they do not exist.
    async fn migrate(&self) -> StoreResult<()>;

    /// Check database connectivity.
    async fn health_check(&self) -> StoreResult<()>;

    /// Close the pool, waiting for checked out connections to be returned.
    async fn close(&self);
}

/// Create a store from configuration.
pub async fn from_config(config: &DatabaseConfig) -> StoreResult<Arc<dyn CoverageStore>> {
    config
        .validate()
        .map_err(|e| StoreError::Config(e.to_string()))?;

    match config {
        DatabaseConfig::Sqlite { path } => {
            tracing::info!(path = %path.display(), "Opening SQLite store");
            let store = SqliteStore::new(path).await?;
            Ok(Arc::new(store) as Arc<dyn CoverageStore>)
        }
        DatabaseConfig::Postgres {
            url,
            max_connections,
        } => {
            tracing::info!(max_connections, "Connecting to PostgreSQL using connection URL");
            let store = PostgresStore::from_url(url, *max_connections).await?;
            Ok(Arc::new(store) as Arc<dyn CoverageStore>)
        }
    }
}

/// Run `apply`, running it once more if it fails with [`StoreError::Conflict`].
async fn retry_on_conflict<F, Fut>(mut apply: F) -> StoreResult<()>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = StoreResult<()>>,
{
    match apply().await {
        Err(StoreError::Conflict(reason)) => {
            tracing::info!(%reason, "Schema created concurrently, applying again");
            apply().await
        }
        other => other,
    }
}

/// Split an embedded schema into individual statements, skipping comment-only chunks.
fn schema_statements(schema: &str) -> Vec<&str> {
    schema
        .split(';')
        .filter_map(|statement| {
            let trimmed = statement.trim();
            let has_sql = trimmed.lines().any(|line| {
                let line = line.trim();
                !line.is_empty() && !line.starts_with("--")
            });
            has_sql.then_some(trimmed)
        })
        .collect()
}
