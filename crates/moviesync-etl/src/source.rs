//! Source reader over the relational movie catalog

use crate::config::DatabaseConfig;
use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;

/// Read access to rows modified after a given watermark.
///
/// Implementations are read-only and must surface connectivity errors to the
/// caller instead of swallowing them; retry decisions belong to the
/// orchestrator.
#[async_trait]
pub trait SourceReader: Send + Sync {
    /// Fetch up to `limit` rows with `modified > since`, ordered by ascending
    /// `modified`, projected to one JSON value per row. An empty batch means
    /// the entity is caught up for this pass.
    async fn fetch_changed_since(
        &self,
        query: &str,
        since: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<serde_json::Value>>;
}

/// PostgreSQL-backed reader.
pub struct PostgresReader {
    pool: PgPool,
}

impl PostgresReader {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Build a lazily-connecting pool from configuration. The first fetch
    /// establishes the connection, so startup outages fall under the
    /// orchestrator's retry policy rather than failing the process early.
    pub fn connect(config: &DatabaseConfig) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.connect_timeout_secs))
            .connect_lazy(&config.url)?;

        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl SourceReader for PostgresReader {
    async fn fetch_changed_since(
        &self,
        query: &str,
        since: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<serde_json::Value>> {
        let rows: Vec<serde_json::Value> = sqlx::query_scalar(query)
            .bind(since)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows)
    }
}
