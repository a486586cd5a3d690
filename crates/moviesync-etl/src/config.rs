//! Configuration management

use moviesync_common::RetryPolicy;
use serde::{Deserialize, Serialize};
use std::time::Duration;

// ============================================================================
// Configuration Constants
// ============================================================================

/// Default database URL for local development.
pub const DEFAULT_DATABASE_URL: &str = "postgresql://localhost/movies";

/// Default maximum database connections in the pool.
pub const DEFAULT_DATABASE_MAX_CONNECTIONS: u32 = 5;

/// Default database connection timeout in seconds.
pub const DEFAULT_DATABASE_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Default search index URL.
pub const DEFAULT_ELASTIC_URL: &str = "http://localhost:9200";

/// Default timeout for index requests in seconds.
pub const DEFAULT_ELASTIC_TIMEOUT_SECS: u64 = 60;

/// Default number of rows fetched and written per batch.
pub const DEFAULT_BATCH_SIZE: i64 = 500;

/// Default path of the watermark state file.
pub const DEFAULT_STATE_PATH: &str = "./sync_state.json";

/// Synchronizer configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub database: DatabaseConfig,
    pub elastic: ElasticConfig,
    pub sync: SyncConfig,
}

/// Source database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub connect_timeout_secs: u64,
}

/// Target index configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElasticConfig {
    pub url: String,
    pub timeout_secs: u64,
}

/// Batch and retry configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    pub batch_size: i64,
    pub state_path: String,
    pub max_retries: u32,
    pub retry_initial_ms: u64,
    pub retry_multiplier: f64,
    pub retry_max_secs: u64,
}

impl Config {
    /// Load configuration from environment and defaults
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let config = Config {
            database: DatabaseConfig {
                url: std::env::var("DATABASE_URL")
                    .unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string()),
                max_connections: std::env::var("DATABASE_MAX_CONNECTIONS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(DEFAULT_DATABASE_MAX_CONNECTIONS),
                connect_timeout_secs: std::env::var("DATABASE_CONNECT_TIMEOUT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(DEFAULT_DATABASE_CONNECT_TIMEOUT_SECS),
            },
            elastic: ElasticConfig {
                url: std::env::var("ELASTIC_URL")
                    .unwrap_or_else(|_| DEFAULT_ELASTIC_URL.to_string()),
                timeout_secs: std::env::var("ELASTIC_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(DEFAULT_ELASTIC_TIMEOUT_SECS),
            },
            sync: SyncConfig {
                batch_size: std::env::var("SYNC_BATCH_SIZE")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(DEFAULT_BATCH_SIZE),
                state_path: std::env::var("SYNC_STATE_PATH")
                    .unwrap_or_else(|_| DEFAULT_STATE_PATH.to_string()),
                max_retries: std::env::var("SYNC_MAX_RETRIES")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(moviesync_common::retry::DEFAULT_MAX_ATTEMPTS),
                retry_initial_ms: std::env::var("SYNC_RETRY_INITIAL_MS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(moviesync_common::retry::DEFAULT_INITIAL_DELAY_MS),
                retry_multiplier: std::env::var("SYNC_RETRY_MULTIPLIER")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(moviesync_common::retry::DEFAULT_MULTIPLIER),
                retry_max_secs: std::env::var("SYNC_RETRY_MAX_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(moviesync_common::retry::DEFAULT_MAX_DELAY_SECS),
            },
        };

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.database.url.is_empty() {
            anyhow::bail!("Database URL cannot be empty");
        }

        if self.database.max_connections == 0 {
            anyhow::bail!("Database max_connections must be greater than 0");
        }

        if self.elastic.url.is_empty() {
            anyhow::bail!("Search index URL cannot be empty");
        }

        if self.sync.batch_size <= 0 {
            anyhow::bail!(
                "SYNC_BATCH_SIZE must be greater than 0, got {}",
                self.sync.batch_size
            );
        }

        if self.sync.max_retries == 0 {
            anyhow::bail!("SYNC_MAX_RETRIES must be at least 1");
        }

        if self.sync.retry_multiplier < 1.0 {
            anyhow::bail!(
                "SYNC_RETRY_MULTIPLIER must be at least 1.0, got {}",
                self.sync.retry_multiplier
            );
        }

        Ok(())
    }

    /// The retry policy described by the sync section
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.sync.max_retries,
            initial_delay: Duration::from_millis(self.sync.retry_initial_ms),
            multiplier: self.sync.retry_multiplier,
            max_delay: Duration::from_secs(self.sync.retry_max_secs),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: DEFAULT_DATABASE_URL.to_string(),
                max_connections: DEFAULT_DATABASE_MAX_CONNECTIONS,
                connect_timeout_secs: DEFAULT_DATABASE_CONNECT_TIMEOUT_SECS,
            },
            elastic: ElasticConfig {
                url: DEFAULT_ELASTIC_URL.to_string(),
                timeout_secs: DEFAULT_ELASTIC_TIMEOUT_SECS,
            },
            sync: SyncConfig {
                batch_size: DEFAULT_BATCH_SIZE,
                state_path: DEFAULT_STATE_PATH.to_string(),
                max_retries: moviesync_common::retry::DEFAULT_MAX_ATTEMPTS,
                retry_initial_ms: moviesync_common::retry::DEFAULT_INITIAL_DELAY_MS,
                retry_multiplier: moviesync_common::retry::DEFAULT_MULTIPLIER,
                retry_max_secs: moviesync_common::retry::DEFAULT_MAX_DELAY_SECS,
            },
        }
    }
}
