//! Error types for the synchronizer
//!
//! The taxonomy matters more than the messages: `is_transient()` is what the
//! orchestrator consults to decide between retrying with backoff and aborting
//! the run. Connectivity failures against either store are transient; rows
//! that fail validation and responses that fail to parse are not.

use thiserror::Error;

/// Result type alias for synchronizer operations
pub type Result<T> = std::result::Result<T, EtlError>;

/// Error type for all synchronizer operations
#[derive(Error, Debug)]
pub enum EtlError {
    /// Source database query or connection failed
    #[error("Database error: {0}. Check DATABASE_URL and that PostgreSQL is reachable.")]
    Database(#[from] sqlx::Error),

    /// Target index HTTP request failed
    #[error("Search index error: {0}. Check ELASTIC_URL and that the index host is reachable.")]
    Http(#[from] reqwest::Error),

    /// State file could not be read or written
    #[error("State file error: {0}. Check SYNC_STATE_PATH permissions and disk space.")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization failed
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration is missing or invalid
    #[error("Configuration error: {0}")]
    Config(String),

    /// A source row is missing required fields or carries the wrong shape
    #[error("Malformed {entity} row: {reason}")]
    MalformedRow { entity: &'static str, reason: String },

    /// A relation list entry does not follow the "id: name" encoding
    #[error("Malformed relation entry '{0}': expected \"id: name\"")]
    MalformedRelation(String),

    /// The index answered with an unexpected payload or status
    #[error("Unexpected index response: {0}")]
    IndexResponse(String),
}

impl EtlError {
    /// Create a malformed-row error with entity context
    pub fn malformed_row(entity: &'static str, reason: impl Into<String>) -> Self {
        Self::MalformedRow {
            entity,
            reason: reason.into(),
        }
    }

    /// Whether the orchestrator should retry this error with backoff.
    ///
    /// Transient: connectivity, pool and timeout failures against Postgres;
    /// connect/timeout and 5xx failures against the index host. Everything
    /// else (bad rows, bad config, 4xx responses) will not heal by waiting.
    pub fn is_transient(&self) -> bool {
        match self {
            EtlError::Database(err) => matches!(
                err,
                sqlx::Error::Io(_)
                    | sqlx::Error::PoolTimedOut
                    | sqlx::Error::PoolClosed
                    | sqlx::Error::Tls(_)
                    | sqlx::Error::Protocol(_)
            ),
            EtlError::Http(err) => {
                err.is_connect()
                    || err.is_timeout()
                    || err.is_request()
                    || err.status().is_some_and(|s| s.is_server_error())
            },
            _ => false,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_timeout_is_transient() {
        assert!(EtlError::Database(sqlx::Error::PoolTimedOut).is_transient());
    }

    #[test]
    fn test_malformed_row_is_fatal() {
        let err = EtlError::malformed_row("film_work", "missing field `title`");
        assert!(!err.is_transient());
        assert!(err.to_string().contains("film_work"));
    }

    #[test]
    fn test_config_error_is_fatal() {
        assert!(!EtlError::Config("SYNC_BATCH_SIZE must be positive".into()).is_transient());
    }

    #[test]
    fn test_row_not_found_is_fatal() {
        assert!(!EtlError::Database(sqlx::Error::RowNotFound).is_transient());
    }
}
