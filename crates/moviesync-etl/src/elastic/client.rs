//! HTTP client for the search index
//!
//! Talks plain Elasticsearch REST: HEAD for existence, PUT for index
//! creation, `POST /_bulk` with NDJSON for writes. Bulk writes are upserts
//! keyed on `_id`, so re-sending a batch is safe. Partial failures are
//! reported per document, never raised; the orchestrator decides what a
//! failed item means for the watermark.

use crate::config::ElasticConfig;
use crate::error::{EtlError, Result};
use crate::task::DocumentEnvelope;
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, info};

/// Write access to the target document index.
#[async_trait]
pub trait IndexWriter: Send + Sync {
    /// Create the index with the given settings/mappings when it does not
    /// exist yet. Idempotent; safe to call on every run.
    async fn ensure_index(&self, index: &str, mapping: &Value) -> Result<()>;

    /// Upsert documents by id. Transport and whole-request failures are
    /// errors; per-document rejections come back in the report.
    async fn bulk_upsert(&self, index: &str, documents: &[DocumentEnvelope])
        -> Result<BulkReport>;
}

/// Outcome of one bulk call.
#[derive(Debug, Clone, Default)]
pub struct BulkReport {
    pub successful: usize,
    pub failures: Vec<BulkFailure>,
}

impl BulkReport {
    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }
}

/// One document the index refused.
#[derive(Debug, Clone)]
pub struct BulkFailure {
    pub id: String,
    pub status: u16,
    pub reason: String,
}

/// Elasticsearch-compatible HTTP client.
pub struct ElasticClient {
    client: Client,
    base_url: String,
}

impl ElasticClient {
    pub fn new(config: &ElasticConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent("moviesync/0.1")
            .build()?;

        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
        })
    }

    async fn index_exists(&self, index: &str) -> Result<bool> {
        let response = self
            .client
            .head(format!("{}/{}", self.base_url, index))
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(false);
        }
        response.error_for_status()?;
        Ok(true)
    }

    async fn create_index(&self, index: &str, mapping: &Value) -> Result<()> {
        self.client
            .put(format!("{}/{}", self.base_url, index))
            .json(mapping)
            .send()
            .await?
            .error_for_status()?;

        Ok(())
    }
}

#[async_trait]
impl IndexWriter for ElasticClient {
    async fn ensure_index(&self, index: &str, mapping: &Value) -> Result<()> {
        if self.index_exists(index).await? {
            debug!(index, "index already exists");
            return Ok(());
        }

        self.create_index(index, mapping).await?;
        info!(index, "created index");
        Ok(())
    }

    async fn bulk_upsert(
        &self,
        index: &str,
        documents: &[DocumentEnvelope],
    ) -> Result<BulkReport> {
        let mut body = String::new();
        for doc in documents {
            body.push_str(&serde_json::to_string(
                &json!({"index": {"_index": index, "_id": doc.id}}),
            )?);
            body.push('\n');
            body.push_str(&serde_json::to_string(&doc.body)?);
            body.push('\n');
        }

        let response = self
            .client
            .post(format!("{}/_bulk", self.base_url))
            .header(CONTENT_TYPE, "application/x-ndjson")
            .body(body)
            .send()
            .await?
            .error_for_status()?;

        let parsed: BulkResponse = response.json().await?;

        let mut report = BulkReport::default();
        for item in parsed.items {
            let Some(status) = item.index else {
                continue;
            };
            if status.is_error() {
                report.failures.push(BulkFailure {
                    id: status.id,
                    status: status.status,
                    reason: status
                        .error
                        .map(|e| e.describe())
                        .unwrap_or_else(|| "unknown".to_string()),
                });
            } else {
                report.successful += 1;
            }
        }

        // The top-level flag and the per-item statuses must agree; if they
        // don't we misparsed the response and cannot trust the report.
        if parsed.errors && !report.has_failures() {
            return Err(EtlError::IndexResponse(
                "bulk response flagged errors but no failed items were found".to_string(),
            ));
        }

        Ok(report)
    }
}

#[derive(Debug, Deserialize)]
struct BulkResponse {
    errors: bool,
    #[serde(default)]
    items: Vec<BulkResponseItem>,
}

#[derive(Debug, Deserialize)]
struct BulkResponseItem {
    #[serde(default)]
    index: Option<BulkItemStatus>,
}

#[derive(Debug, Deserialize)]
struct BulkItemStatus {
    #[serde(rename = "_id")]
    id: String,
    status: u16,
    #[serde(default)]
    error: Option<BulkItemError>,
}

impl BulkItemStatus {
    fn is_error(&self) -> bool {
        self.status >= 300 || self.error.is_some()
    }
}

#[derive(Debug, Deserialize)]
struct BulkItemError {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    reason: Option<String>,
}

impl BulkItemError {
    fn describe(self) -> String {
        match self.reason {
            Some(reason) => format!("{}: {}", self.kind, reason),
            None => self.kind,
        }
    }
}
