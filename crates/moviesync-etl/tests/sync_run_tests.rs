//! End-to-end orchestrator tests
//!
//! Drive full sync passes with an in-memory source and a recording index
//! sink, checking the contracts the rest of the platform relies on:
//! resumability, monotonic watermarks, frozen watermarks on partial failure,
//! idempotent re-sends and bounded backoff.

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use moviesync_common::RetryPolicy;
use moviesync_etl::elastic::{BulkFailure, BulkReport, IndexWriter};
use moviesync_etl::entities::genre::{self, GENRE_STATE_KEY};
use moviesync_etl::error::{EtlError, Result};
use moviesync_etl::orchestrator::SyncOrchestrator;
use moviesync_etl::source::SourceReader;
use moviesync_etl::state::{JsonFileStorage, State};
use moviesync_etl::task::DocumentEnvelope;
use serde_json::{json, Value};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration as StdDuration;
use tempfile::TempDir;

fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
}

fn genre_id(i: usize) -> String {
    format!("00000000-0000-4000-8000-{:012x}", i)
}

/// `count` genre rows with strictly increasing `modified` timestamps.
fn genre_rows(count: usize) -> Vec<Value> {
    (0..count)
        .map(|i| {
            let ts = base_time() + Duration::seconds(i as i64 + 1);
            json!({
                "id": genre_id(i),
                "name": format!("Genre {}", i),
                "description": null,
                "created": ts.to_rfc3339(),
                "modified": ts.to_rfc3339(),
            })
        })
        .collect()
}

fn modified_of(row: &Value) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(row["modified"].as_str().unwrap())
        .unwrap()
        .with_timezone(&Utc)
}

/// In-memory stand-in for the Postgres reader: same ordering, bounding and
/// limiting semantics as the real batch queries.
struct StaticSource {
    rows: Vec<Value>,
}

#[async_trait]
impl SourceReader for StaticSource {
    async fn fetch_changed_since(
        &self,
        _query: &str,
        since: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<Value>> {
        let mut out: Vec<Value> = self
            .rows
            .iter()
            .filter(|row| modified_of(row) > since)
            .cloned()
            .collect();
        out.sort_by_key(modified_of);
        out.truncate(limit as usize);
        Ok(out)
    }
}

/// A reader whose every call fails with a transient infrastructure error.
struct FailingSource {
    calls: AtomicU32,
}

#[async_trait]
impl SourceReader for FailingSource {
    async fn fetch_changed_since(
        &self,
        _query: &str,
        _since: DateTime<Utc>,
        _limit: i64,
    ) -> Result<Vec<Value>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(EtlError::Database(sqlx::Error::PoolTimedOut))
    }
}

/// Records upserts by id (last write wins) and can reject chosen ids the way
/// a real index reports per-item bulk failures.
#[derive(Default)]
struct RecordingWriter {
    documents: Mutex<BTreeMap<String, Value>>,
    write_order: Mutex<Vec<String>>,
    reject_ids: HashSet<String>,
    bulk_calls: AtomicU32,
}

impl RecordingWriter {
    fn rejecting(ids: impl IntoIterator<Item = String>) -> Self {
        Self {
            reject_ids: ids.into_iter().collect(),
            ..Self::default()
        }
    }

    fn document_count(&self) -> usize {
        self.documents.lock().unwrap().len()
    }
}

#[async_trait]
impl IndexWriter for RecordingWriter {
    async fn ensure_index(&self, _index: &str, _mapping: &Value) -> Result<()> {
        Ok(())
    }

    async fn bulk_upsert(
        &self,
        _index: &str,
        documents: &[DocumentEnvelope],
    ) -> Result<BulkReport> {
        self.bulk_calls.fetch_add(1, Ordering::SeqCst);
        let mut report = BulkReport::default();
        let mut store = self.documents.lock().unwrap();
        let mut order = self.write_order.lock().unwrap();

        for doc in documents {
            if self.reject_ids.contains(&doc.id) {
                report.failures.push(BulkFailure {
                    id: doc.id.clone(),
                    status: 400,
                    reason: "mapper_parsing_exception".to_string(),
                });
            } else {
                store.insert(doc.id.clone(), doc.body.clone());
                order.push(doc.id.clone());
                report.successful += 1;
            }
        }

        Ok(report)
    }
}

fn fast_policy() -> RetryPolicy {
    RetryPolicy {
        max_attempts: 4,
        initial_delay: StdDuration::from_millis(10),
        multiplier: 2.0,
        max_delay: StdDuration::from_millis(50),
    }
}

fn state_at(path: &Path) -> State {
    State::new(Box::new(JsonFileStorage::new(path)))
}

fn orchestrator_with(
    reader: Arc<dyn SourceReader>,
    writer: Arc<dyn IndexWriter>,
    state_path: &Path,
    batch_size: i64,
) -> SyncOrchestrator {
    let mut orchestrator = SyncOrchestrator::new(
        reader,
        writer,
        state_at(state_path),
        fast_policy(),
        batch_size,
    );
    orchestrator.register(Box::new(genre::task()));
    orchestrator
}

#[tokio::test]
async fn test_first_run_drains_everything_and_sets_watermark() {
    let dir = TempDir::new().unwrap();
    let state_path = dir.path().join("state.json");
    let rows = genre_rows(510);
    let last_modified = modified_of(rows.last().unwrap());

    let writer = Arc::new(RecordingWriter::default());
    let orchestrator = orchestrator_with(
        Arc::new(StaticSource { rows }),
        writer.clone(),
        &state_path,
        500,
    );

    orchestrator.bootstrap().await.unwrap();
    let stats = orchestrator.run().await.unwrap();

    // two batches: 500 + 10
    assert_eq!(writer.bulk_calls.load(Ordering::SeqCst), 2);
    assert_eq!(writer.document_count(), 510);
    assert_eq!(stats.total_documents(), 510);
    assert_eq!(stats.total_rejected(), 0);
    assert_eq!(stats.tasks[0].batches, 2);

    let watermark = state_at(&state_path).watermark(GENRE_STATE_KEY).unwrap();
    assert_eq!(watermark, Some(last_modified));
}

#[tokio::test]
async fn test_resumes_from_preset_watermark_in_order() {
    let dir = TempDir::new().unwrap();
    let state_path = dir.path().join("state.json");
    let rows = genre_rows(10);

    // preset the watermark to the 4th row: only rows 5..10 may be indexed
    let preset = modified_of(&rows[3]);
    state_at(&state_path)
        .set_watermark(GENRE_STATE_KEY, preset)
        .unwrap();

    let writer = Arc::new(RecordingWriter::default());
    let orchestrator = orchestrator_with(
        Arc::new(StaticSource { rows: rows.clone() }),
        writer.clone(),
        &state_path,
        3,
    );
    orchestrator.run().await.unwrap();

    let expected: Vec<String> = (4..10).map(genre_id).collect();
    assert_eq!(*writer.write_order.lock().unwrap(), expected);

    let watermark = state_at(&state_path).watermark(GENRE_STATE_KEY).unwrap();
    assert_eq!(watermark, Some(modified_of(rows.last().unwrap())));
}

#[tokio::test]
async fn test_watermark_is_monotonic_across_batches() {
    let dir = TempDir::new().unwrap();
    let state_path = dir.path().join("state.json");
    let rows = genre_rows(9);

    let writer = Arc::new(RecordingWriter::default());
    let orchestrator = orchestrator_with(
        Arc::new(StaticSource { rows: rows.clone() }),
        writer.clone(),
        &state_path,
        2,
    );
    orchestrator.run().await.unwrap();

    // after a full drain the watermark is the global maximum, regardless of
    // how many batches it took
    assert_eq!(writer.bulk_calls.load(Ordering::SeqCst), 5);
    let watermark = state_at(&state_path).watermark(GENRE_STATE_KEY).unwrap();
    assert_eq!(watermark, Some(modified_of(rows.last().unwrap())));
}

#[tokio::test]
async fn test_partial_failure_freezes_watermark() {
    let dir = TempDir::new().unwrap();
    let state_path = dir.path().join("state.json");
    let rows = genre_rows(5);

    let preset = modified_of(&rows[0]);
    state_at(&state_path)
        .set_watermark(GENRE_STATE_KEY, preset)
        .unwrap();

    let writer = Arc::new(RecordingWriter::rejecting([genre_id(3)]));
    let orchestrator = orchestrator_with(
        Arc::new(StaticSource { rows }),
        writer.clone(),
        &state_path,
        10,
    );
    let stats = orchestrator.run().await.unwrap();

    assert_eq!(stats.total_rejected(), 1);

    // the pass completed but the watermark must equal its value before it
    let watermark = state_at(&state_path).watermark(GENRE_STATE_KEY).unwrap();
    assert_eq!(watermark, Some(preset));
}

#[tokio::test]
async fn test_rejected_batch_is_resent_and_upsert_is_idempotent() {
    let dir = TempDir::new().unwrap();
    let state_path = dir.path().join("state.json");
    let rows = genre_rows(5);

    // first invocation: one document rejected, watermark frozen
    let rejecting = Arc::new(RecordingWriter::rejecting([genre_id(3)]));
    orchestrator_with(
        Arc::new(StaticSource { rows: rows.clone() }),
        rejecting.clone(),
        &state_path,
        10,
    )
    .run()
    .await
    .unwrap();
    assert_eq!(rejecting.document_count(), 4);

    // second invocation: index healthy again; the whole batch is re-sent and
    // the documents already written are upserted in place
    let healthy = Arc::new(RecordingWriter::default());
    orchestrator_with(
        Arc::new(StaticSource { rows: rows.clone() }),
        healthy.clone(),
        &state_path,
        10,
    )
    .run()
    .await
    .unwrap();

    assert_eq!(healthy.document_count(), 5);
    let watermark = state_at(&state_path).watermark(GENRE_STATE_KEY).unwrap();
    assert_eq!(watermark, Some(modified_of(rows.last().unwrap())));
}

#[tokio::test]
async fn test_caught_up_rerun_writes_nothing() {
    let dir = TempDir::new().unwrap();
    let state_path = dir.path().join("state.json");
    let rows = genre_rows(7);

    let writer = Arc::new(RecordingWriter::default());
    let source = Arc::new(StaticSource { rows });

    orchestrator_with(source.clone(), writer.clone(), &state_path, 10)
        .run()
        .await
        .unwrap();
    let calls_after_first = writer.bulk_calls.load(Ordering::SeqCst);

    let stats = orchestrator_with(source, writer.clone(), &state_path, 10)
        .run()
        .await
        .unwrap();

    assert_eq!(writer.bulk_calls.load(Ordering::SeqCst), calls_after_first);
    assert_eq!(stats.total_documents(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_backoff_gives_up_after_bounded_attempts() {
    let dir = TempDir::new().unwrap();
    let state_path = dir.path().join("state.json");

    let source = Arc::new(FailingSource {
        calls: AtomicU32::new(0),
    });
    let writer = Arc::new(RecordingWriter::default());
    let orchestrator = orchestrator_with(source.clone(), writer, &state_path, 10);

    let result = orchestrator.run().await;

    assert!(result.is_err());
    assert_eq!(
        source.calls.load(Ordering::SeqCst),
        fast_policy().max_attempts
    );
}

#[tokio::test]
async fn test_malformed_row_aborts_the_run() {
    let dir = TempDir::new().unwrap();
    let state_path = dir.path().join("state.json");

    let ts = base_time() + Duration::seconds(1);
    let rows = vec![json!({
        "id": genre_id(0),
        // no "name": the extractor must reject the row
        "created": ts.to_rfc3339(),
        "modified": ts.to_rfc3339(),
    })];

    let writer = Arc::new(RecordingWriter::default());
    let orchestrator = orchestrator_with(
        Arc::new(StaticSource { rows }),
        writer.clone(),
        &state_path,
        10,
    );

    let err = orchestrator.run().await.unwrap_err();

    assert!(matches!(err, EtlError::MalformedRow { .. }));
    assert_eq!(writer.document_count(), 0);
    assert_eq!(
        state_at(&state_path).watermark(GENRE_STATE_KEY).unwrap(),
        None
    );
}
