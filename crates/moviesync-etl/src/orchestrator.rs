//! Sync orchestration
//!
//! Drives the extract → transform → load loop for every registered entity
//! task, one task at a time, one batch at a time. The watermark for a task
//! advances only after the index confirmed a batch with zero failures, and
//! never moves backward. Transient infrastructure errors are retried under
//! the configured policy; exhausting it aborts the whole run.

use crate::elastic::IndexWriter;
use crate::error::{EtlError, Result};
use crate::source::SourceReader;
use crate::state::State;
use crate::task::EntityTask;
use chrono::{DateTime, Utc};
use moviesync_common::RetryPolicy;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Counters for one entity task's pass.
#[derive(Debug, Clone, Default)]
pub struct TaskStats {
    pub entity: String,
    pub batches: u64,
    pub documents: u64,
    pub rejected: u64,
}

/// Counters for a full run across all tasks.
#[derive(Debug, Clone, Default)]
pub struct RunStats {
    pub tasks: Vec<TaskStats>,
}

impl RunStats {
    pub fn total_documents(&self) -> u64 {
        self.tasks.iter().map(|t| t.documents).sum()
    }

    pub fn total_rejected(&self) -> u64 {
        self.tasks.iter().map(|t| t.rejected).sum()
    }
}

/// Orchestrates one synchronization pass over the registered entity tasks.
pub struct SyncOrchestrator {
    reader: Arc<dyn SourceReader>,
    writer: Arc<dyn IndexWriter>,
    state: State,
    retry: RetryPolicy,
    batch_size: i64,
    tasks: Vec<Box<dyn EntityTask>>,
}

impl SyncOrchestrator {
    pub fn new(
        reader: Arc<dyn SourceReader>,
        writer: Arc<dyn IndexWriter>,
        state: State,
        retry: RetryPolicy,
        batch_size: i64,
    ) -> Self {
        Self {
            reader,
            writer,
            state,
            retry,
            batch_size,
            tasks: Vec::new(),
        }
    }

    /// Register an entity task. Tasks run in registration order.
    pub fn register(&mut self, task: Box<dyn EntityTask>) {
        self.tasks.push(task);
    }

    /// Ensure every registered task's target index exists.
    pub async fn bootstrap(&self) -> Result<()> {
        for task in &self.tasks {
            self.retry
                .run("ensure index", EtlError::is_transient, || {
                    self.writer.ensure_index(task.index_name(), task.mapping())
                })
                .await?;
        }
        Ok(())
    }

    /// Run one full pass: drain every entity task to exhaustion.
    pub async fn run(&self) -> Result<RunStats> {
        let mut stats = RunStats::default();

        for task in &self.tasks {
            stats.tasks.push(self.drain_task(task.as_ref()).await?);
        }

        info!(
            documents = stats.total_documents(),
            rejected = stats.total_rejected(),
            "synchronization pass complete"
        );

        Ok(stats)
    }

    /// Drain one entity: read batches from the watermark forward until the
    /// source is exhausted, committing the watermark after each clean write.
    async fn drain_task(&self, task: &dyn EntityTask) -> Result<TaskStats> {
        let entity = task.state_key();
        let mut stats = TaskStats {
            entity: entity.to_string(),
            ..TaskStats::default()
        };

        let mut watermark = self
            .state
            .watermark(entity)?
            .unwrap_or(DateTime::<Utc>::UNIX_EPOCH);

        info!(entity, %watermark, "starting sync pass");

        loop {
            let rows = self
                .retry
                .run("fetch batch", EtlError::is_transient, || {
                    self.reader
                        .fetch_changed_since(task.query(), watermark, self.batch_size)
                })
                .await?;

            if rows.is_empty() {
                break;
            }

            let row_count = rows.len();
            let mut documents = Vec::with_capacity(row_count);
            let mut batch_high = watermark;
            for raw in rows {
                // A row that fails extraction or transformation is a data
                // bug; retrying cannot fix it, so the run aborts here.
                let envelope = task.build_document(raw)?;
                if envelope.modified > batch_high {
                    batch_high = envelope.modified;
                }
                documents.push(envelope);
            }

            let report = self
                .retry
                .run("bulk upsert", EtlError::is_transient, || {
                    self.writer.bulk_upsert(task.index_name(), &documents)
                })
                .await?;

            stats.batches += 1;
            stats.documents += report.successful as u64;

            if report.has_failures() {
                stats.rejected += report.failures.len() as u64;
                for failure in &report.failures {
                    error!(
                        entity,
                        id = %failure.id,
                        status = failure.status,
                        reason = %failure.reason,
                        "document rejected by index"
                    );
                }
                warn!(
                    entity,
                    rejected = report.failures.len(),
                    "batch had rejections; watermark frozen, batch retries next invocation"
                );
                break;
            }

            if batch_high > watermark {
                watermark = batch_high;
                self.state.set_watermark(entity, watermark)?;
            }

            debug!(
                entity,
                batch = stats.batches,
                documents = row_count,
                %watermark,
                "batch committed"
            );
        }

        info!(
            entity,
            batches = stats.batches,
            documents = stats.documents,
            "entity caught up"
        );

        Ok(stats)
    }
}
