//! Moviesync ETL
//!
//! One-way batch synchronizer from the PostgreSQL movie catalog into
//! Elasticsearch indices.
//!
//! # Architecture
//!
//! - **config**: environment-driven configuration with validation
//! - **state**: watermark persistence (one JSON file, atomic per write)
//! - **source**: `SourceReader` trait + PostgreSQL reader over `sqlx`
//! - **queries**: per-entity batch SQL against the `content.*` schema
//! - **extract** / **transform**: pure per-row pipeline stages
//! - **entities**: film, genre and person records, documents and stages
//! - **elastic**: `IndexWriter` trait + Elasticsearch HTTP client + mappings
//! - **task**: the entity-type binding the orchestrator registers
//! - **orchestrator**: the batch loop, watermark advancement and retries
//!
//! One invocation performs one pass: every registered entity is drained to
//! exhaustion, then the process exits. Re-invocation resumes from the
//! persisted watermarks.

pub mod config;
pub mod elastic;
pub mod entities;
pub mod error;
pub mod extract;
pub mod orchestrator;
pub mod queries;
pub mod source;
pub mod state;
pub mod task;
pub mod transform;

pub use error::{EtlError, Result};
