//! Per-entity pipelines: source record, index document, extractor and
//! transformer for each synchronized entity type, plus the task constructor
//! that binds them to their query, index and watermark key.

pub mod film;
pub mod genre;
pub mod person;
