//! Entity type tasks: the unit of registration with the orchestrator

use crate::error::Result;
use crate::extract::{Extract, SourceRecord};
use crate::transform::{IndexDocument, Transform};
use chrono::{DateTime, Utc};
use serde_json::Value;

/// One transformed document plus the metadata the orchestrator needs: the
/// upsert key and the source `modified` timestamp that drives the watermark.
#[derive(Debug, Clone)]
pub struct DocumentEnvelope {
    pub id: String,
    pub modified: DateTime<Utc>,
    pub body: Value,
}

/// Object-safe view of a registered entity type.
///
/// The orchestrator only ever sees this: where to read (query), where to
/// write (index name + mapping), where to keep progress (state key), and how
/// to turn one raw row into one document.
pub trait EntityTask: Send + Sync {
    fn state_key(&self) -> &str;
    fn index_name(&self) -> &str;
    fn query(&self) -> &str;
    fn mapping(&self) -> &Value;
    fn build_document(&self, raw: Value) -> Result<DocumentEnvelope>;
}

/// Immutable binding of an extractor and transformer to an entity type's
/// state key, index, query and mapping.
pub struct SyncTask<E, T> {
    state_key: &'static str,
    index_name: &'static str,
    query: &'static str,
    mapping: Value,
    extractor: E,
    transformer: T,
}

impl<E, T> SyncTask<E, T> {
    pub fn new(
        state_key: &'static str,
        index_name: &'static str,
        query: &'static str,
        mapping: Value,
        extractor: E,
        transformer: T,
    ) -> Self {
        Self {
            state_key,
            index_name,
            query,
            mapping,
            extractor,
            transformer,
        }
    }
}

impl<E, T> EntityTask for SyncTask<E, T>
where
    E: Extract,
    T: Transform<Record = E::Record>,
{
    fn state_key(&self) -> &str {
        self.state_key
    }

    fn index_name(&self) -> &str {
        self.index_name
    }

    fn query(&self) -> &str {
        self.query
    }

    fn mapping(&self) -> &Value {
        &self.mapping
    }

    fn build_document(&self, raw: Value) -> Result<DocumentEnvelope> {
        let record = self.extractor.extract(raw)?;
        let modified = record.modified();
        let document = self.transformer.transform(record)?;

        Ok(DocumentEnvelope {
            id: document.id().to_string(),
            modified,
            body: serde_json::to_value(&document)?,
        })
    }
}
