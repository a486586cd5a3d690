//! Record transformation: typed source records into index documents

use crate::error::{EtlError, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Converts a typed source record into the document shape the index stores.
///
/// Pure function, one implementation per entity type. Responsible for
/// denormalizing relation lists, deriving name-only convenience lists, and
/// serializing datetimes to ISO-8601 strings. Null or absent relation lists
/// become empty lists, not errors.
pub trait Transform: Send + Sync {
    type Record;
    type Document: IndexDocument;

    fn transform(&self, record: Self::Record) -> Result<Self::Document>;
}

/// A target document keyed by its stable identifier.
pub trait IndexDocument: Serialize {
    fn id(&self) -> &str;
}

/// An embedded `{id, name}` sub-document for related entities.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedRef {
    pub id: String,
    pub name: String,
}

/// Parse the source's `"<id>: <name>"` relation encoding into [`NamedRef`]s.
///
/// A `None` list means the row had no related entities and maps to an empty
/// vec. An entry without the `": "` separator is a malformed row, surfaced
/// rather than dropped.
pub fn parse_named_refs(entries: Option<Vec<String>>) -> Result<Vec<NamedRef>> {
    entries
        .unwrap_or_default()
        .into_iter()
        .map(|entry| match entry.split_once(": ") {
            Some((id, name)) => Ok(NamedRef {
                id: id.to_string(),
                name: name.to_string(),
            }),
            None => Err(EtlError::MalformedRelation(entry)),
        })
        .collect()
}

/// The name-only projection of a relation list.
pub fn names_of(refs: &[NamedRef]) -> Vec<String> {
    refs.iter().map(|r| r.name.clone()).collect()
}

/// Canonical ISO-8601 rendering for document datetime fields.
pub fn to_iso8601(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}
