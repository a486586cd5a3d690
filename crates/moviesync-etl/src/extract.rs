//! Row extraction: raw row JSON into typed source records

use crate::error::{EtlError, Result};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Validates and shapes one raw source row into a typed record.
///
/// Pure per-row function, one implementation per entity type. A row missing
/// required fields is rejected with [`EtlError::MalformedRow`]; absent
/// optional fields become `None`/empty, never a crash.
pub trait Extract: Send + Sync {
    type Record: SourceRecord;

    fn extract(&self, raw: Value) -> Result<Self::Record>;
}

/// A typed source record that can position a batch on the modified-time axis.
pub trait SourceRecord {
    fn modified(&self) -> DateTime<Utc>;
}

/// Deserialize a raw row into `T`, attaching entity and row-id context to
/// validation failures. Serde does the field-level checking: required fields
/// reject the row, `#[serde(default)]` fields tolerate null/absence.
pub fn deserialize_row<T: DeserializeOwned>(entity: &'static str, raw: Value) -> Result<T> {
    let row_id = raw
        .get("id")
        .and_then(Value::as_str)
        .map(str::to_owned)
        .unwrap_or_else(|| "<unknown>".to_string());

    serde_json::from_value(raw)
        .map_err(|err| EtlError::malformed_row(entity, format!("{} (row id {})", err, row_id)))
}
