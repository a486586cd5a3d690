//! Genre entity pipeline

use crate::elastic::mappings;
use crate::error::Result;
use crate::extract::{deserialize_row, Extract, SourceRecord};
use crate::queries;
use crate::task::SyncTask;
use crate::transform::{to_iso8601, IndexDocument, Transform};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Watermark key for genres.
pub const GENRE_STATE_KEY: &str = "genre";

/// Target index for genre documents.
pub const GENRES_INDEX: &str = "genres";

/// A genre row as the source query projects it.
#[derive(Debug, Clone, Deserialize)]
pub struct GenreRecord {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub created: DateTime<Utc>,
    pub modified: DateTime<Utc>,
}

impl SourceRecord for GenreRecord {
    fn modified(&self) -> DateTime<Utc> {
        self.modified
    }
}

/// The genre document; timestamps are carried as ISO-8601 strings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenreDocument {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub created: String,
    pub modified: String,
}

impl IndexDocument for GenreDocument {
    fn id(&self) -> &str {
        &self.id
    }
}

pub struct GenreExtractor;

impl Extract for GenreExtractor {
    type Record = GenreRecord;

    fn extract(&self, raw: Value) -> Result<GenreRecord> {
        deserialize_row("genre", raw)
    }
}

pub struct GenreTransformer;

impl Transform for GenreTransformer {
    type Record = GenreRecord;
    type Document = GenreDocument;

    fn transform(&self, record: GenreRecord) -> Result<GenreDocument> {
        Ok(GenreDocument {
            id: record.id.to_string(),
            name: record.name,
            description: record.description,
            created: to_iso8601(record.created),
            modified: to_iso8601(record.modified),
        })
    }
}

/// The genre sync task, ready for registration.
pub fn task() -> SyncTask<GenreExtractor, GenreTransformer> {
    SyncTask::new(
        GENRE_STATE_KEY,
        GENRES_INDEX,
        queries::LOAD_GENRES,
        mappings::genres_mapping(),
        GenreExtractor,
        GenreTransformer,
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serde_json::json;

    fn genre_row() -> Value {
        json!({
            "id": "1ff0d3aa-e4a9-4035-8c48-e48c5f7568e4",
            "name": "Action",
            "description": null,
            "created": "2021-06-16T20:14:09.310212Z",
            "modified": "2021-06-16T20:14:09.310212Z"
        })
    }

    #[test]
    fn test_extract_and_transform() {
        let record = GenreExtractor.extract(genre_row()).unwrap();
        let doc = GenreTransformer.transform(record).unwrap();

        assert_eq!(doc.id, "1ff0d3aa-e4a9-4035-8c48-e48c5f7568e4");
        assert_eq!(doc.name, "Action");
        assert_eq!(doc.description, None);
        assert_eq!(doc.modified, "2021-06-16T20:14:09.310212Z");
    }

    #[test]
    fn test_extract_rejects_row_missing_modified() {
        let mut row = genre_row();
        row.as_object_mut().unwrap().remove("modified");

        assert!(GenreExtractor.extract(row).is_err());
    }
}
