//! Person entity pipeline
//!
//! Person rows arrive with their film credits already aggregated by the
//! source query: one entry per film with the person's roles in it. The
//! document carries them through typed, not as opaque JSON.

use crate::elastic::mappings;
use crate::error::Result;
use crate::extract::{deserialize_row, Extract, SourceRecord};
use crate::queries;
use crate::task::SyncTask;
use crate::transform::{IndexDocument, Transform};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Watermark key for persons.
pub const PERSON_STATE_KEY: &str = "person";

/// Target index for person documents.
pub const PERSONS_INDEX: &str = "persons";

/// One film a person took part in, with their roles in it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilmCredit {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub imdb_rating: Option<f64>,
    pub roles: Vec<String>,
}

/// A person row as the source query projects it.
#[derive(Debug, Clone, Deserialize)]
pub struct PersonRecord {
    pub id: Uuid,
    pub full_name: String,
    pub modified: DateTime<Utc>,
    #[serde(default)]
    pub films: Option<Vec<FilmCredit>>,
}

impl SourceRecord for PersonRecord {
    fn modified(&self) -> DateTime<Utc> {
        self.modified
    }
}

/// The person document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersonDocument {
    pub id: String,
    pub full_name: String,
    pub films: Vec<FilmCredit>,
}

impl IndexDocument for PersonDocument {
    fn id(&self) -> &str {
        &self.id
    }
}

pub struct PersonExtractor;

impl Extract for PersonExtractor {
    type Record = PersonRecord;

    fn extract(&self, raw: Value) -> Result<PersonRecord> {
        deserialize_row("person", raw)
    }
}

pub struct PersonTransformer;

impl Transform for PersonTransformer {
    type Record = PersonRecord;
    type Document = PersonDocument;

    fn transform(&self, record: PersonRecord) -> Result<PersonDocument> {
        Ok(PersonDocument {
            id: record.id.to_string(),
            full_name: record.full_name,
            films: record.films.unwrap_or_default(),
        })
    }
}

/// The person sync task, ready for registration.
pub fn task() -> SyncTask<PersonExtractor, PersonTransformer> {
    SyncTask::new(
        PERSON_STATE_KEY,
        PERSONS_INDEX,
        queries::LOAD_PERSONS,
        mappings::persons_mapping(),
        PersonExtractor,
        PersonTransformer,
    )
}
