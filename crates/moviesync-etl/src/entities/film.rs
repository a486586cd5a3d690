//! Film entity pipeline
//!
//! Films carry the heaviest denormalization: the source row aggregates
//! genres and per-role person lists as `"id: name"` strings, and the
//! document needs both structured `{id, name}` lists and flat name lists per
//! category.

use crate::elastic::mappings;
use crate::error::Result;
use crate::extract::{deserialize_row, Extract, SourceRecord};
use crate::queries;
use crate::task::SyncTask;
use crate::transform::{names_of, parse_named_refs, IndexDocument, NamedRef, Transform};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Watermark key for films.
pub const FILM_STATE_KEY: &str = "film_work";

/// Target index for film documents.
pub const FILMS_INDEX: &str = "movies";

/// A film row as the source query projects it.
#[derive(Debug, Clone, Deserialize)]
pub struct FilmRecord {
    pub id: Uuid,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub rating: Option<f64>,
    #[serde(rename = "type")]
    pub kind: String,
    pub created: DateTime<Utc>,
    pub modified: DateTime<Utc>,
    #[serde(default)]
    pub viewing_permission: Option<String>,
    #[serde(default)]
    pub genres: Option<Vec<String>>,
    #[serde(default)]
    pub actors: Option<Vec<String>>,
    #[serde(default)]
    pub directors: Option<Vec<String>>,
    #[serde(default)]
    pub writers: Option<Vec<String>>,
}

impl SourceRecord for FilmRecord {
    fn modified(&self) -> DateTime<Utc> {
        self.modified
    }
}

/// The denormalized film document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilmDocument {
    pub id: String,
    pub imdb_rating: Option<f64>,
    pub genres: Vec<NamedRef>,
    pub title: String,
    pub description: Option<String>,
    pub viewing_permission: Option<String>,
    pub actors_names: Vec<String>,
    pub directors_names: Vec<String>,
    pub writers_names: Vec<String>,
    pub actors: Vec<NamedRef>,
    pub directors: Vec<NamedRef>,
    pub writers: Vec<NamedRef>,
}

impl IndexDocument for FilmDocument {
    fn id(&self) -> &str {
        &self.id
    }
}

pub struct FilmExtractor;

impl Extract for FilmExtractor {
    type Record = FilmRecord;

    fn extract(&self, raw: Value) -> Result<FilmRecord> {
        deserialize_row("film_work", raw)
    }
}

pub struct FilmTransformer;

impl Transform for FilmTransformer {
    type Record = FilmRecord;
    type Document = FilmDocument;

    fn transform(&self, record: FilmRecord) -> Result<FilmDocument> {
        let genres = parse_named_refs(record.genres)?;
        let actors = parse_named_refs(record.actors)?;
        let directors = parse_named_refs(record.directors)?;
        let writers = parse_named_refs(record.writers)?;

        Ok(FilmDocument {
            id: record.id.to_string(),
            imdb_rating: record.rating,
            title: record.title,
            description: record.description,
            viewing_permission: record.viewing_permission,
            actors_names: names_of(&actors),
            directors_names: names_of(&directors),
            writers_names: names_of(&writers),
            genres,
            actors,
            directors,
            writers,
        })
    }
}

/// The film sync task, ready for registration.
pub fn task() -> SyncTask<FilmExtractor, FilmTransformer> {
    SyncTask::new(
        FILM_STATE_KEY,
        FILMS_INDEX,
        queries::LOAD_FILMS,
        mappings::films_mapping(),
        FilmExtractor,
        FilmTransformer,
    )
}
