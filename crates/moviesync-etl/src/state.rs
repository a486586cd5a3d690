//! Watermark state persistence
//!
//! One JSON file maps entity-type keys to the `modified` timestamp of the
//! last row confirmed written to the index. The file is the only durable
//! state this process owns; everything else is rebuilt from the source on
//! demand.

use crate::error::{EtlError, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use tracing::{debug, warn};

/// Key-value persistence for watermark state.
///
/// `retrieve` must return an empty map when nothing has been stored yet;
/// `persist` must replace the stored map atomically per call, so a crash can
/// lose the most recent update but never corrupt previously stored keys.
pub trait StateStorage: Send + Sync {
    fn retrieve(&self) -> Result<BTreeMap<String, String>>;
    fn persist(&self, state: &BTreeMap<String, String>) -> Result<()>;
}

/// File-backed storage: the whole map as one JSON object.
pub struct JsonFileStorage {
    path: PathBuf,
}

impl JsonFileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl StateStorage for JsonFileStorage {
    fn retrieve(&self) -> Result<BTreeMap<String, String>> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "state file missing, starting empty");
                return Ok(BTreeMap::new());
            },
            Err(err) => return Err(err.into()),
        };

        match serde_json::from_slice(&bytes) {
            Ok(state) => Ok(state),
            Err(err) => {
                warn!(
                    path = %self.path.display(),
                    error = %err,
                    "state file unreadable, starting empty (full resync)"
                );
                Ok(BTreeMap::new())
            },
        }
    }

    fn persist(&self, state: &BTreeMap<String, String>) -> Result<()> {
        // Write-then-rename keeps the previous file intact until the new one
        // is fully on disk.
        let tmp_path = self.path.with_extension("tmp");
        fs::write(&tmp_path, serde_json::to_vec_pretty(state)?)?;
        fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }
}

/// Typed watermark facade over a [`StateStorage`].
pub struct State {
    storage: Box<dyn StateStorage>,
}

impl State {
    pub fn new(storage: Box<dyn StateStorage>) -> Self {
        Self { storage }
    }

    /// The persisted watermark for an entity key, if any.
    pub fn watermark(&self, key: &str) -> Result<Option<DateTime<Utc>>> {
        let state = self.storage.retrieve()?;
        match state.get(key) {
            None => Ok(None),
            Some(raw) => {
                let parsed = DateTime::parse_from_rfc3339(raw).map_err(|err| {
                    EtlError::Config(format!(
                        "stored watermark for '{}' is not a valid timestamp ({}): {}",
                        key, raw, err
                    ))
                })?;
                Ok(Some(parsed.with_timezone(&Utc)))
            },
        }
    }

    /// Persist a new watermark for an entity key, leaving other keys intact.
    pub fn set_watermark(&self, key: &str, value: DateTime<Utc>) -> Result<()> {
        let mut state = self.storage.retrieve()?;
        state.insert(
            key.to_string(),
            value.to_rfc3339_opts(SecondsFormat::Micros, true),
        );
        self.storage.persist(&state)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn state_in(dir: &TempDir) -> State {
        State::new(Box::new(JsonFileStorage::new(dir.path().join("state.json"))))
    }

    #[test]
    fn test_missing_file_yields_no_watermark() {
        let dir = TempDir::new().unwrap();
        let state = state_in(&dir);

        assert_eq!(state.watermark("film_work").unwrap(), None);
    }

    #[test]
    fn test_watermark_roundtrip() {
        let dir = TempDir::new().unwrap();
        let state = state_in(&dir);
        let ts = Utc.with_ymd_and_hms(2024, 5, 17, 12, 30, 45).unwrap();

        state.set_watermark("film_work", ts).unwrap();

        assert_eq!(state.watermark("film_work").unwrap(), Some(ts));
    }

    #[test]
    fn test_updating_one_key_preserves_others() {
        let dir = TempDir::new().unwrap();
        let state = state_in(&dir);
        let film_ts = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let genre_ts = Utc.with_ymd_and_hms(2024, 2, 2, 0, 0, 0).unwrap();

        state.set_watermark("film_work", film_ts).unwrap();
        state.set_watermark("genre", genre_ts).unwrap();
        state
            .set_watermark("film_work", film_ts + chrono::Duration::hours(1))
            .unwrap();

        assert_eq!(state.watermark("genre").unwrap(), Some(genre_ts));
    }

    #[test]
    fn test_corrupt_file_falls_back_to_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(&path, b"{not json").unwrap();

        let state = State::new(Box::new(JsonFileStorage::new(path)));
        assert_eq!(state.watermark("person").unwrap(), None);
    }

    #[test]
    fn test_invalid_stored_timestamp_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(&path, br#"{"genre": "yesterday"}"#).unwrap();

        let state = State::new(Box::new(JsonFileStorage::new(path)));
        assert!(state.watermark("genre").is_err());
    }

    #[test]
    fn test_microsecond_precision_survives_roundtrip() {
        let dir = TempDir::new().unwrap();
        let state = state_in(&dir);
        let ts = Utc
            .with_ymd_and_hms(2024, 5, 17, 12, 30, 45)
            .unwrap()
            .checked_add_signed(chrono::Duration::microseconds(123_456))
            .unwrap();

        state.set_watermark("person", ts).unwrap();

        assert_eq!(state.watermark("person").unwrap(), Some(ts));
    }
}
