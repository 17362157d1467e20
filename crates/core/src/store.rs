//! Flat-file persistence for the patient collection.
//!
//! The whole collection lives in a single JSON document whose top-level value
//! is an object keyed by patient id. There is no incremental update
//! primitive: every mutation is load everything, modify in memory, save
//! everything. Saves go through a temp-file-then-rename cycle so a crash
//! mid-write cannot truncate the collection.

use crate::error::{PatientError, PatientResult};
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};

/// The full set of persisted patient records, keyed by id.
///
/// Values are the stored record objects (no `id` key inside). Iteration
/// preserves insertion order, so listings and sort ties keep the order in
/// which records were created.
pub type Collection = Map<String, Value>;

/// Handle on the backing JSON file.
///
/// Construction performs no I/O; a missing or unreadable file surfaces on
/// [`load`](RecordStore::load).
#[derive(Debug)]
pub struct RecordStore {
    path: PathBuf,
}

impl RecordStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the entire persisted collection into memory.
    ///
    /// # Errors
    ///
    /// Returns `PatientError::FileRead` if the file is missing or unreadable,
    /// or `PatientError::Deserialization` if it does not contain a JSON
    /// object of records.
    pub fn load(&self) -> PatientResult<Collection> {
        let raw = fs::read_to_string(&self.path).map_err(PatientError::FileRead)?;
        let collection: Collection =
            serde_json::from_str(&raw).map_err(PatientError::Deserialization)?;
        tracing::debug!(records = collection.len(), "loaded patient collection");
        Ok(collection)
    }

    /// Overwrites the persisted collection with the given one.
    ///
    /// Writes to a sibling temp file first and renames it over the target,
    /// so the backing file always holds a complete document.
    ///
    /// # Errors
    ///
    /// Returns `PatientError::Serialization` if encoding fails, or
    /// `PatientError::FileWrite` if the temp write or rename fails.
    pub fn save(&self, collection: &Collection) -> PatientResult<()> {
        let raw = serde_json::to_string(collection).map_err(PatientError::Serialization)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, raw).map_err(PatientError::FileWrite)?;
        fs::rename(&tmp, &self.path).map_err(PatientError::FileWrite)?;
        tracing::debug!(records = collection.len(), "saved patient collection");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn store_with(contents: &str) -> (TempDir, RecordStore) {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("patients.json");
        fs::write(&path, contents).unwrap();
        (temp, RecordStore::new(path))
    }

    #[test]
    fn load_missing_file_fails() {
        let temp = TempDir::new().unwrap();
        let store = RecordStore::new(temp.path().join("absent.json"));
        assert!(matches!(store.load(), Err(PatientError::FileRead(_))));
    }

    #[test]
    fn load_malformed_file_fails() {
        let (_temp, store) = store_with("not json");
        assert!(matches!(
            store.load(),
            Err(PatientError::Deserialization(_))
        ));
    }

    #[test]
    fn load_non_object_top_level_fails() {
        let (_temp, store) = store_with("[1, 2, 3]");
        assert!(matches!(
            store.load(),
            Err(PatientError::Deserialization(_))
        ));
    }

    #[test]
    fn save_then_load_round_trips_in_order() {
        let (_temp, store) = store_with("{}");

        let mut collection = Collection::new();
        collection.insert("P002".into(), json!({"name": "B"}));
        collection.insert("P001".into(), json!({"name": "A"}));
        store.save(&collection).unwrap();

        let loaded = store.load().unwrap();
        let ids: Vec<&str> = loaded.keys().map(String::as_str).collect();
        assert_eq!(ids, ["P002", "P001"]);
        assert_eq!(loaded["P001"], json!({"name": "A"}));
    }

    #[test]
    fn save_leaves_no_temp_file_behind() {
        let (temp, store) = store_with("{}");
        store.save(&Collection::new()).unwrap();

        let entries: Vec<_> = fs::read_dir(temp.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(entries, ["patients.json"]);
    }
}
