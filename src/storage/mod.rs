//! JSON persistence for the two state files
//!
//! The progress file is an object: `pages` (pending page numbers), `uids`
//! (pending `[uid, name]` pairs), `decode_err` (lossily decoded URLs) and
//! `known` (page numbers known to exist). The dataset file is an array whose
//! first element is the membership list of every uid ever discovered,
//! followed by one object per collected record.
//!
//! A missing file means an empty default; a malformed file is fatal and
//! aborts the run before any network activity. Rewrites go through a
//! temp-file rename so an interrupted write cannot corrupt existing state.

use crate::state::{AgentRecord, Dataset, ProgressState};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Errors that can occur while reading or writing the state files
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Malformed state file {path}: {message}")]
    Malformed { path: String, message: String },
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// On-disk shape of the progress file
#[derive(Debug, Default, Serialize, Deserialize)]
struct ProgressFile {
    #[serde(default)]
    pages: Vec<u32>,
    #[serde(default)]
    uids: Vec<(String, String)>,
    #[serde(default)]
    decode_err: Vec<String>,
    // Files written before the known set existed lack this field; known
    // pages are then derived from the pending set.
    #[serde(default)]
    known: Vec<u32>,
}

impl From<ProgressFile> for ProgressState {
    fn from(file: ProgressFile) -> Self {
        let mut progress = ProgressState {
            known_pages: file.known.into_iter().collect(),
            pending_pages: file.pages.into_iter().collect(),
            pending_uids: file.uids.into_iter().collect(),
            decode_errors: file.decode_err,
        };
        let pending: Vec<u32> = progress.pending_pages.iter().copied().collect();
        progress.known_pages.extend(pending);
        progress
    }
}

impl From<&ProgressState> for ProgressFile {
    fn from(progress: &ProgressState) -> Self {
        Self {
            pages: progress.pending_pages.iter().copied().collect(),
            uids: progress
                .pending_uids
                .iter()
                .map(|(uid, name)| (uid.clone(), name.clone()))
                .collect(),
            decode_err: progress.decode_errors.clone(),
            known: progress.known_pages.iter().copied().collect(),
        }
    }
}

/// Loads the progress file; None when it does not exist yet
pub fn load_progress(path: &Path) -> StorageResult<Option<ProgressState>> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    let file: ProgressFile = serde_json::from_str(&content)?;
    Ok(Some(file.into()))
}

/// Rewrites the progress file with the current state
pub fn save_progress(path: &Path, progress: &ProgressState) -> StorageResult<()> {
    let file = ProgressFile::from(progress);
    let bytes = serde_json::to_vec_pretty(&file)?;
    write_atomic(path, &bytes)?;
    Ok(())
}

/// Loads the dataset file; None when it does not exist yet
pub fn load_dataset(path: &Path) -> StorageResult<Option<Dataset>> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    let value: Value = serde_json::from_str(&content)?;

    let Value::Array(items) = value else {
        return Err(malformed(path, "expected a top-level array"));
    };

    let mut dataset = Dataset::new();
    let mut items = items.into_iter();

    // A freshly seeded file may be a bare empty array.
    let Some(first) = items.next() else {
        return Ok(Some(dataset));
    };

    let uids: Vec<String> = serde_json::from_value(first)
        .map_err(|e| malformed(path, &format!("uid membership list: {}", e)))?;
    for uid in uids {
        dataset.mark_discovered(&uid);
    }

    for item in items {
        let record: AgentRecord = serde_json::from_value(item)
            .map_err(|e| malformed(path, &format!("record entry: {}", e)))?;
        dataset.insert(record);
    }

    Ok(Some(dataset))
}

/// Rewrites the dataset file with the current records
pub fn save_dataset(path: &Path, dataset: &Dataset) -> StorageResult<()> {
    let mut items = Vec::with_capacity(dataset.len() + 1);
    items.push(serde_json::to_value(
        dataset.discovered_uids().collect::<Vec<_>>(),
    )?);
    for record in dataset.records() {
        items.push(serde_json::to_value(record)?);
    }

    let bytes = serde_json::to_vec_pretty(&Value::Array(items))?;
    write_atomic(path, &bytes)?;
    Ok(())
}

fn malformed(path: &Path, message: &str) -> StorageError {
    StorageError::Malformed {
        path: path.display().to_string(),
        message: message.to_string(),
    }
}

/// Writes through a sibling temp file and renames it into place
fn write_atomic(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let tmp = path.with_extension("tmp");
    fs::write(&tmp, bytes)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::AgentStub;
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    fn record(uid: &str, name: &str, field: (&str, &str)) -> AgentRecord {
        let mut fields = BTreeMap::new();
        fields.insert(field.0.to_string(), field.1.to_string());
        AgentRecord::new(uid.to_string(), name.to_string(), fields)
    }

    #[test]
    fn test_missing_files_load_as_none() {
        let dir = TempDir::new().unwrap();
        assert!(load_progress(&dir.path().join("_record.json"))
            .unwrap()
            .is_none());
        assert!(load_dataset(&dir.path().join("data.json"))
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_progress_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("_record.json");

        let mut progress = ProgressState::initial();
        progress.known_pages.extend([2, 3]);
        progress.pending_pages.insert(3);
        progress
            .pending_uids
            .insert("42".to_string(), "Alice".to_string());
        progress
            .decode_errors
            .push("http://registry.example.gov/query/list.asp?Page=2".to_string());

        save_progress(&path, &progress).unwrap();
        let loaded = load_progress(&path).unwrap().unwrap();

        assert_eq!(loaded, progress);
    }

    #[test]
    fn test_progress_file_shape() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("_record.json");

        let mut progress = ProgressState::initial();
        progress
            .pending_uids
            .insert("42".to_string(), "Alice".to_string());
        save_progress(&path, &progress).unwrap();

        let value: Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["pages"], serde_json::json!([1]));
        assert_eq!(value["uids"], serde_json::json!([["42", "Alice"]]));
        assert_eq!(value["decode_err"], serde_json::json!([]));
    }

    #[test]
    fn test_progress_without_known_field_derives_it() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("_record.json");
        fs::write(&path, r#"{"pages": [3, 5], "uids": [], "decode_err": []}"#).unwrap();

        let progress = load_progress(&path).unwrap().unwrap();
        assert!(progress.known_pages.contains(&3));
        assert!(progress.known_pages.contains(&5));
    }

    #[test]
    fn test_malformed_progress_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("_record.json");
        fs::write(&path, "{ not json").unwrap();

        assert!(load_progress(&path).is_err());
    }

    #[test]
    fn test_dataset_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("data.json");

        let mut dataset = Dataset::new();
        dataset.insert(record("1", "Alice", ("addr", "A Street")));
        dataset.insert(record("2", "Bob", ("addr", "B Street")));
        // Discovered but not yet recorded.
        dataset.mark_discovered("3");

        save_dataset(&path, &dataset).unwrap();
        let loaded = load_dataset(&path).unwrap().unwrap();

        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded.get("1").unwrap().fields["addr"], "A Street");
        assert!(loaded.is_discovered("3"));
        assert!(!loaded.is_recorded("3"));
    }

    #[test]
    fn test_dataset_file_shape() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("data.json");

        let mut dataset = Dataset::new();
        dataset.insert(record("7", "Grace", ("office", "Taipei")));
        save_dataset(&path, &dataset).unwrap();

        let value: Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        let items = value.as_array().unwrap();
        assert_eq!(items[0], serde_json::json!(["7"]));
        assert_eq!(items[1]["uid"], "7");
        assert_eq!(items[1]["name"], "Grace");
        // Field maps are flattened into the record object.
        assert_eq!(items[1]["office"], "Taipei");
    }

    #[test]
    fn test_seed_empty_array_loads_as_empty_dataset() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("data.json");
        fs::write(&path, "[]").unwrap();

        let dataset = load_dataset(&path).unwrap().unwrap();
        assert!(dataset.is_empty());
    }

    #[test]
    fn test_malformed_dataset_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("data.json");
        fs::write(&path, r#"{"not": "an array"}"#).unwrap();

        assert!(load_dataset(&path).is_err());
    }

    #[test]
    fn test_rewrite_replaces_previous_contents() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("_record.json");

        let mut progress = ProgressState::initial();
        save_progress(&path, &progress).unwrap();

        progress.pending_pages.clear();
        let stub = AgentStub {
            uid: "8".to_string(),
            name: "Hui".to_string(),
        };
        progress.pending_uids.insert(stub.uid, stub.name);
        save_progress(&path, &progress).unwrap();

        let loaded = load_progress(&path).unwrap().unwrap();
        assert!(loaded.pending_pages.is_empty());
        assert!(loaded.pending_uids.contains_key("8"));
    }
}
