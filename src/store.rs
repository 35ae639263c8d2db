//! # Append-Only Store
//!
//! Durable persistence of every raw payload, in arrival order, as a single
//! JSON-array-shaped file.
//!
//! Each append rewrites the whole file: read it back, strip the trailing
//! `"\n]"` markers, splice in the new element, write everything out again.
//! That is O(file-size) per append, fine for low-rate telemetry. A file
//! whose trailing markers are missing is treated as corrupted and replaced
//! wholesale with a single-element array holding only the current payload;
//! recovery is deliberately lossy rather than attempting a merge.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::Result;

/// The healthy file always ends with these two bytes.
const CLOSING_MARKERS: &str = "\n]";

/// Whole-file JSON-array store for raw telemetry payloads.
#[derive(Debug, Clone)]
pub struct JsonArrayStore {
    path: PathBuf,
}

impl JsonArrayStore {
    /// Create a store backed by `path`. The file itself is created lazily
    /// on the first append.
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append `raw` as the newest element of the persisted array.
    ///
    /// # Errors
    ///
    /// Returns an error when the backing file (or its directory) cannot be
    /// created, read, or written. A previously corrupted file is not an
    /// error: it is overwritten with a fresh single-element array.
    pub fn append(&self, raw: &str) -> Result<()> {
        if let Some(dir) = self.path.parent() {
            if !dir.as_os_str().is_empty() && !dir.exists() {
                fs::create_dir_all(dir)?;
                debug!("created store directory {}", dir.display());
            }
        }

        if !self.path.exists() {
            fs::write(&self.path, Self::single_element(raw))?;
            debug!("created new store file {}", self.path.display());
            return Ok(());
        }

        let content = fs::read_to_string(&self.path)?;
        if let Some(stripped) = content.strip_suffix(CLOSING_MARKERS) {
            // Healthy file: splice the new element in before the markers.
            // No separating comma when only the opening bracket remains.
            let mut updated = String::with_capacity(stripped.len() + raw.len() + 4);
            updated.push_str(stripped);
            if stripped.len() > 2 {
                updated.push_str(",\n");
            }
            updated.push_str(raw);
            updated.push_str(CLOSING_MARKERS);
            fs::write(&self.path, updated)?;
            debug!("appended payload to {}", self.path.display());
        } else {
            warn!(
                "store file {} is corrupted, discarding prior content",
                self.path.display()
            );
            fs::write(&self.path, Self::single_element(raw))?;
        }

        Ok(())
    }

    fn single_element(raw: &str) -> String {
        format!("[\n{raw}{CLOSING_MARKERS}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;
    use tempfile::tempdir;

    fn read_array(store: &JsonArrayStore) -> Vec<Value> {
        let content = fs::read_to_string(store.path()).unwrap();
        match serde_json::from_str(&content).unwrap() {
            Value::Array(items) => items,
            other => panic!("store file is not a JSON array: {other:?}"),
        }
    }

    #[test]
    fn test_first_append_creates_file() {
        let dir = tempdir().unwrap();
        let store = JsonArrayStore::new(dir.path().join("locations.json"));

        store.append(r#"{"latitude":55.75}"#).unwrap();

        let items = read_array(&store);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0]["latitude"], 55.75);
    }

    #[test]
    fn test_round_trip_preserves_order() {
        let dir = tempdir().unwrap();
        let store = JsonArrayStore::new(dir.path().join("locations.json"));

        let payloads = [
            r#"{"latitude":1.0}"#,
            r#"{"latitude":2.0}"#,
            r#"{"latitude":3.0}"#,
        ];
        for payload in &payloads {
            store.append(payload).unwrap();
        }

        let items = read_array(&store);
        assert_eq!(items.len(), payloads.len());
        for (i, item) in items.iter().enumerate() {
            assert_eq!(item["latitude"], (i + 1) as f64);
        }
    }

    #[test]
    fn test_file_keeps_trailing_markers() {
        let dir = tempdir().unwrap();
        let store = JsonArrayStore::new(dir.path().join("locations.json"));

        store.append(r#"{"a":1}"#).unwrap();
        store.append(r#"{"b":2}"#).unwrap();

        let content = fs::read_to_string(store.path()).unwrap();
        assert!(content.starts_with("[\n"));
        assert!(content.ends_with("\n]"));
    }

    #[test]
    fn test_missing_directory_is_created() {
        let dir = tempdir().unwrap();
        let nested = dir.path().join("database").join("locations.json");
        let store = JsonArrayStore::new(&nested);

        store.append(r#"{"a":1}"#).unwrap();

        assert!(nested.exists());
        assert_eq!(read_array(&store).len(), 1);
    }

    #[test]
    fn test_corruption_recovery_is_lossy() {
        let dir = tempdir().unwrap();
        let store = JsonArrayStore::new(dir.path().join("locations.json"));

        for payload in [r#"{"n":1}"#, r#"{"n":2}"#, r#"{"n":3}"#] {
            store.append(payload).unwrap();
        }
        assert_eq!(read_array(&store).len(), 3);

        // Damage the trailing markers
        let mut content = fs::read_to_string(store.path()).unwrap();
        content.truncate(content.len() - 1);
        fs::write(store.path(), content).unwrap();

        // The next append discards everything that came before
        store.append(r#"{"n":4}"#).unwrap();
        let items = read_array(&store);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0]["n"], 4);
    }

    #[test]
    fn test_empty_existing_file_treated_as_corrupted() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("locations.json");
        fs::write(&path, "").unwrap();

        let store = JsonArrayStore::new(&path);
        store.append(r#"{"n":1}"#).unwrap();

        let items = read_array(&store);
        assert_eq!(items.len(), 1);
    }

    #[test]
    fn test_append_to_unwritable_path_fails() {
        let dir = tempdir().unwrap();
        // The "file" path points at an existing directory
        let store = JsonArrayStore::new(dir.path());
        assert!(store.append(r#"{"n":1}"#).is_err());
    }

    #[test]
    fn test_raw_payload_stored_verbatim() {
        let dir = tempdir().unwrap();
        let store = JsonArrayStore::new(dir.path().join("locations.json"));

        let payload = r#"{"imei":"123456789012345","cellInfo":"LTE"}"#;
        store.append(payload).unwrap();

        let content = fs::read_to_string(store.path()).unwrap();
        assert!(content.contains(payload));
    }
}
