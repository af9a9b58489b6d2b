//! JSON file store
//!
//! One pretty-printed JSON file per document key, written atomically by
//! writing a sibling temp file and renaming it over the target.

use directories::ProjectDirs;
use serde_json::Value;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use super::Store;
use crate::error::StoreError;

/// Stores documents as JSON files in a directory
///
/// Uses `~/.local/share/dashfeeds/` on Linux by default, or the equivalent
/// XDG data path on other platforms.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    /// Directory where documents are stored
    dir: PathBuf,
}

impl JsonFileStore {
    /// Creates a store in the XDG-compliant data directory
    ///
    /// Returns `None` if the directory cannot be determined (e.g., no home directory).
    pub fn new() -> Option<Self> {
        let project_dirs = ProjectDirs::from("", "", "dashfeeds")?;
        Some(Self {
            dir: project_dirs.data_dir().to_path_buf(),
        })
    }

    /// Creates a store rooted at a specific directory
    pub fn with_dir(dir: PathBuf) -> Self {
        Self { dir }
    }

    /// Directory holding the documents
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Returns the path of the file backing `key`
    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }

    fn ensure_dir(&self) -> std::io::Result<()> {
        fs::create_dir_all(&self.dir)
    }
}

impl Store for JsonFileStore {
    fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        let content = match fs::read_to_string(self.path_for(key)) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        serde_json::from_str(&content)
            .map(Some)
            .map_err(|e| StoreError::Corrupt {
                key: key.to_string(),
                reason: e.to_string(),
            })
    }

    fn put(&self, key: &str, value: &Value) -> Result<(), StoreError> {
        self.ensure_dir()?;

        let json = serde_json::to_string_pretty(value)?;
        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn put_if_absent(&self, key: &str, value: &Value) -> Result<bool, StoreError> {
        if self.path_for(key).exists() {
            return Ok(false);
        }
        self.put(key, value)?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn create_test_store() -> (JsonFileStore, TempDir) {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let store = JsonFileStore::with_dir(temp_dir.path().to_path_buf());
        (store, temp_dir)
    }

    #[test]
    fn test_put_creates_file_in_store_directory() {
        let (store, temp_dir) = create_test_store();

        store
            .put("integrations.config", &json!({"weather": {"enabled": true}}))
            .expect("Write should succeed");

        let expected_path = temp_dir.path().join("integrations.config.json");
        assert!(expected_path.exists(), "Document file should exist");

        let content = fs::read_to_string(&expected_path).expect("Should read file");
        assert!(content.contains("\"weather\""));
        assert!(content.contains("\"enabled\""));
    }

    #[test]
    fn test_put_leaves_no_temp_file_behind() {
        let (store, temp_dir) = create_test_store();

        store.put("cache.weather", &json!({"data": 1})).unwrap();

        let leftovers: Vec<_> = fs::read_dir(temp_dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty(), "Temp file should be renamed away");
    }

    #[test]
    fn test_get_returns_none_for_missing_key() {
        let (store, _temp_dir) = create_test_store();

        let result = store.get("nonexistent_key").expect("Missing key is not an error");

        assert!(result.is_none(), "Should return None for missing key");
    }

    #[test]
    fn test_get_reports_corrupt_document() {
        let (store, temp_dir) = create_test_store();
        fs::write(temp_dir.path().join("cache.events.json"), "{ torn").unwrap();

        let result = store.get("cache.events");

        match result {
            Err(StoreError::Corrupt { key, .. }) => assert_eq!(key, "cache.events"),
            other => panic!("Expected Corrupt error, got {:?}", other),
        }
    }

    #[test]
    fn test_overwrite_existing_document() {
        let (store, _temp_dir) = create_test_store();

        store.put("overwrite_key", &json!({"n": 1})).unwrap();
        store.put("overwrite_key", &json!({"n": 2})).unwrap();

        let value = store.get("overwrite_key").unwrap().unwrap();
        assert_eq!(value, json!({"n": 2}), "Store should contain latest document");
    }

    #[test]
    fn test_put_if_absent_keeps_existing_document() {
        let (store, _temp_dir) = create_test_store();

        assert!(store.put_if_absent("doc", &json!({"first": true})).unwrap());
        assert!(!store.put_if_absent("doc", &json!({"second": true})).unwrap());

        assert_eq!(store.get("doc").unwrap().unwrap(), json!({"first": true}));
    }

    #[test]
    fn test_put_creates_directory_if_missing() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let nested_path = temp_dir.path().join("nested").join("data").join("dir");
        let store = JsonFileStore::with_dir(nested_path.clone());

        store.put("nested_key", &json!([])).expect("Write should succeed");

        assert!(nested_path.exists(), "Nested directory should be created");
        assert!(nested_path.join("nested_key.json").exists(), "Document file should exist");
    }

    #[test]
    fn test_new_creates_xdg_compliant_path() {
        if let Some(store) = JsonFileStore::new() {
            let path_str = store.dir().to_string_lossy();
            assert!(
                path_str.contains("dashfeeds"),
                "Data path should contain project name"
            );
        }
        // Test passes if new() returns None (e.g., no home directory in CI)
    }
}
