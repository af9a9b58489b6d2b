//! In-memory store for tests and ephemeral sessions

use std::collections::HashMap;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use serde_json::Value;

use super::Store;
use crate::error::StoreError;

/// Keeps documents as raw JSON text in memory
///
/// Text rather than parsed values is kept so tests can plant torn or
/// malformed documents with [`MemoryStore::insert_raw`].
#[derive(Debug, Default)]
pub struct MemoryStore {
    docs: Mutex<HashMap<String, String>>,
    fail_writes: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores raw text under `key`, bypassing JSON encoding
    pub fn insert_raw(&self, key: &str, text: impl Into<String>) {
        self.lock().insert(key.to_string(), text.into());
    }

    /// Returns the raw text stored under `key`
    pub fn raw(&self, key: &str) -> Option<String> {
        self.lock().get(key).cloned()
    }

    /// Makes every subsequent write fail with an I/O error
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        self.docs.lock().unwrap_or_else(|p| p.into_inner())
    }

    fn check_writable(&self) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(io::Error::new(io::ErrorKind::Other, "store is read-only").into());
        }
        Ok(())
    }
}

impl Store for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        let docs = self.lock();
        let Some(text) = docs.get(key) else {
            return Ok(None);
        };
        serde_json::from_str(text)
            .map(Some)
            .map_err(|e| StoreError::Corrupt {
                key: key.to_string(),
                reason: e.to_string(),
            })
    }

    fn put(&self, key: &str, value: &Value) -> Result<(), StoreError> {
        self.check_writable()?;
        let text = serde_json::to_string(value)?;
        self.lock().insert(key.to_string(), text);
        Ok(())
    }

    fn put_if_absent(&self, key: &str, value: &Value) -> Result<bool, StoreError> {
        self.check_writable()?;
        let text = serde_json::to_string(value)?;
        let mut docs = self.lock();
        if docs.contains_key(key) {
            return Ok(false);
        }
        docs.insert(key.to_string(), text);
        Ok(true)
    }
}
