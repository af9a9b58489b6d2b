//! Persistence capability for the integration cache
//!
//! The cache keeps a handful of JSON documents (configuration, live status,
//! one cache entry per source). A [`Store`] reads and writes whole documents
//! atomically. [`load_or_default`] turns a missing or corrupt document into
//! its default value, which is normal bootstrap behaviour rather than an error.

mod file;
mod memory;

pub use file::JsonFileStore;
pub use memory::MemoryStore;

use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::StoreError;

/// Key of the configuration document
pub const CONFIG_KEY: &str = "integrations.config";

/// Key of the live status and notification document
pub const STATUS_KEY: &str = "integrations.status";

/// Key-value document store with atomic writes
pub trait Store: Send + Sync {
    /// Reads a document, `Ok(None)` if it does not exist
    fn get(&self, key: &str) -> Result<Option<Value>, StoreError>;

    /// Replaces a document atomically
    fn put(&self, key: &str, value: &Value) -> Result<(), StoreError>;

    /// Writes a document only if none exists; returns whether it was written
    fn put_if_absent(&self, key: &str, value: &Value) -> Result<bool, StoreError>;
}

/// Serializes and writes a typed document
pub fn save<T: Serialize>(store: &dyn Store, key: &str, doc: &T) -> Result<(), StoreError> {
    let value = serde_json::to_value(doc)?;
    store.put(key, &value)
}

/// Loads a typed document, recreating it with defaults when missing or corrupt
///
/// Fields absent from an otherwise valid document are filled from the type's
/// serde defaults, so every load re-validates the document. Recreation is
/// logged but never reported as an error.
pub fn load_or_default<T>(store: &dyn Store, key: &str) -> T
where
    T: DeserializeOwned + Serialize + Default,
{
    match store.get(key) {
        Ok(Some(value)) => match serde_json::from_value::<T>(value) {
            Ok(doc) => return doc,
            Err(e) => info!(key, error = %e, "document has unexpected shape, reinitialising"),
        },
        Ok(None) => {
            debug!(key, "document missing, creating defaults");
            let doc = T::default();
            let created = serde_json::to_value(&doc)
                .map_err(StoreError::from)
                .and_then(|value| store.put_if_absent(key, &value));
            match created {
                Ok(true) => return doc,
                // Another writer created it between the read and the write
                Ok(false) => return load_existing(store, key).unwrap_or(doc),
                Err(e) => {
                    warn!(key, error = %e, "failed to write default document");
                    return doc;
                }
            }
        }
        Err(StoreError::Corrupt { reason, .. }) => {
            info!(key, reason = %reason, "document corrupt, reinitialising")
        }
        Err(e) => {
            warn!(key, error = %e, "failed to read document, using defaults");
            return T::default();
        }
    }

    let doc = T::default();
    if let Err(e) = save(store, key, &doc) {
        warn!(key, error = %e, "failed to write default document");
    }
    doc
}

fn load_existing<T: DeserializeOwned>(store: &dyn Store, key: &str) -> Option<T> {
    let value = store.get(key).ok()??;
    serde_json::from_value(value).ok()
}
