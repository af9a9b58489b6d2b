//! Error types for the integration cache
//!
//! Only [`IntegrationError`] ever reaches callers of the hub. Fetch failures
//! and store corruption are recovered internally and surface as notifications.

use std::time::Duration;

use thiserror::Error;

use crate::source::SourceKind;

/// Errors raised by a [`Store`](crate::store::Store) implementation
#[derive(Debug, Error)]
pub enum StoreError {
    /// Reading or writing the underlying medium failed
    #[error("Store I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// A document could not be serialized for writing
    #[error("Failed to serialize document: {0}")]
    Serialize(#[from] serde_json::Error),

    /// A stored document exists but cannot be parsed
    #[error("Document '{key}' is corrupt: {reason}")]
    Corrupt { key: String, reason: String },
}

/// Errors that can occur when fetching a feed from its provider
#[derive(Debug, Error)]
pub enum FetchError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Failed to parse JSON response
    #[error("Failed to parse JSON response: {0}")]
    Parse(#[from] serde_json::Error),

    /// Missing expected field in response
    #[error("Missing expected field in response: {0}")]
    MissingField(String),

    /// Invalid time format in response
    #[error("Invalid time format: {0}")]
    InvalidTimeFormat(String),

    /// Provider answered with a non-success status
    #[error("Provider returned {status}: {message}")]
    Provider { status: u16, message: String },

    /// A supplier has credentials but no endpoint to call
    #[error("Supplier '{0}' has no endpoint configured")]
    MissingEndpoint(String),

    /// The fetch did not complete within the configured timeout
    #[error("Fetch timed out after {0:?}")]
    Timeout(Duration),

    /// The fetcher returned a payload for a different source
    #[error("Expected {expected} payload, got {actual}")]
    WrongPayload { expected: SourceKind, actual: SourceKind },

    /// Failure injected by the simulated fetcher
    #[error("{0}")]
    Simulated(String),
}

/// Errors surfaced to callers of the integration hub
///
/// These indicate caller bugs or a failed configuration write, never a
/// provider outage.
#[derive(Debug, Error)]
pub enum IntegrationError {
    /// The named source is not one of weather, events or suppliers
    #[error("Unknown source: '{0}'. Valid sources: weather, events, suppliers")]
    UnknownSource(String),

    /// Credentials of the wrong shape were supplied for a source
    #[error("{kind} expects {expected} credentials")]
    CredentialShape {
        kind: SourceKind,
        expected: &'static str,
    },

    /// A statistics path was empty or descended through a non-object value
    #[error("Invalid statistic path: '{0}'")]
    InvalidStatisticPath(String),

    /// The named supplier is not configured
    #[error("Unknown supplier: '{0}'")]
    UnknownSupplier(String),

    /// A configuration change could not be persisted and was rolled back
    #[error("Failed to persist change: {0}")]
    Persistence(#[from] StoreError),
}
