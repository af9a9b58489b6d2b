//! Cache manager for the per-source feed payloads
//!
//! Provides a `CacheManager` that keeps the latest payload of each source in
//! memory and in the store, refetches it once its time-to-live has elapsed,
//! and falls back to the stale entry (or a synthesized one) whenever a live
//! fetch is not possible.

use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::config::{Credentials, IntegrationConfig};
use crate::data::Payload;
use crate::error::FetchError;
use crate::fetcher::Fetcher;
use crate::quality::{self, QualitySnapshot};
use crate::source::{PerSource, SourceKind};
use crate::store::{self, Store};

/// Cached payload of one source, persisted as `cache.<source>`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CacheEntry {
    /// When the payload was fetched or synthesized
    pub last_updated: Option<DateTime<Utc>>,
    /// The payload itself
    pub data: Option<Payload>,
    /// Whether the payload was last served as a fallback
    pub is_cached: bool,
}

impl CacheEntry {
    /// Age of the payload at `now`, if one was ever stored
    pub fn age(&self, now: DateTime<Utc>) -> Option<Duration> {
        self.data.as_ref()?;
        self.last_updated.map(|at| now - at)
    }
}

/// Why a resolution did not use a live fetch
#[derive(Debug)]
pub enum FallbackReason {
    /// The source is disabled
    NotConfigured,
    /// The source is enabled but has no usable credentials
    MissingCredentials,
    /// A live fetch was attempted and failed
    FetchFailed(FetchError),
}

impl FallbackReason {
    /// Message shown in the live status view
    pub fn status_message(&self) -> String {
        match self {
            FallbackReason::NotConfigured => "Not configured".to_string(),
            FallbackReason::MissingCredentials => "Missing credentials".to_string(),
            FallbackReason::FetchFailed(e) => e.to_string(),
        }
    }
}

/// How a payload was obtained
#[derive(Debug)]
pub enum Outcome {
    /// Served from an entry still within its time-to-live
    Hit,
    /// Fetched live from the provider
    Fetched,
    /// Served from the stale entry, or synthesized when there was none
    Fallback {
        reason: FallbackReason,
        quality: QualitySnapshot,
        synthesized: bool,
    },
}

/// Result of resolving a source; always carries a payload
#[derive(Debug)]
pub struct Resolution {
    pub payload: Payload,
    pub outcome: Outcome,
}

/// Manages the cached payload of every source
///
/// Each source's entry sits behind its own async mutex which is held for the
/// whole resolution, including the live fetch. A second caller for the same
/// source waits for the in-flight fetch and then finds a fresh entry, so at
/// most one fetch per source is ever in flight. Different sources never
/// contend.
pub struct CacheManager {
    store: Arc<dyn Store>,
    fetcher: Arc<dyn Fetcher>,
    clock: Arc<dyn Clock>,
    fetch_timeout: StdDuration,
    slots: PerSource<Mutex<CacheEntry>>,
}

impl CacheManager {
    /// Creates a cache manager, loading each source's entry from the store
    ///
    /// Missing or corrupt entries start empty. An entry holding a payload of
    /// another source is discarded.
    pub fn load(
        store: Arc<dyn Store>,
        fetcher: Arc<dyn Fetcher>,
        clock: Arc<dyn Clock>,
        fetch_timeout: StdDuration,
    ) -> Self {
        let slots = PerSource::from_fn(|source| {
            let mut entry: CacheEntry = store::load_or_default(store.as_ref(), &source.cache_key());
            if let Some(actual) = entry.data.as_ref().map(Payload::kind).filter(|k| *k != source) {
                warn!(%source, %actual, "cache entry holds a payload of another source, discarding");
                entry = CacheEntry::default();
            }
            Mutex::new(entry)
        });

        Self {
            store,
            fetcher,
            clock,
            fetch_timeout,
            slots,
        }
    }

    /// Snapshot of a source's cache entry
    pub async fn entry(&self, source: SourceKind) -> CacheEntry {
        self.slots.get(source).lock().await.clone()
    }

    /// Resolves the payload of `source` under `config`
    ///
    /// # Arguments
    /// * `source` - The source to resolve
    /// * `config` - The source's configuration at call time
    /// * `force_refresh` - Attempt a live fetch even if the entry is fresh
    ///
    /// # Returns
    /// A payload and how it was obtained. Never fails: fetch errors are
    /// reported through [`Outcome::Fallback`].
    pub async fn resolve(&self, source: SourceKind, config: &IntegrationConfig, force_refresh: bool) -> Resolution {
        let mut entry = self.slots.get(source).lock().await;
        let now = self.clock.now();

        if !config.enabled {
            return self.fall_back(source, &mut entry, FallbackReason::NotConfigured, now);
        }
        let Some(credentials) = config.usable_credentials() else {
            return self.fall_back(source, &mut entry, FallbackReason::MissingCredentials, now);
        };

        if !force_refresh {
            if let Some(payload) = fresh_payload(source, &entry, now) {
                debug!(%source, "serving cache entry within ttl");
                return Resolution {
                    payload,
                    outcome: Outcome::Hit,
                };
            }
        }

        match self.fetch(source, credentials).await {
            Ok(payload) => {
                let now = self.clock.now();
                *entry = CacheEntry {
                    last_updated: Some(now),
                    data: Some(payload.clone()),
                    is_cached: false,
                };
                self.persist(source, &entry);
                info!(%source, fetcher = self.fetcher.name(), "fetched fresh data");
                Resolution {
                    payload,
                    outcome: Outcome::Fetched,
                }
            }
            Err(e) => {
                warn!(%source, fetcher = self.fetcher.name(), error = %e, "fetch failed, falling back");
                let now = self.clock.now();
                self.fall_back(source, &mut entry, FallbackReason::FetchFailed(e), now)
            }
        }
    }

    /// Runs one live fetch bounded by the fetch timeout
    async fn fetch(&self, source: SourceKind, credentials: &Credentials) -> Result<Payload, FetchError> {
        let payload = tokio::time::timeout(self.fetch_timeout, self.fetcher.fetch(source, credentials))
            .await
            .map_err(|_| FetchError::Timeout(self.fetch_timeout))??;

        if payload.kind() != source {
            return Err(FetchError::WrongPayload {
                expected: source,
                actual: payload.kind(),
            });
        }
        Ok(payload)
    }

    /// Serves the stale entry with decayed quality, or synthesizes one
    fn fall_back(
        &self,
        source: SourceKind,
        entry: &mut CacheEntry,
        reason: FallbackReason,
        now: DateTime<Utc>,
    ) -> Resolution {
        let (payload, quality, synthesized) = match (entry.data.clone(), entry.last_updated) {
            (Some(payload), Some(updated)) => {
                let quality = if payload.is_synthetic() {
                    quality::synthesized(source)
                } else {
                    quality::assess(source, now - updated, false)
                };
                debug!(%source, reason = %reason.status_message(), "serving stale cache entry");
                (payload, quality, false)
            }
            _ => {
                let payload = self.fetcher.synthesize(source, now);
                entry.last_updated = Some(now);
                entry.data = Some(payload.clone());
                info!(%source, reason = %reason.status_message(), "no cached data, synthesized a payload");
                (payload, quality::synthesized(source), true)
            }
        };

        entry.is_cached = true;
        self.persist(source, entry);

        Resolution {
            payload,
            outcome: Outcome::Fallback {
                reason,
                quality,
                synthesized,
            },
        }
    }

    fn persist(&self, source: SourceKind, entry: &CacheEntry) {
        if let Err(e) = store::save(self.store.as_ref(), &source.cache_key(), entry) {
            warn!(%source, error = %e, "failed to persist cache entry");
        }
    }
}

/// The entry's payload if it is real data younger than the source's TTL
///
/// Synthesized payloads never count as fresh, so enabling a source always
/// leads to a live fetch.
fn fresh_payload(source: SourceKind, entry: &CacheEntry, now: DateTime<Utc>) -> Option<Payload> {
    let age = entry.age(now)?;
    let payload = entry.data.as_ref().filter(|p| !p.is_synthetic())?;
    (age < source.policy().ttl).then(|| payload.clone())
}
