//! The integration hub: the single entry point used by the dashboard
//!
//! `IntegrationHub` owns the configuration and status documents, the cache
//! manager and the injected capabilities (store, fetcher, clock). There is no
//! global state; create one hub per data directory.
//!
//! Configuration changes are transactional: the change is applied to a copy
//! of both documents, the copies are persisted, and only then swapped in. If
//! persisting fails the in-memory state is untouched and the error is
//! returned. Data reads never fail; their bookkeeping is persisted on a best
//! effort basis.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration as StdDuration;

use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::cache::{CacheEntry, CacheManager, FallbackReason, Outcome, Resolution};
use crate::clock::Clock;
use crate::config::{ConfigStatus, ConfigStore, Credentials, IntegrationConfig, IntegrationStatus};
use crate::data::Payload;
use crate::error::IntegrationError;
use crate::fetcher::Fetcher;
use crate::health::{self, HealthSnapshot};
use crate::notifications::{Notification, NotificationKind, NotificationLog, Scope, DEFAULT_RETENTION};
use crate::quality::QualitySnapshot;
use crate::settings::{Settings, DEFAULT_FETCH_TIMEOUT};
use crate::source::{PerSource, ResetTarget, SourceKind};
use crate::stats::{self, Statistics};
use crate::store::{self, Store, CONFIG_KEY, STATUS_KEY};

/// Tunables of an [`IntegrationHub`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HubOptions {
    pub fetch_timeout: StdDuration,
    pub notification_retention: usize,
}

impl Default for HubOptions {
    fn default() -> Self {
        Self {
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
            notification_retention: DEFAULT_RETENTION,
        }
    }
}

impl From<&Settings> for HubOptions {
    fn from(settings: &Settings) -> Self {
        Self {
            fetch_timeout: settings.fetch_timeout,
            notification_retention: settings.notification_retention,
        }
    }
}

/// The `integrations.status` document
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StatusDocument {
    pub last_check: Option<DateTime<Utc>>,
    pub status: PerSource<IntegrationStatus>,
    pub notifications: NotificationLog,
}

/// Merged configuration and live status of one source
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceStatus {
    pub enabled: bool,
    pub status: ConfigStatus,
    pub last_updated: Option<DateTime<Utc>>,
    pub operational: bool,
    pub message: String,
    pub credential_summary: String,
}

/// Status of every source, as shown on the integrations page
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusView {
    #[serde(flatten)]
    pub sources: PerSource<SourceStatus>,
    pub last_check: Option<DateTime<Utc>>,
}

impl StatusView {
    pub fn source(&self, source: SourceKind) -> &SourceStatus {
        self.sources.get(source)
    }
}

/// Integration hub for weather, events and supplier feeds
pub struct IntegrationHub {
    store: Arc<dyn Store>,
    clock: Arc<dyn Clock>,
    cache: CacheManager,
    config: Mutex<ConfigStore>,
    status: Mutex<StatusDocument>,
    retention: usize,
}

impl IntegrationHub {
    /// Opens a hub over `store`, loading or creating its documents
    ///
    /// Missing and corrupt documents are recreated with defaults; this is
    /// normal first-run behaviour and is not reported as an error.
    pub fn open(
        store: Arc<dyn Store>,
        fetcher: Arc<dyn Fetcher>,
        clock: Arc<dyn Clock>,
        options: HubOptions,
    ) -> Self {
        let config = store::load_or_default::<ConfigStore>(store.as_ref(), CONFIG_KEY).normalized();
        let status = store::load_or_default::<StatusDocument>(store.as_ref(), STATUS_KEY);
        let cache = CacheManager::load(store.clone(), fetcher.clone(), clock.clone(), options.fetch_timeout);

        info!(
            fetcher = fetcher.name(),
            enabled = ?config.enabled_sources(),
            notifications = status.notifications.len(),
            "integration hub ready"
        );

        Self {
            store,
            clock,
            cache,
            config: Mutex::new(config),
            status: Mutex::new(status),
            retention: options.notification_retention,
        }
    }

    fn config(&self) -> MutexGuard<'_, ConfigStore> {
        self.config.lock().unwrap_or_else(|p| p.into_inner())
    }

    fn status(&self) -> MutexGuard<'_, StatusDocument> {
        self.status.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// Applies `change` to copies of both documents and commits them
    ///
    /// Locks are taken config first, then status, and are never held across
    /// an await.
    fn commit<R>(
        &self,
        change: impl FnOnce(&mut ConfigStore, &mut StatusDocument, DateTime<Utc>) -> Result<R, IntegrationError>,
    ) -> Result<R, IntegrationError> {
        let mut config = self.config();
        let mut status = self.status();
        let mut next_config = config.clone();
        let mut next_status = status.clone();

        let result = change(&mut next_config, &mut next_status, self.clock.now())?;

        store::save(self.store.as_ref(), CONFIG_KEY, &next_config)?;
        if let Err(e) = store::save(self.store.as_ref(), STATUS_KEY, &next_status) {
            if let Err(restore) = store::save(self.store.as_ref(), CONFIG_KEY, &*config) {
                warn!(error = %restore, "failed to restore configuration document after rollback");
            }
            return Err(e.into());
        }

        *config = next_config;
        *status = next_status;
        Ok(result)
    }

    /// Enables or disables a source and optionally replaces its credentials
    ///
    /// # Arguments
    /// * `source` - The source to configure
    /// * `credentials` - New credentials, or `None` to keep the stored ones.
    ///   Supplier credentials are merged by supplier name.
    /// * `enabled` - Whether the source should be fetched live
    ///
    /// # Returns
    /// * `Ok(IntegrationConfig)` with the stored configuration
    /// * `Err(IntegrationError::CredentialShape)` for credentials of the wrong kind
    /// * `Err(IntegrationError::Persistence)` if the change could not be saved
    pub fn configure_source(
        &self,
        source: SourceKind,
        credentials: Option<Credentials>,
        enabled: bool,
    ) -> Result<IntegrationConfig, IntegrationError> {
        let retention = self.retention;
        let updated = self.commit(|config, status, now| {
            let updated = config.configure(source, credentials, enabled, now)?;
            *status.status.get_mut(source) = if enabled {
                IntegrationStatus::up("Configured")
            } else {
                IntegrationStatus::down("Disabled")
            };
            let message = format!(
                "{} integration {} ({})",
                source.display_name(),
                if enabled { "enabled" } else { "disabled" },
                updated.credential_summary()
            );
            status.notify(NotificationKind::Configuration, source.into(), message, now, retention);
            Ok(updated)
        })?;

        info!(%source, enabled, "integration configured");
        Ok(updated)
    }

    /// Removes one named supplier from the supplier credentials
    pub fn remove_supplier(&self, name: &str) -> Result<IntegrationConfig, IntegrationError> {
        let retention = self.retention;
        let updated = self.commit(|config, status, now| {
            let updated = config.remove_supplier(name, now)?;
            let message = format!("Supplier '{}' removed ({})", name, updated.credential_summary());
            status.notify(
                NotificationKind::Configuration,
                SourceKind::Suppliers.into(),
                message,
                now,
                retention,
            );
            Ok(updated)
        })?;

        info!(supplier = name, "supplier removed");
        Ok(updated)
    }

    /// Returns the payload of `source`, fetching it if needed
    ///
    /// Never fails: when a live fetch is not possible the stale payload, or a
    /// synthesized one, is returned instead.
    pub async fn get_data(&self, source: SourceKind, force_refresh: bool) -> Payload {
        let config = self.config().get(source).clone();
        let resolution = self.cache.resolve(source, &config, force_refresh).await;
        self.record(source, &config, &resolution);
        resolution.payload
    }

    /// Resolves all three sources concurrently
    ///
    /// Payloads are returned in [`SourceKind::ALL`] order.
    pub async fn refresh_all(&self, force_refresh: bool) -> Vec<Payload> {
        join_all(SourceKind::ALL.map(|source| self.get_data(source, force_refresh))).await
    }

    /// Applies the bookkeeping of a resolution: statistics, quality, status
    /// and notifications
    ///
    /// `resolved_with` is the configuration the resolution started from. If
    /// the source was reconfigured or reset while it was in flight, only the
    /// statistics are recorded; quality and status stay as the newer change
    /// left them.
    fn record(&self, source: SourceKind, resolved_with: &IntegrationConfig, resolution: &Resolution) {
        let now = self.clock.now();
        let mut config = self.config();
        let mut status = self.status();

        let superseded = config.get(source) != resolved_with;
        if superseded {
            debug!(%source, "configuration changed during resolution; keeping its status");
        }

        match &resolution.outcome {
            Outcome::Hit => bump(&mut config.statistics, source, stats::CACHE_HITS),
            Outcome::Fetched => {
                bump(&mut config.statistics, source, stats::API_CALLS);
                if let Err(e) = config.statistics.record_fetch(source, now) {
                    warn!(%source, error = %e, "failed to record fetch time");
                }
            }
            Outcome::Fallback { reason, .. } => {
                if let FallbackReason::FetchFailed(_) = reason {
                    bump(&mut config.statistics, source, stats::API_CALLS);
                    bump(&mut config.statistics, source, stats::ERRORS);
                }
                bump(&mut config.statistics, source, stats::FALLBACKS);
            }
        }

        if !superseded {
            apply_outcome(&mut config, &mut status, source, &resolution.outcome, now, self.retention);
        }
        status.last_check = Some(now);

        if let Err(e) = store::save(self.store.as_ref(), CONFIG_KEY, &*config) {
            warn!(%source, error = %e, "failed to persist configuration document");
        }
        if let Err(e) = store::save(self.store.as_ref(), STATUS_KEY, &*status) {
            warn!(%source, error = %e, "failed to persist status document");
        }
    }

    /// Merged configuration and live status of every source
    pub fn get_status(&self) -> StatusView {
        let config = self.config();
        let status = self.status();
        StatusView {
            sources: PerSource::from_fn(|source| {
                let c = config.get(source);
                let live = status.status.get(source);
                SourceStatus {
                    enabled: c.enabled,
                    status: c.status,
                    last_updated: c.last_updated,
                    operational: live.operational,
                    message: live.message.clone(),
                    credential_summary: c.credential_summary(),
                }
            }),
            last_check: status.last_check,
        }
    }

    /// Configuration of one source
    pub fn get_config(&self, source: SourceKind) -> IntegrationConfig {
        self.config().get(source).clone()
    }

    /// Latest quality snapshot of every source
    pub fn get_data_quality(&self) -> PerSource<QualitySnapshot> {
        self.config().data_quality.clone()
    }

    /// Snapshot of the usage statistics
    pub fn get_statistics(&self) -> Statistics {
        self.config().statistics.clone()
    }

    /// Sets an arbitrary statistic at a dotted path
    pub fn update_statistic(&self, path: &str, value: Value) -> Result<(), IntegrationError> {
        self.commit(|config, _, _| config.statistics.set(path, value))?;
        debug!(path, "statistic updated");
        Ok(())
    }

    /// Aggregate health over the enabled sources
    pub fn calculate_health(&self) -> HealthSnapshot {
        let config = self.config();
        let status = self.status();
        let configs = PerSource::from_fn(|source| config.get(source).clone());
        let operational = PerSource::from_fn(|source| status.status.get(source).operational);
        health::calculate(&configs, &operational, &config.data_quality)
    }

    /// Up to `limit` notifications, most recent first
    pub fn get_notifications(&self, limit: usize) -> Vec<Notification> {
        self.status().notifications.recent(limit)
    }

    /// Returns one source, or all of them, to the unconfigured state
    ///
    /// Credentials are cleared, live status is marked down and a reset
    /// notification is recorded, all in one transaction. Cached payloads are
    /// kept so the dashboard still has something to show.
    pub fn reset_integration(&self, target: ResetTarget) -> Result<StatusView, IntegrationError> {
        let retention = self.retention;
        self.commit(|config, status, now| {
            let (scope, message) = match target {
                ResetTarget::One(source) => {
                    config.reset_one(source);
                    (Scope::Source(source), format!("{} integration reset", source.display_name()))
                }
                ResetTarget::All => {
                    config.reset_all();
                    (Scope::All, "All integrations reset".to_string())
                }
            };
            for source in target.sources() {
                *status.status.get_mut(source) = IntegrationStatus::down("Reset");
            }
            status.notify(NotificationKind::Reset, scope, message, now, retention);
            Ok(())
        })?;

        info!(?target, "integration reset");
        Ok(self.get_status())
    }

    /// Snapshot of a source's cache entry
    pub async fn cache_entry(&self, source: SourceKind) -> CacheEntry {
        self.cache.entry(source).await
    }
}

impl StatusDocument {
    fn notify(
        &mut self,
        kind: NotificationKind,
        source: Scope,
        message: String,
        now: DateTime<Utc>,
        retention: usize,
    ) {
        debug!(?kind, %source, %message, "notification");
        self.notifications.append(
            Notification {
                timestamp: now,
                kind,
                source,
                message,
            },
            retention,
        );
    }
}

/// Quality, live status and notification for one resolution
fn apply_outcome(
    config: &mut ConfigStore,
    status: &mut StatusDocument,
    source: SourceKind,
    outcome: &Outcome,
    now: DateTime<Utc>,
    retention: usize,
) {
    match outcome {
        Outcome::Hit => {}
        Outcome::Fetched => {
            *config.data_quality.get_mut(source) = QualitySnapshot::FRESH;
            *status.status.get_mut(source) = IntegrationStatus::up("Operational");
        }
        Outcome::Fallback { reason, quality, .. } => {
            let (kind, message) = match reason {
                FallbackReason::FetchFailed(e) => (
                    NotificationKind::Error,
                    format!("Failed to fetch {} data: {}", source, e),
                ),
                FallbackReason::NotConfigured => (
                    NotificationKind::Cache,
                    format!("Using cached {} data: integration not configured or enabled", source),
                ),
                FallbackReason::MissingCredentials => (
                    NotificationKind::Cache,
                    format!("Using cached {} data: missing credentials", source),
                ),
            };
            *config.data_quality.get_mut(source) = *quality;
            *status.status.get_mut(source) = IntegrationStatus::down(reason.status_message());
            status.notify(kind, source.into(), message, now, retention);
        }
    }
}

fn bump(statistics: &mut Statistics, source: SourceKind, counter: &str) {
    if let Err(e) = statistics.increment(source, counter) {
        warn!(%source, counter, error = %e, "failed to update statistic");
    }
}
