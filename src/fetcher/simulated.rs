//! Deterministic fetcher for offline use and tests
//!
//! Serves generated payloads as if they came from the provider. Failures and
//! delays can be scripted per source, and every live fetch is counted.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::{synthetic, Fetcher};
use crate::config::Credentials;
use crate::data::Payload;
use crate::error::FetchError;
use crate::settings::Location;
use crate::source::{PerSource, SourceKind};

#[derive(Debug, Default)]
struct Script {
    /// One-shot failures, consumed in order
    queued_failures: PerSource<VecDeque<String>>,
    /// Failure returned on every fetch while set
    persistent_failure: PerSource<Option<String>>,
    /// Payload served on the next fetch instead of a generated one
    queued_payloads: PerSource<VecDeque<Payload>>,
    delay: PerSource<Option<Duration>>,
    calls: PerSource<usize>,
}

/// Fetcher producing generated data with scriptable failures
#[derive(Debug)]
pub struct SimulatedFetcher {
    location: Location,
    script: Mutex<Script>,
}

impl Default for SimulatedFetcher {
    fn default() -> Self {
        Self::new(Location::default())
    }
}

impl SimulatedFetcher {
    pub fn new(location: Location) -> Self {
        Self {
            location,
            script: Mutex::new(Script::default()),
        }
    }

    fn script(&self) -> MutexGuard<'_, Script> {
        self.script.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// Makes the next fetch of `source` fail with `message`
    pub fn fail_next(&self, source: SourceKind, message: impl Into<String>) {
        self.script()
            .queued_failures
            .get_mut(source)
            .push_back(message.into());
    }

    /// Makes every fetch of `source` fail until cleared with `None`
    pub fn fail_always(&self, source: SourceKind, message: Option<String>) {
        *self.script().persistent_failure.get_mut(source) = message;
    }

    /// Serves `payload` on the next fetch of `source`
    pub fn respond_with(&self, source: SourceKind, payload: Payload) {
        self.script().queued_payloads.get_mut(source).push_back(payload);
    }

    /// Delays every fetch of `source` by `delay`
    pub fn set_delay(&self, source: SourceKind, delay: Option<Duration>) {
        *self.script().delay.get_mut(source) = delay;
    }

    /// Number of live fetches attempted for `source`
    pub fn calls(&self, source: SourceKind) -> usize {
        *self.script().calls.get(source)
    }
}

#[async_trait]
impl Fetcher for SimulatedFetcher {
    fn name(&self) -> &'static str {
        "simulated"
    }

    async fn fetch(&self, source: SourceKind, _credentials: &Credentials) -> Result<Payload, FetchError> {
        let (delay, outcome) = {
            let mut script = self.script();
            *script.calls.get_mut(source) += 1;

            let outcome = if let Some(message) = script.queued_failures.get_mut(source).pop_front() {
                Err(message)
            } else if let Some(message) = script.persistent_failure.get(source).clone() {
                Err(message)
            } else {
                Ok(script.queued_payloads.get_mut(source).pop_front())
            };
            (*script.delay.get(source), outcome)
        };

        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        match outcome {
            Err(message) => Err(FetchError::Simulated(message)),
            Ok(Some(payload)) => Ok(payload),
            Ok(None) => {
                let mut payload = synthetic::payload(source, Utc::now(), self.location);
                mark_live(&mut payload);
                Ok(payload)
            }
        }
    }

    fn synthesize(&self, source: SourceKind, now: DateTime<Utc>) -> Payload {
        synthetic::payload(source, now, self.location)
    }
}

/// Presents a generated payload as provider data
fn mark_live(payload: &mut Payload) {
    match payload {
        Payload::Weather(w) => w.synthetic = false,
        Payload::Events(e) => e.synthetic = false,
        Payload::Suppliers(s) => s.synthetic = false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key() -> Credentials {
        Credentials::api_key("test-key")
    }

    #[tokio::test]
    async fn test_fetch_serves_live_looking_payload() {
        let fetcher = SimulatedFetcher::default();
        let payload = fetcher.fetch(SourceKind::Events, &key()).await.unwrap();

        assert_eq!(payload.kind(), SourceKind::Events);
        assert!(!payload.is_synthetic());
        assert_eq!(fetcher.calls(SourceKind::Events), 1);
        assert_eq!(fetcher.calls(SourceKind::Weather), 0);
    }

    #[tokio::test]
    async fn test_fail_next_is_one_shot() {
        let fetcher = SimulatedFetcher::default();
        fetcher.fail_next(SourceKind::Weather, "503 Service Unavailable");

        let err = fetcher.fetch(SourceKind::Weather, &key()).await.unwrap_err();
        assert_eq!(err.to_string(), "503 Service Unavailable");
        assert!(fetcher.fetch(SourceKind::Weather, &key()).await.is_ok());
        assert_eq!(fetcher.calls(SourceKind::Weather), 2);
    }

    #[tokio::test]
    async fn test_fail_always_until_cleared() {
        let fetcher = SimulatedFetcher::default();
        fetcher.fail_always(SourceKind::Suppliers, Some("down".to_string()));

        assert!(fetcher.fetch(SourceKind::Suppliers, &key()).await.is_err());
        assert!(fetcher.fetch(SourceKind::Suppliers, &key()).await.is_err());

        fetcher.fail_always(SourceKind::Suppliers, None);
        assert!(fetcher.fetch(SourceKind::Suppliers, &key()).await.is_ok());
    }

    #[tokio::test]
    async fn test_respond_with_queued_payload() {
        let fetcher = SimulatedFetcher::default();
        let canned = fetcher.synthesize(SourceKind::Weather, Utc::now());
        fetcher.respond_with(SourceKind::Events, canned.clone());

        let payload = fetcher.fetch(SourceKind::Events, &key()).await.unwrap();
        assert_eq!(payload, canned);
    }

    #[test]
    fn test_synthesize_is_marked_synthetic() {
        let fetcher = SimulatedFetcher::default();
        assert!(fetcher.synthesize(SourceKind::Suppliers, Utc::now()).is_synthetic());
    }
}
