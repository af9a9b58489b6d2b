//! Runtime settings for the integration cache
//!
//! Built from command-line flags and environment variables by the CLI, or
//! constructed directly by embedding applications.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::notifications::DEFAULT_RETENTION;

/// Default time allowed for a single provider fetch
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Default search radius for local events
pub const DEFAULT_EVENTS_RADIUS_KM: u32 = 10;

/// Coordinates of the business
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
}

impl Default for Location {
    /// Downtown Vancouver
    fn default() -> Self {
        Self {
            latitude: 49.2827,
            longitude: -123.1207,
        }
    }
}

/// Settings shared by the hub, the fetchers and the CLI
#[derive(Debug, Clone)]
pub struct Settings {
    /// Directory for persisted documents; `None` uses the XDG data directory
    pub data_dir: Option<PathBuf>,
    /// Where weather and events are looked up
    pub location: Location,
    /// Upper bound on a single provider fetch
    pub fetch_timeout: Duration,
    /// Number of notifications kept in the log
    pub notification_retention: usize,
    /// Search radius for local events
    pub events_radius_km: u32,
    /// Use the simulated fetcher instead of real providers
    pub offline: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_dir: None,
            location: Location::default(),
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
            notification_retention: DEFAULT_RETENTION,
            events_radius_km: DEFAULT_EVENTS_RADIUS_KM,
            offline: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_default() {
        let settings = Settings::default();
        assert!(settings.data_dir.is_none());
        assert_eq!(settings.fetch_timeout, Duration::from_secs(10));
        assert_eq!(settings.notification_retention, 500);
        assert_eq!(settings.events_radius_km, 10);
        assert!(!settings.offline);
        assert!((settings.location.latitude - 49.2827).abs() < 0.0001);
    }
}
