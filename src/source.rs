//! The three external feeds and their fixed freshness policy
//!
//! Each source has its own cache time-to-live and quality decay constants.
//! These are policy values, not user settings, and are kept exactly as the
//! dashboard has always computed them.

use std::fmt;
use std::str::FromStr;

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::error::IntegrationError;

/// One of the external feeds the dashboard integrates with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Weather,
    Events,
    Suppliers,
}

/// Freshness and decay constants for a single source
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SourcePolicy {
    /// Maximum cache age before a refetch is attempted
    pub ttl: Duration,
    /// Timeliness points lost per hour of cache age
    pub decay_per_hour: f64,
    /// Lowest accuracy a stale payload can decay to
    pub accuracy_floor: f64,
}

impl SourcePolicy {
    /// Accuracy points lost per hour, always half the timeliness decay
    pub fn accuracy_decay_per_hour(&self) -> f64 {
        self.decay_per_hour / 2.0
    }
}

impl SourceKind {
    /// All sources, in display order
    pub const ALL: [SourceKind; 3] = [SourceKind::Weather, SourceKind::Events, SourceKind::Suppliers];

    /// Returns the wire name used in persisted documents and on the CLI
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Weather => "weather",
            SourceKind::Events => "events",
            SourceKind::Suppliers => "suppliers",
        }
    }

    /// Returns a human-readable label
    pub fn display_name(&self) -> &'static str {
        match self {
            SourceKind::Weather => "Weather",
            SourceKind::Events => "Local events",
            SourceKind::Suppliers => "Suppliers",
        }
    }

    /// Stable index into per-source arrays
    pub fn index(&self) -> usize {
        match self {
            SourceKind::Weather => 0,
            SourceKind::Events => 1,
            SourceKind::Suppliers => 2,
        }
    }

    /// Returns the fixed freshness policy for this source
    pub fn policy(&self) -> SourcePolicy {
        match self {
            SourceKind::Weather => SourcePolicy {
                ttl: Duration::hours(1),
                decay_per_hour: 5.0,
                accuracy_floor: 70.0,
            },
            SourceKind::Events => SourcePolicy {
                ttl: Duration::hours(4),
                decay_per_hour: 2.0,
                accuracy_floor: 75.0,
            },
            SourceKind::Suppliers => SourcePolicy {
                ttl: Duration::hours(12),
                decay_per_hour: 0.5,
                accuracy_floor: 80.0,
            },
        }
    }

    /// Key of the cache document for this source
    pub fn cache_key(&self) -> String {
        format!("cache.{}", self.as_str())
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceKind {
    type Err = IntegrationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "weather" => Ok(SourceKind::Weather),
            "events" | "event" => Ok(SourceKind::Events),
            "suppliers" | "supplier" => Ok(SourceKind::Suppliers),
            _ => Err(IntegrationError::UnknownSource(s.to_string())),
        }
    }
}

/// One value per source, serialized as `{weather, events, suppliers}`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, bound(deserialize = "T: Deserialize<'de> + Default"))]
pub struct PerSource<T> {
    pub weather: T,
    pub events: T,
    pub suppliers: T,
}

impl<T> PerSource<T> {
    /// Builds a value for each source from `f`
    pub fn from_fn(mut f: impl FnMut(SourceKind) -> T) -> Self {
        Self {
            weather: f(SourceKind::Weather),
            events: f(SourceKind::Events),
            suppliers: f(SourceKind::Suppliers),
        }
    }

    pub fn get(&self, source: SourceKind) -> &T {
        match source {
            SourceKind::Weather => &self.weather,
            SourceKind::Events => &self.events,
            SourceKind::Suppliers => &self.suppliers,
        }
    }

    pub fn get_mut(&mut self, source: SourceKind) -> &mut T {
        match source {
            SourceKind::Weather => &mut self.weather,
            SourceKind::Events => &mut self.events,
            SourceKind::Suppliers => &mut self.suppliers,
        }
    }

    /// Pairs of source and value, in display order
    pub fn iter(&self) -> impl Iterator<Item = (SourceKind, &T)> {
        SourceKind::ALL.into_iter().map(move |s| (s, self.get(s)))
    }
}

/// Target of a reset: one source or all of them
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetTarget {
    One(SourceKind),
    All,
}

impl ResetTarget {
    /// Sources affected by this reset
    pub fn sources(&self) -> Vec<SourceKind> {
        match self {
            ResetTarget::One(source) => vec![*source],
            ResetTarget::All => SourceKind::ALL.to_vec(),
        }
    }
}

impl From<SourceKind> for ResetTarget {
    fn from(source: SourceKind) -> Self {
        ResetTarget::One(source)
    }
}

impl FromStr for ResetTarget {
    type Err = IntegrationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("all") {
            return Ok(ResetTarget::All);
        }
        s.parse().map(ResetTarget::One)
    }
}
