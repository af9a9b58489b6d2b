//! Usage statistics stored alongside the integration configuration
//!
//! Statistics are a free-form JSON object addressed by dotted paths such as
//! `weather.api_calls`. The cache maintains a fixed set of per-source
//! counters; dashboard pages may add their own entries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::IntegrationError;
use crate::source::SourceKind;

/// Live fetches attempted
pub const API_CALLS: &str = "api_calls";
/// Resolutions answered from a fresh cache entry
pub const CACHE_HITS: &str = "cache_hits";
/// Resolutions answered from stale or synthesized data
pub const FALLBACKS: &str = "fallbacks";
/// Failed live fetches
pub const ERRORS: &str = "errors";
/// Timestamp of the last successful fetch
pub const LAST_FETCH: &str = "last_fetch";

/// Statistics object, serialized as a plain JSON object
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Statistics(Map<String, Value>);

impl Statistics {
    /// Sets `value` at a dotted `path`, creating intermediate objects
    ///
    /// Fails for an empty path, an empty segment, or a path that descends
    /// through an existing non-object value.
    pub fn set(&mut self, path: &str, value: Value) -> Result<(), IntegrationError> {
        let invalid = || IntegrationError::InvalidStatisticPath(path.to_string());

        let segments = segments(path).ok_or_else(invalid)?;
        let Some((last, parents)) = segments.split_last() else {
            return Err(invalid());
        };

        let mut node = &mut self.0;
        for segment in parents {
            let entry = node
                .entry(segment.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            node = match entry {
                Value::Object(map) => map,
                _ => return Err(invalid()),
            };
        }
        node.insert(last.to_string(), value);
        Ok(())
    }

    /// Value at a dotted `path`
    pub fn get(&self, path: &str) -> Option<&Value> {
        let segments = segments(path)?;
        let (first, rest) = segments.split_first()?;
        let mut current = self.0.get(*first)?;
        for segment in rest {
            current = current.as_object()?.get(*segment)?;
        }
        Some(current)
    }

    /// Counter `name` of `source`, zero when absent
    pub fn counter(&self, source: SourceKind, name: &str) -> u64 {
        self.get(&format!("{}.{}", source, name))
            .and_then(Value::as_u64)
            .unwrap_or(0)
    }

    /// Timestamp of the last successful fetch of `source`
    pub fn last_fetch(&self, source: SourceKind) -> Option<DateTime<Utc>> {
        self.get(&format!("{}.{}", source, LAST_FETCH))
            .and_then(Value::as_str)
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.with_timezone(&Utc))
    }

    /// Adds one to counter `name` of `source`
    pub(crate) fn increment(&mut self, source: SourceKind, name: &str) -> Result<(), IntegrationError> {
        let next = self.counter(source, name) + 1;
        self.set(&format!("{}.{}", source, name), Value::from(next))
    }

    /// Records the time of a successful fetch
    pub(crate) fn record_fetch(&mut self, source: SourceKind, at: DateTime<Utc>) -> Result<(), IntegrationError> {
        self.set(&format!("{}.{}", source, LAST_FETCH), Value::from(at.to_rfc3339()))
    }
}

/// Trimmed segments of a dotted path, `None` if any segment is empty
fn segments(path: &str) -> Option<Vec<&str>> {
    let segments: Vec<&str> = path.split('.').map(str::trim).collect();
    if segments.iter().any(|s| s.is_empty()) {
        return None;
    }
    Some(segments)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn test_set_creates_intermediate_objects() {
        let mut stats = Statistics::default();
        stats.set("dashboard.views.home", json!(3)).unwrap();

        assert_eq!(stats.get("dashboard.views.home"), Some(&json!(3)));
        assert!(stats.get("dashboard.views").unwrap().is_object());
    }

    #[test]
    fn test_get_and_set_agree_on_padded_segments() {
        let mut stats = Statistics::default();
        stats.set("weather. note ", json!("a")).unwrap();

        assert_eq!(stats.get("weather. note "), Some(&json!("a")));
        assert_eq!(stats.get("weather.note"), Some(&json!("a")));
        assert_eq!(stats.get("weather..note"), None);
    }

    #[test]
    fn test_set_overwrites_leaf() {
        let mut stats = Statistics::default();
        stats.set("weather.note", json!("a")).unwrap();
        stats.set("weather.note", json!({"nested": true})).unwrap();
        assert_eq!(stats.get("weather.note.nested"), Some(&json!(true)));
    }

    #[test]
    fn test_invalid_paths_are_rejected() {
        let mut stats = Statistics::default();
        for path in ["", ".", "weather.", ".weather", "a..b", "  "] {
            let err = stats.set(path, json!(1)).unwrap_err();
            assert!(matches!(err, IntegrationError::InvalidStatisticPath(_)), "{path:?}");
        }
    }

    #[test]
    fn test_cannot_descend_through_scalar() {
        let mut stats = Statistics::default();
        stats.set("weather", json!(5)).unwrap();
        assert!(stats.set("weather.api_calls", json!(1)).is_err());
        assert_eq!(stats.get("weather"), Some(&json!(5)));
    }

    #[test]
    fn test_counters() {
        let mut stats = Statistics::default();
        assert_eq!(stats.counter(SourceKind::Weather, API_CALLS), 0);

        stats.increment(SourceKind::Weather, API_CALLS).unwrap();
        stats.increment(SourceKind::Weather, API_CALLS).unwrap();
        stats.increment(SourceKind::Events, API_CALLS).unwrap();

        assert_eq!(stats.counter(SourceKind::Weather, API_CALLS), 2);
        assert_eq!(stats.counter(SourceKind::Events, API_CALLS), 1);
        assert_eq!(stats.counter(SourceKind::Events, ERRORS), 0);
    }

    #[test]
    fn test_record_fetch() {
        let mut stats = Statistics::default();
        let at = Utc.with_ymd_and_hms(2024, 7, 15, 9, 30, 0).unwrap();
        stats.record_fetch(SourceKind::Suppliers, at).unwrap();
        assert_eq!(stats.last_fetch(SourceKind::Suppliers), Some(at));
        assert_eq!(stats.last_fetch(SourceKind::Weather), None);
    }

    #[test]
    fn test_serializes_as_plain_object() {
        let mut stats = Statistics::default();
        stats.increment(SourceKind::Events, FALLBACKS).unwrap();
        let value = serde_json::to_value(&stats).unwrap();
        assert_eq!(value, json!({"events": {"fallbacks": 1}}));
    }
}
