//! Append-only audit trail of configuration changes, fallbacks and errors

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::source::SourceKind;

/// Default number of notifications kept in the persisted log
pub const DEFAULT_RETENTION: usize = 500;

/// What a notification records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Configuration,
    Cache,
    Error,
    Reset,
}

/// The source a notification is about, or every source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum Scope {
    Source(SourceKind),
    All,
}

impl From<Scope> for String {
    fn from(scope: Scope) -> Self {
        scope.to_string()
    }
}

impl TryFrom<String> for Scope {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        if value == "all" {
            return Ok(Scope::All);
        }
        value
            .parse::<SourceKind>()
            .map(Scope::Source)
            .map_err(|e| e.to_string())
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::Source(source) => f.write_str(source.as_str()),
            Scope::All => f.write_str("all"),
        }
    }
}

impl From<SourceKind> for Scope {
    fn from(source: SourceKind) -> Self {
        Scope::Source(source)
    }
}

/// A single immutable log entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub source: Scope,
    pub message: String,
}

/// Insertion-ordered notification log
///
/// Serialized as a plain array. When more than `retention` entries are held,
/// the oldest are dropped on append.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NotificationLog {
    entries: Vec<Notification>,
}

impl NotificationLog {
    /// Appends an entry, trimming the oldest beyond `retention`
    pub fn append(&mut self, notification: Notification, retention: usize) {
        self.entries.push(notification);
        if self.entries.len() > retention {
            let excess = self.entries.len() - retention;
            self.entries.drain(..excess);
        }
    }

    /// Returns up to `limit` entries, most recent first
    ///
    /// Ordered by timestamp; entries sharing a timestamp keep insertion order,
    /// later insertions counting as more recent.
    pub fn recent(&self, limit: usize) -> Vec<Notification> {
        let mut indexed: Vec<(usize, &Notification)> = self.entries.iter().enumerate().collect();
        indexed.sort_by(|(ia, a), (ib, b)| b.timestamp.cmp(&a.timestamp).then(ib.cmp(ia)));
        indexed
            .into_iter()
            .take(limit)
            .map(|(_, n)| n.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn at(minute: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 7, 15, 12, 0, 0).unwrap() + Duration::minutes(minute)
    }

    fn note(minute: i64, message: &str) -> Notification {
        Notification {
            timestamp: at(minute),
            kind: NotificationKind::Cache,
            source: Scope::Source(SourceKind::Weather),
            message: message.to_string(),
        }
    }

    fn messages(list: &[Notification]) -> Vec<&str> {
        list.iter().map(|n| n.message.as_str()).collect()
    }

    #[test]
    fn test_recent_is_most_recent_first() {
        let mut log = NotificationLog::default();
        log.append(note(0, "a"), DEFAULT_RETENTION);
        log.append(note(5, "b"), DEFAULT_RETENTION);
        log.append(note(10, "c"), DEFAULT_RETENTION);

        assert_eq!(messages(&log.recent(10)), vec!["c", "b", "a"]);
        assert_eq!(messages(&log.recent(2)), vec!["c", "b"]);
        assert!(log.recent(0).is_empty());
    }

    #[test]
    fn test_ties_broken_by_insertion_order() {
        let mut log = NotificationLog::default();
        log.append(note(1, "first"), DEFAULT_RETENTION);
        log.append(note(1, "second"), DEFAULT_RETENTION);
        log.append(note(1, "third"), DEFAULT_RETENTION);

        assert_eq!(messages(&log.recent(3)), vec!["third", "second", "first"]);
    }

    #[test]
    fn test_out_of_order_timestamps_sorted() {
        let mut log = NotificationLog::default();
        log.append(note(10, "late"), DEFAULT_RETENTION);
        log.append(note(2, "early"), DEFAULT_RETENTION);

        assert_eq!(messages(&log.recent(2)), vec!["late", "early"]);
    }

    #[test]
    fn test_retention_drops_oldest() {
        let mut log = NotificationLog::default();
        for i in 0..5 {
            log.append(note(i, &i.to_string()), 3);
        }
        assert_eq!(log.len(), 3);
        assert_eq!(messages(&log.recent(10)), vec!["4", "3", "2"]);
    }

    #[test]
    fn test_serialized_shape() {
        let mut log = NotificationLog::default();
        log.append(
            Notification {
                timestamp: at(0),
                kind: NotificationKind::Reset,
                source: Scope::All,
                message: "All integrations reset".to_string(),
            },
            DEFAULT_RETENTION,
        );

        let value = serde_json::to_value(&log).unwrap();
        assert!(value.is_array());
        assert_eq!(value[0]["type"], "reset");
        assert_eq!(value[0]["source"], "all");

        let back: NotificationLog = serde_json::from_value(value).unwrap();
        assert_eq!(back.recent(1)[0].source, Scope::All);
    }

    #[test]
    fn test_unknown_scope_is_rejected() {
        let json = r#"{"timestamp":"2024-07-15T12:00:00Z","type":"cache","source":"traffic","message":"x"}"#;
        assert!(serde_json::from_str::<Notification>(json).is_err());
    }
}
