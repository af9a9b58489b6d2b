//! Time-decayed data-quality model
//!
//! A fresh fetch scores `{100, 100, 95}`. As a cached payload ages, its
//! timeliness drops by the source's decay rate per hour and its accuracy by
//! half that rate, clamped at the source's accuracy floor. Completeness is
//! binary: 100 once any payload exists.

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::source::SourceKind;

/// Accuracy reported for a fresh fetch; never 100
pub const FRESH_ACCURACY: f64 = 95.0;

/// Quality metrics for one source, each in 0..=100
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct QualitySnapshot {
    pub completeness: f64,
    pub timeliness: f64,
    pub accuracy: f64,
}

impl QualitySnapshot {
    /// Baseline immediately after a successful fetch
    pub const FRESH: QualitySnapshot = QualitySnapshot {
        completeness: 100.0,
        timeliness: 100.0,
        accuracy: FRESH_ACCURACY,
    };

    /// Quality of a source that has never produced a payload
    pub const EMPTY: QualitySnapshot = QualitySnapshot {
        completeness: 0.0,
        timeliness: 0.0,
        accuracy: 0.0,
    };

    /// Copy rounded to two decimals, for display
    pub fn rounded(&self) -> Self {
        let round = |v: f64| (v * 100.0).round() / 100.0;
        Self {
            completeness: round(self.completeness),
            timeliness: round(self.timeliness),
            accuracy: round(self.accuracy),
        }
    }
}

/// Computes the quality of a payload of the given age
///
/// `fresh_fetch` short-circuits to the fresh baseline. Negative ages from
/// clock skew count as zero.
pub fn assess(source: SourceKind, age: Duration, fresh_fetch: bool) -> QualitySnapshot {
    if fresh_fetch {
        return QualitySnapshot::FRESH;
    }

    let policy = source.policy();
    let age_hours = (age.num_milliseconds().max(0) as f64) / 3_600_000.0;

    QualitySnapshot {
        completeness: 100.0,
        timeliness: (100.0 - age_hours * policy.decay_per_hour).max(0.0),
        accuracy: (FRESH_ACCURACY - age_hours * policy.accuracy_decay_per_hour())
            .max(policy.accuracy_floor),
    }
}

/// Quality of a freshly synthesized stand-in payload
///
/// The payload is present but carries no timely information, and its
/// accuracy sits at the source's floor.
pub fn synthesized(source: SourceKind) -> QualitySnapshot {
    QualitySnapshot {
        completeness: 100.0,
        timeliness: 0.0,
        accuracy: source.policy().accuracy_floor,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_fresh_fetch_baseline() {
        for source in SourceKind::ALL {
            let q = assess(source, Duration::hours(30), true);
            assert_eq!(q, QualitySnapshot::FRESH);
        }
    }

    #[test]
    fn test_zero_age_matches_fresh_baseline() {
        let q = assess(SourceKind::Weather, Duration::zero(), false);
        assert_eq!(q, QualitySnapshot::FRESH);
    }

    #[test]
    fn test_weather_decay_after_two_hours() {
        let q = assess(SourceKind::Weather, Duration::hours(2), false);
        assert!(approx(q.completeness, 100.0));
        assert!(approx(q.timeliness, 90.0));
        assert!(approx(q.accuracy, 90.0));
    }

    #[test]
    fn test_events_decay_after_five_hours() {
        let q = assess(SourceKind::Events, Duration::hours(5), false);
        assert!(approx(q.timeliness, 90.0));
        assert!(approx(q.accuracy, 90.0));
    }

    #[test]
    fn test_suppliers_decay_after_a_day() {
        let q = assess(SourceKind::Suppliers, Duration::hours(24), false);
        assert!(approx(q.timeliness, 88.0));
        assert!(approx(q.accuracy, 89.0));
    }

    #[test]
    fn test_decay_is_clamped() {
        let q = assess(SourceKind::Weather, Duration::days(10), false);
        assert!(approx(q.timeliness, 0.0));
        assert!(approx(q.accuracy, 70.0));

        let q = assess(SourceKind::Events, Duration::days(10), false);
        assert!(approx(q.accuracy, 75.0));

        let q = assess(SourceKind::Suppliers, Duration::days(100), false);
        assert!(approx(q.accuracy, 80.0));
    }

    #[test]
    fn test_fractional_hours() {
        let q = assess(SourceKind::Weather, Duration::minutes(90), false);
        assert!(approx(q.timeliness, 92.5));
        assert!(approx(q.accuracy, 91.25));
    }

    #[test]
    fn test_negative_age_counts_as_zero() {
        let q = assess(SourceKind::Events, Duration::hours(-3), false);
        assert_eq!(q, QualitySnapshot::FRESH);
    }

    #[test]
    fn test_monotonically_non_increasing_in_age() {
        for source in SourceKind::ALL {
            let mut previous = assess(source, Duration::zero(), false);
            for minutes in (15..=60 * 24 * 14).step_by(15) {
                let q = assess(source, Duration::minutes(minutes), false);
                assert!(q.timeliness <= previous.timeliness, "{source} timeliness rose");
                assert!(q.accuracy <= previous.accuracy, "{source} accuracy rose");
                assert!(approx(q.completeness, 100.0));
                previous = q;
            }
        }
    }

    #[test]
    fn test_synthesized_quality() {
        let q = synthesized(SourceKind::Suppliers);
        assert_eq!(q.completeness, 100.0);
        assert_eq!(q.timeliness, 0.0);
        assert_eq!(q.accuracy, 80.0);
    }

    #[test]
    fn test_rounded() {
        let q = QualitySnapshot {
            completeness: 100.0,
            timeliness: 66.666_666,
            accuracy: 80.125_1,
        }
        .rounded();
        assert_eq!(q.timeliness, 66.67);
        assert_eq!(q.accuracy, 80.13);
    }
}
