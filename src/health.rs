//! Aggregate health score across the enabled integrations

use serde::{Deserialize, Serialize};

use crate::config::IntegrationConfig;
use crate::quality::QualitySnapshot;
use crate::source::{PerSource, SourceKind};

/// Weight of the operational percentage in the overall score
const OPERATIONAL_WEIGHT: f64 = 0.4;
/// Weight of each quality metric in the overall score
const QUALITY_WEIGHT: f64 = 0.2;

/// Coarse health rating derived from the overall score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    Excellent,
    Good,
    Fair,
    Poor,
    NotConfigured,
}

impl HealthStatus {
    /// Maps an overall score to its rating
    pub fn from_score(score: f64) -> Self {
        if score >= 90.0 {
            HealthStatus::Excellent
        } else if score >= 75.0 {
            HealthStatus::Good
        } else if score >= 50.0 {
            HealthStatus::Fair
        } else if score > 0.0 {
            HealthStatus::Poor
        } else {
            HealthStatus::NotConfigured
        }
    }
}

/// Derived health of the integration layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthSnapshot {
    pub operational_percentage: f64,
    pub avg_completeness: f64,
    pub avg_timeliness: f64,
    pub avg_accuracy: f64,
    pub overall_health: f64,
    pub health_status: HealthStatus,
    pub enabled_count: usize,
    pub total_count: usize,
}

impl HealthSnapshot {
    fn not_configured() -> Self {
        Self {
            operational_percentage: 0.0,
            avg_completeness: 0.0,
            avg_timeliness: 0.0,
            avg_accuracy: 0.0,
            overall_health: 0.0,
            health_status: HealthStatus::NotConfigured,
            enabled_count: 0,
            total_count: SourceKind::ALL.len(),
        }
    }
}

/// Computes the health snapshot
///
/// Only enabled sources contribute: a disabled source is excluded from both
/// the operational percentage and the quality averages.
///
/// # Arguments
/// * `configs` - Configuration of each source
/// * `operational` - Live operational flag of each source
/// * `quality` - Latest quality snapshot of each source
pub fn calculate(
    configs: &PerSource<IntegrationConfig>,
    operational: &PerSource<bool>,
    quality: &PerSource<QualitySnapshot>,
) -> HealthSnapshot {
    let enabled: Vec<SourceKind> = configs
        .iter()
        .filter(|(_, c)| c.enabled)
        .map(|(s, _)| s)
        .collect();
    if enabled.is_empty() {
        return HealthSnapshot::not_configured();
    }

    let count = enabled.len() as f64;
    let up = enabled.iter().filter(|s| *operational.get(**s)).count() as f64;
    let average = |metric: fn(&QualitySnapshot) -> f64| {
        enabled.iter().map(|s| metric(quality.get(*s))).sum::<f64>() / count
    };

    let operational_percentage = 100.0 * up / count;
    let avg_completeness = average(|q| q.completeness);
    let avg_timeliness = average(|q| q.timeliness);
    let avg_accuracy = average(|q| q.accuracy);
    let overall_health = OPERATIONAL_WEIGHT * operational_percentage
        + QUALITY_WEIGHT * avg_completeness
        + QUALITY_WEIGHT * avg_timeliness
        + QUALITY_WEIGHT * avg_accuracy;

    HealthSnapshot {
        operational_percentage,
        avg_completeness,
        avg_timeliness,
        avg_accuracy,
        overall_health,
        health_status: HealthStatus::from_score(overall_health),
        enabled_count: enabled.len(),
        total_count: SourceKind::ALL.len(),
    }
}
