use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::config::{EngineConfig, SeverityThresholds};
use crate::domain::Domain;
use crate::models::{MoodRecord, RiskProfile, Severity, ZProfileSnapshot};
use crate::stats;
use crate::trend;

/// Weekly Z-scores of one domain, oldest first.
#[derive(Debug, Clone, PartialEq)]
pub struct DomainHistory {
    pub domain: Domain,
    pub z_scores: Vec<f64>,
    pub latest_percentile: Option<f64>,
}

impl DomainHistory {
    pub fn from_snapshots(domain: Domain, snapshots: &[ZProfileSnapshot]) -> Self {
        Self {
            domain,
            z_scores: trend::z_series(snapshots),
            latest_percentile: snapshots.last().map(|s| s.percentile),
        }
    }

    pub fn latest(&self) -> Option<f64> {
        self.z_scores.last().copied()
    }

    pub fn slope(&self) -> f64 {
        trend::slope(&self.z_scores)
    }
}

pub fn severity(risk_score: f64, thresholds: &SeverityThresholds) -> Severity {
    if risk_score < thresholds.high_below {
        Severity::High
    } else if risk_score < thresholds.medium_below {
        Severity::Medium
    } else {
        Severity::Low
    }
}

pub fn emotional_instability(moods: &[MoodRecord]) -> f64 {
    let ratings: Vec<f64> = moods.iter().map(|m| m.rating as f64).collect();
    stats::population_variance(&ratings)
}

/// Recomputes the full risk profile of a child from its recent Z history
/// and mood ratings. Domains without history are left out, not zero-filled.
pub fn compute_risk_profile(
    child_id: Uuid,
    histories: &[DomainHistory],
    moods: &[MoodRecord],
    config: &EngineConfig,
    now: DateTime<Utc>,
) -> RiskProfile {
    let with_data: Vec<&DomainHistory> = histories
        .iter()
        .filter(|h| !h.z_scores.is_empty())
        .collect();

    let latest: Vec<f64> = with_data.iter().filter_map(|h| h.latest()).collect();
    let slopes: Vec<(Domain, f64)> = with_data
        .iter()
        .map(|h| (h.domain, h.slope()))
        .filter(|(_, slope)| slope.is_finite())
        .collect();
    let slope_values: Vec<f64> = slopes.iter().map(|(_, s)| *s).collect();

    let avg_z_score = stats::mean(&latest);
    let trend_slope = stats::mean(&slope_values);
    let domain_imbalance = stats::population_std(&latest);
    let emotional_instability = emotional_instability(moods);

    let weights = &config.risk_weights;
    let risk_score = weights.avg_z_score * -avg_z_score
        + weights.trend_slope * -trend_slope
        + weights.domain_imbalance * domain_imbalance
        + weights.emotional_instability * emotional_instability;

    let mut by_mean: Vec<(Domain, f64)> = with_data
        .iter()
        .map(|h| (h.domain, stats::mean(&h.z_scores)))
        .collect();
    by_mean.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));

    let declining_domain = slopes
        .iter()
        .copied()
        .min_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
        .filter(|(_, slope)| *slope < config.declining_slope_below)
        .map(|(domain, _)| domain);

    RiskProfile {
        child_id,
        risk_score,
        severity: severity(risk_score, &config.severity),
        avg_z_score,
        trend_slope,
        domain_imbalance,
        emotional_instability,
        weakest_domain: by_mean.first().map(|(domain, _)| *domain),
        strongest_domain: by_mean.last().map(|(domain, _)| *domain),
        declining_domain,
        calculated_at: now,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn history(domain: Domain, z_scores: &[f64]) -> DomainHistory {
        DomainHistory {
            domain,
            z_scores: z_scores.to_vec(),
            latest_percentile: None,
        }
    }

    fn mood(day: u32, rating: i32) -> MoodRecord {
        MoodRecord {
            child_id: Uuid::nil(),
            recorded_on: NaiveDate::from_ymd_opt(2026, 9, day).unwrap(),
            rating,
        }
    }

    #[test]
    fn severity_boundaries_are_strict() {
        let thresholds = SeverityThresholds::default();
        assert_eq!(severity(-1.5, &thresholds), Severity::Medium);
        assert_eq!(severity(-1.50001, &thresholds), Severity::High);
        assert_eq!(severity(-0.8, &thresholds), Severity::Low);
        assert_eq!(severity(-0.80001, &thresholds), Severity::Medium);
    }

    #[test]
    fn no_mood_records_means_no_instability() {
        assert_eq!(emotional_instability(&[]), 0.0);
    }

    #[test]
    fn mood_variance_is_population_variance() {
        let moods = vec![mood(1, 1), mood(2, 3), mood(3, 5)];
        assert!((emotional_instability(&moods) - 8.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn composite_uses_weighted_components() {
        let histories = vec![
            history(Domain::FineMotor, &[0.5, 0.2, -0.1, -0.6]),
            history(Domain::SelfCare, &[1.0, 1.0, 1.0, 1.0]),
            history(Domain::GrossMotor, &[]),
        ];
        let moods = vec![mood(1, 2), mood(2, 4)];
        let profile = compute_risk_profile(
            Uuid::nil(),
            &histories,
            &moods,
            &EngineConfig::default(),
            Utc::now(),
        );

        assert!((profile.avg_z_score - 0.2).abs() < 1e-12);
        assert!((profile.trend_slope + 0.18).abs() < 1e-9);
        assert!((profile.domain_imbalance - 0.8).abs() < 1e-12);
        assert!((profile.emotional_instability - 1.0).abs() < 1e-12);
        let expected = 0.4 * -0.2 + 0.3 * 0.18 + 0.2 * 0.8 + 0.1 * 1.0;
        assert!((profile.risk_score - expected).abs() < 1e-9);
        assert_eq!(profile.severity, Severity::Low);
        assert_eq!(profile.weakest_domain, Some(Domain::FineMotor));
        assert_eq!(profile.strongest_domain, Some(Domain::SelfCare));
        assert_eq!(profile.declining_domain, Some(Domain::FineMotor));
    }

    #[test]
    fn gentle_slopes_do_not_report_a_declining_domain() {
        let histories = vec![history(Domain::FineMotor, &[0.1, 0.05, 0.0])];
        let profile = compute_risk_profile(
            Uuid::nil(),
            &histories,
            &[],
            &EngineConfig::default(),
            Utc::now(),
        );
        assert_eq!(profile.declining_domain, None);
    }

    #[test]
    fn declining_profile_yields_positive_risk_score() {
        let histories: Vec<DomainHistory> = Domain::ALL
            .iter()
            .map(|d| history(*d, &[-1.0, -1.8, -2.6, -3.4]))
            .collect();
        let profile = compute_risk_profile(
            Uuid::nil(),
            &histories,
            &[],
            &EngineConfig::default(),
            Utc::now(),
        );
        // 0.4 * 3.4 + 0.3 * 0.8; tiers only fire below the negative thresholds.
        assert!((profile.risk_score - 1.6).abs() < 1e-9);
        assert_eq!(profile.severity, Severity::Low);
    }

    #[test]
    fn empty_history_is_neutral() {
        let profile = compute_risk_profile(
            Uuid::nil(),
            &[],
            &[],
            &EngineConfig::default(),
            Utc::now(),
        );
        assert_eq!(profile.risk_score, 0.0);
        assert_eq!(profile.severity, Severity::Low);
        assert_eq!(profile.weakest_domain, None);
        assert_eq!(profile.declining_domain, None);
    }
}
