//! Structured justification for alerts and narrative generation.
//!
//! Everything here is data. Prose is composed downstream from these facts.

use serde::{Deserialize, Serialize};

use crate::domain::Domain;
use crate::models::MoodRecord;
use crate::risk::DomainHistory;
use crate::stats;

const TOP_N: usize = 3;
const MOOD_TREND_WINDOW: usize = 7;
const MOOD_DEADBAND: f64 = 0.2;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainStanding {
    pub domain: Domain,
    pub z_score: f64,
    pub percentile: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecliningDomain {
    pub domain: Domain,
    pub slope: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MoodTrend {
    Improving,
    Stable,
    Declining,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoodSummary {
    pub entries: usize,
    pub average: f64,
    /// `1 / (1 + variance)`; 1.0 means perfectly steady.
    pub stability: f64,
    pub trend: MoodTrend,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgeNormStanding {
    pub mean_percentile: f64,
    pub domains_above_median: usize,
    pub domains_below_median: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Explanation {
    pub weakest_domains: Vec<DomainStanding>,
    pub declining_domains: Vec<DecliningDomain>,
    pub mood: MoodSummary,
    pub age_norm_standing: AgeNormStanding,
}

fn by_value(a: f64, b: f64) -> std::cmp::Ordering {
    a.partial_cmp(&b).unwrap_or(std::cmp::Ordering::Equal)
}

pub fn weakest_domains(histories: &[DomainHistory]) -> Vec<DomainStanding> {
    let mut standings: Vec<DomainStanding> = histories
        .iter()
        .filter_map(|h| {
            h.latest().map(|z_score| DomainStanding {
                domain: h.domain,
                z_score,
                percentile: h.latest_percentile,
            })
        })
        .collect();
    standings.sort_by(|a, b| by_value(a.z_score, b.z_score));
    standings.truncate(TOP_N);
    standings
}

pub fn declining_domains(histories: &[DomainHistory], slope_below: f64) -> Vec<DecliningDomain> {
    let mut declining: Vec<DecliningDomain> = histories
        .iter()
        .map(|h| DecliningDomain {
            domain: h.domain,
            slope: h.slope(),
        })
        .filter(|d| d.slope < slope_below)
        .collect();
    declining.sort_by(|a, b| by_value(a.slope, b.slope));
    declining.truncate(TOP_N);
    declining
}

/// Summarizes mood ratings ordered oldest first.
pub fn mood_summary(moods: &[MoodRecord]) -> MoodSummary {
    let ratings: Vec<f64> = moods.iter().map(|m| m.rating as f64).collect();
    let variance = stats::population_variance(&ratings);

    let split = ratings.len().saturating_sub(MOOD_TREND_WINDOW);
    let recent = &ratings[split..];
    let prior = &ratings[split.saturating_sub(MOOD_TREND_WINDOW)..split];

    let trend = if prior.is_empty() || recent.is_empty() {
        MoodTrend::Stable
    } else {
        let change = stats::mean(recent) - stats::mean(prior);
        if change > MOOD_DEADBAND {
            MoodTrend::Improving
        } else if change < -MOOD_DEADBAND {
            MoodTrend::Declining
        } else {
            MoodTrend::Stable
        }
    };

    MoodSummary {
        entries: ratings.len(),
        average: stats::mean(&ratings),
        stability: 1.0 / (1.0 + variance),
        trend,
    }
}

pub fn age_norm_standing(histories: &[DomainHistory]) -> AgeNormStanding {
    let percentiles: Vec<f64> = histories.iter().filter_map(|h| h.latest_percentile).collect();
    AgeNormStanding {
        mean_percentile: stats::mean(&percentiles),
        domains_above_median: percentiles.iter().filter(|p| **p > 50.0).count(),
        domains_below_median: percentiles.iter().filter(|p| **p < 50.0).count(),
    }
}

pub fn explain(histories: &[DomainHistory], moods: &[MoodRecord], slope_below: f64) -> Explanation {
    Explanation {
        weakest_domains: weakest_domains(histories),
        declining_domains: declining_domains(histories, slope_below),
        mood: mood_summary(moods),
        age_norm_standing: age_norm_standing(histories),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};
    use uuid::Uuid;

    fn history(domain: Domain, z_scores: &[f64], percentile: f64) -> DomainHistory {
        DomainHistory {
            domain,
            z_scores: z_scores.to_vec(),
            latest_percentile: Some(percentile),
        }
    }

    fn moods(ratings: &[i32]) -> Vec<MoodRecord> {
        let start = NaiveDate::from_ymd_opt(2026, 9, 1).unwrap();
        ratings
            .iter()
            .enumerate()
            .map(|(i, rating)| MoodRecord {
                child_id: Uuid::nil(),
                recorded_on: start + Duration::days(i as i64),
                rating: *rating,
            })
            .collect()
    }

    #[test]
    fn weakest_three_by_current_z() {
        let histories = vec![
            history(Domain::FineMotor, &[0.0, -1.2], 11.5),
            history(Domain::SelfCare, &[0.8], 78.8),
            history(Domain::GrossMotor, &[-0.4], 34.5),
            history(Domain::SocialEmotional, &[-2.0, -0.1], 46.0),
            history(Domain::CreativeExpression, &[], 50.0),
        ];
        let weakest = weakest_domains(&histories);
        let domains: Vec<Domain> = weakest.iter().map(|w| w.domain).collect();
        assert_eq!(
            domains,
            vec![Domain::FineMotor, Domain::GrossMotor, Domain::SocialEmotional]
        );
        assert_eq!(weakest[0].percentile, Some(11.5));
    }

    #[test]
    fn declining_sorted_most_negative_first() {
        let histories = vec![
            history(Domain::FineMotor, &[0.5, 0.2, -0.1, -0.6], 27.0),
            history(Domain::SelfCare, &[0.0, -0.05, -0.1], 46.0),
            history(Domain::GrossMotor, &[1.0, 0.0, -1.0], 16.0),
            history(Domain::CognitiveReasoning, &[0.3, 0.1], 58.0),
            history(Domain::SensoryProcessing, &[0.9, 0.6, 0.2], 58.0),
        ];
        let declining = declining_domains(&histories, -0.1);
        let domains: Vec<Domain> = declining.iter().map(|d| d.domain).collect();
        assert_eq!(
            domains,
            vec![Domain::GrossMotor, Domain::FineMotor, Domain::SensoryProcessing]
        );
    }

    #[test]
    fn mood_trend_compares_last_two_weeks() {
        let improving = mood_summary(&moods(&[2, 2, 2, 2, 2, 2, 2, 4, 4, 4, 4, 4, 4, 4]));
        assert_eq!(improving.trend, MoodTrend::Improving);

        let declining = mood_summary(&moods(&[4, 4, 4, 4, 4, 4, 4, 3, 3, 3, 3, 3, 3, 3]));
        assert_eq!(declining.trend, MoodTrend::Declining);

        let steady = mood_summary(&moods(&[3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 4]));
        assert_eq!(steady.trend, MoodTrend::Stable);
        assert_eq!(steady.entries, 14);
    }

    #[test]
    fn short_mood_history_is_stable() {
        let summary = mood_summary(&moods(&[1, 5, 1]));
        assert_eq!(summary.trend, MoodTrend::Stable);
        assert!((summary.average - 7.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn empty_mood_history_is_perfectly_stable() {
        let summary = mood_summary(&[]);
        assert_eq!(summary.entries, 0);
        assert_eq!(summary.stability, 1.0);
        assert_eq!(summary.trend, MoodTrend::Stable);
    }

    #[test]
    fn standing_counts_domains_around_median() {
        let histories = vec![
            history(Domain::FineMotor, &[1.0], 84.0),
            history(Domain::SelfCare, &[0.0], 50.0),
            history(Domain::GrossMotor, &[-1.0], 16.0),
            history(Domain::SocialEmotional, &[-0.5], 30.0),
        ];
        let standing = age_norm_standing(&histories);
        assert_eq!(standing.domains_above_median, 1);
        assert_eq!(standing.domains_below_median, 2);
        assert!((standing.mean_percentile - 45.0).abs() < 1e-12);
    }
}
