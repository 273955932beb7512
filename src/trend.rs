use chrono::{Duration, NaiveDate};

use crate::domain::{Domain, DomainMap};
use crate::models::{Assessment, DevelopmentTrend, NeuroProfile, ZProfileSnapshot};
use crate::stats;

/// Slope of a weekly Z series, oldest first. Negative means declining.
pub fn slope(z_scores: &[f64]) -> f64 {
    stats::ols_slope(z_scores)
}

pub fn z_series(snapshots: &[ZProfileSnapshot]) -> Vec<f64> {
    snapshots.iter().map(|s| s.z_score).collect()
}

/// Percentage-point change of each domain over `[period_start, period_start + window_days)`
/// against the profile baseline. Domains not assessed in the window are omitted.
pub fn build_trends(
    profile: &NeuroProfile,
    assessments: &[Assessment],
    period_start: NaiveDate,
    window_days: i64,
) -> Vec<DevelopmentTrend> {
    let period_end = period_start + Duration::days(window_days);
    let mut collected: DomainMap<(f64, usize)> = DomainMap::filled((0.0, 0));

    for assessment in assessments {
        let assessed_on = assessment.assessed_at.date_naive();
        if assessed_on < period_start || assessed_on >= period_end {
            continue;
        }
        for score in &assessment.scores {
            let (sum, count) = collected.get(score.domain);
            collected.set(score.domain, (sum + score.effective_percentage(), count + 1));
        }
    }

    Domain::ALL
        .iter()
        .filter_map(|domain| {
            let (sum, count) = collected.get(*domain);
            if count == 0 {
                return None;
            }
            let window_average = stats::round_to(sum / count as f64, 1);
            let baseline = profile.score(*domain);
            Some(DevelopmentTrend {
                child_id: profile.child_id,
                domain: *domain,
                period_start,
                period_end,
                baseline,
                window_average,
                delta: stats::round_to(window_average - baseline, 1),
            })
        })
        .collect()
}
