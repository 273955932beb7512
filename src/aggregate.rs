use chrono::{DateTime, Utc};

use crate::domain::{Domain, DomainMap};
use crate::models::{Assessment, NeuroProfile};
use crate::stats;

/// Folds every assessment of a child into its ten-domain profile.
///
/// Each domain becomes the mean of its historical percentages, rounded to one
/// decimal. Scores with neither a percentage nor a raw score contribute `0`
/// and dilute the average. Domains never assessed keep the value from
/// `previous` (or `0` for a new profile).
pub fn build_profile(
    previous: Option<&NeuroProfile>,
    child_id: uuid::Uuid,
    assessments: &[Assessment],
    now: DateTime<Utc>,
) -> NeuroProfile {
    let mut collected: DomainMap<(f64, usize)> = DomainMap::filled((0.0, 0));

    for assessment in assessments.iter().filter(|a| a.child_id == child_id) {
        for score in &assessment.scores {
            let (sum, count) = collected.get(score.domain);
            collected.set(score.domain, (sum + score.effective_percentage(), count + 1));
        }
    }

    let mut profile = previous
        .cloned()
        .unwrap_or_else(|| NeuroProfile::empty(child_id, now));

    for domain in Domain::ALL {
        let (sum, count) = collected.get(domain);
        if count > 0 {
            profile
                .scores
                .set(domain, stats::round_to(sum / count as f64, 1));
        }
    }
    profile.updated_at = now;
    profile
}
