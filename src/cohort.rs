use chrono::{DateTime, NaiveDate, Utc};

use crate::domain::Domain;
use crate::models::{Child, ChildDomainStats, NeuroProfile, MIN_COHORT_SIZE};
use crate::stats;

/// Peers whose age in months is within `window_months` of the subject.
pub fn select_cohort<'a>(
    subject: &Child,
    population: &'a [(Child, NeuroProfile)],
    on: NaiveDate,
    window_months: i32,
) -> Vec<&'a NeuroProfile> {
    let subject_age = subject.age_in_months(on);
    population
        .iter()
        .filter(|(peer, _)| peer.active && peer.id != subject.id)
        .filter(|(peer, _)| (peer.age_in_months(on) - subject_age).abs() <= window_months)
        .map(|(_, profile)| profile)
        .collect()
}

/// Cohort mean/std per domain for `subject`.
///
/// Only positive peer scores feed the distribution. Domains with fewer than
/// [`MIN_COHORT_SIZE`] qualifying values produce no row.
pub fn build_cohort_stats(
    subject: &Child,
    population: &[(Child, NeuroProfile)],
    on: NaiveDate,
    window_months: i32,
    now: DateTime<Utc>,
) -> Vec<ChildDomainStats> {
    let cohort = select_cohort(subject, population, on, window_months);
    let age_in_months = subject.age_in_months(on);

    let mut rows = Vec::new();
    for domain in Domain::ALL {
        let values: Vec<f64> = cohort
            .iter()
            .map(|profile| profile.score(domain))
            .filter(|score| *score > 0.0)
            .collect();

        if values.len() < MIN_COHORT_SIZE {
            tracing::debug!(
                child_id = %subject.id,
                %domain,
                cohort_size = values.len(),
                "cohort too small, skipping domain"
            );
            continue;
        }

        rows.push(ChildDomainStats {
            child_id: subject.id,
            domain,
            mean: stats::mean(&values),
            std: stats::population_std(&values),
            cohort_size: values.len(),
            age_in_months,
            calculated_at: now,
        });
    }
    rows
}
