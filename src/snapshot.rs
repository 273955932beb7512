use chrono::{Datelike, Duration, NaiveDate};

use crate::domain::Domain;
use crate::error::StoreResult;
use crate::models::{Child, NeuroProfile, ZProfileSnapshot};
use crate::norms::NormTable;
use crate::store::Store;

/// Monday of the ISO week containing `date`. Sunday rolls back six days.
pub fn week_start(date: NaiveDate) -> NaiveDate {
    let offset = date.weekday().number_from_monday() as i64 - 1;
    date - Duration::days(offset)
}

/// Scores every domain of `profile` against the age norms and upserts one
/// snapshot per domain for the week containing `today`.
pub async fn record_weekly(
    store: &dyn Store,
    child: &Child,
    profile: &NeuroProfile,
    today: NaiveDate,
) -> StoreResult<Vec<ZProfileSnapshot>> {
    let week = week_start(today);
    let age_in_months = child.age_in_months(today);
    let norms = NormTable::new(store);

    let mut recorded = Vec::with_capacity(Domain::ALL.len());
    for domain in Domain::ALL {
        let raw_score = profile.score(domain);
        let scored = norms.score(age_in_months, domain, raw_score).await?;
        let snapshot = ZProfileSnapshot {
            child_id: child.id,
            domain,
            week_start: week,
            raw_score,
            z_score: scored.z_score,
            percentile: scored.percentile,
            age_in_months,
        };
        debug_assert_eq!(snapshot.week_start.weekday(), chrono::Weekday::Mon);
        store.upsert_snapshot(&snapshot).await?;
        recorded.push(snapshot);
    }

    tracing::debug!(child_id = %child.id, %week, "recorded weekly z-profile");
    Ok(recorded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;
    use chrono::Utc;
    use uuid::Uuid;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn week_starts_on_monday() {
        // 2026-10-12 is a Monday.
        assert_eq!(week_start(date(2026, 10, 12)), date(2026, 10, 12));
        assert_eq!(week_start(date(2026, 10, 15)), date(2026, 10, 12));
        assert_eq!(week_start(date(2026, 10, 18)), date(2026, 10, 12));
        assert_eq!(week_start(date(2026, 10, 19)), date(2026, 10, 19));
    }

    #[tokio::test]
    async fn rerunning_the_same_week_overwrites() {
        let store = MemoryStore::new();
        let child = Child {
            id: Uuid::new_v4(),
            full_name: "Sam Okafor".to_string(),
            date_of_birth: date(2023, 4, 2),
            active: true,
        };
        let mut profile = NeuroProfile::empty(child.id, Utc::now());
        profile.scores.set(Domain::LanguageCommunication, 40.0);

        record_weekly(&store, &child, &profile, date(2026, 10, 13))
            .await
            .unwrap();
        profile.scores.set(Domain::LanguageCommunication, 70.0);
        record_weekly(&store, &child, &profile, date(2026, 10, 16))
            .await
            .unwrap();

        assert_eq!(store.snapshot_count().await, Domain::ALL.len());
        let history = store
            .recent_snapshots(child.id, Domain::LanguageCommunication, date(2026, 1, 5), 12)
            .await
            .unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].raw_score, 70.0);
        assert_eq!(history[0].week_start, date(2026, 10, 12));
    }

    #[tokio::test]
    async fn non_monday_rows_are_rejected_by_the_store() {
        let store = MemoryStore::new();
        let snapshot = ZProfileSnapshot {
            child_id: Uuid::new_v4(),
            domain: Domain::SelfCare,
            week_start: date(2026, 10, 14),
            raw_score: 50.0,
            z_score: 0.0,
            percentile: 50.0,
            age_in_months: 40,
        };
        assert!(store.upsert_snapshot(&snapshot).await.is_err());
    }
}
