//! Persistence port for the engine.
//!
//! Every write is an upsert keyed by the entity's natural key, so re-running
//! any batch step replaces rows instead of duplicating them.

use async_trait::async_trait;
use chrono::NaiveDate;
use uuid::Uuid;

use crate::domain::Domain;
use crate::error::StoreResult;
use crate::models::{
    AgeNorm, Alert, Assessment, Child, ChildDomainStats, DevelopmentTrend, MoodRecord,
    NeuroProfile, RiskProfile, ZProfileSnapshot,
};

#[async_trait]
pub trait Store: Send + Sync {
    async fn active_children(&self) -> StoreResult<Vec<Child>>;

    async fn child(&self, id: Uuid) -> StoreResult<Option<Child>>;

    async fn upsert_child(&self, child: &Child) -> StoreResult<()>;

    async fn assessments_for(&self, child_id: Uuid) -> StoreResult<Vec<Assessment>>;

    /// Returns `false` when `source_key` was already imported.
    async fn insert_assessment(
        &self,
        assessment: &Assessment,
        source_key: Option<&str>,
    ) -> StoreResult<bool>;

    async fn mood_records(&self, child_id: Uuid, since: NaiveDate) -> StoreResult<Vec<MoodRecord>>;

    async fn insert_mood(&self, record: &MoodRecord) -> StoreResult<()>;

    async fn profile(&self, child_id: Uuid) -> StoreResult<Option<NeuroProfile>>;

    /// Active children paired with their profile, for cohort sampling.
    async fn active_profiles(&self) -> StoreResult<Vec<(Child, NeuroProfile)>>;

    async fn upsert_profile(&self, profile: &NeuroProfile) -> StoreResult<()>;

    async fn domain_stats(&self, child_id: Uuid) -> StoreResult<Vec<ChildDomainStats>>;

    /// Replaces every stats row of the child with `rows`.
    async fn replace_domain_stats(
        &self,
        child_id: Uuid,
        rows: &[ChildDomainStats],
    ) -> StoreResult<()>;

    async fn age_norm(&self, age_bucket: i32, domain: Domain) -> StoreResult<Option<AgeNorm>>;

    /// Inserts `norm` unless a row for its key exists; returns the stored row.
    async fn insert_age_norm_if_absent(&self, norm: &AgeNorm) -> StoreResult<AgeNorm>;

    async fn upsert_age_norm(&self, norm: &AgeNorm) -> StoreResult<()>;

    async fn upsert_snapshot(&self, snapshot: &ZProfileSnapshot) -> StoreResult<()>;

    /// Up to `limit` of the most recent weekly snapshots with
    /// `week_start >= since`, oldest first.
    async fn recent_snapshots(
        &self,
        child_id: Uuid,
        domain: Domain,
        since: NaiveDate,
        limit: usize,
    ) -> StoreResult<Vec<ZProfileSnapshot>>;

    async fn risk_profile(&self, child_id: Uuid) -> StoreResult<Option<RiskProfile>>;

    async fn upsert_risk_profile(&self, profile: &RiskProfile) -> StoreResult<()>;

    async fn upsert_trend(&self, trend: &DevelopmentTrend) -> StoreResult<()>;

    /// Most recent trend row per domain.
    async fn latest_trends(&self, child_id: Uuid) -> StoreResult<Vec<DevelopmentTrend>>;

    async fn has_open_alert(&self, child_id: Uuid, domain: Domain) -> StoreResult<bool>;

    /// Returns `false` without writing when an unresolved alert already exists
    /// for the alert's child and domain.
    async fn insert_alert(&self, alert: &Alert) -> StoreResult<bool>;

    async fn open_alerts(&self, child_id: Uuid) -> StoreResult<Vec<Alert>>;

    async fn resolve_alert(&self, alert_id: Uuid) -> StoreResult<()>;
}

/// Rejects snapshot rows whose week does not start on a Monday.
pub fn check_week_start(snapshot: &ZProfileSnapshot) -> StoreResult<()> {
    use chrono::{Datelike, Weekday};

    if snapshot.week_start.weekday() != Weekday::Mon {
        return Err(crate::error::StoreError::InvariantViolation(format!(
            "snapshot week_start {} is not a Monday",
            snapshot.week_start
        )));
    }
    Ok(())
}

/// Rejects stats rows computed from an undersized cohort.
pub fn check_cohort_size(row: &ChildDomainStats) -> StoreResult<()> {
    if row.cohort_size < crate::models::MIN_COHORT_SIZE {
        return Err(crate::error::StoreError::InvariantViolation(format!(
            "stats for {} built from cohort of {}",
            row.domain, row.cohort_size
        )));
    }
    Ok(())
}
