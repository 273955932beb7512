//! Scheduled recompute jobs over the active population.
//!
//! Each job is independently triggerable and idempotent. A failure for one
//! child is logged and counted; the remaining children are still processed.

use std::future::Future;
use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::aggregate;
use crate::alerts;
use crate::cohort;
use crate::config::EngineConfig;
use crate::domain::Domain;
use crate::error::{or_unprovisioned, EngineError, EngineResult};
use crate::explain::{self, Explanation};
use crate::models::{
    Child, ChildDomainStats, DevelopmentTrend, MoodRecord, NeuroProfile, RiskProfile,
    ZProfileSnapshot,
};
use crate::norms;
use crate::report::{self, ChildReport, NarrativeInput, ReportInputs};
use crate::risk::{self, DomainHistory};
use crate::snapshot;
use crate::store::Store;
use crate::trend;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub processed: usize,
    pub failed: usize,
}

impl BatchSummary {
    fn merge(&mut self, other: BatchSummary) {
        self.processed += other.processed;
        self.failed += other.failed;
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub profiles: BatchSummary,
    pub cohort_stats: BatchSummary,
    pub z_profiles: BatchSummary,
    pub trends: BatchSummary,
    pub risk: BatchSummary,
}

impl RunSummary {
    pub fn total(&self) -> BatchSummary {
        let mut total = BatchSummary::default();
        for part in [self.profiles, self.cohort_stats, self.z_profiles, self.trends, self.risk] {
            total.merge(part);
        }
        total
    }
}

pub struct Engine {
    store: Arc<dyn Store>,
    config: EngineConfig,
}

impl Engine {
    pub fn new(store: Arc<dyn Store>, config: EngineConfig) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn store(&self) -> &dyn Store {
        self.store.as_ref()
    }

    async fn for_each_child<F, Fut>(&self, job: &'static str, run: F) -> EngineResult<BatchSummary>
    where
        F: Fn(Child) -> Fut,
        Fut: Future<Output = EngineResult<()>>,
    {
        let children = self.store().active_children().await?;
        let mut summary = BatchSummary::default();

        for child in children {
            let child_id = child.id;
            match run(child).await {
                Ok(()) => summary.processed += 1,
                Err(err) => {
                    summary.failed += 1;
                    tracing::warn!(job, %child_id, error = %err, "child skipped");
                }
            }
        }

        tracing::info!(
            job,
            processed = summary.processed,
            failed = summary.failed,
            "batch finished"
        );
        Ok(summary)
    }

    // Per-child steps

    /// Rebuilds the child's profile. A child never assessed gets no profile,
    /// so later steps treat it as having no data rather than scores of zero.
    pub async fn refresh_profile(
        &self,
        child: &Child,
        now: DateTime<Utc>,
    ) -> EngineResult<Option<NeuroProfile>> {
        let assessments = self.store().assessments_for(child.id).await?;
        let previous = self.store().profile(child.id).await?;
        if assessments.is_empty() && previous.is_none() {
            tracing::debug!(child_id = %child.id, "no assessments yet, skipping profile");
            return Ok(None);
        }
        let profile = aggregate::build_profile(previous.as_ref(), child.id, &assessments, now);
        self.store().upsert_profile(&profile).await?;
        Ok(Some(profile))
    }

    pub async fn refresh_cohort_stats(
        &self,
        child: &Child,
        population: &[(Child, NeuroProfile)],
        today: NaiveDate,
        now: DateTime<Utc>,
    ) -> EngineResult<Vec<ChildDomainStats>> {
        let rows = cohort::build_cohort_stats(
            child,
            population,
            today,
            self.config.cohort_window_months,
            now,
        );
        self.store().replace_domain_stats(child.id, &rows).await?;
        Ok(rows)
    }

    /// Records this week's Z-profile. Children without a profile are skipped.
    pub async fn record_z_profile(
        &self,
        child: &Child,
        today: NaiveDate,
    ) -> EngineResult<Vec<ZProfileSnapshot>> {
        let Some(profile) = self.store().profile(child.id).await? else {
            tracing::debug!(child_id = %child.id, "no profile yet, skipping z-profile");
            return Ok(Vec::new());
        };
        Ok(snapshot::record_weekly(self.store(), child, &profile, today).await?)
    }

    pub async fn refresh_trends(
        &self,
        child: &Child,
        today: NaiveDate,
    ) -> EngineResult<Vec<DevelopmentTrend>> {
        let Some(profile) = self.store().profile(child.id).await? else {
            return Ok(Vec::new());
        };
        let assessments = self.store().assessments_for(child.id).await?;
        let window = self.config.trend_window_days;
        let period_start = today - Duration::days(window - 1);
        let trends = trend::build_trends(&profile, &assessments, period_start, window);
        for row in &trends {
            self.store().upsert_trend(row).await?;
        }
        Ok(trends)
    }

    /// Snapshot histories for the `weeks` calendar weeks ending with the week
    /// of `today`. Older snapshots are not part of the window.
    pub async fn domain_histories(
        &self,
        child_id: Uuid,
        weeks: usize,
        today: NaiveDate,
    ) -> EngineResult<Vec<DomainHistory>> {
        let since = snapshot::week_start(today) - Duration::weeks(weeks as i64 - 1);
        let mut histories = Vec::with_capacity(Domain::ALL.len());
        for domain in Domain::ALL {
            let snapshots = or_unprovisioned(
                self.store()
                    .recent_snapshots(child_id, domain, since, weeks)
                    .await,
            )?;
            histories.push(DomainHistory::from_snapshots(domain, &snapshots));
        }
        Ok(histories)
    }

    async fn recent_moods(&self, child_id: Uuid, today: NaiveDate) -> EngineResult<Vec<MoodRecord>> {
        let since = today - Duration::days(self.config.mood_window_days - 1);
        Ok(self.store().mood_records(child_id, since).await?)
    }

    /// Replaces the child's risk profile and raises any new alerts.
    pub async fn refresh_risk(
        &self,
        child: &Child,
        today: NaiveDate,
        now: DateTime<Utc>,
    ) -> EngineResult<(RiskProfile, usize)> {
        let histories = self
            .domain_histories(child.id, self.config.risk_window_weeks, today)
            .await?;
        let moods = self.recent_moods(child.id, today).await?;

        let profile = risk::compute_risk_profile(child.id, &histories, &moods, &self.config, now);
        self.store().upsert_risk_profile(&profile).await?;

        let trends = or_unprovisioned(self.store().latest_trends(child.id).await)?;
        let candidates = alerts::detect(&histories, &trends, &self.config);
        let created = if candidates.is_empty() {
            0
        } else {
            let explanation = self.explain_child(child.id, today).await?;
            alerts::raise(self.store(), child.id, &candidates, &explanation, now).await?
        };

        tracing::debug!(
            child_id = %child.id,
            risk_score = profile.risk_score,
            severity = profile.severity.as_str(),
            alerts = created,
            "risk profile refreshed"
        );
        Ok((profile, created))
    }

    async fn require_child(&self, child_id: Uuid) -> EngineResult<Child> {
        self.store()
            .child(child_id)
            .await?
            .ok_or(EngineError::ChildNotFound(child_id))
    }

    pub async fn explain_child(&self, child_id: Uuid, today: NaiveDate) -> EngineResult<Explanation> {
        let histories = self
            .domain_histories(child_id, self.config.trajectory_window_weeks, today)
            .await?;
        let moods = self.recent_moods(child_id, today).await?;
        Ok(explain::explain(
            &histories,
            &moods,
            self.config.declining_slope_below,
        ))
    }

    pub async fn child_report(&self, child_id: Uuid, today: NaiveDate) -> EngineResult<ChildReport> {
        let child = self.require_child(child_id).await?;
        let profile = self
            .store()
            .profile(child_id)
            .await?
            .unwrap_or_else(|| NeuroProfile::empty(child_id, Utc::now()));
        let stats = or_unprovisioned(self.store().domain_stats(child_id).await)?;
        let histories = self
            .domain_histories(child_id, self.config.trajectory_window_weeks, today)
            .await?;
        let risk = or_unprovisioned(self.store().risk_profile(child_id).await)?;

        let bucket = norms::age_bucket(child.age_in_months(today));
        let mut placeholder_norms = false;
        for domain in Domain::ALL {
            let norm = or_unprovisioned(self.store().age_norm(bucket, domain).await)?;
            placeholder_norms |= norm.map(|n| n.is_placeholder).unwrap_or(false);
        }

        Ok(report::build_report(
            ReportInputs {
                child: &child,
                profile: &profile,
                stats: &stats,
                histories: &histories,
                risk,
                placeholder_norms,
                today,
            },
            &self.config,
        ))
    }

    pub async fn narrative_input(&self, child_id: Uuid, today: NaiveDate) -> EngineResult<NarrativeInput> {
        let report = self.child_report(child_id, today).await?;
        let explanation = self.explain_child(child_id, today).await?;
        Ok(report::narrative_input(&report, explanation))
    }

    // Batch entry points

    pub async fn recompute_profiles_for_all(&self, now: DateTime<Utc>) -> EngineResult<BatchSummary> {
        self.for_each_child("profiles", |child| async move {
            self.refresh_profile(&child, now).await.map(|_| ())
        })
        .await
    }

    pub async fn recompute_cohort_stats_for_all(
        &self,
        today: NaiveDate,
        now: DateTime<Utc>,
    ) -> EngineResult<BatchSummary> {
        let population = self.store().active_profiles().await?;
        let population = &population;
        self.for_each_child("cohort_stats", |child| async move {
            self.refresh_cohort_stats(&child, population, today, now)
                .await
                .map(|_| ())
        })
        .await
    }

    pub async fn recompute_z_profiles_for_all(&self, today: NaiveDate) -> EngineResult<BatchSummary> {
        self.for_each_child("z_profiles", |child| async move {
            self.record_z_profile(&child, today).await.map(|_| ())
        })
        .await
    }

    pub async fn recompute_trends_for_all(&self, today: NaiveDate) -> EngineResult<BatchSummary> {
        self.for_each_child("trends", |child| async move {
            self.refresh_trends(&child, today).await.map(|_| ())
        })
        .await
    }

    pub async fn recompute_risk_for_all(
        &self,
        today: NaiveDate,
        now: DateTime<Utc>,
    ) -> EngineResult<BatchSummary> {
        self.for_each_child("risk", |child| async move {
            self.refresh_risk(&child, today, now).await.map(|_| ())
        })
        .await
    }

    /// Runs every job in dependency order.
    pub async fn run_all(&self, today: NaiveDate, now: DateTime<Utc>) -> EngineResult<RunSummary> {
        Ok(RunSummary {
            profiles: self.recompute_profiles_for_all(now).await?,
            cohort_stats: self.recompute_cohort_stats_for_all(today, now).await?,
            z_profiles: self.recompute_z_profiles_for_all(today).await?,
            trends: self.recompute_trends_for_all(today).await?,
            risk: self.recompute_risk_for_all(today, now).await?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{StoreError, StoreResult};
    use crate::memory::MemoryStore;
    use crate::models::{AgeNorm, Alert, Assessment, AssessmentScore, Severity};
    use async_trait::async_trait;
    use chrono::{Months, NaiveTime};

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 16).unwrap()
    }

    fn child(name: &str, age_months: u32) -> Child {
        Child {
            id: Uuid::new_v4(),
            full_name: name.to_string(),
            date_of_birth: today().checked_sub_months(Months::new(age_months)).unwrap(),
            active: true,
        }
    }

    async fn assess(store: &MemoryStore, child: &Child, days_ago: i64, percentage: f64) {
        let scores = Domain::ALL
            .iter()
            .map(|d| AssessmentScore::new(*d, None, Some(percentage)).unwrap())
            .collect();
        let assessment = Assessment {
            id: Uuid::new_v4(),
            child_id: child.id,
            assessed_at: (today() - Duration::days(days_ago))
                .and_time(NaiveTime::MIN)
                .and_utc(),
            scores,
        };
        store.insert_assessment(&assessment, None).await.unwrap();
    }

    async fn populated_store() -> (Arc<MemoryStore>, Vec<Child>) {
        let store = Arc::new(MemoryStore::new());
        let mut children = Vec::new();
        for (i, percentage) in [40.0, 45.0, 50.0, 55.0, 60.0, 65.0, 70.0].iter().enumerate() {
            let c = child(&format!("Child {i}"), 30 + (i as u32 % 3));
            store.upsert_child(&c).await.unwrap();
            assess(&store, &c, 20, *percentage).await;
            assess(&store, &c, 2, *percentage).await;
            children.push(c);
        }
        (store, children)
    }

    #[tokio::test]
    async fn full_run_populates_every_derived_table() {
        let (store, children) = populated_store().await;
        let engine = Engine::new(store.clone(), EngineConfig::default());

        let summary = engine.run_all(today(), Utc::now()).await.unwrap();
        assert_eq!(summary.total().failed, 0);
        assert_eq!(summary.profiles.processed, 7);

        let subject = &children[6];
        let stats = store.domain_stats(subject.id).await.unwrap();
        assert_eq!(stats.len(), Domain::ALL.len());
        assert_eq!(stats[0].cohort_size, 6);
        assert!((stats[0].mean - 52.5).abs() < 1e-9);

        assert_eq!(store.snapshot_count().await, 7 * Domain::ALL.len());
        assert!(store.risk_profile(subject.id).await.unwrap().is_some());
        assert_eq!(store.latest_trends(subject.id).await.unwrap().len(), Domain::ALL.len());

        let report = engine.child_report(subject.id, today()).await.unwrap();
        assert!(report.placeholder_norms);
        assert!((report.domains[0].z_score - 2.049).abs() < 1e-3);
    }

    #[tokio::test]
    async fn running_twice_in_one_week_keeps_one_snapshot_per_domain() {
        let (store, _) = populated_store().await;
        let engine = Engine::new(store.clone(), EngineConfig::default());

        engine.recompute_profiles_for_all(Utc::now()).await.unwrap();
        engine.recompute_z_profiles_for_all(today()).await.unwrap();
        engine
            .recompute_z_profiles_for_all(today() - Duration::days(1))
            .await
            .unwrap();
        assert_eq!(store.snapshot_count().await, 7 * Domain::ALL.len());
    }

    #[tokio::test]
    async fn second_risk_pass_does_not_duplicate_alerts() {
        let store = Arc::new(MemoryStore::new());
        let c = child("Noor Said", 40);
        store.upsert_child(&c).await.unwrap();
        for (weeks_ago, z) in [(3, 0.5), (2, -1.0), (1, -2.0), (0, -2.6)] {
            let week = snapshot::week_start(today() - Duration::weeks(weeks_ago));
            store
                .upsert_snapshot(&ZProfileSnapshot {
                    child_id: c.id,
                    domain: Domain::LanguageCommunication,
                    week_start: week,
                    raw_score: 20.0,
                    z_score: z,
                    percentile: norms::percentile(z),
                    age_in_months: 40,
                })
                .await
                .unwrap();
        }

        let engine = Engine::new(store.clone(), EngineConfig::default());
        let (_, first) = engine.refresh_risk(&c, today(), Utc::now()).await.unwrap();
        let (profile, second) = engine.refresh_risk(&c, today(), Utc::now()).await.unwrap();

        assert_eq!(first, 1);
        assert_eq!(second, 0);
        assert_eq!(store.alert_count().await, 1);
        assert_eq!(profile.declining_domain, Some(Domain::LanguageCommunication));
        assert_eq!(profile.weakest_domain, Some(Domain::LanguageCommunication));
        assert_eq!(profile.severity, Severity::Low);

        let open = store.open_alerts(c.id).await.unwrap();
        let narrative = engine.explain_child(c.id, today()).await.unwrap();
        assert_eq!(
            open[0].explanation,
            Some(serde_json::to_value(&narrative).unwrap())
        );
    }

    #[tokio::test]
    async fn explanation_reports_mood_and_decline() {
        let store = Arc::new(MemoryStore::new());
        let c = child("Ira Bloom", 50);
        store.upsert_child(&c).await.unwrap();
        for (i, z) in [0.5, 0.2, -0.1, -0.6].iter().enumerate() {
            let week = snapshot::week_start(today() - Duration::weeks(3 - i as i64));
            store
                .upsert_snapshot(&ZProfileSnapshot {
                    child_id: c.id,
                    domain: Domain::FineMotor,
                    week_start: week,
                    raw_score: 50.0,
                    z_score: *z,
                    percentile: norms::percentile(*z),
                    age_in_months: 50,
                })
                .await
                .unwrap();
        }
        store
            .insert_mood(&MoodRecord {
                child_id: c.id,
                recorded_on: today() - Duration::days(60),
                rating: 1,
            })
            .await
            .unwrap();

        let engine = Engine::new(store, EngineConfig::default());
        let explanation = engine.explain_child(c.id, today()).await.unwrap();
        assert_eq!(explanation.declining_domains.len(), 1);
        assert_eq!(explanation.declining_domains[0].domain, Domain::FineMotor);
        assert_eq!(explanation.mood.entries, 0);
        assert_eq!(explanation.weakest_domains[0].domain, Domain::FineMotor);
    }

    #[tokio::test]
    async fn never_assessed_child_gets_no_scores_or_alerts() {
        let (store, _) = populated_store().await;
        let idle = child("Tove Lind", 36);
        store.upsert_child(&idle).await.unwrap();
        let engine = Engine::new(store.clone(), EngineConfig::default());

        let summary = engine.run_all(today(), Utc::now()).await.unwrap();
        assert_eq!(summary.total().failed, 0);

        assert!(store.profile(idle.id).await.unwrap().is_none());
        assert_eq!(store.snapshot_count().await, 7 * Domain::ALL.len());
        assert!(store.open_alerts(idle.id).await.unwrap().is_empty());

        let risk = store.risk_profile(idle.id).await.unwrap().unwrap();
        assert_eq!(risk.avg_z_score, 0.0);
        assert_eq!(risk.risk_score, 0.0);
        assert_eq!(risk.weakest_domain, None);
        assert_eq!(risk.declining_domain, None);
    }

    #[tokio::test]
    async fn snapshots_older_than_the_risk_window_are_ignored() {
        let store = Arc::new(MemoryStore::new());
        let c = child("Mika Orr", 48);
        store.upsert_child(&c).await.unwrap();
        for (weeks_ago, z) in [(40, 0.5), (30, -0.5), (20, -1.0), (10, -2.5)] {
            let week = snapshot::week_start(today() - Duration::weeks(weeks_ago));
            store
                .upsert_snapshot(&ZProfileSnapshot {
                    child_id: c.id,
                    domain: Domain::FineMotor,
                    week_start: week,
                    raw_score: 30.0,
                    z_score: z,
                    percentile: norms::percentile(z),
                    age_in_months: 48,
                })
                .await
                .unwrap();
        }

        let engine = Engine::new(store.clone(), EngineConfig::default());
        let (profile, created) = engine.refresh_risk(&c, today(), Utc::now()).await.unwrap();

        assert_eq!(created, 0);
        assert_eq!(store.alert_count().await, 0);
        assert_eq!(profile.avg_z_score, 0.0);
        assert_eq!(profile.trend_slope, 0.0);
        assert_eq!(profile.declining_domain, None);
    }

    #[tokio::test]
    async fn mood_window_covers_exactly_the_configured_days() {
        let store = Arc::new(MemoryStore::new());
        let c = child("Lena Voss", 42);
        store.upsert_child(&c).await.unwrap();
        for days_ago in [27, 28] {
            store
                .insert_mood(&MoodRecord {
                    child_id: c.id,
                    recorded_on: today() - Duration::days(days_ago),
                    rating: 4,
                })
                .await
                .unwrap();
        }

        let engine = Engine::new(store, EngineConfig::default());
        let explanation = engine.explain_child(c.id, today()).await.unwrap();
        assert_eq!(explanation.mood.entries, 1);
    }

    /// Fails every read for one child, delegating everything else.
    struct FlakyStore {
        inner: MemoryStore,
        broken: Uuid,
    }

    #[async_trait]
    impl Store for FlakyStore {
        async fn active_children(&self) -> StoreResult<Vec<Child>> {
            self.inner.active_children().await
        }
        async fn child(&self, id: Uuid) -> StoreResult<Option<Child>> {
            self.inner.child(id).await
        }
        async fn upsert_child(&self, child: &Child) -> StoreResult<()> {
            self.inner.upsert_child(child).await
        }
        async fn assessments_for(&self, child_id: Uuid) -> StoreResult<Vec<Assessment>> {
            if child_id == self.broken {
                return Err(StoreError::InvalidRecord("corrupt assessment".to_string()));
            }
            self.inner.assessments_for(child_id).await
        }
        async fn insert_assessment(&self, a: &Assessment, key: Option<&str>) -> StoreResult<bool> {
            self.inner.insert_assessment(a, key).await
        }
        async fn mood_records(&self, child_id: Uuid, since: NaiveDate) -> StoreResult<Vec<MoodRecord>> {
            self.inner.mood_records(child_id, since).await
        }
        async fn insert_mood(&self, record: &MoodRecord) -> StoreResult<()> {
            self.inner.insert_mood(record).await
        }
        async fn profile(&self, child_id: Uuid) -> StoreResult<Option<NeuroProfile>> {
            self.inner.profile(child_id).await
        }
        async fn active_profiles(&self) -> StoreResult<Vec<(Child, NeuroProfile)>> {
            self.inner.active_profiles().await
        }
        async fn upsert_profile(&self, profile: &NeuroProfile) -> StoreResult<()> {
            self.inner.upsert_profile(profile).await
        }
        async fn domain_stats(&self, child_id: Uuid) -> StoreResult<Vec<ChildDomainStats>> {
            self.inner.domain_stats(child_id).await
        }
        async fn replace_domain_stats(&self, id: Uuid, rows: &[ChildDomainStats]) -> StoreResult<()> {
            self.inner.replace_domain_stats(id, rows).await
        }
        async fn age_norm(&self, bucket: i32, domain: Domain) -> StoreResult<Option<AgeNorm>> {
            self.inner.age_norm(bucket, domain).await
        }
        async fn insert_age_norm_if_absent(&self, norm: &AgeNorm) -> StoreResult<AgeNorm> {
            self.inner.insert_age_norm_if_absent(norm).await
        }
        async fn upsert_age_norm(&self, norm: &AgeNorm) -> StoreResult<()> {
            self.inner.upsert_age_norm(norm).await
        }
        async fn upsert_snapshot(&self, snapshot: &ZProfileSnapshot) -> StoreResult<()> {
            self.inner.upsert_snapshot(snapshot).await
        }
        async fn recent_snapshots(
            &self,
            child_id: Uuid,
            domain: Domain,
            since: NaiveDate,
            limit: usize,
        ) -> StoreResult<Vec<ZProfileSnapshot>> {
            self.inner.recent_snapshots(child_id, domain, since, limit).await
        }
        async fn risk_profile(&self, child_id: Uuid) -> StoreResult<Option<RiskProfile>> {
            self.inner.risk_profile(child_id).await
        }
        async fn upsert_risk_profile(&self, profile: &RiskProfile) -> StoreResult<()> {
            self.inner.upsert_risk_profile(profile).await
        }
        async fn upsert_trend(&self, trend: &DevelopmentTrend) -> StoreResult<()> {
            self.inner.upsert_trend(trend).await
        }
        async fn latest_trends(&self, child_id: Uuid) -> StoreResult<Vec<DevelopmentTrend>> {
            Err(StoreError::MissingSchema {
                table: format!("development_trends for {child_id}"),
            })
        }
        async fn has_open_alert(&self, child_id: Uuid, domain: Domain) -> StoreResult<bool> {
            self.inner.has_open_alert(child_id, domain).await
        }
        async fn insert_alert(&self, alert: &Alert) -> StoreResult<bool> {
            self.inner.insert_alert(alert).await
        }
        async fn open_alerts(&self, child_id: Uuid) -> StoreResult<Vec<Alert>> {
            self.inner.open_alerts(child_id).await
        }
        async fn resolve_alert(&self, alert_id: Uuid) -> StoreResult<()> {
            self.inner.resolve_alert(alert_id).await
        }
    }

    #[tokio::test]
    async fn one_failing_child_does_not_abort_the_batch() {
        let inner = MemoryStore::new();
        let healthy = child("Ada Quinn", 36);
        let broken = child("Bo Reyes", 36);
        inner.upsert_child(&healthy).await.unwrap();
        inner.upsert_child(&broken).await.unwrap();
        assess(&inner, &healthy, 2, 55.0).await;

        let store = Arc::new(FlakyStore {
            inner,
            broken: broken.id,
        });
        let engine = Engine::new(store.clone(), EngineConfig::default());

        let summary = engine.recompute_profiles_for_all(Utc::now()).await.unwrap();
        assert_eq!(summary, BatchSummary { processed: 1, failed: 1 });
        assert!(store.profile(healthy.id).await.unwrap().is_some());
        assert!(store.profile(broken.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn unprovisioned_trend_table_reads_as_empty() {
        let inner = MemoryStore::new();
        let c = child("Cy Park", 44);
        inner.upsert_child(&c).await.unwrap();
        let store = Arc::new(FlakyStore {
            inner,
            broken: Uuid::nil(),
        });
        let engine = Engine::new(store.clone(), EngineConfig::default());

        let (profile, created) = engine.refresh_risk(&c, today(), Utc::now()).await.unwrap();
        assert_eq!(created, 0);
        assert_eq!(profile.risk_score, 0.0);
    }
}
