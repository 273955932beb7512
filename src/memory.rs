use std::collections::{BTreeMap, HashMap, HashSet};

use async_trait::async_trait;
use chrono::NaiveDate;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::Domain;
use crate::error::StoreResult;
use crate::models::{
    AgeNorm, Alert, Assessment, Child, ChildDomainStats, DevelopmentTrend, MoodRecord,
    NeuroProfile, RiskProfile, ZProfileSnapshot,
};
use crate::store::{check_cohort_size, check_week_start, Store};

#[derive(Default)]
struct Tables {
    children: HashMap<Uuid, Child>,
    assessments: Vec<Assessment>,
    source_keys: HashSet<String>,
    moods: Vec<MoodRecord>,
    profiles: HashMap<Uuid, NeuroProfile>,
    stats: HashMap<(Uuid, Domain), ChildDomainStats>,
    age_norms: HashMap<(i32, Domain), AgeNorm>,
    snapshots: BTreeMap<(Uuid, Domain, NaiveDate), ZProfileSnapshot>,
    risk_profiles: HashMap<Uuid, RiskProfile>,
    trends: BTreeMap<(Uuid, Domain, NaiveDate), DevelopmentTrend>,
    alerts: Vec<Alert>,
}

/// In-process store used by tests and dry runs.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn snapshot_count(&self) -> usize {
        self.tables.read().await.snapshots.len()
    }

    pub async fn age_norm_count(&self) -> usize {
        self.tables.read().await.age_norms.len()
    }

    pub async fn alert_count(&self) -> usize {
        self.tables.read().await.alerts.len()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn active_children(&self) -> StoreResult<Vec<Child>> {
        let tables = self.tables.read().await;
        let mut children: Vec<Child> = tables
            .children
            .values()
            .filter(|child| child.active)
            .cloned()
            .collect();
        children.sort_by(|a, b| a.full_name.cmp(&b.full_name));
        Ok(children)
    }

    async fn child(&self, id: Uuid) -> StoreResult<Option<Child>> {
        Ok(self.tables.read().await.children.get(&id).cloned())
    }

    async fn upsert_child(&self, child: &Child) -> StoreResult<()> {
        self.tables
            .write()
            .await
            .children
            .insert(child.id, child.clone());
        Ok(())
    }

    async fn assessments_for(&self, child_id: Uuid) -> StoreResult<Vec<Assessment>> {
        let tables = self.tables.read().await;
        let mut assessments: Vec<Assessment> = tables
            .assessments
            .iter()
            .filter(|a| a.child_id == child_id)
            .cloned()
            .collect();
        assessments.sort_by_key(|a| a.assessed_at);
        Ok(assessments)
    }

    async fn insert_assessment(
        &self,
        assessment: &Assessment,
        source_key: Option<&str>,
    ) -> StoreResult<bool> {
        let mut tables = self.tables.write().await;
        if let Some(key) = source_key {
            if !tables.source_keys.insert(key.to_string()) {
                return Ok(false);
            }
        }
        tables.assessments.push(assessment.clone());
        Ok(true)
    }

    async fn mood_records(&self, child_id: Uuid, since: NaiveDate) -> StoreResult<Vec<MoodRecord>> {
        let tables = self.tables.read().await;
        let mut records: Vec<MoodRecord> = tables
            .moods
            .iter()
            .filter(|m| m.child_id == child_id && m.recorded_on >= since)
            .cloned()
            .collect();
        records.sort_by_key(|m| m.recorded_on);
        Ok(records)
    }

    async fn insert_mood(&self, record: &MoodRecord) -> StoreResult<()> {
        self.tables.write().await.moods.push(record.clone());
        Ok(())
    }

    async fn profile(&self, child_id: Uuid) -> StoreResult<Option<NeuroProfile>> {
        Ok(self.tables.read().await.profiles.get(&child_id).cloned())
    }

    async fn active_profiles(&self) -> StoreResult<Vec<(Child, NeuroProfile)>> {
        let tables = self.tables.read().await;
        Ok(tables
            .children
            .values()
            .filter(|child| child.active)
            .filter_map(|child| {
                tables
                    .profiles
                    .get(&child.id)
                    .map(|profile| (child.clone(), profile.clone()))
            })
            .collect())
    }

    async fn upsert_profile(&self, profile: &NeuroProfile) -> StoreResult<()> {
        self.tables
            .write()
            .await
            .profiles
            .insert(profile.child_id, profile.clone());
        Ok(())
    }

    async fn domain_stats(&self, child_id: Uuid) -> StoreResult<Vec<ChildDomainStats>> {
        let tables = self.tables.read().await;
        let mut rows: Vec<ChildDomainStats> = tables
            .stats
            .values()
            .filter(|row| row.child_id == child_id)
            .cloned()
            .collect();
        rows.sort_by_key(|row| row.domain);
        Ok(rows)
    }

    async fn replace_domain_stats(
        &self,
        child_id: Uuid,
        rows: &[ChildDomainStats],
    ) -> StoreResult<()> {
        for row in rows {
            check_cohort_size(row)?;
        }
        let mut tables = self.tables.write().await;
        tables.stats.retain(|(id, _), _| *id != child_id);
        for row in rows {
            tables.stats.insert((child_id, row.domain), row.clone());
        }
        Ok(())
    }

    async fn age_norm(&self, age_bucket: i32, domain: Domain) -> StoreResult<Option<AgeNorm>> {
        Ok(self
            .tables
            .read()
            .await
            .age_norms
            .get(&(age_bucket, domain))
            .cloned())
    }

    async fn insert_age_norm_if_absent(&self, norm: &AgeNorm) -> StoreResult<AgeNorm> {
        let mut tables = self.tables.write().await;
        Ok(tables
            .age_norms
            .entry((norm.age_bucket, norm.domain))
            .or_insert_with(|| norm.clone())
            .clone())
    }

    async fn upsert_age_norm(&self, norm: &AgeNorm) -> StoreResult<()> {
        self.tables
            .write()
            .await
            .age_norms
            .insert((norm.age_bucket, norm.domain), norm.clone());
        Ok(())
    }

    async fn upsert_snapshot(&self, snapshot: &ZProfileSnapshot) -> StoreResult<()> {
        check_week_start(snapshot)?;
        self.tables.write().await.snapshots.insert(
            (snapshot.child_id, snapshot.domain, snapshot.week_start),
            snapshot.clone(),
        );
        Ok(())
    }

    async fn recent_snapshots(
        &self,
        child_id: Uuid,
        domain: Domain,
        since: NaiveDate,
        limit: usize,
    ) -> StoreResult<Vec<ZProfileSnapshot>> {
        let tables = self.tables.read().await;
        let mut rows: Vec<ZProfileSnapshot> = tables
            .snapshots
            .range((child_id, domain, since)..=(child_id, domain, NaiveDate::MAX))
            .rev()
            .take(limit)
            .map(|(_, snapshot)| snapshot.clone())
            .collect();
        rows.reverse();
        Ok(rows)
    }

    async fn risk_profile(&self, child_id: Uuid) -> StoreResult<Option<RiskProfile>> {
        Ok(self.tables.read().await.risk_profiles.get(&child_id).cloned())
    }

    async fn upsert_risk_profile(&self, profile: &RiskProfile) -> StoreResult<()> {
        self.tables
            .write()
            .await
            .risk_profiles
            .insert(profile.child_id, profile.clone());
        Ok(())
    }

    async fn upsert_trend(&self, trend: &DevelopmentTrend) -> StoreResult<()> {
        self.tables.write().await.trends.insert(
            (trend.child_id, trend.domain, trend.period_start),
            trend.clone(),
        );
        Ok(())
    }

    async fn latest_trends(&self, child_id: Uuid) -> StoreResult<Vec<DevelopmentTrend>> {
        let tables = self.tables.read().await;
        let mut latest: BTreeMap<Domain, DevelopmentTrend> = BTreeMap::new();
        for ((id, domain, _), trend) in tables.trends.iter() {
            if *id == child_id {
                latest.insert(*domain, trend.clone());
            }
        }
        Ok(latest.into_values().collect())
    }

    async fn has_open_alert(&self, child_id: Uuid, domain: Domain) -> StoreResult<bool> {
        Ok(self
            .tables
            .read()
            .await
            .alerts
            .iter()
            .any(|a| a.child_id == child_id && a.domain == domain && !a.resolved))
    }

    async fn insert_alert(&self, alert: &Alert) -> StoreResult<bool> {
        let mut tables = self.tables.write().await;
        let exists = tables
            .alerts
            .iter()
            .any(|a| a.child_id == alert.child_id && a.domain == alert.domain && !a.resolved);
        if exists {
            return Ok(false);
        }
        tables.alerts.push(alert.clone());
        Ok(true)
    }

    async fn open_alerts(&self, child_id: Uuid) -> StoreResult<Vec<Alert>> {
        Ok(self
            .tables
            .read()
            .await
            .alerts
            .iter()
            .filter(|a| a.child_id == child_id && !a.resolved)
            .cloned()
            .collect())
    }

    async fn resolve_alert(&self, alert_id: Uuid) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        if let Some(alert) = tables.alerts.iter_mut().find(|a| a.id == alert_id) {
            alert.resolved = true;
        }
        Ok(())
    }
}
