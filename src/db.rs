use std::collections::HashMap;

use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::domain::{Domain, DomainMap};
use crate::error::{StoreError, StoreResult};
use crate::models::{
    AgeNorm, Alert, AlertKind, Assessment, AssessmentScore, Child, ChildDomainStats,
    DevelopmentTrend, MoodRecord, NeuroProfile, RiskProfile, Severity, ZProfileSnapshot,
};
use crate::store::{check_cohort_size, check_week_start, Store};

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

/// Postgres-backed [`Store`] over the `neuro_risk` schema.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn parse_domain(value: &str) -> StoreResult<Domain> {
    value
        .parse::<Domain>()
        .map_err(|err| StoreError::InvalidRecord(err.to_string()))
}

fn parse_optional_domain(value: Option<String>) -> StoreResult<Option<Domain>> {
    value.as_deref().map(parse_domain).transpose()
}

fn child_from_row(row: &PgRow) -> StoreResult<Child> {
    Ok(Child {
        id: row.try_get("id")?,
        full_name: row.try_get("full_name")?,
        date_of_birth: row.try_get("date_of_birth")?,
        active: row.try_get("active")?,
    })
}

fn profile_from_row(row: &PgRow, child_id: Uuid) -> StoreResult<NeuroProfile> {
    let mut scores = DomainMap::default();
    for domain in Domain::ALL {
        scores.set(domain, row.try_get::<f64, _>(domain.code())?);
    }
    Ok(NeuroProfile {
        child_id,
        scores,
        updated_at: row.try_get("updated_at")?,
    })
}

fn snapshot_from_row(row: &PgRow) -> StoreResult<ZProfileSnapshot> {
    Ok(ZProfileSnapshot {
        child_id: row.try_get("child_id")?,
        domain: parse_domain(row.try_get("domain")?)?,
        week_start: row.try_get("week_start")?,
        raw_score: row.try_get("raw_score")?,
        z_score: row.try_get("z_score")?,
        percentile: row.try_get("percentile")?,
        age_in_months: row.try_get("age_in_months")?,
    })
}

fn alert_from_row(row: &PgRow) -> StoreResult<Alert> {
    let kind: String = row.try_get("kind")?;
    Ok(Alert {
        id: row.try_get("id")?,
        child_id: row.try_get("child_id")?,
        domain: parse_domain(row.try_get("domain")?)?,
        kind: AlertKind::parse(&kind)
            .ok_or_else(|| StoreError::InvalidRecord(format!("unknown alert kind {kind}")))?,
        level: row.try_get("level")?,
        explanation: row.try_get("explanation")?,
        created_at: row.try_get("created_at")?,
        resolved: row.try_get("resolved")?,
    })
}

#[async_trait]
impl Store for PgStore {
    async fn active_children(&self) -> StoreResult<Vec<Child>> {
        let rows = sqlx::query(
            "SELECT id, full_name, date_of_birth, active FROM neuro_risk.children \
             WHERE active ORDER BY full_name",
        )
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(child_from_row).collect()
    }

    async fn child(&self, id: Uuid) -> StoreResult<Option<Child>> {
        let row = sqlx::query(
            "SELECT id, full_name, date_of_birth, active FROM neuro_risk.children WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(child_from_row).transpose()
    }

    async fn upsert_child(&self, child: &Child) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO neuro_risk.children (id, full_name, date_of_birth, active)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (id) DO UPDATE
            SET full_name = EXCLUDED.full_name,
                date_of_birth = EXCLUDED.date_of_birth,
                active = EXCLUDED.active
            "#,
        )
        .bind(child.id)
        .bind(&child.full_name)
        .bind(child.date_of_birth)
        .bind(child.active)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn assessments_for(&self, child_id: Uuid) -> StoreResult<Vec<Assessment>> {
        let rows = sqlx::query(
            r#"
            SELECT a.id, a.assessed_at, s.domain, s.score, s.percentage
            FROM neuro_risk.assessments a
            LEFT JOIN neuro_risk.assessment_scores s ON s.assessment_id = a.id
            WHERE a.child_id = $1
            ORDER BY a.assessed_at, a.id
            "#,
        )
        .bind(child_id)
        .fetch_all(&self.pool)
        .await?;

        let mut assessments: Vec<Assessment> = Vec::new();
        for row in rows {
            let id: Uuid = row.try_get("id")?;
            if assessments.last().map(|a| a.id) != Some(id) {
                assessments.push(Assessment {
                    id,
                    child_id,
                    assessed_at: row.try_get("assessed_at")?,
                    scores: Vec::new(),
                });
            }
            let domain: Option<String> = row.try_get("domain")?;
            if let (Some(domain), Some(current)) = (domain, assessments.last_mut()) {
                current.scores.push(AssessmentScore {
                    domain: parse_domain(&domain)?,
                    score: row.try_get("score")?,
                    percentage: row.try_get("percentage")?,
                });
            }
        }
        Ok(assessments)
    }

    async fn insert_assessment(
        &self,
        assessment: &Assessment,
        source_key: Option<&str>,
    ) -> StoreResult<bool> {
        let mut tx = self.pool.begin().await?;
        let result = sqlx::query(
            r#"
            INSERT INTO neuro_risk.assessments (id, child_id, assessed_at, source_key)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(assessment.id)
        .bind(assessment.child_id)
        .bind(assessment.assessed_at)
        .bind(source_key)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(false);
        }

        for score in &assessment.scores {
            sqlx::query(
                r#"
                INSERT INTO neuro_risk.assessment_scores (assessment_id, domain, score, percentage)
                VALUES ($1, $2, $3, $4)
                ON CONFLICT (assessment_id, domain) DO UPDATE
                SET score = EXCLUDED.score, percentage = EXCLUDED.percentage
                "#,
            )
            .bind(assessment.id)
            .bind(score.domain.code())
            .bind(score.score)
            .bind(score.percentage)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(true)
    }

    async fn mood_records(&self, child_id: Uuid, since: NaiveDate) -> StoreResult<Vec<MoodRecord>> {
        let rows = sqlx::query(
            "SELECT child_id, recorded_on, rating FROM neuro_risk.mood_records \
             WHERE child_id = $1 AND recorded_on >= $2 ORDER BY recorded_on, id",
        )
        .bind(child_id)
        .bind(since)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| -> StoreResult<MoodRecord> {
                Ok(MoodRecord {
                    child_id: row.try_get("child_id")?,
                    recorded_on: row.try_get("recorded_on")?,
                    rating: row.try_get("rating")?,
                })
            })
            .collect()
    }

    async fn insert_mood(&self, record: &MoodRecord) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO neuro_risk.mood_records (child_id, recorded_on, rating) VALUES ($1, $2, $3)",
        )
        .bind(record.child_id)
        .bind(record.recorded_on)
        .bind(record.rating)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn profile(&self, child_id: Uuid) -> StoreResult<Option<NeuroProfile>> {
        let row = sqlx::query("SELECT * FROM neuro_risk.neuro_profiles WHERE child_id = $1")
            .bind(child_id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref()
            .map(|row| profile_from_row(row, child_id))
            .transpose()
    }

    async fn active_profiles(&self) -> StoreResult<Vec<(Child, NeuroProfile)>> {
        let rows = sqlx::query(
            r#"
            SELECT c.id, c.full_name, c.date_of_birth, c.active, p.*
            FROM neuro_risk.children c
            JOIN neuro_risk.neuro_profiles p ON p.child_id = c.id
            WHERE c.active
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| -> StoreResult<(Child, NeuroProfile)> {
                let child = child_from_row(row)?;
                let profile = profile_from_row(row, child.id)?;
                Ok((child, profile))
            })
            .collect()
    }

    async fn upsert_profile(&self, profile: &NeuroProfile) -> StoreResult<()> {
        let columns: Vec<&str> = Domain::ALL.iter().map(|d| d.code()).collect();
        let placeholders: Vec<String> = (0..columns.len()).map(|i| format!("${}", i + 3)).collect();
        let updates: Vec<String> = columns
            .iter()
            .map(|c| format!("{c} = EXCLUDED.{c}"))
            .collect();
        let sql = format!(
            "INSERT INTO neuro_risk.neuro_profiles (child_id, updated_at, {}) \
             VALUES ($1, $2, {}) \
             ON CONFLICT (child_id) DO UPDATE SET updated_at = EXCLUDED.updated_at, {}",
            columns.join(", "),
            placeholders.join(", "),
            updates.join(", ")
        );

        let mut query = sqlx::query(&sql)
            .bind(profile.child_id)
            .bind(profile.updated_at);
        for domain in Domain::ALL {
            query = query.bind(profile.score(domain));
        }
        query.execute(&self.pool).await?;
        Ok(())
    }

    async fn domain_stats(&self, child_id: Uuid) -> StoreResult<Vec<ChildDomainStats>> {
        let rows = sqlx::query(
            "SELECT * FROM neuro_risk.child_domain_stats WHERE child_id = $1 ORDER BY domain",
        )
        .bind(child_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| -> StoreResult<ChildDomainStats> {
                let cohort_size: i32 = row.try_get("cohort_size")?;
                Ok(ChildDomainStats {
                    child_id: row.try_get("child_id")?,
                    domain: parse_domain(row.try_get("domain")?)?,
                    mean: row.try_get("mean")?,
                    std: row.try_get("std")?,
                    cohort_size: cohort_size.max(0) as usize,
                    age_in_months: row.try_get("age_in_months")?,
                    calculated_at: row.try_get("calculated_at")?,
                })
            })
            .collect()
    }

    async fn replace_domain_stats(
        &self,
        child_id: Uuid,
        rows: &[ChildDomainStats],
    ) -> StoreResult<()> {
        for row in rows {
            check_cohort_size(row)?;
        }

        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM neuro_risk.child_domain_stats WHERE child_id = $1")
            .bind(child_id)
            .execute(&mut *tx)
            .await?;
        for row in rows {
            sqlx::query(
                r#"
                INSERT INTO neuro_risk.child_domain_stats
                (child_id, domain, mean, std, cohort_size, age_in_months, calculated_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                "#,
            )
            .bind(child_id)
            .bind(row.domain.code())
            .bind(row.mean)
            .bind(row.std)
            .bind(row.cohort_size as i32)
            .bind(row.age_in_months)
            .bind(row.calculated_at)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn age_norm(&self, age_bucket: i32, domain: Domain) -> StoreResult<Option<AgeNorm>> {
        let row = sqlx::query(
            "SELECT * FROM neuro_risk.age_norms WHERE age_bucket = $1 AND domain = $2",
        )
        .bind(age_bucket)
        .bind(domain.code())
        .fetch_optional(&self.pool)
        .await?;

        row.map(|row| -> StoreResult<AgeNorm> {
            Ok(AgeNorm {
                age_bucket: row.try_get("age_bucket")?,
                domain,
                mean: row.try_get("mean")?,
                std_dev: row.try_get("std_dev")?,
                sample_size: row.try_get("sample_size")?,
                is_placeholder: row.try_get("is_placeholder")?,
            })
        })
        .transpose()
    }

    async fn insert_age_norm_if_absent(&self, norm: &AgeNorm) -> StoreResult<AgeNorm> {
        sqlx::query(
            r#"
            INSERT INTO neuro_risk.age_norms
            (age_bucket, domain, mean, std_dev, sample_size, is_placeholder)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (age_bucket, domain) DO NOTHING
            "#,
        )
        .bind(norm.age_bucket)
        .bind(norm.domain.code())
        .bind(norm.mean)
        .bind(norm.std_dev)
        .bind(norm.sample_size)
        .bind(norm.is_placeholder)
        .execute(&self.pool)
        .await?;

        self.age_norm(norm.age_bucket, norm.domain)
            .await?
            .ok_or_else(|| {
                StoreError::InvalidRecord(format!(
                    "age norm {}/{} missing after insert",
                    norm.age_bucket, norm.domain
                ))
            })
    }

    async fn upsert_age_norm(&self, norm: &AgeNorm) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO neuro_risk.age_norms
            (age_bucket, domain, mean, std_dev, sample_size, is_placeholder)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (age_bucket, domain) DO UPDATE
            SET mean = EXCLUDED.mean,
                std_dev = EXCLUDED.std_dev,
                sample_size = EXCLUDED.sample_size,
                is_placeholder = EXCLUDED.is_placeholder
            "#,
        )
        .bind(norm.age_bucket)
        .bind(norm.domain.code())
        .bind(norm.mean)
        .bind(norm.std_dev)
        .bind(norm.sample_size)
        .bind(norm.is_placeholder)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn upsert_snapshot(&self, snapshot: &ZProfileSnapshot) -> StoreResult<()> {
        check_week_start(snapshot)?;
        sqlx::query(
            r#"
            INSERT INTO neuro_risk.z_profile_snapshots
            (child_id, domain, week_start, raw_score, z_score, percentile, age_in_months)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (child_id, domain, week_start) DO UPDATE
            SET raw_score = EXCLUDED.raw_score,
                z_score = EXCLUDED.z_score,
                percentile = EXCLUDED.percentile,
                age_in_months = EXCLUDED.age_in_months
            "#,
        )
        .bind(snapshot.child_id)
        .bind(snapshot.domain.code())
        .bind(snapshot.week_start)
        .bind(snapshot.raw_score)
        .bind(snapshot.z_score)
        .bind(snapshot.percentile)
        .bind(snapshot.age_in_months)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn recent_snapshots(
        &self,
        child_id: Uuid,
        domain: Domain,
        since: NaiveDate,
        limit: usize,
    ) -> StoreResult<Vec<ZProfileSnapshot>> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM neuro_risk.z_profile_snapshots
            WHERE child_id = $1 AND domain = $2 AND week_start >= $3
            ORDER BY week_start DESC
            LIMIT $4
            "#,
        )
        .bind(child_id)
        .bind(domain.code())
        .bind(since)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        let mut snapshots = rows
            .iter()
            .map(snapshot_from_row)
            .collect::<StoreResult<Vec<_>>>()?;
        snapshots.reverse();
        Ok(snapshots)
    }

    async fn risk_profile(&self, child_id: Uuid) -> StoreResult<Option<RiskProfile>> {
        let row = sqlx::query("SELECT * FROM neuro_risk.risk_profiles WHERE child_id = $1")
            .bind(child_id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(|row| -> StoreResult<RiskProfile> {
            let severity: String = row.try_get("severity")?;
            Ok(RiskProfile {
                child_id,
                risk_score: row.try_get("risk_score")?,
                severity: Severity::parse(&severity).ok_or_else(|| {
                    StoreError::InvalidRecord(format!("unknown severity {severity}"))
                })?,
                avg_z_score: row.try_get("avg_z_score")?,
                trend_slope: row.try_get("trend_slope")?,
                domain_imbalance: row.try_get("domain_imbalance")?,
                emotional_instability: row.try_get("emotional_instability")?,
                weakest_domain: parse_optional_domain(row.try_get("weakest_domain")?)?,
                strongest_domain: parse_optional_domain(row.try_get("strongest_domain")?)?,
                declining_domain: parse_optional_domain(row.try_get("declining_domain")?)?,
                calculated_at: row.try_get("calculated_at")?,
            })
        })
        .transpose()
    }

    async fn upsert_risk_profile(&self, profile: &RiskProfile) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO neuro_risk.risk_profiles
            (child_id, risk_score, severity, avg_z_score, trend_slope, domain_imbalance,
             emotional_instability, weakest_domain, strongest_domain, declining_domain,
             calculated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            ON CONFLICT (child_id) DO UPDATE
            SET risk_score = EXCLUDED.risk_score,
                severity = EXCLUDED.severity,
                avg_z_score = EXCLUDED.avg_z_score,
                trend_slope = EXCLUDED.trend_slope,
                domain_imbalance = EXCLUDED.domain_imbalance,
                emotional_instability = EXCLUDED.emotional_instability,
                weakest_domain = EXCLUDED.weakest_domain,
                strongest_domain = EXCLUDED.strongest_domain,
                declining_domain = EXCLUDED.declining_domain,
                calculated_at = EXCLUDED.calculated_at
            "#,
        )
        .bind(profile.child_id)
        .bind(profile.risk_score)
        .bind(profile.severity.as_str())
        .bind(profile.avg_z_score)
        .bind(profile.trend_slope)
        .bind(profile.domain_imbalance)
        .bind(profile.emotional_instability)
        .bind(profile.weakest_domain.map(|d| d.code()))
        .bind(profile.strongest_domain.map(|d| d.code()))
        .bind(profile.declining_domain.map(|d| d.code()))
        .bind(profile.calculated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn upsert_trend(&self, trend: &DevelopmentTrend) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO neuro_risk.development_trends
            (child_id, domain, period_start, period_end, baseline, window_average, delta)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (child_id, domain, period_start) DO UPDATE
            SET period_end = EXCLUDED.period_end,
                baseline = EXCLUDED.baseline,
                window_average = EXCLUDED.window_average,
                delta = EXCLUDED.delta
            "#,
        )
        .bind(trend.child_id)
        .bind(trend.domain.code())
        .bind(trend.period_start)
        .bind(trend.period_end)
        .bind(trend.baseline)
        .bind(trend.window_average)
        .bind(trend.delta)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn latest_trends(&self, child_id: Uuid) -> StoreResult<Vec<DevelopmentTrend>> {
        let rows = sqlx::query(
            r#"
            SELECT DISTINCT ON (domain) *
            FROM neuro_risk.development_trends
            WHERE child_id = $1
            ORDER BY domain, period_start DESC
            "#,
        )
        .bind(child_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| -> StoreResult<DevelopmentTrend> {
                Ok(DevelopmentTrend {
                    child_id: row.try_get("child_id")?,
                    domain: parse_domain(row.try_get("domain")?)?,
                    period_start: row.try_get("period_start")?,
                    period_end: row.try_get("period_end")?,
                    baseline: row.try_get("baseline")?,
                    window_average: row.try_get("window_average")?,
                    delta: row.try_get("delta")?,
                })
            })
            .collect()
    }

    async fn has_open_alert(&self, child_id: Uuid, domain: Domain) -> StoreResult<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM neuro_risk.alerts \
             WHERE child_id = $1 AND domain = $2 AND NOT resolved)",
        )
        .bind(child_id)
        .bind(domain.code())
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    async fn insert_alert(&self, alert: &Alert) -> StoreResult<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO neuro_risk.alerts
            (id, child_id, domain, kind, level, explanation, created_at, resolved)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (child_id, domain) WHERE NOT resolved DO NOTHING
            "#,
        )
        .bind(alert.id)
        .bind(alert.child_id)
        .bind(alert.domain.code())
        .bind(alert.kind.as_str())
        .bind(&alert.level)
        .bind(&alert.explanation)
        .bind(alert.created_at)
        .bind(alert.resolved)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn open_alerts(&self, child_id: Uuid) -> StoreResult<Vec<Alert>> {
        let rows = sqlx::query(
            "SELECT * FROM neuro_risk.alerts WHERE child_id = $1 AND NOT resolved \
             ORDER BY created_at",
        )
        .bind(child_id)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(alert_from_row).collect()
    }

    async fn resolve_alert(&self, alert_id: Uuid) -> StoreResult<()> {
        sqlx::query("UPDATE neuro_risk.alerts SET resolved = TRUE WHERE id = $1")
            .bind(alert_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

/// Loads a small demonstration population.
pub async fn seed(store: &dyn Store, today: NaiveDate) -> anyhow::Result<()> {
    let children = vec![
        (
            Uuid::parse_str("ce50dc7b-2e7b-45b5-9c0c-671ad147230b")?,
            "Elio Brandt",
            30u32,
            [72.0, 68.0, 64.0, 70.0, 75.0],
        ),
        (
            Uuid::parse_str("1c602e7a-9f0e-42d0-abb5-625d93a3f662")?,
            "Maren Okafor",
            32,
            [48.0, 40.0, 55.0, 52.0, 44.0],
        ),
        (
            Uuid::parse_str("4d99b17b-92ac-4941-8fcd-d1cdce4850df")?,
            "Sami Ruiz",
            29,
            [85.0, 80.0, 78.0, 90.0, 82.0],
        ),
    ];

    for (id, name, age_months, percentages) in children {
        let date_of_birth = today
            .checked_sub_months(chrono::Months::new(age_months))
            .context("invalid seed birth date")?;
        store
            .upsert_child(&Child {
                id,
                full_name: name.to_string(),
                date_of_birth,
                active: true,
            })
            .await?;

        for (week, percentage) in percentages.iter().enumerate() {
            let assessed_on = today - Duration::weeks(5 - week as i64);
            let scores = Domain::ALL
                .iter()
                .map(|domain| AssessmentScore::new(*domain, None, Some(*percentage)))
                .collect::<Result<Vec<_>, _>>()?;
            let assessment = Assessment {
                id: Uuid::new_v4(),
                child_id: id,
                assessed_at: midnight_utc(assessed_on),
                scores,
            };
            store
                .insert_assessment(&assessment, Some(&format!("seed-{id}-{week}")))
                .await?;
        }

        for day in 0..14 {
            store
                .insert_mood(&MoodRecord {
                    child_id: id,
                    recorded_on: today - Duration::days(day),
                    rating: 3 + (day % 3) as i32 - 1,
                })
                .await?;
        }
    }

    Ok(())
}

fn midnight_utc(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

/// Imports assessment scores from a CSV file.
///
/// Rows sharing an `assessment_key` form one assessment. Keys that were
/// imported before are skipped. Returns the number of new assessments.
pub async fn import_csv(store: &dyn Store, csv_path: &std::path::Path) -> anyhow::Result<usize> {
    #[derive(serde::Deserialize)]
    struct CsvRow {
        child_id: Uuid,
        full_name: String,
        date_of_birth: NaiveDate,
        assessment_key: String,
        assessed_on: NaiveDate,
        domain: String,
        score: Option<i32>,
        percentage: Option<f64>,
    }

    let mut reader = csv::Reader::from_path(csv_path)?;
    let mut grouped: HashMap<String, Assessment> = HashMap::new();
    let mut order: Vec<String> = Vec::new();

    for (line, result) in reader.deserialize::<CsvRow>().enumerate() {
        let row = result.with_context(|| format!("malformed row {}", line + 2))?;
        store
            .upsert_child(&Child {
                id: row.child_id,
                full_name: row.full_name.clone(),
                date_of_birth: row.date_of_birth,
                active: true,
            })
            .await?;

        let domain: Domain = row.domain.parse()?;
        let score = AssessmentScore::new(domain, row.score, row.percentage)
            .with_context(|| format!("row {}", line + 2))?;

        let assessment = grouped.entry(row.assessment_key.clone()).or_insert_with(|| {
            order.push(row.assessment_key.clone());
            Assessment {
                id: Uuid::new_v4(),
                child_id: row.child_id,
                assessed_at: midnight_utc(row.assessed_on),
                scores: Vec::new(),
            }
        });
        assessment.scores.push(score);
    }

    let mut inserted = 0usize;
    for key in order {
        if let Some(assessment) = grouped.get(&key) {
            if store.insert_assessment(assessment, Some(&key)).await? {
                inserted += 1;
            }
        }
    }

    Ok(inserted)
}
