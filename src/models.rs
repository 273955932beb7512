use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{Domain, DomainMap};
use crate::error::{EngineError, EngineResult};

pub const SCORE_MIN: f64 = 1.0;
pub const SCORE_MAX: f64 = 5.0;
pub const MIN_COHORT_SIZE: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Child {
    pub id: Uuid,
    pub full_name: String,
    pub date_of_birth: NaiveDate,
    pub active: bool,
}

impl Child {
    /// Whole months elapsed between birth and `on`.
    pub fn age_in_months(&self, on: NaiveDate) -> i32 {
        age_in_months(self.date_of_birth, on)
    }
}

pub fn age_in_months(date_of_birth: NaiveDate, on: NaiveDate) -> i32 {
    use chrono::Datelike;

    let mut months = (on.year() - date_of_birth.year()) * 12
        + (on.month() as i32 - date_of_birth.month() as i32);
    if on.day() < date_of_birth.day() {
        months -= 1;
    }
    months.max(0)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssessmentScore {
    pub domain: Domain,
    pub score: Option<i32>,
    pub percentage: Option<f64>,
}

impl AssessmentScore {
    pub fn new(domain: Domain, score: Option<i32>, percentage: Option<f64>) -> EngineResult<Self> {
        if let Some(value) = score {
            let value = value as f64;
            if !(SCORE_MIN..=SCORE_MAX).contains(&value) {
                return Err(EngineError::ScoreOutOfRange {
                    domain,
                    field: "score",
                    value,
                    min: SCORE_MIN,
                    max: SCORE_MAX,
                });
            }
        }
        if let Some(value) = percentage {
            if !(0.0..=100.0).contains(&value) {
                return Err(EngineError::ScoreOutOfRange {
                    domain,
                    field: "percentage",
                    value,
                    min: 0.0,
                    max: 100.0,
                });
            }
        }
        Ok(Self {
            domain,
            score,
            percentage,
        })
    }

    /// Percentage when recorded, else the 1–5 score scaled to 0–100, else zero.
    pub fn effective_percentage(&self) -> f64 {
        match (self.percentage, self.score) {
            (Some(percentage), _) => percentage,
            (None, Some(score)) => score as f64 / SCORE_MAX * 100.0,
            (None, None) => 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assessment {
    pub id: Uuid,
    pub child_id: Uuid,
    pub assessed_at: DateTime<Utc>,
    pub scores: Vec<AssessmentScore>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NeuroProfile {
    pub child_id: Uuid,
    pub scores: DomainMap<f64>,
    pub updated_at: DateTime<Utc>,
}

impl NeuroProfile {
    pub fn empty(child_id: Uuid, now: DateTime<Utc>) -> Self {
        Self {
            child_id,
            scores: DomainMap::default(),
            updated_at: now,
        }
    }

    pub fn score(&self, domain: Domain) -> f64 {
        self.scores.get(domain)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChildDomainStats {
    pub child_id: Uuid,
    pub domain: Domain,
    pub mean: f64,
    pub std: f64,
    pub cohort_size: usize,
    pub age_in_months: i32,
    pub calculated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgeNorm {
    pub age_bucket: i32,
    pub domain: Domain,
    pub mean: f64,
    pub std_dev: f64,
    pub sample_size: i32,
    /// Synthesized fallback rather than a measured population norm.
    pub is_placeholder: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZProfileSnapshot {
    pub child_id: Uuid,
    pub domain: Domain,
    pub week_start: NaiveDate,
    pub raw_score: f64,
    pub z_score: f64,
    pub percentile: f64,
    pub age_in_months: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "low" => Some(Severity::Low),
            "medium" => Some(Severity::Medium),
            "high" => Some(Severity::High),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskProfile {
    pub child_id: Uuid,
    pub risk_score: f64,
    pub severity: Severity,
    pub avg_z_score: f64,
    pub trend_slope: f64,
    pub domain_imbalance: f64,
    pub emotional_instability: f64,
    pub weakest_domain: Option<Domain>,
    pub strongest_domain: Option<Domain>,
    pub declining_domain: Option<Domain>,
    pub calculated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DevelopmentTrend {
    pub child_id: Uuid,
    pub domain: Domain,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub baseline: f64,
    pub window_average: f64,
    pub delta: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    RiskLevel,
    ScoreDrop,
}

impl AlertKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertKind::RiskLevel => "risk_level",
            AlertKind::ScoreDrop => "score_drop",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "risk_level" => Some(AlertKind::RiskLevel),
            "score_drop" => Some(AlertKind::ScoreDrop),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub id: Uuid,
    pub child_id: Uuid,
    pub domain: Domain,
    pub kind: AlertKind,
    pub level: String,
    pub explanation: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub resolved: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoodRecord {
    pub child_id: Uuid,
    pub recorded_on: NaiveDate,
    pub rating: i32,
}
