//! Reference distributions and the Z-score / percentile calculator.
//!
//! Two references exist: the child's same-age cohort ([`ChildDomainStats`])
//! and the age-norm table keyed by 6-month bucket ([`AgeNorm`]).

use serde::{Deserialize, Serialize};

use crate::domain::Domain;
use crate::error::StoreResult;
use crate::models::{AgeNorm, ChildDomainStats};
use crate::stats;
use crate::store::Store;

pub const MIN_AGE_BUCKET: i32 = 24;
pub const MAX_AGE_BUCKET: i32 = 72;
pub const BUCKET_WIDTH: i32 = 6;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ZScore {
    pub z_score: f64,
    pub percentile: f64,
}

impl ZScore {
    pub const NEUTRAL: ZScore = ZScore {
        z_score: 0.0,
        percentile: 50.0,
    };

    pub fn from_z(z_score: f64) -> Self {
        Self {
            z_score,
            percentile: percentile(z_score),
        }
    }
}

/// `(raw - mean) / std`, defined as `0` when the spread is zero.
pub fn z_score(raw: f64, mean: f64, std: f64) -> f64 {
    if std == 0.0 || !std.is_finite() {
        return 0.0;
    }
    (raw - mean) / std
}

/// Percentile (0–100) of a standard-normal Z.
pub fn percentile(z: f64) -> f64 {
    stats::normal_cdf(z) * 100.0
}

/// Z against cohort stats. No stats row means no signal.
pub fn cohort_z(stats: Option<&ChildDomainStats>, raw: f64) -> ZScore {
    match stats {
        Some(row) => ZScore::from_z(z_score(raw, row.mean, row.std)),
        None => ZScore::NEUTRAL,
    }
}

pub fn age_norm_z(norm: &AgeNorm, raw: f64) -> ZScore {
    ZScore::from_z(z_score(raw, norm.mean, norm.std_dev))
}

/// Nearest 6-month bucket, clamped to 24..=72.
pub fn age_bucket(age_in_months: i32) -> i32 {
    let rounded = ((age_in_months as f64 / BUCKET_WIDTH as f64).round() as i32) * BUCKET_WIDTH;
    rounded.clamp(MIN_AGE_BUCKET, MAX_AGE_BUCKET)
}

/// Linear stand-in used when no measured norm exists for a bucket.
///
/// Not a clinically valid reference; rows carry `is_placeholder = true`.
pub fn placeholder_norm(age_bucket: i32, domain: Domain) -> AgeNorm {
    AgeNorm {
        age_bucket,
        domain,
        mean: 50.0 + (age_bucket - MIN_AGE_BUCKET) as f64 * 0.5,
        std_dev: 15.0,
        sample_size: 0,
        is_placeholder: true,
    }
}

/// Age-norm lookups backed by the store, synthesizing placeholders on miss.
pub struct NormTable<'a> {
    store: &'a dyn Store,
}

impl<'a> NormTable<'a> {
    pub fn new(store: &'a dyn Store) -> Self {
        Self { store }
    }

    pub async fn get_or_create(&self, age_in_months: i32, domain: Domain) -> StoreResult<AgeNorm> {
        let bucket = age_bucket(age_in_months);
        if let Some(norm) = self.store.age_norm(bucket, domain).await? {
            return Ok(norm);
        }

        tracing::warn!(
            age_bucket = bucket,
            %domain,
            "no age norm on record, persisting placeholder reference"
        );
        self.store
            .insert_age_norm_if_absent(&placeholder_norm(bucket, domain))
            .await
    }

    pub async fn score(&self, age_in_months: i32, domain: Domain, raw: f64) -> StoreResult<ZScore> {
        let norm = self.get_or_create(age_in_months, domain).await?;
        Ok(age_norm_z(&norm, raw))
    }
}
