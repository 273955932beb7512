use serde::{Deserialize, Serialize};

use crate::domain::Domain;
use crate::models::ChildDomainStats;
use crate::stats;

pub const WEEKS_PER_MONTH: f64 = 4.33;
pub const MIN_POINTS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    Low,
    Medium,
    High,
}

impl Confidence {
    pub fn from_fit(points: usize, r_squared: f64) -> Self {
        if points >= 8 && r_squared > 0.7 {
            Confidence::High
        } else if points >= 4 && r_squared > 0.5 {
            Confidence::Medium
        } else {
            Confidence::Low
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Confidence::Low => "low",
            Confidence::Medium => "medium",
            Confidence::High => "high",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Projection {
    pub domain: Domain,
    pub current_z_score: f64,
    pub projected_z_score: f64,
    /// Projected 0–100 score; only known when cohort stats exist.
    pub projected_raw_score: Option<f64>,
    pub slope: f64,
    pub r_squared: f64,
    pub points: usize,
    pub confidence: Confidence,
    pub months: f64,
}

/// Extrapolates a domain's weekly Z series `months` ahead.
///
/// With fewer than three points the projection is the current value with
/// low confidence.
pub fn project(
    domain: Domain,
    z_scores: &[f64],
    cohort: Option<&ChildDomainStats>,
    months: f64,
) -> Projection {
    let current_z_score = z_scores.last().copied().unwrap_or(0.0);

    let fit = if z_scores.len() < MIN_POINTS {
        None
    } else {
        stats::linear_fit(z_scores)
    };

    let Some(fit) = fit else {
        return Projection {
            domain,
            current_z_score,
            projected_z_score: current_z_score,
            projected_raw_score: None,
            slope: 0.0,
            r_squared: 0.0,
            points: z_scores.len(),
            confidence: Confidence::Low,
            months,
        };
    };

    let weeks = months * WEEKS_PER_MONTH;
    let projected_z_score = current_z_score + fit.slope * weeks;
    let projected_raw_score =
        cohort.map(|stats| (projected_z_score * stats.std + stats.mean).clamp(0.0, 100.0));

    Projection {
        domain,
        current_z_score,
        projected_z_score,
        projected_raw_score,
        slope: fit.slope,
        r_squared: fit.r_squared,
        points: z_scores.len(),
        confidence: Confidence::from_fit(z_scores.len(), fit.r_squared),
        months,
    }
}
