//! Deterministic per-domain clinical classification from (Z-score, slope).

use serde::{Deserialize, Serialize};

use crate::config::{MatrixBand, MatrixThresholds};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Normal,
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Normal => "normal",
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Classification {
    pub level: RiskLevel,
    pub interpretation: &'static str,
    pub clinical_meaning: &'static str,
}

fn triggers(band: &MatrixBand, z_score: f64, slope: f64) -> bool {
    z_score < band.z_below || slope < band.slope_below
}

/// First matching band wins, checked from high to low.
pub fn classify(thresholds: &MatrixThresholds, z_score: f64, slope: f64) -> Classification {
    if triggers(&thresholds.high, z_score, slope) {
        Classification {
            level: RiskLevel::High,
            interpretation: "severe developmental lag or rapid decline",
            clinical_meaning: "refer for specialist developmental evaluation",
        }
    } else if triggers(&thresholds.medium, z_score, slope) {
        Classification {
            level: RiskLevel::Medium,
            interpretation: "moderate delay or decline",
            clinical_meaning: "targeted support plan and close monitoring",
        }
    } else if triggers(&thresholds.low, z_score, slope) {
        Classification {
            level: RiskLevel::Low,
            interpretation: "at risk",
            clinical_meaning: "observe and reassess at the next cycle",
        }
    } else {
        Classification {
            level: RiskLevel::Normal,
            interpretation: "within expected range",
            clinical_meaning: "no action required",
        }
    }
}

/// Overall level across a child's domain classifications.
pub fn overall_level<I>(levels: I) -> RiskLevel
where
    I: IntoIterator<Item = RiskLevel>,
{
    let mut mediums = 0usize;
    let mut lows = 0usize;
    for level in levels {
        match level {
            RiskLevel::High => return RiskLevel::High,
            RiskLevel::Medium => mediums += 1,
            RiskLevel::Low => lows += 1,
            RiskLevel::Normal => {}
        }
    }
    if mediums >= 1 {
        RiskLevel::Medium
    } else if lows >= 1 {
        RiskLevel::Low
    } else {
        RiskLevel::Normal
    }
}
