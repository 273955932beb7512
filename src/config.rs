use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};

/// Weights of the composite risk score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskWeights {
    pub avg_z_score: f64,
    pub trend_slope: f64,
    pub domain_imbalance: f64,
    pub emotional_instability: f64,
}

impl Default for RiskWeights {
    fn default() -> Self {
        Self {
            avg_z_score: 0.4,
            trend_slope: 0.3,
            domain_imbalance: 0.2,
            emotional_instability: 0.1,
        }
    }
}

/// Strict upper bounds on the risk score for each severity tier.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeverityThresholds {
    pub high_below: f64,
    pub medium_below: f64,
}

impl Default for SeverityThresholds {
    fn default() -> Self {
        Self {
            high_below: -1.5,
            medium_below: -0.8,
        }
    }
}

/// One row of the clinical risk matrix: below either bound triggers the level.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MatrixBand {
    pub z_below: f64,
    pub slope_below: f64,
}

/// Partial band as written in a policy file. Missing bounds fall back to
/// the band's own default.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
struct MatrixBandOverride {
    z_below: Option<f64>,
    slope_below: Option<f64>,
}

impl MatrixBandOverride {
    fn apply(self, base: MatrixBand) -> MatrixBand {
        MatrixBand {
            z_below: self.z_below.unwrap_or(base.z_below),
            slope_below: self.slope_below.unwrap_or(base.slope_below),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(default)]
struct MatrixThresholdsOverride {
    high: MatrixBandOverride,
    medium: MatrixBandOverride,
    low: MatrixBandOverride,
}

impl From<MatrixThresholdsOverride> for MatrixThresholds {
    fn from(raw: MatrixThresholdsOverride) -> Self {
        let base = MatrixThresholds::default();
        Self {
            high: raw.high.apply(base.high),
            medium: raw.medium.apply(base.medium),
            low: raw.low.apply(base.low),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "MatrixThresholdsOverride")]
pub struct MatrixThresholds {
    pub high: MatrixBand,
    pub medium: MatrixBand,
    pub low: MatrixBand,
}

impl Default for MatrixThresholds {
    fn default() -> Self {
        Self {
            high: MatrixBand {
                z_below: -2.0,
                slope_below: -5.0,
            },
            medium: MatrixBand {
                z_below: -1.3,
                slope_below: -3.0,
            },
            low: MatrixBand {
                z_below: -0.7,
                slope_below: -1.0,
            },
        }
    }
}

/// Scoring policy. Every field defaults to the documented engine constants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub risk_weights: RiskWeights,
    pub severity: SeverityThresholds,
    pub matrix: MatrixThresholds,
    pub cohort_window_months: i32,
    pub risk_window_weeks: usize,
    pub trajectory_window_weeks: usize,
    pub projection_months: f64,
    pub declining_slope_below: f64,
    pub mood_window_days: i64,
    pub trend_window_days: i64,
    pub score_drop_threshold: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            risk_weights: RiskWeights::default(),
            severity: SeverityThresholds::default(),
            matrix: MatrixThresholds::default(),
            cohort_window_months: 3,
            risk_window_weeks: 4,
            trajectory_window_weeks: 12,
            projection_months: 3.0,
            declining_slope_below: -0.1,
            mood_window_days: 28,
            trend_window_days: 7,
            score_drop_threshold: 15.0,
        }
    }
}

impl EngineConfig {
    pub fn from_json(raw: &str) -> EngineResult<Self> {
        let config: EngineConfig =
            serde_json::from_str(raw).map_err(|err| EngineError::Config(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> EngineResult<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|err| EngineError::Config(format!("{}: {err}", path.display())))?;
        Self::from_json(&raw)
    }

    pub fn validate(&self) -> EngineResult<()> {
        if self.severity.high_below > self.severity.medium_below {
            return Err(EngineError::Config(
                "severity.high_below must not exceed severity.medium_below".to_string(),
            ));
        }
        let m = &self.matrix;
        if !(m.high.z_below <= m.medium.z_below && m.medium.z_below <= m.low.z_below) {
            return Err(EngineError::Config(
                "matrix z thresholds must be ordered high <= medium <= low".to_string(),
            ));
        }
        if !(m.high.slope_below <= m.medium.slope_below && m.medium.slope_below <= m.low.slope_below)
        {
            return Err(EngineError::Config(
                "matrix slope thresholds must be ordered high <= medium <= low".to_string(),
            ));
        }
        if self.risk_window_weeks == 0 || self.trajectory_window_weeks == 0 {
            return Err(EngineError::Config("history windows must be positive".to_string()));
        }
        if self.cohort_window_months < 0 || self.mood_window_days <= 0 || self.trend_window_days <= 0 {
            return Err(EngineError::Config("windows must be positive".to_string()));
        }
        Ok(())
    }
}
