use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::config::EngineConfig;
use crate::domain::Domain;
use crate::error::StoreResult;
use crate::explain::Explanation;
use crate::matrix::{self, RiskLevel};
use crate::models::{Alert, AlertKind, DevelopmentTrend};
use crate::risk::DomainHistory;
use crate::store::Store;

#[derive(Debug, Clone, PartialEq)]
pub struct AlertCandidate {
    pub domain: Domain,
    pub kind: AlertKind,
    pub level: String,
    /// Percentage-point change behind a score-drop candidate.
    pub delta: Option<f64>,
}

/// At most one candidate per domain. A matrix level of medium or high takes
/// precedence over a percentage-point drop in the latest trend window.
pub fn detect(
    histories: &[DomainHistory],
    trends: &[DevelopmentTrend],
    config: &EngineConfig,
) -> Vec<AlertCandidate> {
    let mut candidates = Vec::new();
    for domain in Domain::ALL {
        let history = histories.iter().find(|h| h.domain == domain);
        let classification = history
            .and_then(|h| h.latest().map(|z| matrix::classify(&config.matrix, z, h.slope())));

        if let Some(classification) = classification {
            if classification.level >= RiskLevel::Medium {
                candidates.push(AlertCandidate {
                    domain,
                    kind: AlertKind::RiskLevel,
                    level: classification.level.as_str().to_string(),
                    delta: None,
                });
                continue;
            }
        }

        let dropped = trends
            .iter()
            .filter(|t| t.domain == domain)
            .max_by_key(|t| t.period_start)
            .filter(|t| t.delta <= -config.score_drop_threshold);
        if let Some(trend) = dropped {
            // A drop is reported no lower than the low tier.
            let level = classification
                .map(|c| c.level)
                .unwrap_or(RiskLevel::Normal)
                .max(RiskLevel::Low);
            candidates.push(AlertCandidate {
                domain,
                kind: AlertKind::ScoreDrop,
                level: level.as_str().to_string(),
                delta: Some(trend.delta),
            });
        }
    }
    candidates
}

/// Persists candidates for which no unresolved alert exists yet.
pub async fn raise(
    store: &dyn Store,
    child_id: Uuid,
    candidates: &[AlertCandidate],
    explanation: &Explanation,
    now: DateTime<Utc>,
) -> StoreResult<usize> {
    let payload = serde_json::to_value(explanation)
        .map_err(|err| crate::error::StoreError::InvalidRecord(err.to_string()))?;

    let mut created = 0usize;
    for candidate in candidates {
        if store.has_open_alert(child_id, candidate.domain).await? {
            tracing::debug!(%child_id, domain = %candidate.domain, "open alert exists, skipping");
            continue;
        }
        let mut explanation = payload.clone();
        if let (Some(delta), Some(fields)) = (candidate.delta, explanation.as_object_mut()) {
            fields.insert("score_drop_delta".to_string(), serde_json::json!(delta));
        }
        let alert = Alert {
            id: Uuid::new_v4(),
            child_id,
            domain: candidate.domain,
            kind: candidate.kind,
            level: candidate.level.clone(),
            explanation: Some(explanation),
            created_at: now,
            resolved: false,
        };
        if store.insert_alert(&alert).await? {
            tracing::info!(
                %child_id,
                domain = %candidate.domain,
                kind = candidate.kind.as_str(),
                level = %candidate.level,
                "alert raised"
            );
            created += 1;
        }
    }
    Ok(created)
}
