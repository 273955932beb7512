use std::fmt::Write;

use chrono::NaiveDate;
use serde::Serialize;
use uuid::Uuid;

use crate::config::EngineConfig;
use crate::domain::Domain;
use crate::explain::Explanation;
use crate::matrix::{self, Classification, RiskLevel};
use crate::models::{Child, ChildDomainStats, NeuroProfile, RiskProfile};
use crate::norms;
use crate::risk::DomainHistory;
use crate::trajectory::{self, Projection};

#[derive(Debug, Clone, Serialize)]
pub struct DomainReport {
    pub domain: Domain,
    pub raw_score: f64,
    pub z_score: f64,
    pub percentile: f64,
    pub cohort_size: Option<usize>,
    pub classification: Classification,
    pub projection: Projection,
}

/// Numeric payload for the report renderer.
#[derive(Debug, Clone, Serialize)]
pub struct ChildReport {
    pub child_id: Uuid,
    pub child_name: String,
    pub age_in_months: i32,
    pub generated_on: NaiveDate,
    pub overall_level: RiskLevel,
    pub domains: Vec<DomainReport>,
    pub risk: Option<RiskProfile>,
    /// Set when any age-norm reference used so far was synthesized.
    pub placeholder_norms: bool,
}

/// Input for the external narrative generator: numbers, tiers and facts only.
#[derive(Debug, Clone, Serialize)]
pub struct NarrativeInput {
    pub child_id: Uuid,
    pub age_in_months: i32,
    pub overall_level: RiskLevel,
    pub severity: Option<String>,
    pub risk_score: Option<f64>,
    pub domains: Vec<NarrativeDomain>,
    pub explanation: Explanation,
}

#[derive(Debug, Clone, Serialize)]
pub struct NarrativeDomain {
    pub domain: Domain,
    pub z_score: f64,
    pub percentile: f64,
    pub level: RiskLevel,
    pub projected_z_score: f64,
}

pub struct ReportInputs<'a> {
    pub child: &'a Child,
    pub profile: &'a NeuroProfile,
    pub stats: &'a [ChildDomainStats],
    pub histories: &'a [DomainHistory],
    pub risk: Option<RiskProfile>,
    pub placeholder_norms: bool,
    pub today: NaiveDate,
}

/// Scores each domain against its cohort, classifies it and projects it forward.
pub fn build_report(inputs: ReportInputs<'_>, config: &EngineConfig) -> ChildReport {
    let mut domains = Vec::with_capacity(Domain::ALL.len());
    for domain in Domain::ALL {
        let raw_score = inputs.profile.score(domain);
        let stats = inputs.stats.iter().find(|s| s.domain == domain);
        let scored = norms::cohort_z(stats, raw_score);
        let history = inputs.histories.iter().find(|h| h.domain == domain);
        let z_scores: &[f64] = history.map(|h| h.z_scores.as_slice()).unwrap_or(&[]);
        let slope = history.map(|h| h.slope()).unwrap_or(0.0);

        domains.push(DomainReport {
            domain,
            raw_score,
            z_score: scored.z_score,
            percentile: scored.percentile,
            cohort_size: stats.map(|s| s.cohort_size),
            classification: matrix::classify(&config.matrix, scored.z_score, slope),
            projection: trajectory::project(domain, z_scores, stats, config.projection_months),
        });
    }

    ChildReport {
        child_id: inputs.child.id,
        child_name: inputs.child.full_name.clone(),
        age_in_months: inputs.child.age_in_months(inputs.today),
        generated_on: inputs.today,
        overall_level: matrix::overall_level(domains.iter().map(|d| d.classification.level)),
        domains,
        risk: inputs.risk,
        placeholder_norms: inputs.placeholder_norms,
    }
}

pub fn narrative_input(report: &ChildReport, explanation: Explanation) -> NarrativeInput {
    NarrativeInput {
        child_id: report.child_id,
        age_in_months: report.age_in_months,
        overall_level: report.overall_level,
        severity: report.risk.as_ref().map(|r| r.severity.as_str().to_string()),
        risk_score: report.risk.as_ref().map(|r| r.risk_score),
        domains: report
            .domains
            .iter()
            .map(|d| NarrativeDomain {
                domain: d.domain,
                z_score: d.z_score,
                percentile: d.percentile,
                level: d.classification.level,
                projected_z_score: d.projection.projected_z_score,
            })
            .collect(),
        explanation,
    }
}

pub fn render_markdown(report: &ChildReport) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# Developmental Profile: {}", report.child_name);
    let _ = writeln!(
        output,
        "Generated {} (age {} months), overall level: {}",
        report.generated_on,
        report.age_in_months,
        report.overall_level.as_str()
    );
    if report.placeholder_norms {
        let _ = writeln!(
            output,
            "> Age-norm percentiles use placeholder reference values, not measured norms."
        );
    }
    let _ = writeln!(output);
    let _ = writeln!(output, "## Domains");
    let _ = writeln!(
        output,
        "| Domain | Score | Z | Percentile | Level | 3-month Z | Confidence |"
    );
    let _ = writeln!(output, "|---|---|---|---|---|---|---|");

    for domain in &report.domains {
        let _ = writeln!(
            output,
            "| {} | {:.1} | {:.2} | {:.1} | {} | {:.2} | {} |",
            domain.domain,
            domain.raw_score,
            domain.z_score,
            domain.percentile,
            domain.classification.level.as_str(),
            domain.projection.projected_z_score,
            domain.projection.confidence.as_str()
        );
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Risk Profile");
    match &report.risk {
        None => {
            let _ = writeln!(output, "Insufficient data yet.");
        }
        Some(risk) => {
            let _ = writeln!(
                output,
                "- score {:.2} ({})",
                risk.risk_score,
                risk.severity.as_str()
            );
            let _ = writeln!(output, "- trend slope {:.3}", risk.trend_slope);
            let _ = writeln!(output, "- domain imbalance {:.2}", risk.domain_imbalance);
            let _ = writeln!(
                output,
                "- emotional instability {:.2}",
                risk.emotional_instability
            );
            if let Some(domain) = risk.declining_domain {
                let _ = writeln!(output, "- declining domain: {domain}");
            }
        }
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::explain;
    use chrono::{Months, Utc};

    fn fixture() -> (Child, NeuroProfile, Vec<ChildDomainStats>, Vec<DomainHistory>) {
        let today = NaiveDate::from_ymd_opt(2026, 10, 16).unwrap();
        let child = Child {
            id: Uuid::new_v4(),
            full_name: "Mina Hart".to_string(),
            date_of_birth: today.checked_sub_months(Months::new(30)).unwrap(),
            active: true,
        };
        let mut profile = NeuroProfile::empty(child.id, Utc::now());
        profile.scores.set(Domain::FineMotor, 70.0);
        profile.scores.set(Domain::LanguageCommunication, 20.0);

        let stats = vec![
            ChildDomainStats {
                child_id: child.id,
                domain: Domain::FineMotor,
                mean: 52.5,
                std: 8.539,
                cohort_size: 6,
                age_in_months: 30,
                calculated_at: Utc::now(),
            },
            ChildDomainStats {
                child_id: child.id,
                domain: Domain::LanguageCommunication,
                mean: 60.0,
                std: 10.0,
                cohort_size: 6,
                age_in_months: 30,
                calculated_at: Utc::now(),
            },
        ];
        let histories = vec![DomainHistory {
            domain: Domain::LanguageCommunication,
            z_scores: vec![-1.0, -1.5, -2.2, -3.0],
            latest_percentile: Some(0.1),
        }];
        (child, profile, stats, histories)
    }

    #[test]
    fn report_scores_classifies_and_projects() {
        let (child, profile, stats, histories) = fixture();
        let report = build_report(
            ReportInputs {
                child: &child,
                profile: &profile,
                stats: &stats,
                histories: &histories,
                risk: None,
                placeholder_norms: false,
                today: NaiveDate::from_ymd_opt(2026, 10, 16).unwrap(),
            },
            &EngineConfig::default(),
        );

        assert_eq!(report.domains.len(), 10);
        let fine = &report.domains[Domain::FineMotor.index()];
        assert_eq!(fine.classification.level, RiskLevel::Normal);
        assert!((fine.z_score - 2.049).abs() < 1e-3);

        let language = &report.domains[Domain::LanguageCommunication.index()];
        assert_eq!(language.classification.level, RiskLevel::High);
        assert!(language.projection.projected_z_score < -3.0);

        let self_care = &report.domains[Domain::SelfCare.index()];
        assert_eq!(self_care.z_score, 0.0);
        assert_eq!(self_care.cohort_size, None);

        assert_eq!(report.overall_level, RiskLevel::High);
        assert_eq!(report.age_in_months, 30);
    }

    #[test]
    fn markdown_and_narrative_payloads() {
        let (child, profile, stats, histories) = fixture();
        let report = build_report(
            ReportInputs {
                child: &child,
                profile: &profile,
                stats: &stats,
                histories: &histories,
                risk: None,
                placeholder_norms: true,
                today: NaiveDate::from_ymd_opt(2026, 10, 16).unwrap(),
            },
            &EngineConfig::default(),
        );

        let markdown = render_markdown(&report);
        assert!(markdown.contains("# Developmental Profile: Mina Hart"));
        assert!(markdown.contains("placeholder reference values"));
        assert!(markdown.contains("Insufficient data yet."));

        let payload = narrative_input(&report, explain::explain(&histories, &[], -0.1));
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["overall_level"], "high");
        assert_eq!(json["domains"].as_array().unwrap().len(), 10);
        assert_eq!(
            json["explanation"]["declining_domains"][0]["domain"],
            "language_communication"
        );
    }
}
