//! Recommendation engine.
//!
//! Converts a blind-spot report into prioritized, actionable items.
//! Priority follows the adjusted BSI ladder; ordering is fully
//! deterministic (priority, then incident percentage descending, then
//! category code ascending).

use crate::gap::BlindSpotReport;
use ars_core::recommendation::{Priority, Recommendation};
use ars_core::taxonomy::CategoryKey;
use serde::{Deserialize, Serialize};
use tracing::instrument;

/// Recommendation engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendConfig {
    /// Adjusted BSI above which priority is HIGH.
    #[serde(default = "default_high_threshold")]
    pub high_threshold: f64,
    /// Adjusted BSI above which (up to the high threshold) priority is
    /// MEDIUM.
    #[serde(default = "default_medium_threshold")]
    pub medium_threshold: f64,
    /// Documented percentage at or below which a category counts as
    /// having essentially no documentation, forcing evidence_required.
    #[serde(default = "default_near_zero_doc_pct")]
    pub near_zero_doc_pct: f64,
}

fn default_high_threshold() -> f64 {
    0.5
}

fn default_medium_threshold() -> f64 {
    0.3
}

fn default_near_zero_doc_pct() -> f64 {
    5.0
}

impl Default for RecommendConfig {
    fn default() -> Self {
        Self {
            high_threshold: default_high_threshold(),
            medium_threshold: default_medium_threshold(),
            near_zero_doc_pct: default_near_zero_doc_pct(),
        }
    }
}

/// Generates prioritized recommendations from blind-spot metrics.
#[derive(Debug, Clone, Default)]
pub struct RecommendationEngine {
    config: RecommendConfig,
}

impl RecommendationEngine {
    /// Creates a recommendation engine.
    pub fn new(config: RecommendConfig) -> Self {
        Self { config }
    }

    /// Produces one recommendation per category with signal, ordered by
    /// priority, then incident percentage descending, then category code
    /// ascending.
    #[instrument(skip(self, report), fields(categories = report.by_category.len()))]
    pub fn recommend(&self, report: &BlindSpotReport) -> Vec<Recommendation> {
        let mut recommendations: Vec<Recommendation> = report
            .by_category
            .iter()
            .filter(|m| m.entity_count > 0 || m.documented_pct > 0.0 || m.incident_pct > 0.0)
            .map(|metric| {
                let adjusted_bsi = metric.effective_bsi();
                let priority = if adjusted_bsi > self.config.high_threshold {
                    Priority::High
                } else if adjusted_bsi > self.config.medium_threshold {
                    Priority::Medium
                } else {
                    Priority::Low
                };
                Recommendation {
                    category: metric.category.clone(),
                    priority,
                    action: action_text(&metric.category),
                    evidence_required: metric.documented_pct <= self.config.near_zero_doc_pct,
                    incident_pct: metric.incident_pct,
                    adjusted_bsi,
                }
            })
            .collect();

        recommendations.sort_by(|a, b| {
            b.priority
                .cmp(&a.priority)
                .then_with(|| {
                    b.incident_pct
                        .partial_cmp(&a.incident_pct)
                        .unwrap_or(std::cmp::Ordering::Equal)
                })
                .then_with(|| a.category.cmp(&b.category))
        });
        recommendations
    }
}

/// Concrete corrective action text per category.
fn action_text(category: &CategoryKey) -> String {
    match category.code.as_str() {
        "malicious_actors" | "malicious_uses" => {
            "Document risks related to deepfakes, fraud, social engineering, and targeted \
             manipulation, including specific misuse scenarios."
                .to_string()
        }
        "misinformation" | "misinformation_harms" => {
            "Add explicit warnings about hallucination, false information generation, and \
             impacts on decision-making in critical domains."
                .to_string()
        }
        "privacy_security" | "information_hazards" => {
            "Document data leakage risks, training data memorization, and potential for \
             privacy violations."
                .to_string()
        }
        "socioeconomic_environmental" | "environmental_socioeconomic_harms" => {
            "Include environmental impact of compute, job displacement risks, and equity \
             considerations."
                .to_string()
        }
        "human_computer_interaction" | "human_computer_interaction_harms" => {
            "Address overreliance risks, loss of human agency, and unsafe use in high-stakes \
             contexts."
                .to_string()
        }
        "discrimination_toxicity" | "discrimination_exclusion_toxicity" => {
            "Document demographic bias, toxic output modes, and unequal performance across \
             groups."
                .to_string()
        }
        other => format!("Review and document risks in the {other} category."),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gap::{BlindSpotMetric, ScopeFilter};
    use ars_core::taxonomy::TaxonomyId;
    use chrono::Utc;

    fn metric(code: &str, documented_pct: f64, incident_pct: f64, bsi: f64) -> BlindSpotMetric {
        BlindSpotMetric {
            category: CategoryKey::new(TaxonomyId::MitAiRisk, code),
            documented_pct,
            incident_pct,
            bsi,
            adjusted_bsi: Some(bsi),
            entity_count: 5,
        }
    }

    fn report(metrics: Vec<BlindSpotMetric>) -> BlindSpotReport {
        BlindSpotReport {
            run_at: Utc::now(),
            scope: ScopeFilter::default(),
            global_bsi: 0.0,
            by_category: metrics,
            high_risk: vec![],
            total_documented: 10,
            total_incidents: 10,
        }
    }

    #[test]
    fn test_priority_ladder() {
        let report = report(vec![
            metric("malicious_actors", 4.0, 22.4, 0.82),
            metric("misinformation", 10.2, 12.9, 0.42),
            metric("discrimination_toxicity", 44.5, 27.5, 0.21),
        ]);
        let recommendations = RecommendationEngine::default().recommend(&report);

        assert_eq!(recommendations[0].priority, Priority::High);
        assert_eq!(recommendations[1].priority, Priority::Medium);
        assert_eq!(recommendations[2].priority, Priority::Low);
    }

    #[test]
    fn test_tie_break_by_incident_pct_then_code() {
        let report = report(vec![
            metric("privacy_security", 1.0, 8.0, 0.9),
            metric("malicious_actors", 1.0, 22.0, 0.9),
            metric("ai_system_safety", 1.0, 8.0, 0.9),
        ]);
        let recommendations = RecommendationEngine::default().recommend(&report);

        // All HIGH: incident pct descending, then code ascending.
        assert_eq!(
            recommendations[0].category.code.as_str(),
            "malicious_actors"
        );
        assert_eq!(
            recommendations[1].category.code.as_str(),
            "ai_system_safety"
        );
        assert_eq!(
            recommendations[2].category.code.as_str(),
            "privacy_security"
        );
    }

    #[test]
    fn test_evidence_required_on_near_zero_documentation() {
        let report = report(vec![
            metric("malicious_actors", 0.0, 22.4, 0.82),
            metric("discrimination_toxicity", 44.5, 27.5, 0.21),
        ]);
        let recommendations = RecommendationEngine::default().recommend(&report);

        let malicious = recommendations
            .iter()
            .find(|r| r.category.code.as_str() == "malicious_actors")
            .unwrap();
        assert!(malicious.evidence_required);

        let discrimination = recommendations
            .iter()
            .find(|r| r.category.code.as_str() == "discrimination_toxicity")
            .unwrap();
        assert!(!discrimination.evidence_required);
    }

    #[test]
    fn test_boundary_values() {
        // 0.5 is not HIGH; 0.3 is not MEDIUM.
        let report = report(vec![
            metric("privacy_security", 10.0, 10.0, 0.5),
            metric("misinformation", 10.0, 10.0, 0.3),
        ]);
        let recommendations = RecommendationEngine::default().recommend(&report);
        let by_code = |code: &str| {
            recommendations
                .iter()
                .find(|r| r.category.code.as_str() == code)
                .unwrap()
                .priority
        };
        assert_eq!(by_code("privacy_security"), Priority::Medium);
        assert_eq!(by_code("misinformation"), Priority::Low);
    }
}
