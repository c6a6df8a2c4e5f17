//! Gap analysis: the Blind Spot Index engine.
//!
//! Aggregates deduplicated canonical entities by category and source type,
//! then computes the Blind Spot Index per category and globally. The BSI
//! measures divergence between how often a risk category is documented and
//! how often it shows up in real-world incidents:
//!
//! ```text
//! BSI = |documented% - incident%| / max(documented%, incident%, eps)
//! ```
//!
//! clamped to [0, 1]; when both percentages are zero the BSI is 0 (no
//! signal, not a gap). Aggregates are always derived fresh from the
//! canonical entity set; nothing is persisted incrementally, so any scope
//! can be re-analyzed without mutating global state.

use ars_core::entity::CanonicalRiskEntity;
use ars_core::statement::SourceType;
use ars_core::taxonomy::CategoryKey;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use thiserror::Error;
use tracing::{info, instrument, warn};

/// Guard against division by zero when one side is zero-adjacent.
pub const BSI_EPSILON: f64 = 1e-9;

/// Errors that abort an analysis run.
#[derive(Error, Debug)]
pub enum AnalysisError {
    /// Category totals disagree with the cluster partition (e.g. a
    /// statement counted twice). The run aborts rather than emit a
    /// silently wrong BSI.
    #[error("Aggregation inconsistency: {0}")]
    AggregationInconsistency(String),
}

/// Restricts an analysis run to a subset of entities.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScopeFilter {
    /// Only entities observed for this model type.
    pub model_type: Option<String>,
    /// Only entities first seen at or after this instant.
    pub period_start: Option<DateTime<Utc>>,
    /// Only entities first seen before this instant.
    pub period_end: Option<DateTime<Utc>>,
}

impl ScopeFilter {
    /// Whether an entity falls inside this scope.
    pub fn matches(&self, entity: &CanonicalRiskEntity) -> bool {
        if let Some(model_type) = &self.model_type {
            if !entity.model_types.contains(model_type) {
                return false;
            }
        }
        if let Some(start) = self.period_start {
            if entity.first_seen < start {
                return false;
            }
        }
        if let Some(end) = self.period_end {
            if entity.first_seen >= end {
                return false;
            }
        }
        true
    }
}

/// Per-(category, source type) counts for one analysis run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CategoryAggregate {
    /// Entities tagged with the category that carry documentation members.
    pub documented_count: usize,
    /// Entities tagged with the category that carry incident members.
    pub incident_count: usize,
    /// Sum of per-entity confidence for documentation-sourced entities.
    pub documented_confidence_sum: f64,
    /// Sum of per-entity confidence for incident-sourced entities.
    pub incident_confidence_sum: f64,
}

/// Blind-spot metrics for one category.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlindSpotMetric {
    /// The category.
    pub category: CategoryKey,
    /// Share of documentation-sourced entities tagged with the category.
    pub documented_pct: f64,
    /// Share of incident-sourced entities tagged with the category.
    pub incident_pct: f64,
    /// Blind Spot Index in [0, 1].
    pub bsi: f64,
    /// BSI after risk propagation adjustment, when computed.
    pub adjusted_bsi: Option<f64>,
    /// Entities contributing to this category (documented + incident).
    pub entity_count: usize,
}

impl BlindSpotMetric {
    /// The propagation-adjusted BSI, falling back to the raw BSI.
    pub fn effective_bsi(&self) -> f64 {
        self.adjusted_bsi.unwrap_or(self.bsi)
    }
}

/// Read-only artifact of one analysis run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlindSpotReport {
    /// When the run happened.
    pub run_at: DateTime<Utc>,
    /// The scope the run was restricted to.
    pub scope: ScopeFilter,
    /// Count-weighted mean of per-category BSI.
    pub global_bsi: f64,
    /// Per-category metrics, highest BSI first.
    pub by_category: Vec<BlindSpotMetric>,
    /// Categories whose BSI exceeds the high-risk threshold.
    pub high_risk: Vec<CategoryKey>,
    /// Documentation-sourced entities in scope.
    pub total_documented: usize,
    /// Incident-sourced entities in scope.
    pub total_incidents: usize,
}

/// Gap analyzer configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GapConfig {
    /// BSI above which a category is high risk.
    #[serde(default = "default_high_risk_threshold")]
    pub high_risk_threshold: f64,
}

fn default_high_risk_threshold() -> f64 {
    0.5
}

impl Default for GapConfig {
    fn default() -> Self {
        Self {
            high_risk_threshold: default_high_risk_threshold(),
        }
    }
}

/// Computes the Blind Spot Index for one category.
///
/// Defined as 0 when both percentages are zero: no signal is not a gap.
pub fn blind_spot_index(documented_pct: f64, incident_pct: f64) -> f64 {
    if documented_pct == 0.0 && incident_pct == 0.0 {
        return 0.0;
    }
    let gap = (documented_pct - incident_pct).abs();
    let denominator = documented_pct.max(incident_pct).max(BSI_EPSILON);
    (gap / denominator).clamp(0.0, 1.0)
}

/// Aggregates canonical entities and computes blind-spot metrics.
#[derive(Debug, Clone, Default)]
pub struct GapAnalyzer {
    config: GapConfig,
}

impl GapAnalyzer {
    /// Creates a gap analyzer.
    pub fn new(config: GapConfig) -> Self {
        Self { config }
    }

    /// Runs gap analysis over the entity set, restricted to the scope.
    ///
    /// Pure with respect to global state: the same entities and scope
    /// always produce the same report (modulo `run_at`).
    #[instrument(skip(self, entities), fields(entities = entities.len()))]
    pub fn analyze(
        &self,
        entities: &[CanonicalRiskEntity],
        scope: &ScopeFilter,
    ) -> Result<BlindSpotReport, AnalysisError> {
        Self::verify_partition_disjoint(entities)?;

        // Unclassified-only entities carry no category signal; they are
        // tracked in the review queue, not in percentages.
        let in_scope: Vec<&CanonicalRiskEntity> = entities
            .iter()
            .filter(|e| scope.matches(e) && !e.is_unclassified())
            .collect();

        let total_documented = in_scope
            .iter()
            .filter(|e| e.has_source(SourceType::Documentation))
            .count();
        let total_incidents = in_scope
            .iter()
            .filter(|e| e.has_source(SourceType::Incident))
            .count();

        let aggregates = Self::aggregate(&in_scope);
        Self::verify_totals(&aggregates, total_documented, total_incidents)?;

        let mut by_category: Vec<BlindSpotMetric> = aggregates
            .into_iter()
            .map(|(category, agg)| {
                let documented_pct = percentage(agg.documented_count, total_documented);
                let incident_pct = percentage(agg.incident_count, total_incidents);
                BlindSpotMetric {
                    category,
                    documented_pct,
                    incident_pct,
                    bsi: blind_spot_index(documented_pct, incident_pct),
                    adjusted_bsi: None,
                    entity_count: agg.documented_count + agg.incident_count,
                }
            })
            .collect();

        // Highest BSI first; category key as the deterministic tie-break.
        by_category.sort_by(|a, b| {
            b.bsi
                .partial_cmp(&a.bsi)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.category.cmp(&b.category))
        });

        let global_bsi = Self::global_bsi(&by_category);
        let high_risk: Vec<CategoryKey> = by_category
            .iter()
            .filter(|m| m.bsi > self.config.high_risk_threshold)
            .map(|m| m.category.clone())
            .collect();

        for metric in &by_category {
            if metric.bsi > self.config.high_risk_threshold {
                warn!(
                    category = %metric.category,
                    bsi = format!("{:.3}", metric.bsi),
                    "High-risk blind spot detected"
                );
            }
        }
        info!(
            global_bsi = format!("{global_bsi:.3}"),
            high_risk = high_risk.len(),
            "Gap analysis complete"
        );

        Ok(BlindSpotReport {
            run_at: Utc::now(),
            scope: scope.clone(),
            global_bsi,
            by_category,
            high_risk,
            total_documented,
            total_incidents,
        })
    }

    /// Count-weighted mean of per-category BSI over categories with a
    /// nonzero total count.
    pub fn global_bsi(metrics: &[BlindSpotMetric]) -> f64 {
        let mut weighted = 0.0;
        let mut weight = 0.0;
        for metric in metrics {
            if metric.entity_count == 0 {
                continue;
            }
            weighted += metric.bsi * metric.entity_count as f64;
            weight += metric.entity_count as f64;
        }
        if weight == 0.0 {
            0.0
        } else {
            weighted / weight
        }
    }

    fn aggregate(
        in_scope: &[&CanonicalRiskEntity],
    ) -> BTreeMap<CategoryKey, CategoryAggregate> {
        let mut aggregates: BTreeMap<CategoryKey, CategoryAggregate> = BTreeMap::new();
        for entity in in_scope {
            for (category, confidence) in &entity.categories {
                let agg = aggregates.entry(category.clone()).or_default();
                if entity.has_source(SourceType::Documentation) {
                    agg.documented_count += 1;
                    agg.documented_confidence_sum += confidence;
                }
                if entity.has_source(SourceType::Incident) {
                    agg.incident_count += 1;
                    agg.incident_confidence_sum += confidence;
                }
            }
        }
        aggregates
    }

    /// Entities must not share member statements: double counting here
    /// would silently distort every percentage downstream.
    fn verify_partition_disjoint(
        entities: &[CanonicalRiskEntity],
    ) -> Result<(), AnalysisError> {
        let mut seen = HashSet::new();
        for entity in entities {
            for id in &entity.member_statement_ids {
                if !seen.insert(*id) {
                    return Err(AnalysisError::AggregationInconsistency(format!(
                        "statement {id} appears in more than one cluster"
                    )));
                }
            }
        }
        Ok(())
    }

    fn verify_totals(
        aggregates: &BTreeMap<CategoryKey, CategoryAggregate>,
        total_documented: usize,
        total_incidents: usize,
    ) -> Result<(), AnalysisError> {
        for (category, agg) in aggregates {
            if agg.documented_count > total_documented {
                return Err(AnalysisError::AggregationInconsistency(format!(
                    "category {category} documented count {} exceeds scope total {}",
                    agg.documented_count, total_documented
                )));
            }
            if agg.incident_count > total_incidents {
                return Err(AnalysisError::AggregationInconsistency(format!(
                    "category {category} incident count {} exceeds scope total {}",
                    agg.incident_count, total_incidents
                )));
            }
        }
        Ok(())
    }
}

fn percentage(count: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        count as f64 / total as f64 * 100.0
    }
}

pub mod reference {
    //! Reference calibration distributions from the AI model risk catalog
    //! study (percent of documented risks and of observed incidents per
    //! scheme-A category). Used as a demo baseline and by calibration
    //! tests.

    use super::{blind_spot_index, BlindSpotMetric};
    use ars_core::taxonomy::{CategoryKey, TaxonomyId};

    /// (category code, documented %, incident %).
    pub const REFERENCE_DISTRIBUTION: &[(&str, f64, f64)] = &[
        ("discrimination_toxicity", 44.5, 27.5),
        ("ai_system_safety", 37.3, 23.9),
        ("misinformation", 10.2, 12.9),
        ("malicious_actors", 4.0, 22.4),
        ("privacy_security", 2.9, 8.2),
        ("human_computer_interaction", 0.6, 1.5),
        ("socioeconomic_environmental", 0.5, 3.6),
    ];

    /// Blind-spot metrics computed from the reference distribution,
    /// highest BSI first.
    pub fn reference_metrics() -> Vec<BlindSpotMetric> {
        let mut metrics: Vec<BlindSpotMetric> = REFERENCE_DISTRIBUTION
            .iter()
            .map(|(code, documented_pct, incident_pct)| BlindSpotMetric {
                category: CategoryKey::new(TaxonomyId::MitAiRisk, *code),
                documented_pct: *documented_pct,
                incident_pct: *incident_pct,
                bsi: blind_spot_index(*documented_pct, *incident_pct),
                adjusted_bsi: None,
                entity_count: 0,
            })
            .collect();
        metrics.sort_by(|a, b| {
            b.bsi
                .partial_cmp(&a.bsi)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.category.cmp(&b.category))
        });
        metrics
    }
}
