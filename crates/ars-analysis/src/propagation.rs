//! Risk propagation model.
//!
//! Derives secondary risk exposure from co-occurrence patterns between
//! categories: a category rarely documented on its own but frequently
//! tagged together with a high-incident, low-documentation category
//! inherits elevated risk. The adjustment is additive, weighted, and
//! capped so adjusted values stay inside the BSI range [0, 1].

use crate::gap::BlindSpotReport;
use ars_core::entity::CanonicalRiskEntity;
use ars_core::taxonomy::CategoryKey;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, instrument};

/// Propagation configuration. The weighting function and cap are
/// configuration, not hard-coded constants.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PropagationConfig {
    /// Weight applied to the summed co-occurrence contributions.
    #[serde(default = "default_weight")]
    pub weight: f64,
    /// Upper bound on the total boost a single category may receive.
    #[serde(default = "default_max_boost")]
    pub max_boost: f64,
}

fn default_weight() -> f64 {
    0.5
}

fn default_max_boost() -> f64 {
    0.25
}

impl Default for PropagationConfig {
    fn default() -> Self {
        Self {
            weight: default_weight(),
            max_boost: default_max_boost(),
        }
    }
}

/// Pairwise co-occurrence over canonical entities.
///
/// `fraction(a, b)` is the share of considered entities carrying both
/// tags. Pairs are only meaningful within one taxonomy; cross-scheme
/// pairs co-occur trivially because every statement is classified in both
/// schemes.
#[derive(Debug, Clone, Default)]
pub struct CooccurrenceMatrix {
    pairs: BTreeMap<(CategoryKey, CategoryKey), f64>,
}

impl CooccurrenceMatrix {
    /// Builds the matrix from entities carrying at least one category.
    pub fn build(entities: &[CanonicalRiskEntity]) -> Self {
        let tagged: Vec<&CanonicalRiskEntity> =
            entities.iter().filter(|e| !e.is_unclassified()).collect();
        let total = tagged.len();
        let mut counts: BTreeMap<(CategoryKey, CategoryKey), usize> = BTreeMap::new();

        for entity in &tagged {
            let keys: Vec<&CategoryKey> = entity.categories.keys().collect();
            for (i, a) in keys.iter().enumerate() {
                for b in keys.iter().skip(i + 1) {
                    if a.taxonomy != b.taxonomy {
                        continue;
                    }
                    // Normalized ordering so (a, b) and (b, a) share a cell.
                    let pair = if a < b {
                        ((*a).clone(), (*b).clone())
                    } else {
                        ((*b).clone(), (*a).clone())
                    };
                    *counts.entry(pair).or_insert(0) += 1;
                }
            }
        }

        let pairs = counts
            .into_iter()
            .map(|(pair, count)| (pair, count as f64 / total.max(1) as f64))
            .collect();
        Self { pairs }
    }

    /// Fraction of entities carrying both tags.
    pub fn fraction(&self, a: &CategoryKey, b: &CategoryKey) -> f64 {
        let pair = if a < b {
            (a.clone(), b.clone())
        } else {
            (b.clone(), a.clone())
        };
        self.pairs.get(&pair).copied().unwrap_or(0.0)
    }
}

/// Adjusts blind-spot metrics with co-occurrence-derived exposure.
#[derive(Debug, Clone, Default)]
pub struct PropagationModel {
    config: PropagationConfig,
}

impl PropagationModel {
    /// Creates a propagation model.
    pub fn new(config: PropagationConfig) -> Self {
        Self { config }
    }

    /// Returns the report with `adjusted_bsi` filled in for every
    /// category.
    ///
    /// The boost a category receives from a co-occurring partner grows
    /// with the partner's incident-over-documentation surplus; the total
    /// adjustment is capped and the result clamped into [0, 1]. Pure over
    /// its inputs.
    #[instrument(skip(self, entities, report), fields(categories = report.by_category.len()))]
    pub fn propagate(
        &self,
        entities: &[CanonicalRiskEntity],
        mut report: BlindSpotReport,
    ) -> BlindSpotReport {
        let matrix = CooccurrenceMatrix::build(entities);

        // Surplus lookup from the unadjusted metrics.
        let surplus: BTreeMap<CategoryKey, f64> = report
            .by_category
            .iter()
            .map(|m| {
                let surplus = (m.incident_pct - m.documented_pct).max(0.0) / 100.0;
                (m.category.clone(), surplus)
            })
            .collect();

        let boosts: Vec<f64> = report
            .by_category
            .iter()
            .map(|metric| {
                let contribution: f64 = surplus
                    .iter()
                    .filter(|(other, _)| **other != metric.category)
                    .map(|(other, surplus)| matrix.fraction(&metric.category, other) * surplus)
                    .sum();
                (self.config.weight * contribution).min(self.config.max_boost)
            })
            .collect();

        for (metric, boost) in report.by_category.iter_mut().zip(boosts) {
            let adjusted = (metric.bsi + boost).clamp(0.0, 1.0);
            if boost > 0.0 {
                debug!(
                    category = %metric.category,
                    boost = format!("{boost:.4}"),
                    "Propagation boost applied"
                );
            }
            metric.adjusted_bsi = Some(adjusted);
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gap::{GapAnalyzer, ScopeFilter};
    use ars_core::statement::SourceType;
    use ars_core::taxonomy::TaxonomyId;
    use chrono::Utc;
    use std::collections::{BTreeMap, BTreeSet};
    use uuid::Uuid;

    fn entity(categories: &[&str], source_types: &[SourceType]) -> CanonicalRiskEntity {
        let mut category_map = BTreeMap::new();
        for code in categories {
            category_map.insert(CategoryKey::new(TaxonomyId::MitAiRisk, *code), 0.7);
        }
        CanonicalRiskEntity {
            cluster_id: Uuid::new_v4(),
            member_statement_ids: vec![Uuid::new_v4()],
            representative: "test entity".to_string(),
            categories: category_map,
            source_types: source_types.iter().copied().collect(),
            model_types: BTreeSet::new(),
            first_seen: Utc::now(),
        }
    }

    fn analyzed(entities: &[CanonicalRiskEntity]) -> BlindSpotReport {
        GapAnalyzer::default()
            .analyze(entities, &ScopeFilter::default())
            .unwrap()
    }

    #[test]
    fn test_cooccurrence_fractions() {
        let entities = vec![
            entity(
                &["malicious_actors", "privacy_security"],
                &[SourceType::Incident],
            ),
            entity(&["malicious_actors"], &[SourceType::Incident]),
        ];
        let matrix = CooccurrenceMatrix::build(&entities);
        let a = CategoryKey::new(TaxonomyId::MitAiRisk, "malicious_actors");
        let b = CategoryKey::new(TaxonomyId::MitAiRisk, "privacy_security");
        assert!((matrix.fraction(&a, &b) - 0.5).abs() < 1e-12);
        assert_eq!(matrix.fraction(&b, &a), matrix.fraction(&a, &b));
    }

    #[test]
    fn test_boost_from_under_documented_partner() {
        // privacy_security co-occurs with malicious_actors, which has high
        // incidents and no documentation; privacy inherits exposure.
        let entities = vec![
            entity(
                &["privacy_security", "malicious_actors"],
                &[SourceType::Incident],
            ),
            entity(&["malicious_actors"], &[SourceType::Incident]),
            entity(&["privacy_security"], &[SourceType::Documentation]),
        ];
        let report = analyzed(&entities);
        let adjusted = PropagationModel::default().propagate(&entities, report);

        let privacy = adjusted
            .by_category
            .iter()
            .find(|m| m.category.code.as_str() == "privacy_security")
            .unwrap();
        let adjusted_bsi = privacy.adjusted_bsi.unwrap();
        assert!(adjusted_bsi > privacy.bsi);
        assert!(adjusted_bsi <= 1.0);
    }

    #[test]
    fn test_boost_capped() {
        let config = PropagationConfig {
            weight: 100.0,
            max_boost: 0.1,
        };
        let entities = vec![
            entity(
                &["privacy_security", "malicious_actors"],
                &[SourceType::Incident],
            ),
            entity(&["privacy_security"], &[SourceType::Documentation]),
        ];
        let report = analyzed(&entities);
        let baseline: BTreeMap<CategoryKey, f64> = report
            .by_category
            .iter()
            .map(|m| (m.category.clone(), m.bsi))
            .collect();
        let adjusted = PropagationModel::new(config).propagate(&entities, report);

        for metric in &adjusted.by_category {
            let bsi = baseline[&metric.category];
            let boost = metric.adjusted_bsi.unwrap() - bsi;
            assert!(boost <= 0.1 + 1e-12, "boost {boost} exceeds cap");
            assert!(metric.adjusted_bsi.unwrap() <= 1.0);
        }
    }

    #[test]
    fn test_all_metrics_adjusted() {
        let entities = vec![
            entity(&["misinformation"], &[SourceType::Documentation]),
            entity(&["ai_system_safety"], &[SourceType::Incident]),
        ];
        let report = analyzed(&entities);
        let adjusted = PropagationModel::default().propagate(&entities, report);
        assert!(adjusted.by_category.iter().all(|m| m.adjusted_bsi.is_some()));
    }
}
