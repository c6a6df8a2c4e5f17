//! End-to-end analysis pipeline.
//!
//! Wires normalizer, deduplicator, gap analyzer, propagation model, and
//! recommendation engine into one run over a batch of ingested
//! statements. Data flows strictly downstream; component progress is
//! reported into the injected [`AgentRegistry`].

use crate::classify::{ClassificationStrategy, ClassifiedStatement, NormalizerConfig, RiskNormalizer};
use crate::dedup::{DedupConfig, Deduplicator, NearMiss};
use crate::gap::{AnalysisError, BlindSpotReport, GapAnalyzer, GapConfig, ScopeFilter};
use crate::propagation::{PropagationConfig, PropagationModel};
use crate::recommend::{RecommendConfig, RecommendationEngine};
use crate::report::ReportSnapshot;
use ars_core::entity::CanonicalRiskEntity;
use ars_core::registry::AgentRegistry;
use ars_core::statement::{NormalizedRisk, RawRiskStatement};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

/// Configuration for a full pipeline run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Normalizer settings.
    #[serde(default)]
    pub normalizer: NormalizerConfig,
    /// Deduplication settings.
    #[serde(default)]
    pub dedup: DedupConfig,
    /// Gap analysis settings.
    #[serde(default)]
    pub gap: GapConfig,
    /// Propagation settings.
    #[serde(default)]
    pub propagation: PropagationConfig,
    /// Recommendation settings.
    #[serde(default)]
    pub recommend: RecommendConfig,
}

/// Everything one pipeline run produces.
#[derive(Debug, Clone)]
pub struct PipelineOutcome {
    /// The snapshot exposed to the reporting layer.
    pub snapshot: ReportSnapshot,
    /// The full blind-spot report (with propagation adjustments).
    pub report: BlindSpotReport,
    /// The canonical entity set the report was derived from.
    pub entities: Vec<CanonicalRiskEntity>,
    /// Classification records routed to manual review.
    pub review_queue: Vec<NormalizedRisk>,
    /// Dedup near misses recorded for audit.
    pub near_misses: Vec<NearMiss>,
}

/// The risk normalization and gap-analysis pipeline.
pub struct Pipeline {
    normalizer: RiskNormalizer,
    deduplicator: Deduplicator,
    gap: GapAnalyzer,
    propagation: PropagationModel,
    recommender: RecommendationEngine,
}

impl Pipeline {
    /// Builds a pipeline over the given classification strategy.
    pub fn new(strategy: Arc<dyn ClassificationStrategy>, config: PipelineConfig) -> Self {
        Self {
            normalizer: RiskNormalizer::new(strategy, config.normalizer),
            deduplicator: Deduplicator::new(config.dedup),
            gap: GapAnalyzer::new(config.gap),
            propagation: PropagationModel::new(config.propagation),
            recommender: RecommendationEngine::new(config.recommend),
        }
    }

    /// Runs the full pipeline over a batch of ingested statements.
    #[instrument(skip_all, fields(statements = statements.len()))]
    pub async fn run(
        &self,
        statements: Vec<RawRiskStatement>,
        scope: &ScopeFilter,
        registry: &mut AgentRegistry,
    ) -> Result<PipelineOutcome, AnalysisError> {
        let statements = Self::drop_duplicate_origins(statements);
        let total = statements.len() as u64;

        let classified = self.normalizer.classify_batch(statements).await;
        let review_count = RiskNormalizer::review_count(&classified) as u64;
        registry.record_run("normalizer", total);
        registry.record_failures("normalizer", review_count);

        let review_queue: Vec<NormalizedRisk> = classified
            .iter()
            .filter(|c| c.risk.needs_review)
            .map(|c| c.risk.clone())
            .collect();

        let dedup_report = self.deduplicator.merge(&classified);
        registry.record_run("deduplicator", dedup_report.entities.len() as u64);
        registry.record_failures("deduplicator", dedup_report.near_misses.len() as u64);

        let report = self.gap.analyze(&dedup_report.entities, scope)?;
        let report = self.propagation.propagate(&dedup_report.entities, report);
        registry.record_run("gap_analyzer", report.by_category.len() as u64);

        let recommendations = self.recommender.recommend(&report);
        registry.record_run("recommendation_engine", recommendations.len() as u64);

        let manual_review_ids: Vec<Uuid> =
            review_queue.iter().map(|r| r.statement_id).collect();
        let snapshot = ReportSnapshot::new(&report, recommendations, manual_review_ids);

        info!(
            entities = dedup_report.entities.len(),
            review_queue = review_queue.len(),
            recommendations = snapshot.recommendations.len(),
            "Pipeline run complete"
        );

        Ok(PipelineOutcome {
            snapshot,
            report,
            entities: dedup_report.entities,
            review_queue,
            near_misses: dedup_report.near_misses,
        })
    }

    /// Classifies a batch without running the analysis stages.
    pub async fn classify_only(
        &self,
        statements: Vec<RawRiskStatement>,
    ) -> Vec<ClassifiedStatement> {
        self.normalizer.classify_batch(statements).await
    }

    /// Collectors guarantee origin_ref uniqueness per source; violations
    /// keep the first-seen record and are logged.
    fn drop_duplicate_origins(statements: Vec<RawRiskStatement>) -> Vec<RawRiskStatement> {
        let mut seen: HashSet<(String, String)> = HashSet::new();
        let mut kept = Vec::with_capacity(statements.len());
        for statement in statements {
            let key = (statement.source_id.clone(), statement.origin_ref.clone());
            if seen.insert(key) {
                kept.push(statement);
            } else {
                warn!(
                    source_id = %statement.source_id,
                    origin_ref = %statement.origin_ref,
                    "Duplicate origin_ref from collector, keeping first-seen record"
                );
            }
        }
        kept
    }
}
