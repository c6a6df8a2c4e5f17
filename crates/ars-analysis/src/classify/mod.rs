//! Risk normalization.
//!
//! The [`RiskNormalizer`] maps a raw risk statement onto canonical
//! categories in both taxonomies with a confidence score per assignment.
//! Classification is polymorphic over interchangeable
//! [`ClassificationStrategy`] implementations; the pipeline depends only
//! on the trait.
//!
//! `classify` never fails: empty or too-short text, a strategy error, a
//! strategy that exceeds its time budget, or no assignment reaching the
//! confidence threshold all fall back to a single synthetic
//! `unclassified` assignment flagged for manual review. Unclassifiable
//! statements are surfaced, never dropped.

mod plugin;
mod rules;

pub use plugin::PluginStrategy;
pub use rules::{KeywordRule, RuleBasedStrategy};

use ars_core::statement::{
    CategoryAssignment, ClassificationMethod, NormalizedRisk, RawRiskStatement,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinSet;
use tracing::{debug, instrument, warn};

/// Errors a classification strategy may surface.
///
/// All of them are recovered by the normalizer's unclassified fallback.
#[derive(Error, Debug)]
pub enum StrategyError {
    #[error("Strategy unavailable: {0}")]
    Unavailable(String),

    #[error("Strategy rejected input: {0}")]
    RejectedInput(String),
}

/// A pluggable classifier: statement text to category assignments.
///
/// Implementations must be side-effect free and deterministic for a given
/// input. The normalizer enforces the bounded-time contract with a
/// timeout; a strategy that overruns is treated as failed for that
/// statement.
#[async_trait]
pub trait ClassificationStrategy: Send + Sync {
    /// Name used in logs and the agent registry.
    fn name(&self) -> &str;

    /// Which classification method records produced by this strategy
    /// carry.
    fn method(&self) -> ClassificationMethod;

    /// Classifies free text into zero or more category assignments across
    /// both taxonomies.
    async fn classify(&self, text: &str) -> Result<Vec<CategoryAssignment>, StrategyError>;
}

/// Normalizer configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizerConfig {
    /// Statements shorter than this are unclassifiable.
    #[serde(default = "default_min_text_len")]
    pub min_text_len: usize,
    /// Assignments below this confidence are discarded; if none survive,
    /// the statement is unclassifiable.
    #[serde(default = "default_confidence_threshold")]
    pub confidence_threshold: f64,
    /// Time budget per strategy invocation.
    #[serde(default = "default_strategy_timeout_ms")]
    pub strategy_timeout_ms: u64,
    /// Concurrent classifications in a batch run.
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
}

fn default_min_text_len() -> usize {
    20
}

fn default_confidence_threshold() -> f64 {
    0.35
}

fn default_strategy_timeout_ms() -> u64 {
    1_000
}

fn default_max_concurrency() -> usize {
    8
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            min_text_len: default_min_text_len(),
            confidence_threshold: default_confidence_threshold(),
            strategy_timeout_ms: default_strategy_timeout_ms(),
            max_concurrency: default_max_concurrency(),
        }
    }
}

/// A raw statement paired with its classification record.
///
/// The unit flowing from the normalizer into deduplication.
#[derive(Debug, Clone)]
pub struct ClassifiedStatement {
    /// The ingested statement.
    pub statement: RawRiskStatement,
    /// Its classification.
    pub risk: NormalizedRisk,
}

/// Classifies raw risk statements against the active strategy.
pub struct RiskNormalizer {
    strategy: Arc<dyn ClassificationStrategy>,
    config: NormalizerConfig,
}

impl RiskNormalizer {
    /// Creates a normalizer over the given strategy.
    pub fn new(strategy: Arc<dyn ClassificationStrategy>, config: NormalizerConfig) -> Self {
        Self { strategy, config }
    }

    /// Classifies one statement. Never fails; unclassifiable input yields
    /// the synthetic fallback record flagged for review.
    #[instrument(skip(self, statement), fields(statement_id = %statement.id))]
    pub async fn classify(&self, statement: &RawRiskStatement) -> NormalizedRisk {
        let text = statement.text.trim();
        if text.len() < self.config.min_text_len {
            debug!("Statement below minimum length, routing to review");
            return NormalizedRisk::unclassified(statement.id, self.strategy.method());
        }

        let budget = Duration::from_millis(self.config.strategy_timeout_ms);
        let outcome = tokio::time::timeout(budget, self.strategy.classify(text)).await;

        let assignments = match outcome {
            Ok(Ok(assignments)) => assignments,
            Ok(Err(err)) => {
                warn!(strategy = self.strategy.name(), %err, "Strategy failed, routing to review");
                return NormalizedRisk::unclassified(statement.id, self.strategy.method());
            }
            Err(_) => {
                warn!(
                    strategy = self.strategy.name(),
                    timeout_ms = self.config.strategy_timeout_ms,
                    "Strategy exceeded time budget, routing to review"
                );
                return NormalizedRisk::unclassified(statement.id, self.strategy.method());
            }
        };

        // Confidence thresholds apply per scheme independently; an
        // assignment ambiguous in one taxonomy does not suppress a
        // confident one in the other.
        let surviving: Vec<CategoryAssignment> = assignments
            .into_iter()
            .filter(|a| !a.is_unclassified() && a.confidence >= self.config.confidence_threshold)
            .collect();

        if surviving.is_empty() {
            debug!("No assignment reached the confidence threshold");
            return NormalizedRisk::unclassified(statement.id, self.strategy.method());
        }

        NormalizedRisk::new(statement.id, surviving, self.strategy.method())
    }

    /// Classifies a batch of independent statements concurrently.
    ///
    /// Output order matches input order. Statements share no mutable
    /// state during classification.
    pub async fn classify_batch(
        &self,
        statements: Vec<RawRiskStatement>,
    ) -> Vec<ClassifiedStatement> {
        let concurrency = self.config.max_concurrency.max(1);
        let mut results: Vec<Option<ClassifiedStatement>> =
            (0..statements.len()).map(|_| None).collect();
        let mut set: JoinSet<(usize, ClassifiedStatement)> = JoinSet::new();
        let mut pending = statements.into_iter().enumerate();

        loop {
            while set.len() < concurrency {
                let Some((index, statement)) = pending.next() else {
                    break;
                };
                let strategy = Arc::clone(&self.strategy);
                let config = self.config.clone();
                set.spawn(async move {
                    let normalizer = RiskNormalizer::new(strategy, config);
                    let risk = normalizer.classify(&statement).await;
                    (index, ClassifiedStatement { statement, risk })
                });
            }
            match set.join_next().await {
                Some(Ok((index, classified))) => results[index] = Some(classified),
                Some(Err(join_err)) => {
                    // A panicking task loses its statement slot; the gap is
                    // visible as a None below and logged here.
                    warn!(%join_err, "Classification task failed");
                }
                None => break,
            }
        }

        results.into_iter().flatten().collect()
    }

    /// Number of statements in a batch that were routed to manual review.
    pub fn review_count(batch: &[ClassifiedStatement]) -> usize {
        batch.iter().filter(|c| c.risk.needs_review).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ars_core::taxonomy::TaxonomyId;
    use chrono::Utc;

    struct FailingStrategy;

    #[async_trait]
    impl ClassificationStrategy for FailingStrategy {
        fn name(&self) -> &str {
            "failing"
        }

        fn method(&self) -> ClassificationMethod {
            ClassificationMethod::Learned
        }

        async fn classify(&self, _text: &str) -> Result<Vec<CategoryAssignment>, StrategyError> {
            Err(StrategyError::Unavailable("model endpoint down".into()))
        }
    }

    struct SlowStrategy;

    #[async_trait]
    impl ClassificationStrategy for SlowStrategy {
        fn name(&self) -> &str {
            "slow"
        }

        fn method(&self) -> ClassificationMethod {
            ClassificationMethod::Learned
        }

        async fn classify(&self, _text: &str) -> Result<Vec<CategoryAssignment>, StrategyError> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(vec![])
        }
    }

    fn statement(text: &str) -> RawRiskStatement {
        RawRiskStatement::new(
            "test-source",
            ars_core::statement::SourceType::Documentation,
            text,
            "ref-1",
            Utc::now(),
        )
    }

    #[tokio::test]
    async fn test_short_text_routes_to_review() {
        let normalizer = RiskNormalizer::new(
            Arc::new(RuleBasedStrategy::with_default_rules()),
            NormalizerConfig::default(),
        );
        let risk = normalizer.classify(&statement("too short")).await;
        assert!(risk.needs_review);
        assert!(risk.is_unclassified());
    }

    #[tokio::test]
    async fn test_strategy_error_routes_to_review() {
        let normalizer =
            RiskNormalizer::new(Arc::new(FailingStrategy), NormalizerConfig::default());
        let risk = normalizer
            .classify(&statement("May memorize and leak personal data from training"))
            .await;
        assert!(risk.needs_review);
        assert_eq!(risk.method, ClassificationMethod::Learned);
    }

    #[tokio::test]
    async fn test_strategy_timeout_routes_to_review() {
        let config = NormalizerConfig {
            strategy_timeout_ms: 10,
            ..NormalizerConfig::default()
        };
        let normalizer = RiskNormalizer::new(Arc::new(SlowStrategy), config);
        let risk = normalizer
            .classify(&statement("Generates convincing false information at scale"))
            .await;
        assert!(risk.needs_review);
    }

    #[tokio::test]
    async fn test_multi_category_attachment() {
        let normalizer = RiskNormalizer::new(
            Arc::new(RuleBasedStrategy::with_default_rules()),
            NormalizerConfig::default(),
        );
        let risk = normalizer
            .classify(&statement(
                "Model output shows bias against demographic groups and may leak personal data",
            ))
            .await;
        assert!(!risk.needs_review);
        // Both schemes are scored independently; expect assignments in each.
        let schemes: std::collections::BTreeSet<TaxonomyId> =
            risk.assignments.iter().map(|a| a.taxonomy).collect();
        assert!(schemes.contains(&TaxonomyId::MitAiRisk));
        assert!(schemes.contains(&TaxonomyId::HarmLayers));
        // Risks are not mutually exclusive: bias and privacy both attach.
        assert!(risk.assignments.len() >= 2);
    }

    #[tokio::test]
    async fn test_batch_preserves_order() {
        let normalizer = RiskNormalizer::new(
            Arc::new(RuleBasedStrategy::with_default_rules()),
            NormalizerConfig::default(),
        );
        let statements: Vec<RawRiskStatement> = (0..20)
            .map(|i| {
                statement(&format!(
                    "Statement {i}: generates incorrect and misleading information"
                ))
            })
            .collect();
        let ids: Vec<uuid::Uuid> = statements.iter().map(|s| s.id).collect();
        let batch = normalizer.classify_batch(statements).await;
        let out_ids: Vec<uuid::Uuid> = batch.iter().map(|c| c.statement.id).collect();
        assert_eq!(ids, out_ids);
    }
}
