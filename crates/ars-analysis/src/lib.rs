//! # ars-analysis
//!
//! The risk normalization and gap-analysis pipeline for Risk Sentinel.
//!
//! Ingested risk statements are classified onto canonical taxonomy
//! categories, deduplicated into canonical risk entities, aggregated into
//! the Blind Spot Index per category and globally, adjusted for
//! co-occurrence-derived exposure, and converted into prioritized
//! recommendations for the orchestrator's human-review queue.

pub mod classify;
pub mod dedup;
pub mod gap;
pub mod pipeline;
pub mod propagation;
pub mod recommend;
pub mod report;

pub use classify::{
    ClassificationStrategy, ClassifiedStatement, NormalizerConfig, PluginStrategy,
    RiskNormalizer, RuleBasedStrategy, StrategyError,
};
pub use dedup::{DedupConfig, DedupReport, Deduplicator, NearMiss};
pub use gap::{
    blind_spot_index, AnalysisError, BlindSpotMetric, BlindSpotReport, GapAnalyzer, GapConfig,
    ScopeFilter,
};
pub use pipeline::{Pipeline, PipelineConfig, PipelineOutcome};
pub use propagation::{CooccurrenceMatrix, PropagationConfig, PropagationModel};
pub use recommend::{RecommendConfig, RecommendationEngine};
pub use report::{BlindSpotIndexSnapshot, ReportSnapshot};
