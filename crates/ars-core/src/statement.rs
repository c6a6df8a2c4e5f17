//! Risk statement data models.
//!
//! A [`RawRiskStatement`] is the unit of ingestion: a single free-text risk
//! claim from either a model's published documentation or an incident
//! record. It is immutable once ingested. The normalizer attaches taxonomy
//! assignments to it via a [`NormalizedRisk`], which is itself append-only:
//! a human correction supersedes an earlier record instead of mutating it,
//! so the original classification is retained for audit.

use crate::taxonomy::{CategoryCode, CategoryKey, TaxonomyId, UNCLASSIFIED_CODE};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Where a risk statement came from.
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord,
)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    /// Published model documentation (model card).
    Documentation,
    /// A real-world incident record.
    Incident,
}

impl std::fmt::Display for SourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceType::Documentation => write!(f, "documentation"),
            SourceType::Incident => write!(f, "incident"),
        }
    }
}

/// A raw risk statement handed to the pipeline by an upstream collector.
///
/// Collectors guarantee `origin_ref` uniqueness per source. Immutable once
/// ingested.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawRiskStatement {
    /// Unique identifier assigned at ingestion.
    pub id: Uuid,
    /// Identifier of the source (e.g. a model id or incident feed name).
    pub source_id: String,
    /// Whether this came from documentation or an incident record.
    pub source_type: SourceType,
    /// Free-text description of the risk.
    pub text: String,
    /// Identifier of the originating record within the source.
    pub origin_ref: String,
    /// Model type the statement concerns, when known (e.g. "LLM", "Vision").
    pub model_type: Option<String>,
    /// When the originating record was produced.
    pub timestamp: DateTime<Utc>,
}

impl RawRiskStatement {
    /// Creates a new statement.
    pub fn new(
        source_id: impl Into<String>,
        source_type: SourceType,
        text: impl Into<String>,
        origin_ref: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            source_id: source_id.into(),
            source_type,
            text: text.into(),
            origin_ref: origin_ref.into(),
            model_type: None,
            timestamp,
        }
    }

    /// Attaches the model type this statement concerns.
    pub fn with_model_type(mut self, model_type: impl Into<String>) -> Self {
        self.model_type = Some(model_type.into());
        self
    }
}

/// How a classification was produced.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ClassificationMethod {
    /// Deterministic keyword/rule matching.
    Rule,
    /// A learned-model strategy.
    Learned,
    /// Explicit human correction superseding an earlier record.
    HumanOverride,
}

/// One (taxonomy, category, confidence) assignment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CategoryAssignment {
    /// Taxonomy the category belongs to.
    pub taxonomy: TaxonomyId,
    /// Category code within that taxonomy.
    pub code: CategoryCode,
    /// Classification confidence in [0, 1].
    pub confidence: f64,
}

impl CategoryAssignment {
    /// Creates an assignment, clamping confidence into [0, 1].
    pub fn new(taxonomy: TaxonomyId, code: impl Into<String>, confidence: f64) -> Self {
        Self {
            taxonomy,
            code: CategoryCode::new(code),
            confidence: confidence.clamp(0.0, 1.0),
        }
    }

    /// The synthetic assignment used for unclassifiable statements.
    pub fn unclassified() -> Self {
        Self {
            taxonomy: TaxonomyId::MitAiRisk,
            code: CategoryCode::new(UNCLASSIFIED_CODE),
            confidence: 0.0,
        }
    }

    /// The fully qualified key of this assignment.
    pub fn key(&self) -> CategoryKey {
        CategoryKey {
            taxonomy: self.taxonomy,
            code: self.code.clone(),
        }
    }

    /// Whether this is the synthetic unclassified assignment.
    pub fn is_unclassified(&self) -> bool {
        self.code.is_unclassified()
    }
}

/// A classified risk statement.
///
/// Never mutated after creation. A human correction creates a new record
/// whose `supersedes` field points at the original.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizedRisk {
    /// Unique identifier of this classification record.
    pub id: Uuid,
    /// The statement this classification applies to.
    pub statement_id: Uuid,
    /// Category assignments across both taxonomies.
    pub assignments: Vec<CategoryAssignment>,
    /// How the classification was produced.
    pub method: ClassificationMethod,
    /// Whether the statement was routed to the manual-review queue.
    pub needs_review: bool,
    /// The record this one supersedes, for human overrides.
    pub supersedes: Option<Uuid>,
    /// When the classification was produced.
    pub classified_at: DateTime<Utc>,
}

impl NormalizedRisk {
    /// Creates a classification record.
    pub fn new(
        statement_id: Uuid,
        assignments: Vec<CategoryAssignment>,
        method: ClassificationMethod,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            statement_id,
            assignments,
            method,
            needs_review: false,
            supersedes: None,
            classified_at: Utc::now(),
        }
    }

    /// Creates the fallback record for an unclassifiable statement:
    /// a single synthetic `unclassified` assignment at confidence 0,
    /// flagged for manual review.
    pub fn unclassified(statement_id: Uuid, method: ClassificationMethod) -> Self {
        Self {
            id: Uuid::new_v4(),
            statement_id,
            assignments: vec![CategoryAssignment::unclassified()],
            method,
            needs_review: true,
            supersedes: None,
            classified_at: Utc::now(),
        }
    }

    /// Creates a human-override record superseding this one.
    ///
    /// The original record is left untouched; callers keep both, and
    /// consumers resolve to the newest record in the supersession chain.
    pub fn superseded_by_human(&self, assignments: Vec<CategoryAssignment>) -> Self {
        Self {
            id: Uuid::new_v4(),
            statement_id: self.statement_id,
            assignments,
            method: ClassificationMethod::HumanOverride,
            needs_review: false,
            supersedes: Some(self.id),
            classified_at: Utc::now(),
        }
    }

    /// Category keys of all real (non-synthetic) assignments.
    pub fn category_keys(&self) -> Vec<CategoryKey> {
        self.assignments
            .iter()
            .filter(|a| !a.is_unclassified())
            .map(CategoryAssignment::key)
            .collect()
    }

    /// Whether the record carries only the synthetic unclassified
    /// assignment.
    pub fn is_unclassified(&self) -> bool {
        self.assignments.iter().all(CategoryAssignment::is_unclassified)
    }

    /// Whether two records share at least one real category assignment in
    /// either taxonomy.
    pub fn shares_category(&self, other: &NormalizedRisk) -> bool {
        let ours = self.category_keys();
        other
            .category_keys()
            .iter()
            .any(|k| ours.contains(k))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn statement() -> RawRiskStatement {
        RawRiskStatement::new(
            "meta-llama/Llama-3.1-8B",
            SourceType::Documentation,
            "May memorize and leak training data",
            "card-42",
            Utc::now(),
        )
    }

    #[test]
    fn test_unclassified_record() {
        let s = statement();
        let risk = NormalizedRisk::unclassified(s.id, ClassificationMethod::Rule);
        assert!(risk.needs_review);
        assert!(risk.is_unclassified());
        assert_eq!(risk.assignments.len(), 1);
        assert_eq!(risk.assignments[0].confidence, 0.0);
        assert!(risk.category_keys().is_empty());
    }

    #[test]
    fn test_human_override_supersedes() {
        let s = statement();
        let original = NormalizedRisk::unclassified(s.id, ClassificationMethod::Rule);
        let corrected = original.superseded_by_human(vec![CategoryAssignment::new(
            TaxonomyId::MitAiRisk,
            "privacy_security",
            0.9,
        )]);

        assert_eq!(corrected.supersedes, Some(original.id));
        assert_eq!(corrected.method, ClassificationMethod::HumanOverride);
        assert!(!corrected.needs_review);
        // Original untouched.
        assert!(original.is_unclassified());
    }

    #[test]
    fn test_shares_category_ignores_synthetic() {
        let s1 = statement();
        let s2 = statement();
        let a = NormalizedRisk::unclassified(s1.id, ClassificationMethod::Rule);
        let b = NormalizedRisk::unclassified(s2.id, ClassificationMethod::Rule);
        assert!(!a.shares_category(&b));

        let c = NormalizedRisk::new(
            s1.id,
            vec![CategoryAssignment::new(
                TaxonomyId::HarmLayers,
                "information_hazards",
                0.7,
            )],
            ClassificationMethod::Rule,
        );
        let d = NormalizedRisk::new(
            s2.id,
            vec![
                CategoryAssignment::new(TaxonomyId::MitAiRisk, "privacy_security", 0.6),
                CategoryAssignment::new(TaxonomyId::HarmLayers, "information_hazards", 0.8),
            ],
            ClassificationMethod::Rule,
        );
        assert!(c.shares_category(&d));
    }

    #[test]
    fn test_confidence_clamped() {
        let a = CategoryAssignment::new(TaxonomyId::MitAiRisk, "misinformation", 1.7);
        assert_eq!(a.confidence, 1.0);
        let b = CategoryAssignment::new(TaxonomyId::MitAiRisk, "misinformation", -0.2);
        assert_eq!(b.confidence, 0.0);
    }
}
