//! Canonical risk entities.
//!
//! The deduplicator collapses near-identical classified statements into
//! [`CanonicalRiskEntity`] clusters. Cluster membership is a partition of
//! all classified statement ids processed in a run; merges are
//! one-directional (entities are never split once merged).

use crate::statement::SourceType;
use crate::taxonomy::CategoryKey;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use uuid::Uuid;

/// A deduplicated cluster of classified statements believed to describe
/// the same underlying risk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CanonicalRiskEntity {
    /// Cluster identifier.
    pub cluster_id: Uuid,
    /// Statement ids belonging to this cluster.
    pub member_statement_ids: Vec<Uuid>,
    /// Representative description (the earliest member's text).
    pub representative: String,
    /// Union of category assignments across members, with the highest
    /// member confidence per category.
    pub categories: BTreeMap<CategoryKey, f64>,
    /// Source types present among members.
    pub source_types: BTreeSet<SourceType>,
    /// Model types present among members.
    pub model_types: BTreeSet<String>,
    /// Earliest member timestamp.
    pub first_seen: DateTime<Utc>,
}

impl CanonicalRiskEntity {
    /// Number of member statements.
    pub fn member_count(&self) -> usize {
        self.member_statement_ids.len()
    }

    /// Whether the entity carries the given category tag.
    pub fn has_category(&self, key: &CategoryKey) -> bool {
        self.categories.contains_key(key)
    }

    /// Whether any member came from the given source type.
    pub fn has_source(&self, source_type: SourceType) -> bool {
        self.source_types.contains(&source_type)
    }

    /// Whether the cluster carries no real category tags (all members
    /// were unclassifiable).
    pub fn is_unclassified(&self) -> bool {
        self.categories.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::taxonomy::TaxonomyId;

    #[test]
    fn test_entity_lookups() {
        let key = CategoryKey::new(TaxonomyId::MitAiRisk, "malicious_actors");
        let mut categories = BTreeMap::new();
        categories.insert(key.clone(), 0.8);
        let entity = CanonicalRiskEntity {
            cluster_id: Uuid::new_v4(),
            member_statement_ids: vec![Uuid::new_v4(), Uuid::new_v4()],
            representative: "Enables generation of deceptive content for fraud".to_string(),
            categories,
            source_types: [SourceType::Incident].into_iter().collect(),
            model_types: ["LLM".to_string()].into_iter().collect(),
            first_seen: Utc::now(),
        };

        assert_eq!(entity.member_count(), 2);
        assert!(entity.has_category(&key));
        assert!(entity.has_source(SourceType::Incident));
        assert!(!entity.has_source(SourceType::Documentation));
        assert!(!entity.is_unclassified());
    }
}
