//! Taxonomy reference data for Risk Sentinel.
//!
//! Risk statements are classified against two independent schemes: the
//! seven-domain MIT AI-risk taxonomy (scheme A) and a six-area harm
//! taxonomy organized in three layers (scheme B). The [`TaxonomyRegistry`]
//! holds both category sets plus the bipartite cross-mapping between them,
//! versioned and loaded at process start. Classification logic never
//! hard-codes category tables; it looks them up here.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Synthetic category code attached when a statement cannot be classified.
///
/// Not part of either scheme; excluded from aggregation and from the
/// dedup shared-category check.
pub const UNCLASSIFIED_CODE: &str = "unclassified";

/// The two independent classification schemes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum TaxonomyId {
    /// Scheme A: the seven-domain MIT AI-risk taxonomy.
    MitAiRisk,
    /// Scheme B: the six-area harm taxonomy with three layers.
    HarmLayers,
}

impl std::fmt::Display for TaxonomyId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaxonomyId::MitAiRisk => write!(f, "mit_ai_risk"),
            TaxonomyId::HarmLayers => write!(f, "harm_layers"),
        }
    }
}

/// Layers of the harm taxonomy (scheme B only).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum HarmLayer {
    /// Harms arising directly from model capability.
    Capability,
    /// Harms arising from how people interact with the model.
    Interaction,
    /// Harms at the level of society and infrastructure.
    Systemic,
}

/// A category code within one taxonomy.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct CategoryCode(String);

impl CategoryCode {
    /// Creates a category code.
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    /// The code as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this is the synthetic unclassified code.
    pub fn is_unclassified(&self) -> bool {
        self.0 == UNCLASSIFIED_CODE
    }
}

impl std::fmt::Display for CategoryCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for CategoryCode {
    fn from(code: &str) -> Self {
        Self::new(code)
    }
}

/// Fully qualified category key: taxonomy plus code.
///
/// Used as the key of every per-category map in the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CategoryKey {
    /// The taxonomy this category belongs to.
    pub taxonomy: TaxonomyId,
    /// The category code within that taxonomy.
    pub code: CategoryCode,
}

impl CategoryKey {
    /// Creates a category key.
    pub fn new(taxonomy: TaxonomyId, code: impl Into<String>) -> Self {
        Self {
            taxonomy,
            code: CategoryCode::new(code),
        }
    }

    /// Whether this key carries the synthetic unclassified code.
    pub fn is_unclassified(&self) -> bool {
        self.code.is_unclassified()
    }
}

impl std::fmt::Display for CategoryKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.taxonomy, self.code)
    }
}

/// A single category definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaxonomyCategory {
    /// The taxonomy this category belongs to.
    pub taxonomy: TaxonomyId,
    /// Category code, unique within the taxonomy.
    pub code: CategoryCode,
    /// Human-readable label.
    pub label: String,
    /// Layer, for schemes that are layered (scheme B).
    pub layer: Option<HarmLayer>,
}

/// One edge of the bipartite cross-mapping between the two schemes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CrossMapping {
    /// Category in scheme A.
    pub mit: CategoryCode,
    /// Corresponding category in scheme B.
    pub harm: CategoryCode,
}

/// Errors raised while loading or validating taxonomy data.
#[derive(Error, Debug)]
pub enum TaxonomyError {
    #[error("Unknown category {code} in taxonomy {taxonomy}")]
    UnknownCategory {
        taxonomy: TaxonomyId,
        code: CategoryCode,
    },

    #[error("Duplicate category {code} in taxonomy {taxonomy}")]
    DuplicateCategory {
        taxonomy: TaxonomyId,
        code: CategoryCode,
    },

    #[error("Cross-mapping references unknown category: {0}")]
    DanglingMapping(String),

    #[error("Failed to parse taxonomy data: {0}")]
    Parse(#[from] serde_yaml::Error),
}

/// Versioned registry of both taxonomies and the cross-mapping table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaxonomyRegistry {
    /// Registry data version.
    pub version: String,
    /// All category definitions, keyed by (taxonomy, code).
    categories: BTreeMap<CategoryKey, TaxonomyCategory>,
    /// Bipartite mapping between scheme A and scheme B.
    cross_map: Vec<CrossMapping>,
}

impl TaxonomyRegistry {
    /// Builds a registry from raw parts, validating uniqueness and that
    /// every cross-mapping edge references a defined category.
    pub fn new(
        version: impl Into<String>,
        categories: Vec<TaxonomyCategory>,
        cross_map: Vec<CrossMapping>,
    ) -> Result<Self, TaxonomyError> {
        let mut map = BTreeMap::new();
        for cat in categories {
            let key = CategoryKey {
                taxonomy: cat.taxonomy,
                code: cat.code.clone(),
            };
            if map.insert(key.clone(), cat).is_some() {
                return Err(TaxonomyError::DuplicateCategory {
                    taxonomy: key.taxonomy,
                    code: key.code,
                });
            }
        }
        let registry = Self {
            version: version.into(),
            categories: map,
            cross_map,
        };
        for edge in &registry.cross_map {
            let a = CategoryKey {
                taxonomy: TaxonomyId::MitAiRisk,
                code: edge.mit.clone(),
            };
            let b = CategoryKey {
                taxonomy: TaxonomyId::HarmLayers,
                code: edge.harm.clone(),
            };
            if !registry.categories.contains_key(&a) {
                return Err(TaxonomyError::DanglingMapping(a.to_string()));
            }
            if !registry.categories.contains_key(&b) {
                return Err(TaxonomyError::DanglingMapping(b.to_string()));
            }
        }
        Ok(registry)
    }

    /// Loads a registry from YAML.
    pub fn from_yaml(yaml: &str) -> Result<Self, TaxonomyError> {
        #[derive(Deserialize)]
        struct Raw {
            version: String,
            categories: Vec<TaxonomyCategory>,
            cross_map: Vec<CrossMapping>,
        }
        let raw: Raw = serde_yaml::from_str(yaml)?;
        Self::new(raw.version, raw.categories, raw.cross_map)
    }

    /// The built-in reference registry.
    ///
    /// Scheme A carries the seven MIT AI-risk domains; scheme B the six
    /// harm areas across the capability, interaction, and systemic layers.
    pub fn builtin() -> Self {
        let mit = |code: &str, label: &str| TaxonomyCategory {
            taxonomy: TaxonomyId::MitAiRisk,
            code: CategoryCode::new(code),
            label: label.to_string(),
            layer: None,
        };
        let harm = |code: &str, label: &str, layer: HarmLayer| TaxonomyCategory {
            taxonomy: TaxonomyId::HarmLayers,
            code: CategoryCode::new(code),
            label: label.to_string(),
            layer: Some(layer),
        };
        let categories = vec![
            mit("discrimination_toxicity", "Discrimination & Toxicity"),
            mit("privacy_security", "Privacy & Security"),
            mit("misinformation", "Misinformation"),
            mit("malicious_actors", "Malicious Actors & Misuse"),
            mit("human_computer_interaction", "Human-Computer Interaction"),
            mit(
                "socioeconomic_environmental",
                "Socioeconomic & Environmental Harms",
            ),
            mit("ai_system_safety", "AI System Safety, Failures & Limitations"),
            harm(
                "discrimination_exclusion_toxicity",
                "Discrimination, Exclusion & Toxicity",
                HarmLayer::Capability,
            ),
            harm(
                "misinformation_harms",
                "Misinformation Harms",
                HarmLayer::Capability,
            ),
            harm("malicious_uses", "Malicious Uses", HarmLayer::Interaction),
            harm(
                "human_computer_interaction_harms",
                "Human-Computer Interaction Harms",
                HarmLayer::Interaction,
            ),
            harm(
                "information_hazards",
                "Information Hazards",
                HarmLayer::Systemic,
            ),
            harm(
                "environmental_socioeconomic_harms",
                "Environmental & Socioeconomic Harms",
                HarmLayer::Systemic,
            ),
        ];
        let edge = |mit: &str, harm: &str| CrossMapping {
            mit: CategoryCode::new(mit),
            harm: CategoryCode::new(harm),
        };
        let cross_map = vec![
            edge("discrimination_toxicity", "discrimination_exclusion_toxicity"),
            edge("misinformation", "misinformation_harms"),
            edge("malicious_actors", "malicious_uses"),
            edge("privacy_security", "information_hazards"),
            edge(
                "human_computer_interaction",
                "human_computer_interaction_harms",
            ),
            edge(
                "socioeconomic_environmental",
                "environmental_socioeconomic_harms",
            ),
            // The safety domain has no single scheme-B counterpart; it maps
            // onto the capability layer as a whole via misinformation_harms
            // plus malicious_uses in downstream reconciliation.
            edge("ai_system_safety", "malicious_uses"),
        ];
        let mut map = BTreeMap::new();
        for cat in categories {
            let key = CategoryKey {
                taxonomy: cat.taxonomy,
                code: cat.code.clone(),
            };
            map.insert(key, cat);
        }
        Self {
            version: "2025.1".to_string(),
            categories: map,
            cross_map,
        }
    }

    /// Looks up a category definition.
    pub fn get(&self, key: &CategoryKey) -> Option<&TaxonomyCategory> {
        self.categories.get(key)
    }

    /// Whether the key names a defined category (the synthetic
    /// unclassified code is always accepted).
    pub fn contains(&self, key: &CategoryKey) -> bool {
        key.is_unclassified() || self.categories.contains_key(key)
    }

    /// All categories of one taxonomy, in code order.
    pub fn categories_of(&self, taxonomy: TaxonomyId) -> Vec<&TaxonomyCategory> {
        self.categories
            .values()
            .filter(|c| c.taxonomy == taxonomy)
            .collect()
    }

    /// Scheme-B counterparts of a scheme-A category (and vice versa).
    pub fn mapped(&self, key: &CategoryKey) -> Vec<CategoryKey> {
        match key.taxonomy {
            TaxonomyId::MitAiRisk => self
                .cross_map
                .iter()
                .filter(|e| e.mit == key.code)
                .map(|e| CategoryKey {
                    taxonomy: TaxonomyId::HarmLayers,
                    code: e.harm.clone(),
                })
                .collect(),
            TaxonomyId::HarmLayers => self
                .cross_map
                .iter()
                .filter(|e| e.harm == key.code)
                .map(|e| CategoryKey {
                    taxonomy: TaxonomyId::MitAiRisk,
                    code: e.mit.clone(),
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_category_counts() {
        let registry = TaxonomyRegistry::builtin();
        assert_eq!(registry.categories_of(TaxonomyId::MitAiRisk).len(), 7);
        assert_eq!(registry.categories_of(TaxonomyId::HarmLayers).len(), 6);
    }

    #[test]
    fn test_builtin_layers() {
        let registry = TaxonomyRegistry::builtin();
        let layered = registry
            .categories_of(TaxonomyId::HarmLayers)
            .iter()
            .all(|c| c.layer.is_some());
        assert!(layered);
        let flat = registry
            .categories_of(TaxonomyId::MitAiRisk)
            .iter()
            .all(|c| c.layer.is_none());
        assert!(flat);
    }

    #[test]
    fn test_cross_mapping_lookup() {
        let registry = TaxonomyRegistry::builtin();
        let key = CategoryKey::new(TaxonomyId::MitAiRisk, "malicious_actors");
        let mapped = registry.mapped(&key);
        assert!(mapped
            .iter()
            .any(|k| k.code.as_str() == "malicious_uses"));

        // And back.
        let back = registry.mapped(&mapped[0]);
        assert!(back.iter().any(|k| k.code.as_str() == "malicious_actors"));
    }

    #[test]
    fn test_duplicate_category_rejected() {
        let cat = TaxonomyCategory {
            taxonomy: TaxonomyId::MitAiRisk,
            code: CategoryCode::new("misinformation"),
            label: "Misinformation".to_string(),
            layer: None,
        };
        let err = TaxonomyRegistry::new("test", vec![cat.clone(), cat], vec![]);
        assert!(matches!(
            err,
            Err(TaxonomyError::DuplicateCategory { .. })
        ));
    }

    #[test]
    fn test_dangling_mapping_rejected() {
        let err = TaxonomyRegistry::new(
            "test",
            vec![],
            vec![CrossMapping {
                mit: CategoryCode::new("nope"),
                harm: CategoryCode::new("nope"),
            }],
        );
        assert!(matches!(err, Err(TaxonomyError::DanglingMapping(_))));
    }

    #[test]
    fn test_unclassified_always_accepted() {
        let registry = TaxonomyRegistry::builtin();
        let key = CategoryKey::new(TaxonomyId::MitAiRisk, UNCLASSIFIED_CODE);
        assert!(registry.contains(&key));
        assert!(registry.get(&key).is_none());
    }

    #[test]
    fn test_from_yaml_roundtrip() {
        let yaml = r#"
version: "test.1"
categories:
  - taxonomy: mit_ai_risk
    code: misinformation
    label: Misinformation
    layer: null
  - taxonomy: harm_layers
    code: misinformation_harms
    label: Misinformation Harms
    layer: capability
cross_map:
  - mit: misinformation
    harm: misinformation_harms
"#;
        let registry = TaxonomyRegistry::from_yaml(yaml).unwrap();
        assert_eq!(registry.version, "test.1");
        let key = CategoryKey::new(TaxonomyId::MitAiRisk, "misinformation");
        assert_eq!(registry.mapped(&key).len(), 1);
    }
}
