//! Deterministic keyword-rule classification strategy.

use super::{ClassificationStrategy, StrategyError};
use ars_core::statement::{CategoryAssignment, ClassificationMethod};
use ars_core::taxonomy::TaxonomyId;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Base confidence for a single keyword hit.
const BASE_CONFIDENCE: f64 = 0.40;
/// Confidence added per additional keyword hit.
const PER_HIT_CONFIDENCE: f64 = 0.15;
/// Rule confidence never exceeds this.
const MAX_CONFIDENCE: f64 = 0.95;

/// One keyword rule: hits on any listed keyword vote for the category.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeywordRule {
    /// Taxonomy the rule assigns into.
    pub taxonomy: TaxonomyId,
    /// Category code assigned on a hit.
    pub code: String,
    /// Lowercase keywords/stems matched as substrings.
    pub keywords: Vec<String>,
}

impl KeywordRule {
    fn new(taxonomy: TaxonomyId, code: &str, keywords: &[&str]) -> Self {
        Self {
            taxonomy,
            code: code.to_string(),
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
        }
    }

    /// Number of keywords present in the (lowercased) text.
    fn hits(&self, text: &str) -> usize {
        self.keywords.iter().filter(|k| text.contains(k.as_str())).count()
    }
}

/// Keyword/rule matching strategy.
///
/// Confidence grows with the number of distinct keyword hits; each scheme
/// is scored independently from its own rule set.
#[derive(Debug, Clone)]
pub struct RuleBasedStrategy {
    rules: Vec<KeywordRule>,
}

impl RuleBasedStrategy {
    /// Creates a strategy from explicit rules.
    pub fn new(rules: Vec<KeywordRule>) -> Self {
        Self { rules }
    }

    /// The built-in rule set covering both taxonomies.
    pub fn with_default_rules() -> Self {
        use TaxonomyId::{HarmLayers, MitAiRisk};
        let rules = vec![
            // Scheme A: MIT AI-risk domains.
            KeywordRule::new(
                MitAiRisk,
                "discrimination_toxicity",
                &[
                    "bias", "biased", "discriminat", "stereotyp", "unfair", "toxic",
                    "offensive", "hate", "harmful content",
                ],
            ),
            KeywordRule::new(
                MitAiRisk,
                "misinformation",
                &[
                    "hallucin", "incorrect", "false", "misinform", "inaccura", "misleading",
                ],
            ),
            KeywordRule::new(
                MitAiRisk,
                "malicious_actors",
                &[
                    "malicious", "misuse", "fraud", "scam", "deepfake", "impersonat",
                    "social engineering", "phishing",
                ],
            ),
            KeywordRule::new(
                MitAiRisk,
                "privacy_security",
                &[
                    "privacy", "leak", "personal data", "security", "memoriz",
                    "prompt injection",
                ],
            ),
            KeywordRule::new(
                MitAiRisk,
                "human_computer_interaction",
                &[
                    "overrel", "over-rel", "human oversight", "judgment", "anthropomorph",
                    "human agency",
                ],
            ),
            KeywordRule::new(
                MitAiRisk,
                "socioeconomic_environmental",
                &[
                    "environment", "energy", "carbon", "job displacement", "economic",
                    "inequal",
                ],
            ),
            KeywordRule::new(
                MitAiRisk,
                "ai_system_safety",
                &[
                    "unsafe", "robust", "adversarial", "out-of-distribution",
                    "failure mode", "limitation", "degrad",
                ],
            ),
            // Scheme B: harm areas, scored independently.
            KeywordRule::new(
                HarmLayers,
                "discrimination_exclusion_toxicity",
                &[
                    "bias", "discriminat", "stereotyp", "toxic", "offensive", "hate",
                    "exclusion",
                ],
            ),
            KeywordRule::new(
                HarmLayers,
                "misinformation_harms",
                &["hallucin", "false", "misinform", "misleading", "incorrect"],
            ),
            KeywordRule::new(
                HarmLayers,
                "malicious_uses",
                &[
                    "malicious", "misuse", "fraud", "deepfake", "weapon", "disinformation campaign",
                ],
            ),
            KeywordRule::new(
                HarmLayers,
                "human_computer_interaction_harms",
                &["overrel", "over-rel", "anthropomorph", "human oversight"],
            ),
            KeywordRule::new(
                HarmLayers,
                "information_hazards",
                &[
                    "leak", "personal data", "memoriz", "confidential", "sensitive information",
                ],
            ),
            KeywordRule::new(
                HarmLayers,
                "environmental_socioeconomic_harms",
                &["environment", "carbon", "energy", "job displacement", "inequal"],
            ),
        ];
        Self::new(rules)
    }
}

#[async_trait]
impl ClassificationStrategy for RuleBasedStrategy {
    fn name(&self) -> &str {
        "rule_based"
    }

    fn method(&self) -> ClassificationMethod {
        ClassificationMethod::Rule
    }

    async fn classify(&self, text: &str) -> Result<Vec<CategoryAssignment>, StrategyError> {
        let lowered = text.to_lowercase();
        let assignments = self
            .rules
            .iter()
            .filter_map(|rule| {
                let hits = rule.hits(&lowered);
                if hits == 0 {
                    return None;
                }
                let confidence = (BASE_CONFIDENCE + PER_HIT_CONFIDENCE * (hits as f64 - 1.0))
                    .min(MAX_CONFIDENCE);
                Some(CategoryAssignment::new(
                    rule.taxonomy,
                    rule.code.clone(),
                    confidence,
                ))
            })
            .collect();
        Ok(assignments)
    }
}
