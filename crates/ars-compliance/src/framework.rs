//! Declarative compliance frameworks.
//!
//! A framework is a named, versioned rule set. Each rule states a
//! required category coverage (minimum documented percentage, or bare
//! presence when no percentage is given) and whether supporting evidence
//! artifacts are required. Rule sets are data: loadable from YAML, with
//! the EU AI Act and NIST AI RMF reference sets built in.

use ars_core::taxonomy::{CategoryKey, TaxonomyId};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// How a rule's required categories combine.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum CoverageMode {
    /// Every required category must meet the coverage bar.
    #[default]
    All,
    /// At least one required category must meet the coverage bar.
    Any,
}

/// One declarative compliance rule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComplianceRule {
    /// Rule identifier, unique within the framework.
    pub rule_id: String,
    /// What the rule demands, for humans.
    pub description: String,
    /// Categories the rule covers.
    pub required_categories: Vec<CategoryKey>,
    /// Minimum documented percentage; `None` means bare presence.
    pub min_coverage_pct: Option<f64>,
    /// How the required categories combine.
    #[serde(default)]
    pub coverage_mode: CoverageMode,
    /// Whether findings against this rule must ship evidence artifacts.
    pub evidence_required: bool,
}

/// A named, versioned rule set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComplianceFramework {
    /// Framework identifier (e.g. `eu_ai_act`).
    pub framework_id: String,
    /// Rule set version; findings record the version they were evaluated
    /// against.
    pub version: String,
    /// The rules.
    pub rules: Vec<ComplianceRule>,
}

/// Errors raised while loading framework definitions.
#[derive(Error, Debug)]
pub enum FrameworkError {
    #[error("Failed to parse framework definition: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Framework has no rules: {0}")]
    Empty(String),
}

impl ComplianceFramework {
    /// Loads a framework from YAML.
    pub fn from_yaml(yaml: &str) -> Result<Self, FrameworkError> {
        let framework: Self = serde_yaml::from_str(yaml)?;
        if framework.rules.is_empty() {
            return Err(FrameworkError::Empty(framework.framework_id));
        }
        Ok(framework)
    }

    /// The EU AI Act high-risk documentation rule set.
    ///
    /// One rule per Annex-III-relevant category, each demanding presence
    /// of documented risks with supporting evidence.
    pub fn builtin_eu_ai_act() -> Self {
        let rule = |rule_id: &str, code: &str, description: &str| ComplianceRule {
            rule_id: rule_id.to_string(),
            description: description.to_string(),
            required_categories: vec![CategoryKey::new(TaxonomyId::MitAiRisk, code)],
            min_coverage_pct: None,
            coverage_mode: CoverageMode::All,
            evidence_required: true,
        };
        Self {
            framework_id: "eu_ai_act".to_string(),
            version: "annex-iii-2024".to_string(),
            rules: vec![
                rule(
                    "EUAIA-1",
                    "discrimination_toxicity",
                    "High-risk systems must document discrimination and toxicity risks",
                ),
                rule(
                    "EUAIA-2",
                    "ai_system_safety",
                    "High-risk systems must document safety limitations and failure modes",
                ),
                rule(
                    "EUAIA-3",
                    "privacy_security",
                    "High-risk systems must document privacy and security risks",
                ),
                rule(
                    "EUAIA-4",
                    "human_computer_interaction",
                    "High-risk systems must document human-oversight and overreliance risks",
                ),
            ],
        }
    }

    /// The NIST AI RMF core-function rule set.
    ///
    /// One rule per function; a function counts as covered when any of
    /// its mapped categories is documented.
    pub fn builtin_nist_ai_rmf() -> Self {
        let rule = |rule_id: &str, codes: &[&str], description: &str| ComplianceRule {
            rule_id: rule_id.to_string(),
            description: description.to_string(),
            required_categories: codes
                .iter()
                .map(|code| CategoryKey::new(TaxonomyId::MitAiRisk, *code))
                .collect(),
            min_coverage_pct: None,
            coverage_mode: CoverageMode::Any,
            evidence_required: false,
        };
        Self {
            framework_id: "nist_ai_rmf".to_string(),
            version: "1.0".to_string(),
            rules: vec![
                rule(
                    "NIST-GOVERN",
                    &["socioeconomic_environmental"],
                    "GOVERN: societal impact risks are documented",
                ),
                rule(
                    "NIST-MAP",
                    &["ai_system_safety", "human_computer_interaction"],
                    "MAP: system context and interaction risks are documented",
                ),
                rule(
                    "NIST-MEASURE",
                    &["discrimination_toxicity", "misinformation"],
                    "MEASURE: measurable output harms are documented",
                ),
                rule(
                    "NIST-MANAGE",
                    &["malicious_actors", "privacy_security"],
                    "MANAGE: misuse and security risks are documented",
                ),
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_frameworks() {
        let eu = ComplianceFramework::builtin_eu_ai_act();
        assert_eq!(eu.rules.len(), 4);
        assert!(eu.rules.iter().all(|r| r.evidence_required));

        let nist = ComplianceFramework::builtin_nist_ai_rmf();
        assert_eq!(nist.rules.len(), 4);
        assert!(nist
            .rules
            .iter()
            .all(|r| r.coverage_mode == CoverageMode::Any));
    }

    #[test]
    fn test_from_yaml() {
        let yaml = r#"
framework_id: internal_baseline
version: "2026-01"
rules:
  - rule_id: BASE-1
    description: Misinformation risks must reach 5% documented coverage
    required_categories:
      - taxonomy: mit_ai_risk
        code: misinformation
    min_coverage_pct: 5.0
    evidence_required: false
"#;
        let framework = ComplianceFramework::from_yaml(yaml).unwrap();
        assert_eq!(framework.framework_id, "internal_baseline");
        assert_eq!(framework.rules[0].min_coverage_pct, Some(5.0));
        assert_eq!(framework.rules[0].coverage_mode, CoverageMode::All);
    }

    #[test]
    fn test_empty_framework_rejected() {
        let yaml = r#"
framework_id: hollow
version: "1"
rules: []
"#;
        assert!(matches!(
            ComplianceFramework::from_yaml(yaml),
            Err(FrameworkError::Empty(_))
        ));
    }
}
