//! Compliance evaluation.
//!
//! Evaluates a subject model's normalized risk profile against a
//! declarative framework. Evaluation is pure and deterministic given the
//! same profile and rule-set version. `InsufficientEvidence` means the
//! data needed to evaluate a rule is missing, not that the subject
//! violates it; the distinction is preserved all the way through
//! [`ComplianceSummary`].

use crate::framework::{ComplianceFramework, ComplianceRule, CoverageMode};
use ars_analysis::gap::BlindSpotReport;
use ars_core::entity::CanonicalRiskEntity;
use ars_core::statement::SourceType;
use ars_core::taxonomy::CategoryKey;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{info, instrument};
use uuid::Uuid;

/// Outcome of evaluating one rule.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FindingStatus {
    /// The subject meets the rule.
    Pass,
    /// The subject violates the rule.
    Fail,
    /// The data needed to evaluate the rule is missing. Not a failure.
    InsufficientEvidence,
}

/// A reference to a canonical entity cited as evidence.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EvidenceRef {
    /// The cited entity.
    pub entity_id: Uuid,
    /// The category under which it was cited.
    pub category: CategoryKey,
}

/// The result of checking one rule against one subject.
///
/// Findings are retained historically, never overwritten.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComplianceFinding {
    /// Framework the rule belongs to.
    pub framework_id: String,
    /// Rule set version evaluated.
    pub framework_version: String,
    /// The rule.
    pub rule_id: String,
    /// The subject model.
    pub subject_id: String,
    /// Pass, fail, or insufficient evidence.
    pub status: FindingStatus,
    /// Entities substantiating the finding.
    pub evidence: Vec<EvidenceRef>,
    /// When the check ran.
    pub evaluated_at: DateTime<Utc>,
}

/// Per-category documented coverage for one subject.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CategoryCoverage {
    /// Documented percentage for the category.
    pub documented_pct: f64,
    /// Documentation-sourced entities tagged with the category.
    pub documented_count: usize,
    /// Entities tagged with the category, cited as evidence.
    pub entity_ids: Vec<Uuid>,
}

/// A subject model's normalized risk profile, as the checker consumes it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskProfile {
    /// The subject model.
    pub subject_id: String,
    /// Coverage per category.
    pub coverage: BTreeMap<CategoryKey, CategoryCoverage>,
    /// Documentation-sourced entities in the profile's scope.
    pub total_documented: usize,
}

impl RiskProfile {
    /// Builds a profile from an analysis report and its entity set.
    pub fn from_report(
        subject_id: impl Into<String>,
        report: &BlindSpotReport,
        entities: &[CanonicalRiskEntity],
    ) -> Self {
        let mut coverage: BTreeMap<CategoryKey, CategoryCoverage> = BTreeMap::new();
        for metric in &report.by_category {
            coverage.insert(
                metric.category.clone(),
                CategoryCoverage {
                    documented_pct: metric.documented_pct,
                    documented_count: 0,
                    entity_ids: Vec::new(),
                },
            );
        }
        for entity in entities {
            if !entity.has_source(SourceType::Documentation) {
                continue;
            }
            for category in entity.categories.keys() {
                if let Some(cov) = coverage.get_mut(category) {
                    cov.documented_count += 1;
                    cov.entity_ids.push(entity.cluster_id);
                }
            }
        }
        Self {
            subject_id: subject_id.into(),
            coverage,
            total_documented: report.total_documented,
        }
    }
}

/// Summary counts over a batch of findings.
///
/// `insufficient_evidence` is tracked separately from `failed` and is
/// never folded into it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ComplianceSummary {
    /// Rules the subject meets.
    pub passed: usize,
    /// Rules the subject violates.
    pub failed: usize,
    /// Rules that could not be evaluated.
    pub insufficient_evidence: usize,
}

impl ComplianceSummary {
    /// Builds a summary from findings.
    pub fn from_findings(findings: &[ComplianceFinding]) -> Self {
        let mut summary = Self::default();
        for finding in findings {
            match finding.status {
                FindingStatus::Pass => summary.passed += 1,
                FindingStatus::Fail => summary.failed += 1,
                FindingStatus::InsufficientEvidence => summary.insufficient_evidence += 1,
            }
        }
        summary
    }

    /// Share of decidable rules that passed.
    pub fn pass_rate(&self) -> f64 {
        let decided = self.passed + self.failed;
        if decided == 0 {
            0.0
        } else {
            self.passed as f64 / decided as f64
        }
    }
}

/// Evaluates risk profiles against declarative frameworks.
#[derive(Debug, Clone, Default)]
pub struct ComplianceChecker;

impl ComplianceChecker {
    /// Creates a checker.
    pub fn new() -> Self {
        Self
    }

    /// Checks a subject profile against every rule of a framework.
    ///
    /// Pure: no side effects, deterministic for a given profile and rule
    /// set version.
    #[instrument(skip(self, profile, framework), fields(subject = %profile.subject_id, framework = %framework.framework_id))]
    pub fn check(
        &self,
        profile: &RiskProfile,
        framework: &ComplianceFramework,
    ) -> Vec<ComplianceFinding> {
        let evaluated_at = Utc::now();
        let findings: Vec<ComplianceFinding> = framework
            .rules
            .iter()
            .map(|rule| {
                let (status, evidence) = self.evaluate_rule(profile, rule);
                ComplianceFinding {
                    framework_id: framework.framework_id.clone(),
                    framework_version: framework.version.clone(),
                    rule_id: rule.rule_id.clone(),
                    subject_id: profile.subject_id.clone(),
                    status,
                    evidence,
                    evaluated_at,
                }
            })
            .collect();

        let summary = ComplianceSummary::from_findings(&findings);
        info!(
            passed = summary.passed,
            failed = summary.failed,
            insufficient = summary.insufficient_evidence,
            "Compliance check complete"
        );
        findings
    }

    fn evaluate_rule(
        &self,
        profile: &RiskProfile,
        rule: &ComplianceRule,
    ) -> (FindingStatus, Vec<EvidenceRef>) {
        // With no documentation-sourced data at all, the rule cannot be
        // decided either way.
        if profile.total_documented == 0 {
            return (FindingStatus::InsufficientEvidence, Vec::new());
        }

        let mut evidence = Vec::new();
        let mut satisfied = 0;
        for category in &rule.required_categories {
            let coverage = profile.coverage.get(category);
            let met = match (coverage, rule.min_coverage_pct) {
                (Some(cov), Some(min_pct)) => cov.documented_pct >= min_pct,
                (Some(cov), None) => cov.documented_count > 0,
                (None, _) => false,
            };
            if met {
                satisfied += 1;
                if let Some(cov) = coverage {
                    evidence.extend(cov.entity_ids.iter().map(|entity_id| EvidenceRef {
                        entity_id: *entity_id,
                        category: category.clone(),
                    }));
                }
            }
        }

        let passed = match rule.coverage_mode {
            CoverageMode::All => satisfied == rule.required_categories.len(),
            CoverageMode::Any => satisfied > 0,
        };
        if passed {
            (FindingStatus::Pass, evidence)
        } else {
            (FindingStatus::Fail, evidence)
        }
    }
}
