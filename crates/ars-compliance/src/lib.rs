//! # ars-compliance
//!
//! Compliance framework evaluation and evidence-pack export for Risk
//! Sentinel.
//!
//! Frameworks are declarative, versioned rule sets (EU AI Act and NIST AI
//! RMF reference sets built in, arbitrary sets loadable from YAML). The
//! checker evaluates a subject's normalized risk profile against a rule
//! set, producing pass/fail/insufficient-evidence findings with evidence
//! references, exportable as self-describing bundles.

pub mod checker;
pub mod evidence;
pub mod framework;

pub use checker::{
    CategoryCoverage, ComplianceChecker, ComplianceFinding, ComplianceSummary, EvidenceRef,
    FindingStatus, RiskProfile,
};
pub use evidence::{EvidenceError, EvidencePackWriter, PackManifest, PACK_VERSION};
pub use framework::{
    ComplianceFramework, ComplianceRule, CoverageMode, FrameworkError,
};
