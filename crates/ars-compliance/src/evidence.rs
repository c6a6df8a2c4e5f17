//! Evidence pack export.
//!
//! Bundles a compliance finding with the canonical risk entities it cites
//! and the rule-set version it was evaluated against, as a self-describing
//! directory: a manifest, the machine-readable JSON artifacts, and a
//! human-readable markdown summary.

use crate::checker::ComplianceFinding;
use crate::framework::ComplianceFramework;
use ars_core::entity::CanonicalRiskEntity;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, instrument};

/// Evidence pack format version.
pub const PACK_VERSION: u32 = 1;

/// Errors raised during export.
#[derive(Error, Debug)]
pub enum EvidenceError {
    #[error("Failed to write evidence pack: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to serialize evidence artifact: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Manifest describing the contents of a pack.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackManifest {
    /// Pack format version.
    pub pack_version: u32,
    /// Framework and rule the pack substantiates.
    pub framework_id: String,
    /// Rule set version evaluated.
    pub framework_version: String,
    /// The rule.
    pub rule_id: String,
    /// The subject model.
    pub subject_id: String,
    /// Files contained in the pack.
    pub contents: Vec<String>,
    /// When the pack was written.
    pub exported_at: chrono::DateTime<Utc>,
}

/// Writes evidence packs under a base directory.
#[derive(Debug, Clone)]
pub struct EvidencePackWriter {
    base_dir: PathBuf,
}

impl EvidencePackWriter {
    /// Creates a writer rooted at the given directory.
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    /// Exports one finding with its cited entities and framework.
    ///
    /// Only entities actually cited by the finding are included. Returns
    /// the pack directory.
    #[instrument(skip_all, fields(rule = %finding.rule_id, subject = %finding.subject_id))]
    pub fn export(
        &self,
        finding: &ComplianceFinding,
        entities: &[CanonicalRiskEntity],
        framework: &ComplianceFramework,
    ) -> Result<PathBuf, EvidenceError> {
        let slug = finding.subject_id.replace('/', "_");
        let stamp = finding.evaluated_at.format("%Y%m%d_%H%M%S");
        let pack_dir = self
            .base_dir
            .join(format!("evidence_{}_{}_{stamp}", slug, finding.rule_id));
        std::fs::create_dir_all(&pack_dir)?;

        let cited: Vec<&CanonicalRiskEntity> = entities
            .iter()
            .filter(|e| {
                finding
                    .evidence
                    .iter()
                    .any(|evidence| evidence.entity_id == e.cluster_id)
            })
            .collect();

        write_json(&pack_dir.join("finding.json"), finding)?;
        write_json(&pack_dir.join("entities.json"), &cited)?;
        write_json(&pack_dir.join("framework.json"), framework)?;
        std::fs::write(
            pack_dir.join("summary.md"),
            render_summary(finding, &cited),
        )?;

        let manifest = PackManifest {
            pack_version: PACK_VERSION,
            framework_id: finding.framework_id.clone(),
            framework_version: finding.framework_version.clone(),
            rule_id: finding.rule_id.clone(),
            subject_id: finding.subject_id.clone(),
            contents: vec![
                "finding.json".to_string(),
                "entities.json".to_string(),
                "framework.json".to_string(),
                "summary.md".to_string(),
            ],
            exported_at: Utc::now(),
        };
        write_json(&pack_dir.join("manifest.json"), &manifest)?;

        info!(path = %pack_dir.display(), "Evidence pack exported");
        Ok(pack_dir)
    }
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), EvidenceError> {
    let json = serde_json::to_string_pretty(value)?;
    std::fs::write(path, json)?;
    Ok(())
}

fn render_summary(finding: &ComplianceFinding, cited: &[&CanonicalRiskEntity]) -> String {
    let mut out = String::new();
    out.push_str("# Compliance Evidence Pack\n\n");
    out.push_str(&format!("- **Subject**: {}\n", finding.subject_id));
    out.push_str(&format!(
        "- **Framework**: {} (version {})\n",
        finding.framework_id, finding.framework_version
    ));
    out.push_str(&format!("- **Rule**: {}\n", finding.rule_id));
    out.push_str(&format!("- **Status**: {:?}\n", finding.status));
    out.push_str(&format!(
        "- **Evaluated**: {}\n\n",
        finding.evaluated_at.to_rfc3339()
    ));
    out.push_str("## Cited risk entities\n\n");
    if cited.is_empty() {
        out.push_str("None.\n");
    } else {
        for entity in cited {
            out.push_str(&format!(
                "- `{}` ({} statements): {}\n",
                entity.cluster_id,
                entity.member_count(),
                entity.representative
            ));
        }
    }
    out
}
