//! Statement ingestion from collector export files.
//!
//! Collectors hand the pipeline batches of raw risk statements as JSON or
//! YAML arrays matching the ingestion contract:
//! `{source_id, source_type, text, origin_ref, timestamp}` plus optional
//! `model_type`.

use anyhow::{bail, Context, Result};
use ars_core::statement::{RawRiskStatement, SourceType};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::path::Path;

/// One record of the ingestion contract.
#[derive(Debug, Clone, Deserialize)]
pub struct IngestRecord {
    /// Source identifier.
    pub source_id: String,
    /// documentation or incident.
    pub source_type: SourceType,
    /// Free-text risk description.
    pub text: String,
    /// Originating record id, unique per source.
    pub origin_ref: String,
    /// Model type, when the collector knows it.
    #[serde(default)]
    pub model_type: Option<String>,
    /// When the originating record was produced.
    pub timestamp: DateTime<Utc>,
}

impl From<IngestRecord> for RawRiskStatement {
    fn from(record: IngestRecord) -> Self {
        let statement = RawRiskStatement::new(
            record.source_id,
            record.source_type,
            record.text,
            record.origin_ref,
            record.timestamp,
        );
        match record.model_type {
            Some(model_type) => statement.with_model_type(model_type),
            None => statement,
        }
    }
}

/// Loads statements from a JSON or YAML file, by extension.
pub fn load_statements(path: &Path) -> Result<Vec<RawRiskStatement>> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read input file: {}", path.display()))?;
    let records: Vec<IngestRecord> = match path.extension().and_then(|e| e.to_str()) {
        Some("json") => serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse JSON input: {}", path.display()))?,
        Some("yaml") | Some("yml") => serde_yaml::from_str(&contents)
            .with_context(|| format!("Failed to parse YAML input: {}", path.display()))?,
        other => bail!("Unsupported input extension {other:?} (expected json or yaml)"),
    };
    Ok(records.into_iter().map(RawRiskStatement::from).collect())
}
