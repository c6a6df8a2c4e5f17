//! Configuration loading for the Risk Sentinel CLI.

use anyhow::{Context, Result};
use ars_analysis::pipeline::PipelineConfig;
use ars_core::orchestrator::OrchestratorConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Analysis pipeline settings.
    #[serde(default)]
    pub pipeline: PipelineConfig,

    /// Orchestrator settings.
    #[serde(default)]
    pub orchestrator: OrchestratorConfig,

    /// Use JSON log output.
    #[serde(default)]
    pub json_logs: bool,
}

impl AppConfig {
    /// Loads configuration from a YAML file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Self = serde_yaml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_yaml() {
        let config: AppConfig = serde_yaml::from_str("{}").unwrap();
        assert!(!config.json_logs);
        assert_eq!(config.orchestrator.stale_after_hours, 24);
    }

    #[test]
    fn test_partial_override() {
        let yaml = r#"
pipeline:
  dedup:
    similarity_threshold: 0.8
orchestrator:
  stale_after_hours: 6
"#;
        let config: AppConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.pipeline.dedup.similarity_threshold, 0.8);
        assert_eq!(config.orchestrator.stale_after_hours, 6);
        // Untouched sections keep their defaults.
        assert_eq!(config.pipeline.normalizer.min_text_len, 20);
    }
}
