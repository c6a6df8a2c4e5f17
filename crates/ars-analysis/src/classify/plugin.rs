//! Adapter for external classifier plug-ins.
//!
//! Wraps a side-effect-free scoring function (typically backed by a
//! learned model behind some inference runtime) in the
//! [`ClassificationStrategy`] interface, so the pipeline is indifferent
//! to whether assignments come from rules or a model.

use super::{ClassificationStrategy, StrategyError};
use ars_core::statement::{CategoryAssignment, ClassificationMethod};
use async_trait::async_trait;

/// The plug-in scoring function contract.
pub type ClassifyFn =
    dyn Fn(&str) -> Result<Vec<CategoryAssignment>, StrategyError> + Send + Sync;

/// A strategy backed by an externally supplied scoring function.
pub struct PluginStrategy {
    name: String,
    method: ClassificationMethod,
    scorer: Box<ClassifyFn>,
}

impl PluginStrategy {
    /// Wraps a learned-model scoring function.
    pub fn learned(name: impl Into<String>, scorer: Box<ClassifyFn>) -> Self {
        Self {
            name: name.into(),
            method: ClassificationMethod::Learned,
            scorer,
        }
    }
}

impl std::fmt::Debug for PluginStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginStrategy")
            .field("name", &self.name)
            .field("method", &self.method)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl ClassificationStrategy for PluginStrategy {
    fn name(&self) -> &str {
        &self.name
    }

    fn method(&self) -> ClassificationMethod {
        self.method
    }

    async fn classify(&self, text: &str) -> Result<Vec<CategoryAssignment>, StrategyError> {
        (self.scorer)(text)
    }
}
