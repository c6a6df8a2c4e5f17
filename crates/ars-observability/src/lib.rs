//! # ars-observability
//!
//! Logging and metrics infrastructure for Risk Sentinel.

pub mod logging;
pub mod metrics;

pub use logging::{init_logging, init_logging_with_config, LoggingConfig};
pub use metrics::{MetricsCollector, PipelineKpis};
