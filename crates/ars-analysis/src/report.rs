//! Reporting snapshot exposed to the API/dashboard layer.
//!
//! Read-only view over one analysis run. The serialized form follows the
//! documented schema literally:
//!
//! ```json
//! {
//!   "blind_spot_index": { "global": 0.31, "by_category": [ ... ] },
//!   "recommendations": [ ... ]
//! }
//! ```

use crate::gap::{BlindSpotMetric, BlindSpotReport};
use ars_core::recommendation::Recommendation;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The blind-spot-index section of the snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlindSpotIndexSnapshot {
    /// Count-weighted global BSI.
    pub global: f64,
    /// Per-category metrics, highest BSI first.
    pub by_category: Vec<BlindSpotMetric>,
}

/// Read-only snapshot of one analysis run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportSnapshot {
    /// Blind-spot metrics.
    pub blind_spot_index: BlindSpotIndexSnapshot,
    /// Current recommendation queue, highest priority first.
    pub recommendations: Vec<Recommendation>,
    /// Statement ids waiting for manual classification review.
    pub manual_review_queue: Vec<Uuid>,
    /// When the underlying analysis ran.
    pub run_at: DateTime<Utc>,
}

impl ReportSnapshot {
    /// Assembles a snapshot from a finished run.
    pub fn new(
        report: &BlindSpotReport,
        recommendations: Vec<Recommendation>,
        manual_review_queue: Vec<Uuid>,
    ) -> Self {
        Self {
            blind_spot_index: BlindSpotIndexSnapshot {
                global: report.global_bsi,
                by_category: report.by_category.clone(),
            },
            recommendations,
            manual_review_queue,
            run_at: report.run_at,
        }
    }
}
