//! Recommendation data model.

use crate::taxonomy::CategoryKey;
use serde::{Deserialize, Serialize};

/// Priority of a recommendation.
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum Priority {
    /// Documented and observed prevalence roughly aligned.
    Low,
    /// Moderate blind spot.
    Medium,
    /// Severe blind spot requiring attention.
    High,
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Priority::Low => write!(f, "LOW"),
            Priority::Medium => write!(f, "MEDIUM"),
            Priority::High => write!(f, "HIGH"),
        }
    }
}

/// An actionable item generated from a blind-spot snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recommendation {
    /// Category the recommendation addresses.
    pub category: CategoryKey,
    /// Assigned priority.
    pub priority: Priority,
    /// What should be done.
    pub action: String,
    /// Whether supporting evidence artifacts must accompany the fix
    /// (set when the category has essentially no existing documentation).
    pub evidence_required: bool,
    /// Incident percentage that triggered this recommendation.
    pub incident_pct: f64,
    /// Blind Spot Index (propagation-adjusted) that triggered this
    /// recommendation.
    pub adjusted_bsi: f64,
}
