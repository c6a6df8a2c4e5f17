//! Metrics collection for the analysis pipeline.
//!
//! Emits counters through the `metrics` crate (for Prometheus export by
//! whatever recorder the host process installs) and keeps local totals so
//! callers can read a snapshot without a recorder.

use metrics::{counter, describe_counter};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Snapshot of pipeline counters.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineKpis {
    /// Statements ingested across all runs.
    pub statements_ingested: u64,
    /// Statements routed to manual review.
    pub unclassified: u64,
    /// Cluster merges performed.
    pub merges: u64,
    /// Dedup near misses recorded.
    pub near_misses: u64,
    /// Completed analysis runs.
    pub runs: u64,
    /// Human decisions applied.
    pub human_decisions: u64,
}

impl PipelineKpis {
    /// Share of ingested statements that needed manual review.
    pub fn review_rate(&self) -> f64 {
        if self.statements_ingested == 0 {
            0.0
        } else {
            self.unclassified as f64 / self.statements_ingested as f64
        }
    }
}

/// Collects pipeline metrics.
#[derive(Debug, Default)]
pub struct MetricsCollector {
    statements_ingested: AtomicU64,
    unclassified: AtomicU64,
    merges: AtomicU64,
    near_misses: AtomicU64,
    runs: AtomicU64,
    human_decisions: AtomicU64,
}

impl MetricsCollector {
    /// Creates a collector and registers metric descriptions.
    pub fn new() -> Self {
        describe_counter!(
            "ars_statements_ingested_total",
            "Raw risk statements ingested"
        );
        describe_counter!(
            "ars_unclassified_total",
            "Statements routed to the manual-review queue"
        );
        describe_counter!("ars_dedup_merges_total", "Cluster merges performed");
        describe_counter!(
            "ars_dedup_near_misses_total",
            "Similar statement pairs rejected for category incompatibility"
        );
        describe_counter!("ars_analysis_runs_total", "Completed analysis runs");
        describe_counter!("ars_human_decisions_total", "Human decisions applied");
        Self::default()
    }

    /// Records one completed pipeline run.
    pub fn record_run(&self, ingested: u64, unclassified: u64, merges: u64, near_misses: u64) {
        self.statements_ingested
            .fetch_add(ingested, Ordering::Relaxed);
        self.unclassified.fetch_add(unclassified, Ordering::Relaxed);
        self.merges.fetch_add(merges, Ordering::Relaxed);
        self.near_misses.fetch_add(near_misses, Ordering::Relaxed);
        self.runs.fetch_add(1, Ordering::Relaxed);

        counter!("ars_statements_ingested_total").increment(ingested);
        counter!("ars_unclassified_total").increment(unclassified);
        counter!("ars_dedup_merges_total").increment(merges);
        counter!("ars_dedup_near_misses_total").increment(near_misses);
        counter!("ars_analysis_runs_total").increment(1);
    }

    /// Records a human decision on a proposed action.
    pub fn record_human_decision(&self) {
        self.human_decisions.fetch_add(1, Ordering::Relaxed);
        counter!("ars_human_decisions_total").increment(1);
    }

    /// Current counter totals.
    pub fn kpis(&self) -> PipelineKpis {
        PipelineKpis {
            statements_ingested: self.statements_ingested.load(Ordering::Relaxed),
            unclassified: self.unclassified.load(Ordering::Relaxed),
            merges: self.merges.load(Ordering::Relaxed),
            near_misses: self.near_misses.load(Ordering::Relaxed),
            runs: self.runs.load(Ordering::Relaxed),
            human_decisions: self.human_decisions.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_totals_accumulate() {
        let collector = MetricsCollector::new();
        collector.record_run(120, 6, 10, 2);
        collector.record_run(30, 0, 1, 0);
        collector.record_human_decision();

        let kpis = collector.kpis();
        assert_eq!(kpis.statements_ingested, 150);
        assert_eq!(kpis.unclassified, 6);
        assert_eq!(kpis.merges, 11);
        assert_eq!(kpis.near_misses, 2);
        assert_eq!(kpis.runs, 2);
        assert_eq!(kpis.human_decisions, 1);
        assert!((kpis.review_rate() - 0.04).abs() < 1e-12);
    }

    #[test]
    fn test_review_rate_empty() {
        let collector = MetricsCollector::new();
        assert_eq!(collector.kpis().review_rate(), 0.0);
    }
}
