//! Pipeline agent registry.
//!
//! An explicit, injected record of pipeline component health and progress.
//! There is deliberately no process-wide singleton: whoever runs the
//! pipeline constructs a registry and passes it to the components that
//! report into it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Progress and health of one named pipeline agent.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentStatus {
    /// When the agent last completed a run.
    pub last_run: Option<DateTime<Utc>>,
    /// Items processed across all runs.
    pub processed: u64,
    /// Failures recovered or surfaced across all runs.
    pub failures: u64,
}

/// Registry of pipeline agents, keyed by agent name.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentRegistry {
    agents: BTreeMap<String, AgentStatus>,
}

impl AgentRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a completed run for an agent.
    pub fn record_run(&mut self, agent: &str, processed: u64) {
        let status = self.agents.entry(agent.to_string()).or_default();
        status.last_run = Some(Utc::now());
        status.processed += processed;
    }

    /// Records failures observed by an agent.
    pub fn record_failures(&mut self, agent: &str, failures: u64) {
        let status = self.agents.entry(agent.to_string()).or_default();
        status.failures += failures;
    }

    /// Status of one agent, if it has reported.
    pub fn status(&self, agent: &str) -> Option<&AgentStatus> {
        self.agents.get(agent)
    }

    /// Snapshot of all agent statuses.
    pub fn snapshot(&self) -> &BTreeMap<String, AgentStatus> {
        &self.agents
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_and_query() {
        let mut registry = AgentRegistry::new();
        registry.record_run("normalizer", 120);
        registry.record_run("normalizer", 30);
        registry.record_failures("normalizer", 2);

        let status = registry.status("normalizer").unwrap();
        assert_eq!(status.processed, 150);
        assert_eq!(status.failures, 2);
        assert!(status.last_run.is_some());
        assert!(registry.status("dedup").is_none());
    }
}
