//! Corrective-action orchestrator.
//!
//! Tracks each proposed corrective action from detection through mandatory
//! human review to application, producing an audit trail.
//!
//! ## Mandatory human review
//!
//! No automated transition may skip `PendingHumanReview`: `Approved` and
//! `Rejected` are only reachable through an explicit [`HumanDecision`]
//! carrying an actor identity and rationale, both persisted in the audit
//! trail. This is the non-negotiable safety invariant of the system.
//!
//! ## Atomicity
//!
//! Every transition holds the action map's write lock and compares the
//! action's current state before applying, so two concurrent decisions on
//! the same action cannot both win. The losing call gets an
//! [`OrchestratorError::InvalidTransition`] and the state is left
//! unchanged.
//!
//! ## Durable waits
//!
//! An action pending review is a plain data record, not a suspended
//! computation: the wait survives serialization and process restarts, and
//! is resumed by the external decision event. An optional escalation pass
//! ([`Orchestrator::requeue_stale`]) re-surfaces stale items for
//! re-notification without changing their state.

use crate::recommendation::Recommendation;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{info, instrument, warn};
use uuid::Uuid;

/// Lifecycle states of a proposed corrective action.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ActionState {
    /// Gap detected, action not yet proposed.
    Detected,
    /// Action proposed, not yet queued for review.
    Proposed,
    /// Waiting for an explicit human decision.
    PendingHumanReview,
    /// Approved by a human reviewer.
    Approved,
    /// Rejected by a human reviewer. Terminal.
    Rejected,
    /// Downstream action reported completion. Terminal.
    Applied,
    /// Revoked before a decision was made. Terminal.
    Cancelled,
}

impl ActionState {
    /// Whether the state admits no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ActionState::Rejected | ActionState::Applied | ActionState::Cancelled
        )
    }

    /// Whether `self -> to` is a legal transition.
    ///
    /// The transition table is the whole safety argument, so it is written
    /// out exhaustively rather than derived.
    pub fn allows(&self, to: ActionState) -> bool {
        use ActionState::*;
        matches!(
            (self, to),
            (Detected, Proposed)
                | (Proposed, PendingHumanReview)
                | (Proposed, Cancelled)
                | (PendingHumanReview, Approved)
                | (PendingHumanReview, Rejected)
                | (PendingHumanReview, Cancelled)
                | (Approved, Applied)
        )
    }
}

impl std::fmt::Display for ActionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ActionState::Detected => write!(f, "detected"),
            ActionState::Proposed => write!(f, "proposed"),
            ActionState::PendingHumanReview => write!(f, "pending_human_review"),
            ActionState::Approved => write!(f, "approved"),
            ActionState::Rejected => write!(f, "rejected"),
            ActionState::Applied => write!(f, "applied"),
            ActionState::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Errors raised by the orchestrator.
#[derive(Error, Debug)]
pub enum OrchestratorError {
    #[error("Action not found: {0}")]
    ActionNotFound(Uuid),

    #[error("Invalid state transition from {from} to {to}")]
    InvalidTransition { from: ActionState, to: ActionState },
}

/// A human reviewer's verdict.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum HumanChoice {
    Approve,
    Reject,
}

/// An explicit human decision event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HumanDecision {
    /// The action being decided.
    pub action_id: Uuid,
    /// Approve or reject.
    pub decision: HumanChoice,
    /// Identity of the reviewer.
    pub actor: String,
    /// Free-text rationale for the decision.
    pub rationale: String,
    /// When the decision was made.
    pub timestamp: DateTime<Utc>,
}

/// Events recorded in an action's audit trail.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionAuditEvent {
    /// State changed from one state to another.
    StateChanged { from: ActionState, to: ActionState },
    /// The action was re-surfaced for reviewer attention.
    Requeued,
}

/// One audit trail entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionAuditEntry {
    /// Entry identifier.
    pub id: Uuid,
    /// What happened.
    pub event: ActionAuditEvent,
    /// Who caused it ("system" for automatic transitions).
    pub actor: String,
    /// Free-text detail (e.g. a decision rationale).
    pub detail: Option<String>,
    /// When it happened.
    pub timestamp: DateTime<Utc>,
}

impl ActionAuditEntry {
    fn new(event: ActionAuditEvent, actor: &str, detail: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            event,
            actor: actor.to_string(),
            detail,
            timestamp: Utc::now(),
        }
    }
}

/// A proposed corrective action owned by the orchestrator.
///
/// Durable, resumable task record: the pending-review wait lives in this
/// data, not in a blocked thread.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProposedAction {
    /// Unique identifier.
    pub id: Uuid,
    /// The recommendation this action would carry out.
    pub recommendation: Recommendation,
    /// Current lifecycle state.
    pub state: ActionState,
    /// Reviewer identity, once decided.
    pub decided_by: Option<String>,
    /// Reviewer rationale, once decided.
    pub decision_rationale: Option<String>,
    /// Last time reviewers were notified about this action.
    pub last_notified_at: Option<DateTime<Utc>>,
    /// Append-only audit trail.
    pub audit: Vec<ActionAuditEntry>,
    /// When the action was created.
    pub created_at: DateTime<Utc>,
    /// When the action last changed.
    pub updated_at: DateTime<Utc>,
}

impl ProposedAction {
    fn new(recommendation: Recommendation) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            recommendation,
            state: ActionState::Detected,
            decided_by: None,
            decision_rationale: None,
            last_notified_at: None,
            audit: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Applies a transition after checking it against the table.
    ///
    /// Callers must hold exclusive access to the action; the state compare
    /// here is what makes concurrent conflicting transitions lose cleanly.
    fn transition(
        &mut self,
        to: ActionState,
        actor: &str,
        detail: Option<String>,
    ) -> Result<(), OrchestratorError> {
        let from = self.state;
        if !from.allows(to) {
            return Err(OrchestratorError::InvalidTransition { from, to });
        }
        self.state = to;
        self.updated_at = Utc::now();
        self.audit.push(ActionAuditEntry::new(
            ActionAuditEvent::StateChanged { from, to },
            actor,
            detail,
        ));
        Ok(())
    }
}

/// Configuration for the orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Age after which a pending review is considered stale and eligible
    /// for re-notification.
    #[serde(default = "default_stale_after_hours")]
    pub stale_after_hours: i64,
}

fn default_stale_after_hours() -> i64 {
    24
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            stale_after_hours: default_stale_after_hours(),
        }
    }
}

/// Tracks proposed corrective actions through their lifecycle.
pub struct Orchestrator {
    config: OrchestratorConfig,
    actions: Arc<RwLock<HashMap<Uuid, ProposedAction>>>,
}

impl Orchestrator {
    /// Creates an orchestrator.
    pub fn new(config: OrchestratorConfig) -> Self {
        Self {
            config,
            actions: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Creates a proposed action for a recommendation and enqueues it for
    /// human review.
    ///
    /// The action passes `Detected -> Proposed -> PendingHumanReview`
    /// automatically; there is no automated path beyond that point.
    #[instrument(skip(self, recommendation), fields(category = %recommendation.category))]
    pub async fn propose(&self, recommendation: Recommendation) -> ProposedAction {
        let mut action = ProposedAction::new(recommendation);
        // Freshly created actions cannot fail these two transitions.
        let _ = action.transition(ActionState::Proposed, "system", None);
        let _ = action.transition(ActionState::PendingHumanReview, "system", None);
        action.last_notified_at = Some(Utc::now());

        info!(action_id = %action.id, "Action enqueued for human review");
        let mut actions = self.actions.write().await;
        actions.insert(action.id, action.clone());
        action
    }

    /// Applies an explicit human decision to a pending action.
    ///
    /// The only way any action reaches `Approved` or `Rejected`. Actor and
    /// rationale are persisted on the action and in its audit trail.
    #[instrument(skip(self, decision), fields(action_id = %decision.action_id))]
    pub async fn decide(
        &self,
        decision: HumanDecision,
    ) -> Result<ProposedAction, OrchestratorError> {
        let to = match decision.decision {
            HumanChoice::Approve => ActionState::Approved,
            HumanChoice::Reject => ActionState::Rejected,
        };
        let mut actions = self.actions.write().await;
        let action = actions
            .get_mut(&decision.action_id)
            .ok_or(OrchestratorError::ActionNotFound(decision.action_id))?;
        action.transition(to, &decision.actor, Some(decision.rationale.clone()))?;
        action.decided_by = Some(decision.actor.clone());
        action.decision_rationale = Some(decision.rationale);

        info!(actor = %decision.actor, state = %action.state, "Human decision applied");
        Ok(action.clone())
    }

    /// Marks an approved action as applied once the downstream action
    /// reports completion.
    #[instrument(skip(self, completion_report))]
    pub async fn mark_applied(
        &self,
        action_id: Uuid,
        completion_report: impl Into<String>,
    ) -> Result<ProposedAction, OrchestratorError> {
        let mut actions = self.actions.write().await;
        let action = actions
            .get_mut(&action_id)
            .ok_or(OrchestratorError::ActionNotFound(action_id))?;
        action.transition(
            ActionState::Applied,
            "system",
            Some(completion_report.into()),
        )?;
        info!(action_id = %action_id, "Action applied");
        Ok(action.clone())
    }

    /// Revokes an action that has not yet been decided.
    ///
    /// Only legal from `Proposed` or `PendingHumanReview`; cancelling an
    /// approved action fails and leaves it unchanged.
    #[instrument(skip(self, reason))]
    pub async fn cancel(
        &self,
        action_id: Uuid,
        actor: &str,
        reason: impl Into<String>,
    ) -> Result<ProposedAction, OrchestratorError> {
        let mut actions = self.actions.write().await;
        let action = actions
            .get_mut(&action_id)
            .ok_or(OrchestratorError::ActionNotFound(action_id))?;
        action.transition(ActionState::Cancelled, actor, Some(reason.into()))?;
        info!(action_id = %action_id, actor, "Action cancelled");
        Ok(action.clone())
    }

    /// Re-surfaces stale pending-review actions for re-notification.
    ///
    /// Does not change any action's state; it only refreshes the
    /// notification timestamp and records the requeue in the audit trail.
    /// Returns the ids of the requeued actions.
    pub async fn requeue_stale(&self) -> Vec<Uuid> {
        let cutoff = Utc::now() - Duration::hours(self.config.stale_after_hours);
        let mut requeued = Vec::new();
        let mut actions = self.actions.write().await;
        for action in actions.values_mut() {
            if action.state != ActionState::PendingHumanReview {
                continue;
            }
            let last = action.last_notified_at.unwrap_or(action.created_at);
            if last < cutoff {
                action.last_notified_at = Some(Utc::now());
                action.audit.push(ActionAuditEntry::new(
                    ActionAuditEvent::Requeued,
                    "system",
                    None,
                ));
                warn!(action_id = %action.id, "Stale review requeued for notification");
                requeued.push(action.id);
            }
        }
        requeued.sort();
        requeued
    }

    /// A snapshot of one action.
    pub async fn get(&self, action_id: Uuid) -> Option<ProposedAction> {
        self.actions.read().await.get(&action_id).cloned()
    }

    /// Actions currently waiting for a human decision, oldest first.
    pub async fn pending_review(&self) -> Vec<ProposedAction> {
        let actions = self.actions.read().await;
        let mut pending: Vec<ProposedAction> = actions
            .values()
            .filter(|a| a.state == ActionState::PendingHumanReview)
            .cloned()
            .collect();
        pending.sort_by_key(|a| a.created_at);
        pending
    }

    /// All tracked actions, oldest first.
    pub async fn all(&self) -> Vec<ProposedAction> {
        let actions = self.actions.read().await;
        let mut all: Vec<ProposedAction> = actions.values().cloned().collect();
        all.sort_by_key(|a| a.created_at);
        all
    }
}

impl Default for Orchestrator {
    fn default() -> Self {
        Self::new(OrchestratorConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recommendation::Priority;
    use crate::taxonomy::{CategoryKey, TaxonomyId};

    fn recommendation() -> Recommendation {
        Recommendation {
            category: CategoryKey::new(TaxonomyId::MitAiRisk, "malicious_actors"),
            priority: Priority::High,
            action: "Document misuse scenarios including deepfakes and fraud".to_string(),
            evidence_required: true,
            incident_pct: 22.4,
            adjusted_bsi: 0.82,
        }
    }

    fn decision(action_id: Uuid, choice: HumanChoice) -> HumanDecision {
        HumanDecision {
            action_id,
            decision: choice,
            actor: "analyst@example.org".to_string(),
            rationale: "Incident data supports the gap".to_string(),
            timestamp: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_propose_enqueues_for_review() {
        let orchestrator = Orchestrator::default();
        let action = orchestrator.propose(recommendation()).await;

        assert_eq!(action.state, ActionState::PendingHumanReview);
        // Detected->Proposed and Proposed->PendingHumanReview audited.
        assert_eq!(action.audit.len(), 2);
        assert_eq!(orchestrator.pending_review().await.len(), 1);
    }

    #[tokio::test]
    async fn test_approve_then_apply() {
        let orchestrator = Orchestrator::default();
        let action = orchestrator.propose(recommendation()).await;

        let approved = orchestrator
            .decide(decision(action.id, HumanChoice::Approve))
            .await
            .unwrap();
        assert_eq!(approved.state, ActionState::Approved);
        assert_eq!(approved.decided_by.as_deref(), Some("analyst@example.org"));
        assert!(approved.decision_rationale.is_some());

        let applied = orchestrator
            .mark_applied(action.id, "documentation patch merged")
            .await
            .unwrap();
        assert_eq!(applied.state, ActionState::Applied);
    }

    #[tokio::test]
    async fn test_reject_is_terminal() {
        let orchestrator = Orchestrator::default();
        let action = orchestrator.propose(recommendation()).await;
        orchestrator
            .decide(decision(action.id, HumanChoice::Reject))
            .await
            .unwrap();

        let err = orchestrator
            .mark_applied(action.id, "should not apply")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            OrchestratorError::InvalidTransition {
                from: ActionState::Rejected,
                to: ActionState::Applied,
            }
        ));
    }

    #[tokio::test]
    async fn test_apply_without_approval_fails() {
        let orchestrator = Orchestrator::default();
        let action = orchestrator.propose(recommendation()).await;

        let err = orchestrator
            .mark_applied(action.id, "skipping review")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            OrchestratorError::InvalidTransition {
                from: ActionState::PendingHumanReview,
                to: ActionState::Applied,
            }
        ));
        // State unchanged.
        let current = orchestrator.get(action.id).await.unwrap();
        assert_eq!(current.state, ActionState::PendingHumanReview);
    }

    #[tokio::test]
    async fn test_cancel_after_approval_fails() {
        let orchestrator = Orchestrator::default();
        let action = orchestrator.propose(recommendation()).await;
        orchestrator
            .decide(decision(action.id, HumanChoice::Approve))
            .await
            .unwrap();

        let err = orchestrator
            .cancel(action.id, "analyst@example.org", "changed my mind")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            OrchestratorError::InvalidTransition {
                from: ActionState::Approved,
                to: ActionState::Cancelled,
            }
        ));
        let current = orchestrator.get(action.id).await.unwrap();
        assert_eq!(current.state, ActionState::Approved);
    }

    #[tokio::test]
    async fn test_cancel_pending_review() {
        let orchestrator = Orchestrator::default();
        let action = orchestrator.propose(recommendation()).await;
        let cancelled = orchestrator
            .cancel(action.id, "analyst@example.org", "duplicate of earlier action")
            .await
            .unwrap();
        assert_eq!(cancelled.state, ActionState::Cancelled);
        assert!(orchestrator.pending_review().await.is_empty());
    }

    #[tokio::test]
    async fn test_double_decision_loses() {
        let orchestrator = Orchestrator::default();
        let action = orchestrator.propose(recommendation()).await;
        orchestrator
            .decide(decision(action.id, HumanChoice::Approve))
            .await
            .unwrap();

        // A second decision arrives after the first has won.
        let err = orchestrator
            .decide(decision(action.id, HumanChoice::Reject))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            OrchestratorError::InvalidTransition {
                from: ActionState::Approved,
                to: ActionState::Rejected,
            }
        ));
    }

    #[tokio::test]
    async fn test_requeue_stale_keeps_state() {
        let config = OrchestratorConfig {
            stale_after_hours: 0,
        };
        let orchestrator = Orchestrator::new(config);
        let action = orchestrator.propose(recommendation()).await;

        // Force the notification timestamp into the past.
        {
            let mut actions = orchestrator.actions.write().await;
            let a = actions.get_mut(&action.id).unwrap();
            a.last_notified_at = Some(Utc::now() - Duration::hours(48));
        }

        let requeued = orchestrator.requeue_stale().await;
        assert_eq!(requeued, vec![action.id]);

        let current = orchestrator.get(action.id).await.unwrap();
        assert_eq!(current.state, ActionState::PendingHumanReview);
        assert!(current
            .audit
            .iter()
            .any(|e| matches!(e.event, ActionAuditEvent::Requeued)));
    }

    #[tokio::test]
    async fn test_unknown_action() {
        let orchestrator = Orchestrator::default();
        let err = orchestrator
            .decide(decision(Uuid::new_v4(), HumanChoice::Approve))
            .await
            .unwrap_err();
        assert!(matches!(err, OrchestratorError::ActionNotFound(_)));
    }
}
