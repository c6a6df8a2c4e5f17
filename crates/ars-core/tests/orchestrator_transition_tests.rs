//! Exhaustive transition-safety tests for the corrective-action state
//! machine.
//!
//! The property under test: an action can never reach `Applied` without
//! passing through `PendingHumanReview` and an explicit `Approved`
//! transition, and every illegal transition fails leaving state unchanged.

use ars_core::orchestrator::{
    ActionState, HumanChoice, HumanDecision, Orchestrator, OrchestratorError,
};
use ars_core::recommendation::{Priority, Recommendation};
use ars_core::taxonomy::{CategoryKey, TaxonomyId};
use chrono::Utc;

const ALL_STATES: [ActionState; 7] = [
    ActionState::Detected,
    ActionState::Proposed,
    ActionState::PendingHumanReview,
    ActionState::Approved,
    ActionState::Rejected,
    ActionState::Applied,
    ActionState::Cancelled,
];

fn legal(from: ActionState, to: ActionState) -> bool {
    use ActionState::*;
    matches!(
        (from, to),
        (Detected, Proposed)
            | (Proposed, PendingHumanReview)
            | (Proposed, Cancelled)
            | (PendingHumanReview, Approved)
            | (PendingHumanReview, Rejected)
            | (PendingHumanReview, Cancelled)
            | (Approved, Applied)
    )
}

fn recommendation() -> Recommendation {
    Recommendation {
        category: CategoryKey::new(TaxonomyId::MitAiRisk, "misinformation"),
        priority: Priority::Medium,
        action: "Add explicit hallucination warnings".to_string(),
        evidence_required: false,
        incident_pct: 12.9,
        adjusted_bsi: 0.21,
    }
}

fn decision(action_id: uuid::Uuid, choice: HumanChoice) -> HumanDecision {
    HumanDecision {
        action_id,
        decision: choice,
        actor: "reviewer@example.org".to_string(),
        rationale: "transition test".to_string(),
        timestamp: Utc::now(),
    }
}

#[test]
fn every_transition_pair_matches_the_table() {
    for from in ALL_STATES {
        for to in ALL_STATES {
            assert_eq!(
                from.allows(to),
                legal(from, to),
                "transition table mismatch for {from} -> {to}"
            );
        }
    }
}

#[test]
fn terminal_states_allow_nothing() {
    for from in ALL_STATES.into_iter().filter(ActionState::is_terminal) {
        for to in ALL_STATES {
            assert!(!from.allows(to), "terminal {from} must not allow {to}");
        }
    }
}

/// Walks every legal path from `Detected` and asserts that any path
/// reaching `Applied` visited `PendingHumanReview` and then `Approved`.
#[test]
fn applied_requires_review_then_approval_on_every_path() {
    fn walk(path: &mut Vec<ActionState>, reached_applied: &mut Vec<Vec<ActionState>>) {
        let current = *path.last().unwrap();
        if current == ActionState::Applied {
            reached_applied.push(path.clone());
            return;
        }
        for next in ALL_STATES {
            if current.allows(next) {
                path.push(next);
                walk(path, reached_applied);
                path.pop();
            }
        }
    }

    let mut paths = Vec::new();
    walk(&mut vec![ActionState::Detected], &mut paths);

    assert!(!paths.is_empty(), "Applied must be reachable");
    for path in paths {
        let review = path
            .iter()
            .position(|s| *s == ActionState::PendingHumanReview);
        let approved = path.iter().position(|s| *s == ActionState::Approved);
        let applied = path.iter().position(|s| *s == ActionState::Applied);
        let (review, approved, applied) = (
            review.expect("path to Applied must pass PendingHumanReview"),
            approved.expect("path to Applied must pass Approved"),
            applied.expect("path ends at Applied"),
        );
        assert!(review < approved && approved < applied, "bad order: {path:?}");
    }
}

/// Drives real actions into each reachable resting state and asserts every
/// illegal operation fails and leaves the state untouched.
#[tokio::test]
async fn illegal_operations_leave_state_unchanged() {
    let orchestrator = Orchestrator::default();

    // PendingHumanReview: applying without approval must fail.
    let pending = orchestrator.propose(recommendation()).await;
    assert!(matches!(
        orchestrator.mark_applied(pending.id, "premature").await,
        Err(OrchestratorError::InvalidTransition { .. })
    ));
    assert_eq!(
        orchestrator.get(pending.id).await.unwrap().state,
        ActionState::PendingHumanReview
    );

    // Approved: cancel and re-decide must fail; apply succeeds.
    let approved = orchestrator.propose(recommendation()).await;
    orchestrator
        .decide(decision(approved.id, HumanChoice::Approve))
        .await
        .unwrap();
    assert!(orchestrator
        .cancel(approved.id, "reviewer@example.org", "late regret")
        .await
        .is_err());
    assert!(orchestrator
        .decide(decision(approved.id, HumanChoice::Reject))
        .await
        .is_err());
    assert_eq!(
        orchestrator.get(approved.id).await.unwrap().state,
        ActionState::Approved
    );

    // Terminal states: every operation must fail.
    let rejected = orchestrator.propose(recommendation()).await;
    orchestrator
        .decide(decision(rejected.id, HumanChoice::Reject))
        .await
        .unwrap();
    let cancelled = orchestrator.propose(recommendation()).await;
    orchestrator
        .cancel(cancelled.id, "reviewer@example.org", "withdrawn")
        .await
        .unwrap();
    let applied = orchestrator.propose(recommendation()).await;
    orchestrator
        .decide(decision(applied.id, HumanChoice::Approve))
        .await
        .unwrap();
    orchestrator.mark_applied(applied.id, "done").await.unwrap();

    for (id, state) in [
        (rejected.id, ActionState::Rejected),
        (cancelled.id, ActionState::Cancelled),
        (applied.id, ActionState::Applied),
    ] {
        assert!(orchestrator
            .decide(decision(id, HumanChoice::Approve))
            .await
            .is_err());
        assert!(orchestrator
            .decide(decision(id, HumanChoice::Reject))
            .await
            .is_err());
        assert!(orchestrator.mark_applied(id, "no").await.is_err());
        assert!(orchestrator
            .cancel(id, "reviewer@example.org", "no")
            .await
            .is_err());
        assert_eq!(orchestrator.get(id).await.unwrap().state, state);
    }
}
