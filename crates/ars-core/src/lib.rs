//! # ars-core
//!
//! Core data models, taxonomy reference data, and the corrective-action
//! orchestrator for Risk Sentinel.
//!
//! This crate provides the statement and entity models shared across the
//! pipeline, the versioned two-scheme taxonomy registry with its
//! cross-mapping table, the injected agent registry, and the
//! human-in-the-loop orchestrator state machine.

pub mod entity;
pub mod orchestrator;
pub mod recommendation;
pub mod registry;
pub mod statement;
pub mod taxonomy;

pub use entity::CanonicalRiskEntity;
pub use orchestrator::{
    ActionAuditEntry, ActionAuditEvent, ActionState, HumanChoice, HumanDecision, Orchestrator,
    OrchestratorConfig, OrchestratorError, ProposedAction,
};
pub use recommendation::{Priority, Recommendation};
pub use registry::{AgentRegistry, AgentStatus};
pub use statement::{
    CategoryAssignment, ClassificationMethod, NormalizedRisk, RawRiskStatement, SourceType,
};
pub use taxonomy::{
    CategoryCode, CategoryKey, CrossMapping, HarmLayer, TaxonomyCategory, TaxonomyError,
    TaxonomyId, TaxonomyRegistry, UNCLASSIFIED_CODE,
};
