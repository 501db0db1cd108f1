//! Command orchestrators
//!
//! Orchestrators hold the business logic behind CLI commands so that it can be
//! driven from tests with an in-memory directory and state store.

pub mod offline;
pub mod reconcile_orchestrator;

pub use offline::OfflineDirectory;
pub use reconcile_orchestrator::{
    Plan, PlanEntry, PlannedAction, ReconcileOrchestrator, ResourceChange, ResourceResult,
    RunReport,
};
