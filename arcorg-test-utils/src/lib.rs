//! Test utilities for arcorg
//!
//! This crate provides an in-memory directory service, a manual clock and
//! builders for testing account lifecycle behaviour without an organization.

pub mod builders;
pub mod harness;
pub mod mocks;

// Re-export commonly used types
pub use builders::{AccountBuilder, PlacementBuilder};
pub use harness::ReconcilerHarness;
pub use mocks::{DirectoryCall, ManualClock, MockDirectory, MockOperation, ScriptedPoll};
