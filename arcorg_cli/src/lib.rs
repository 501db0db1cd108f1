//! arcorg CLI library
//!
//! Host surface for the account lifecycle library: declared accounts come
//! from a TOML manifest, managed records live in a JSON state file, and the
//! orchestrator drives the reconciler over both.

pub mod config;
pub mod error;
pub mod manifest;
pub mod orchestrators;
pub mod output;
pub mod paths;
pub mod state;
pub mod terminal;
