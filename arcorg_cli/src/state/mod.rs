//! Persisted managed-resource records
//!
//! State is the set of `ManagedResourceRecord`s the CLI is responsible for,
//! keyed by the manifest resource key. A record is written when a create or
//! adoption succeeds and dropped when the quarantine move succeeds.

mod file_store;
mod memory_store;

pub use file_store::FileStateStore;
pub use memory_store::MemoryStateStore;

use anyhow::Result;
use arcorg_core::ManagedResourceRecord;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Current on-disk format version
pub const STATE_VERSION: u32 = 1;

/// Snapshot of all managed records
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateFile {
    pub version: u32,
    #[serde(default)]
    pub resources: BTreeMap<String, ManagedResourceRecord>,
}

impl Default for StateFile {
    fn default() -> Self {
        Self {
            version: STATE_VERSION,
            resources: BTreeMap::new(),
        }
    }
}

impl StateFile {
    pub fn get(&self, key: &str) -> Option<&ManagedResourceRecord> {
        self.resources.get(key)
    }

    pub fn insert(&mut self, key: &str, record: ManagedResourceRecord) {
        self.resources.insert(key.to_string(), record);
    }

    pub fn remove(&mut self, key: &str) -> Option<ManagedResourceRecord> {
        self.resources.remove(key)
    }

    pub fn keys(&self) -> Vec<String> {
        self.resources.keys().cloned().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }
}

/// Trait for state storage backends
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Load the current snapshot
    ///
    /// A store that has never been saved yields an empty snapshot.
    async fn load(&self) -> Result<StateFile>;

    /// Replace the stored snapshot
    async fn save(&self, state: &StateFile) -> Result<()>;

    /// Human-readable location, for messages
    fn location(&self) -> String;
}
