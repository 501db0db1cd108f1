//! In-memory state store

use super::{StateFile, StateStore};
use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

/// State kept in memory only, for dry runs and tests
#[derive(Debug, Clone, Default)]
pub struct MemoryStateStore {
    state: Arc<RwLock<StateFile>>,
    saves: Arc<RwLock<usize>>,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-populated with `state`
    pub fn with_state(state: StateFile) -> Self {
        Self {
            state: Arc::new(RwLock::new(state)),
            saves: Arc::default(),
        }
    }

    /// Number of saves so far
    pub async fn save_count(&self) -> usize {
        *self.saves.read().await
    }
}

#[async_trait]
impl StateStore for MemoryStateStore {
    async fn load(&self) -> Result<StateFile> {
        Ok(self.state.read().await.clone())
    }

    async fn save(&self, state: &StateFile) -> Result<()> {
        *self.state.write().await = state.clone();
        *self.saves.write().await += 1;
        Ok(())
    }

    fn location(&self) -> String {
        "<memory>".to_string()
    }
}
