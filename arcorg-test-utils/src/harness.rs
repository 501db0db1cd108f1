//! Ready-made reconciler over the in-memory directory

use crate::mocks::{ManualClock, MockDirectory};
use arcorg_core::{AccountReconciler, ReconcilerConfig};
use std::sync::Arc;

/// A reconciler wired to a [`MockDirectory`] and a [`ManualClock`]
///
/// Both collaborators are shared, so tests can seed the directory and inspect
/// calls and sleeps after driving the reconciler.
pub struct ReconcilerHarness {
    pub directory: MockDirectory,
    pub clock: Arc<ManualClock>,
    pub reconciler: AccountReconciler,
}

impl ReconcilerHarness {
    /// Harness with the default ten-minute wait policy
    pub fn new() -> Self {
        Self::with_config(ReconcilerConfig::default())
    }

    pub fn with_config(config: ReconcilerConfig) -> Self {
        Self::with_directory(MockDirectory::new(), config)
    }

    pub fn with_directory(directory: MockDirectory, config: ReconcilerConfig) -> Self {
        let clock = Arc::new(ManualClock::new());
        let reconciler =
            AccountReconciler::new(Arc::new(directory.clone()), clock.clone(), config);
        Self {
            directory,
            clock,
            reconciler,
        }
    }
}

impl Default for ReconcilerHarness {
    fn default() -> Self {
        Self::new()
    }
}
