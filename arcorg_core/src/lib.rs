//! arcorg Core Library
//!
//! Lifecycle management for cloud sub-accounts inside an organization.
//! Instead of the provider's slow, irreversible account deletion, accounts are
//! quarantined by moving them from an active organizational unit to a closed
//! one, and adopted back when the same email is declared again.

pub mod directory;
pub mod error;
pub mod identity;
pub mod mover;
pub mod reconciler;
pub mod waiter;

// Re-export main types
pub use directory::{
    Account, AccountDirectory, AccountPage, AccountStatus, CreationState, CreationStatus,
    CreationTicket, DirectoryService,
};
#[cfg(feature = "aws")]
pub use directory::OrganizationsDirectory;
pub use error::{Error, ErrorCategory, Result};
pub use identity::{EXTERNAL_ID_PREFIX, ExternalId};
pub use mover::UnitMover;
pub use reconciler::{
    AccountReconciler, CreateOutcome, DesiredPlacement, ImportedAccount, LifecycleState,
    ManagedResourceRecord, ReadOutcome, Warning,
};
pub use waiter::{Clock, CreationWaiter, TokioClock, WaitOutcome, WaitPolicy};

use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// Reconciliation behaviour
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReconcilerConfig {
    /// Creation polling budget
    #[serde(default)]
    pub wait: WaitPolicy,
    /// Refuse to act when more than one account shares the declared email
    #[serde(default)]
    pub strict_email_uniqueness: bool,
    /// Ambient deadline for a single create/read/update/destroy
    #[serde(default)]
    pub operation_timeout_seconds: Option<u64>,
}

impl ReconcilerConfig {
    /// Create a test configuration
    pub fn test() -> Self {
        Self {
            wait: WaitPolicy {
                max_attempts: 5,
                interval: Duration::from_millis(1),
            },
            strict_email_uniqueness: false,
            operation_timeout_seconds: None,
        }
    }

    /// Deadline for an operation starting at `now`
    pub fn deadline_from(&self, now: Instant) -> Option<Instant> {
        self.operation_timeout_seconds
            .map(|secs| now + Duration::from_secs(secs))
    }

    /// Check the configuration is usable
    pub fn validate(&self) -> std::result::Result<(), error::ValidationError> {
        if self.wait.max_attempts == 0 {
            return Err(error::ValidationError::invalid_configuration(
                "wait.max_attempts must be at least 1",
            ));
        }
        if self.wait.interval.is_zero() {
            return Err(error::ValidationError::invalid_configuration(
                "wait.interval_seconds must be greater than 0",
            ));
        }
        if self.operation_timeout_seconds == Some(0) {
            return Err(error::ValidationError::invalid_configuration(
                "operation_timeout_seconds must be greater than 0",
            ));
        }
        Ok(())
    }
}

/// Where and how to reach the account directory
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DirectoryConfig {
    /// Region override; the ambient AWS configuration applies when unset
    #[serde(default)]
    pub region: Option<String>,
    /// Named credentials profile
    #[serde(default)]
    pub profile: Option<String>,
    /// Custom endpoint, e.g. a local emulator
    #[serde(default)]
    pub endpoint_url: Option<String>,
}
