//! Account lifecycle error types

use super::{DirectoryError, ErrorCategory};
use thiserror::Error;

/// Errors raised while driving an account through its lifecycle
#[derive(Error, Debug)]
pub enum LifecycleError {
    /// The account exists but the directory is closing it
    #[error("Account {account_id} ({email}) was found, however it is pending closure")]
    PendingClosure { account_id: String, email: String },

    /// The account does not sit under exactly one organizational unit
    #[error(
        "Account {account_id} has {parent_count} parent units, expected exactly one; \
         possibly modified outside the managed workflow"
    )]
    ParentCardinality {
        account_id: String,
        parent_count: usize,
    },

    /// More than one account answers to the same email
    #[error("Email {email} matches {} accounts: {}", .account_ids.len(), .account_ids.join(", "))]
    DuplicateEmail {
        email: String,
        account_ids: Vec<String>,
    },

    /// A declared field differs from the one the account was created with
    #[error("Cannot modify '{field}' after creation (stored '{stored}', declared '{desired}')")]
    ImmutableField {
        field: &'static str,
        stored: String,
        desired: String,
    },

    /// The directory reported the creation request as failed
    #[error("Account creation {ticket_id} failed{}", .reason.as_ref().map(|r| format!(": {r}")).unwrap_or_default())]
    CreationFailed {
        ticket_id: String,
        reason: Option<String>,
    },

    /// Polling ran out of attempts while the request was still pending
    #[error("Account creation {ticket_id} still pending after {attempts} attempts")]
    CreationTimedOut { ticket_id: String, attempts: u32 },

    /// Polling ran out of attempts and the last status query itself failed
    #[error(
        "Account creation {ticket_id} status unknown after {attempts} attempts \
         ({errors} failed queries, last: {last_error})"
    )]
    CreationStatusUnavailable {
        ticket_id: String,
        attempts: u32,
        errors: u32,
        last_error: DirectoryError,
    },

    /// The caller's deadline expired while waiting for creation
    #[error("Deadline expired while waiting for account creation {ticket_id} after {attempts} attempts")]
    DeadlineExceeded { ticket_id: String, attempts: u32 },

    /// Moving the account between organizational units failed
    #[error("Error moving account {account_id} to {to_unit_id}: {source}")]
    MoveFailed {
        account_id: String,
        from_unit_id: Option<String>,
        to_unit_id: String,
        #[source]
        source: DirectoryError,
    },
}

impl LifecycleError {
    /// Create a pending closure conflict
    pub fn pending_closure(account_id: &str, email: &str) -> Self {
        Self::PendingClosure {
            account_id: account_id.to_string(),
            email: email.to_string(),
        }
    }

    /// Create a parent cardinality conflict
    pub fn parent_cardinality(account_id: &str, parent_count: usize) -> Self {
        Self::ParentCardinality {
            account_id: account_id.to_string(),
            parent_count,
        }
    }

    /// Create an immutable field conflict
    pub fn immutable_field(field: &'static str, stored: &str, desired: &str) -> Self {
        Self::ImmutableField {
            field,
            stored: stored.to_string(),
            desired: desired.to_string(),
        }
    }

    /// Create a move failure
    pub fn move_failed(
        account_id: &str,
        from_unit_id: Option<&str>,
        to_unit_id: &str,
        source: DirectoryError,
    ) -> Self {
        Self::MoveFailed {
            account_id: account_id.to_string(),
            from_unit_id: from_unit_id.map(str::to_string),
            to_unit_id: to_unit_id.to_string(),
            source,
        }
    }

    /// Check if this error is a user-actionable conflict
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            Self::PendingClosure { .. }
                | Self::ParentCardinality { .. }
                | Self::DuplicateEmail { .. }
                | Self::ImmutableField { .. }
        )
    }

    pub(crate) fn category(&self) -> ErrorCategory {
        match self {
            _ if self.is_conflict() => ErrorCategory::Conflict,
            Self::CreationFailed { .. } => ErrorCategory::CreationFailed,
            Self::CreationTimedOut { .. }
            | Self::CreationStatusUnavailable { .. }
            | Self::DeadlineExceeded { .. } => ErrorCategory::Timeout,
            _ => ErrorCategory::MoveFailed,
        }
    }

    pub(crate) fn remediation(&self) -> &'static str {
        match self {
            Self::PendingClosure { .. } => {
                "Reopen the account manually or wait for the provider to delete it"
            }
            Self::ParentCardinality { .. } => {
                "Inspect the account placement in the console and restore a single parent unit"
            }
            Self::DuplicateEmail { .. } => {
                "Resolve the duplicate email addresses in the organization before retrying"
            }
            Self::ImmutableField { .. } => "Destroy this resource and re-create it",
            Self::CreationFailed { .. } => {
                "Check the creation failure reason in the organization console"
            }
            Self::CreationTimedOut { .. }
            | Self::CreationStatusUnavailable { .. }
            | Self::DeadlineExceeded { .. } => {
                "Retry the operation; an account created in the meantime will be adopted or reported"
            }
            Self::MoveFailed { .. } => {
                "Verify where the account currently sits and reconcile its placement manually"
            }
        }
    }

    pub(crate) fn is_retryable(&self) -> bool {
        match self {
            Self::CreationTimedOut { .. }
            | Self::CreationStatusUnavailable { .. }
            | Self::DeadlineExceeded { .. } => true,
            Self::MoveFailed { source, .. } => source.is_transient(),
            _ => false,
        }
    }
}
