//! Error types for the arcorg core library
//!
//! Errors are grouped by concern so that callers can tell apart a flaky
//! directory from a state the operator has to resolve by hand.

use thiserror::Error;

pub mod directory;
pub mod lifecycle;
pub mod validation;

pub use self::directory::{DirectoryError, DirectoryResult};
pub use self::lifecycle::LifecycleError;
pub use self::validation::ValidationError;

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the arcorg core library
///
/// Errors are categorized into three main types:
/// - Directory errors: transport or response failures of the account directory
/// - Lifecycle errors: conflicts, creation outcomes and failed unit moves
/// - Validation errors: malformed input or configuration
#[derive(Error, Debug)]
pub enum Error {
    /// Directory service errors
    #[error(transparent)]
    Directory(#[from] DirectoryError),

    /// Account lifecycle errors
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),

    /// Validation related errors
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

/// Short, user-facing error category
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// The account directory could not be reached or answered unexpectedly
    Directory,
    /// The observed account state blocks the requested transition
    Conflict,
    /// Account creation did not reach a terminal state in time
    Timeout,
    /// The directory rejected account creation
    CreationFailed,
    /// An organizational unit move failed
    MoveFailed,
    /// Input or configuration is malformed
    Validation,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Directory => "directory error",
            Self::Conflict => "conflict",
            Self::Timeout => "timeout",
            Self::CreationFailed => "creation failed",
            Self::MoveFailed => "move failed",
            Self::Validation => "invalid input",
        };
        f.write_str(label)
    }
}

impl Error {
    /// Category used for display and exit-code mapping
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Directory(_) => ErrorCategory::Directory,
            Self::Lifecycle(err) => err.category(),
            Self::Validation(_) => ErrorCategory::Validation,
        }
    }

    /// Hint telling the operator how to get unstuck
    pub fn remediation(&self) -> &'static str {
        match self {
            Self::Directory(_) => "Check credentials and connectivity, then retry the operation",
            Self::Lifecycle(err) => err.remediation(),
            Self::Validation(_) => "Fix the declared configuration and retry",
        }
    }

    /// Whether re-invoking the same operation may succeed without operator action
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Directory(err) => err.is_transient(),
            Self::Lifecycle(err) => err.is_retryable(),
            Self::Validation(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_directory_error_category() {
        let error = Error::Directory(DirectoryError::transport("ListAccounts", "connection reset"));

        assert_eq!(error.category(), ErrorCategory::Directory);
        assert!(error.is_retryable());
        assert!(error.to_string().contains("ListAccounts"));
        assert!(error.to_string().contains("connection reset"));
    }

    #[test]
    fn test_conflict_error_category() {
        let error = Error::Lifecycle(LifecycleError::pending_closure("111122223333", "a@b.io"));

        assert_eq!(error.category(), ErrorCategory::Conflict);
        assert!(!error.is_retryable());
        assert!(error.remediation().contains("reopen"));
    }

    #[test]
    fn test_timeout_is_retryable() {
        let error = Error::Lifecycle(LifecycleError::CreationTimedOut {
            ticket_id: "car-1".to_string(),
            attempts: 60,
        });

        assert_eq!(error.category(), ErrorCategory::Timeout);
        assert!(error.is_retryable());
    }

    #[test]
    fn test_validation_error_category() {
        let error = Error::Validation(ValidationError::missing_field("email"));

        assert_eq!(error.category(), ErrorCategory::Validation);
        assert!(!error.is_retryable());
        assert!(error.to_string().contains("email"));
    }

    #[test]
    fn test_category_display() {
        assert_eq!(ErrorCategory::Conflict.to_string(), "conflict");
        assert_eq!(ErrorCategory::MoveFailed.to_string(), "move failed");
    }

    #[test]
    fn test_error_is_send_and_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}

        assert_send::<Error>();
        assert_sync::<Error>();
    }
}
