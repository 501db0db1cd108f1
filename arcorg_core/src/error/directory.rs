//! Directory service error types

use thiserror::Error;

/// Result type for calls across the directory boundary
pub type DirectoryResult<T> = std::result::Result<T, DirectoryError>;

/// Errors raised by the account directory
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DirectoryError {
    /// The call never produced a service answer (network, credentials, dispatch)
    #[error("Directory call {operation} failed: {message}")]
    Transport { operation: String, message: String },

    /// The service asked us to slow down
    #[error("Directory call {operation} was throttled")]
    Throttled { operation: String },

    /// The service answered and refused the request
    #[error("Directory rejected {operation} ({code}): {message}")]
    Rejected {
        operation: String,
        code: String,
        message: String,
    },

    /// The service answered with something we cannot use
    #[error("Unexpected response from {operation}: {message}")]
    InvalidResponse { operation: String, message: String },
}

impl DirectoryError {
    /// Create a transport error
    pub fn transport(operation: &str, message: impl Into<String>) -> Self {
        Self::Transport {
            operation: operation.to_string(),
            message: message.into(),
        }
    }

    /// Create a throttling error
    pub fn throttled(operation: &str) -> Self {
        Self::Throttled {
            operation: operation.to_string(),
        }
    }

    /// Create a rejection error with the service error code
    pub fn rejected(operation: &str, code: &str, message: impl Into<String>) -> Self {
        Self::Rejected {
            operation: operation.to_string(),
            code: code.to_string(),
            message: message.into(),
        }
    }

    /// Create an invalid response error
    pub fn invalid_response(operation: &str, message: impl Into<String>) -> Self {
        Self::InvalidResponse {
            operation: operation.to_string(),
            message: message.into(),
        }
    }

    /// Name of the directory operation that failed
    pub fn operation(&self) -> &str {
        match self {
            Self::Transport { operation, .. }
            | Self::Throttled { operation }
            | Self::Rejected { operation, .. }
            | Self::InvalidResponse { operation, .. } => operation,
        }
    }

    /// Check if this error is transient and the call can be retried
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transport { .. } | Self::Throttled { .. })
    }
}
