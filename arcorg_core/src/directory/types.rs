//! Account directory data types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Account status as reported by the directory
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccountStatus {
    Active,
    /// Pending closure; the directory itself has quarantined the account
    Suspended,
    /// Any status this library does not act on, kept verbatim
    Other(String),
}

impl AccountStatus {
    /// Parse a raw directory status string
    pub fn from_raw(raw: &str) -> Self {
        match raw {
            "ACTIVE" => Self::Active,
            "SUSPENDED" => Self::Suspended,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn is_suspended(&self) -> bool {
        matches!(self, Self::Suspended)
    }
}

impl std::fmt::Display for AccountStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Active => f.write_str("ACTIVE"),
            Self::Suspended => f.write_str("SUSPENDED"),
            Self::Other(raw) => f.write_str(raw),
        }
    }
}

/// One cloud sub-account as seen by the directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Provider-assigned identifier, immutable once created
    pub id: String,
    /// Natural key used for lookup
    pub email: String,
    pub name: String,
    pub status: AccountStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arn: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub joined_at: Option<DateTime<Utc>>,
}

/// One page of an account listing
#[derive(Debug, Clone, Default)]
pub struct AccountPage {
    pub accounts: Vec<Account>,
    /// Opaque continuation token; `None` on the last page
    pub next_cursor: Option<String>,
}

impl AccountPage {
    /// Create a final page
    pub fn last(accounts: Vec<Account>) -> Self {
        Self {
            accounts,
            next_cursor: None,
        }
    }

    /// Create a page followed by more results
    pub fn with_cursor(accounts: Vec<Account>, cursor: impl Into<String>) -> Self {
        Self {
            accounts,
            next_cursor: Some(cursor.into()),
        }
    }
}

/// Handle on an asynchronous creation request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreationTicket {
    /// Request identifier, not the final account id
    pub id: String,
}

/// State of a creation request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreationState {
    Pending,
    Succeeded,
    Failed,
}

/// Snapshot of a creation request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreationStatus {
    /// `None` when the directory answered without a state
    pub state: Option<CreationState>,
    /// Set once the request has succeeded
    pub account_id: Option<String>,
    pub failure_reason: Option<String>,
}

impl CreationStatus {
    pub fn pending() -> Self {
        Self {
            state: Some(CreationState::Pending),
            account_id: None,
            failure_reason: None,
        }
    }

    pub fn succeeded(account_id: impl Into<String>) -> Self {
        Self {
            state: Some(CreationState::Succeeded),
            account_id: Some(account_id.into()),
            failure_reason: None,
        }
    }

    pub fn failed(reason: Option<String>) -> Self {
        Self {
            state: Some(CreationState::Failed),
            account_id: None,
            failure_reason: reason,
        }
    }
}
