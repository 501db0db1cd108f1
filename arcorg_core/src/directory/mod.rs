//! Account directory boundary
//!
//! This module defines the calls the lifecycle logic makes against the
//! organization's account-management API:
//! - `DirectoryService`: the raw boundary, one method per remote call
//! - `AccountDirectory`: lookup helpers layered on top (pagination, email match)

pub mod client;
#[cfg(feature = "aws")]
pub mod organizations;
pub mod types;

use crate::error::DirectoryResult;
use async_trait::async_trait;

// Re-export main types
pub use client::AccountDirectory;
#[cfg(feature = "aws")]
pub use organizations::OrganizationsDirectory;
pub use types::{
    Account, AccountPage, AccountStatus, CreationState, CreationStatus, CreationTicket,
};

/// Remote calls against the account-management API
///
/// Implementations hold no account state of their own; every call goes to the
/// directory. Errors are returned as-is, retrying is up to the caller.
#[async_trait]
pub trait DirectoryService: Send + Sync {
    /// List one page of accounts, starting at `cursor` when given
    async fn list_accounts(&self, cursor: Option<&str>) -> DirectoryResult<AccountPage>;

    /// Submit an asynchronous account creation request
    async fn create_account(&self, name: &str, email: &str) -> DirectoryResult<CreationTicket>;

    /// Query the state of a creation request
    async fn get_creation_status(&self, ticket_id: &str) -> DirectoryResult<CreationStatus>;

    /// List the organizational units directly containing an account
    async fn list_parents(&self, account_id: &str) -> DirectoryResult<Vec<String>>;

    /// Move an account to `to_unit_id`
    ///
    /// `from_unit_id` is `None` for a freshly created account still sitting in
    /// the placement the directory assigned at creation.
    async fn move_account(
        &self,
        account_id: &str,
        from_unit_id: Option<&str>,
        to_unit_id: &str,
    ) -> DirectoryResult<()>;
}
