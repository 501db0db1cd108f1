//! Directory stand-in for commands that only compare manifest and state

use arcorg_core::DirectoryService;
use arcorg_core::directory::{AccountPage, CreationStatus, CreationTicket};
use arcorg_core::error::{DirectoryError, DirectoryResult};
use async_trait::async_trait;

const REASON: &str = "the directory is not reachable from an offline command";

/// Directory service that refuses every call
///
/// `plan` and `show` never touch the directory, so they run without
/// credentials.
#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineDirectory;

#[async_trait]
impl DirectoryService for OfflineDirectory {
    async fn list_accounts(&self, _cursor: Option<&str>) -> DirectoryResult<AccountPage> {
        Err(DirectoryError::transport("ListAccounts", REASON))
    }

    async fn create_account(&self, _name: &str, _email: &str) -> DirectoryResult<CreationTicket> {
        Err(DirectoryError::transport("CreateAccount", REASON))
    }

    async fn get_creation_status(&self, _ticket_id: &str) -> DirectoryResult<CreationStatus> {
        Err(DirectoryError::transport("DescribeCreateAccountStatus", REASON))
    }

    async fn list_parents(&self, _account_id: &str) -> DirectoryResult<Vec<String>> {
        Err(DirectoryError::transport("ListParents", REASON))
    }

    async fn move_account(
        &self,
        _account_id: &str,
        _from_unit_id: Option<&str>,
        _to_unit_id: &str,
    ) -> DirectoryResult<()> {
        Err(DirectoryError::transport("MoveAccount", REASON))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_every_call_is_refused() {
        let directory = OfflineDirectory;

        let err = directory.list_accounts(None).await.unwrap_err();
        assert_eq!(err.operation(), "ListAccounts");
        assert!(directory.move_account("1", None, "ou-x").await.is_err());
    }
}
