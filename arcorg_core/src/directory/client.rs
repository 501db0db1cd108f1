//! Account lookup and creation on top of the directory boundary

use crate::directory::DirectoryService;
use crate::directory::types::{Account, CreationStatus, CreationTicket};
use crate::error::DirectoryResult;
use log::{debug, trace};
use std::sync::Arc;

/// Stateless client for account lookup, creation and placement queries
///
/// Email is treated as a natural key within one organization. The directory
/// does not enforce uniqueness; `find_by_email` returns the first match and
/// `find_all_by_email` lets callers detect duplicates.
#[derive(Clone)]
pub struct AccountDirectory {
    service: Arc<dyn DirectoryService>,
}

impl AccountDirectory {
    /// Create a client over a shared directory service
    pub fn new(service: Arc<dyn DirectoryService>) -> Self {
        Self { service }
    }

    /// Underlying directory service
    pub fn service(&self) -> &Arc<dyn DirectoryService> {
        &self.service
    }

    /// Find the first account whose email matches exactly
    ///
    /// Walks the listing page by page and stops at the first match. Returns
    /// `Ok(None)` only once the last page (no continuation token) is consumed.
    pub async fn find_by_email(&self, email: &str) -> DirectoryResult<Option<Account>> {
        debug!("Looking up account by email: {email}");
        self.find_first(|account| account.email == email).await
    }

    /// Find an account by its provider-assigned id
    pub async fn find_by_id(&self, account_id: &str) -> DirectoryResult<Option<Account>> {
        debug!("Looking up account by id: {account_id}");
        self.find_first(|account| account.id == account_id).await
    }

    /// Collect every account whose email matches exactly
    ///
    /// Always drains the full listing.
    pub async fn find_all_by_email(&self, email: &str) -> DirectoryResult<Vec<Account>> {
        debug!("Collecting all accounts with email: {email}");

        let mut matches = Vec::new();
        let mut cursor: Option<String> = None;
        let mut pages = 0usize;

        loop {
            let page = self.service.list_accounts(cursor.as_deref()).await?;
            pages += 1;
            matches.extend(page.accounts.into_iter().filter(|a| a.email == email));

            match page.next_cursor {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }

        debug!("Scanned {pages} page(s), {} match(es)", matches.len());
        Ok(matches)
    }

    async fn find_first<F>(&self, predicate: F) -> DirectoryResult<Option<Account>>
    where
        F: Fn(&Account) -> bool,
    {
        let mut cursor: Option<String> = None;
        let mut pages = 0usize;

        loop {
            let page = self.service.list_accounts(cursor.as_deref()).await?;
            pages += 1;
            trace!("Page {pages}: {} account(s)", page.accounts.len());

            if let Some(account) = page.accounts.into_iter().find(|a| predicate(a)) {
                debug!("Match {} found on page {pages}", account.id);
                return Ok(Some(account));
            }

            match page.next_cursor {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }

        debug!("No match after {pages} page(s)");
        Ok(None)
    }

    /// Submit an account creation request
    pub async fn create(&self, name: &str, email: &str) -> DirectoryResult<CreationTicket> {
        debug!("Submitting creation request for {email} ({name})");
        let ticket = self.service.create_account(name, email).await?;
        debug!("Creation request accepted: {}", ticket.id);
        Ok(ticket)
    }

    /// Query a creation request
    pub async fn get_creation_status(&self, ticket_id: &str) -> DirectoryResult<CreationStatus> {
        self.service.get_creation_status(ticket_id).await
    }

    /// Organizational units directly containing the account
    pub async fn parents_of(&self, account_id: &str) -> DirectoryResult<Vec<String>> {
        self.service.list_parents(account_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::types::{AccountPage, AccountStatus};
    use crate::error::DirectoryError;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Serves fixed pages keyed by position; cursor "p<N>" points at page N
    struct PagedDirectory {
        pages: Vec<Vec<Account>>,
        requested: Mutex<Vec<Option<String>>>,
    }

    impl PagedDirectory {
        fn new(pages: Vec<Vec<Account>>) -> Self {
            Self {
                pages,
                requested: Mutex::new(Vec::new()),
            }
        }

        fn requested(&self) -> Vec<Option<String>> {
            self.requested.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl DirectoryService for PagedDirectory {
        async fn list_accounts(&self, cursor: Option<&str>) -> DirectoryResult<AccountPage> {
            self.requested
                .lock()
                .unwrap()
                .push(cursor.map(str::to_string));
            let index = match cursor {
                None => 0,
                Some(c) => c.trim_start_matches('p').parse::<usize>().unwrap(),
            };
            let accounts = self.pages[index].clone();
            if index + 1 < self.pages.len() {
                Ok(AccountPage::with_cursor(accounts, format!("p{}", index + 1)))
            } else {
                Ok(AccountPage::last(accounts))
            }
        }

        async fn create_account(&self, _: &str, _: &str) -> DirectoryResult<CreationTicket> {
            Err(DirectoryError::transport("CreateAccount", "unsupported"))
        }

        async fn get_creation_status(&self, _: &str) -> DirectoryResult<CreationStatus> {
            Err(DirectoryError::transport("DescribeCreateAccountStatus", "unsupported"))
        }

        async fn list_parents(&self, _: &str) -> DirectoryResult<Vec<String>> {
            Ok(vec![])
        }

        async fn move_account(&self, _: &str, _: Option<&str>, _: &str) -> DirectoryResult<()> {
            Ok(())
        }
    }

    fn account(id: &str, email: &str) -> Account {
        Account {
            id: id.to_string(),
            email: email.to_string(),
            name: id.to_string(),
            status: AccountStatus::Active,
            arn: None,
            joined_at: None,
        }
    }

    #[tokio::test]
    async fn test_find_by_email_stops_at_first_match() {
        let service = Arc::new(PagedDirectory::new(vec![
            vec![account("1", "a@x.io")],
            vec![account("2", "b@x.io")],
            vec![account("3", "c@x.io")],
        ]));
        let directory = AccountDirectory::new(service.clone());

        let found = directory.find_by_email("b@x.io").await.unwrap().unwrap();

        assert_eq!(found.id, "2");
        assert_eq!(service.requested(), vec![None, Some("p1".to_string())]);
    }

    #[tokio::test]
    async fn test_find_by_email_is_exact_match() {
        let service = Arc::new(PagedDirectory::new(vec![vec![account("1", "Ops@x.io")]]));
        let directory = AccountDirectory::new(service);

        assert!(directory.find_by_email("ops@x.io").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_find_all_by_email_drains_every_page() {
        let service = Arc::new(PagedDirectory::new(vec![
            vec![account("1", "dup@x.io")],
            vec![account("2", "other@x.io")],
            vec![account("3", "dup@x.io")],
        ]));
        let directory = AccountDirectory::new(service.clone());

        let found = directory.find_all_by_email("dup@x.io").await.unwrap();

        assert_eq!(
            found.iter().map(|a| a.id.as_str()).collect::<Vec<_>>(),
            vec!["1", "3"]
        );
        assert_eq!(service.requested().len(), 3);
    }

    #[tokio::test]
    async fn test_find_by_id() {
        let service = Arc::new(PagedDirectory::new(vec![
            vec![account("1", "a@x.io")],
            vec![account("2", "b@x.io")],
        ]));
        let directory = AccountDirectory::new(service);

        assert_eq!(
            directory.find_by_id("2").await.unwrap().map(|a| a.email),
            Some("b@x.io".to_string())
        );
        assert!(directory.find_by_id("9").await.unwrap().is_none());
    }
}
