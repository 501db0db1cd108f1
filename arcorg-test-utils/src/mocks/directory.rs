//! In-memory directory service for testing

use arcorg_core::directory::{
    Account, AccountPage, AccountStatus, CreationStatus, CreationTicket, DirectoryService,
};
use arcorg_core::error::{DirectoryError, DirectoryResult};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

/// Unit that freshly created accounts are placed under
pub const ROOT_UNIT_ID: &str = "r-root";

/// Directory operations, for failure injection and call counting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MockOperation {
    ListAccounts,
    CreateAccount,
    GetCreationStatus,
    ListParents,
    MoveAccount,
}

/// One recorded call against the mock
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirectoryCall {
    ListAccounts {
        cursor: Option<String>,
    },
    CreateAccount {
        name: String,
        email: String,
    },
    GetCreationStatus {
        ticket_id: String,
    },
    ListParents {
        account_id: String,
    },
    MoveAccount {
        account_id: String,
        from_unit_id: Option<String>,
        to_unit_id: String,
    },
}

impl DirectoryCall {
    pub fn operation(&self) -> MockOperation {
        match self {
            Self::ListAccounts { .. } => MockOperation::ListAccounts,
            Self::CreateAccount { .. } => MockOperation::CreateAccount,
            Self::GetCreationStatus { .. } => MockOperation::GetCreationStatus,
            Self::ListParents { .. } => MockOperation::ListParents,
            Self::MoveAccount { .. } => MockOperation::MoveAccount,
        }
    }

    /// Whether this call changes directory state
    pub fn is_mutating(&self) -> bool {
        matches!(
            self,
            Self::CreateAccount { .. } | Self::MoveAccount { .. }
        )
    }
}

/// Scripted answer to one creation status poll
#[derive(Debug, Clone)]
pub enum ScriptedPoll {
    Pending,
    /// Materialize the account under the root unit and report success
    Succeed,
    Fail(Option<String>),
    /// Answer without any state
    NoState,
    Error(DirectoryError),
}

#[derive(Debug)]
struct MockAccount {
    account: Account,
    parents: Vec<String>,
}

#[derive(Debug)]
struct Ticket {
    name: String,
    email: String,
    script: VecDeque<ScriptedPoll>,
    account_id: Option<String>,
}

#[derive(Debug)]
struct MockState {
    accounts: Vec<MockAccount>,
    page_size: usize,
    tickets: HashMap<String, Ticket>,
    creation_script: Vec<ScriptedPoll>,
    next_account_seq: u64,
    next_ticket_seq: u64,
    queued_failures: HashMap<MockOperation, VecDeque<DirectoryError>>,
    persistent_failures: HashMap<MockOperation, DirectoryError>,
    calls: Vec<DirectoryCall>,
}

impl Default for MockState {
    fn default() -> Self {
        Self {
            accounts: Vec::new(),
            page_size: 20,
            tickets: HashMap::new(),
            creation_script: Vec::new(),
            next_account_seq: 1,
            next_ticket_seq: 1,
            queued_failures: HashMap::new(),
            persistent_failures: HashMap::new(),
            calls: Vec::new(),
        }
    }
}

impl MockState {
    fn record(&mut self, call: DirectoryCall) -> DirectoryResult<()> {
        let operation = call.operation();
        self.calls.push(call);

        if let Some(error) = self
            .queued_failures
            .get_mut(&operation)
            .and_then(VecDeque::pop_front)
        {
            return Err(error);
        }
        if let Some(error) = self.persistent_failures.get(&operation) {
            return Err(error.clone());
        }
        Ok(())
    }

    fn find_mut(&mut self, account_id: &str) -> Option<&mut MockAccount> {
        self.accounts
            .iter_mut()
            .find(|entry| entry.account.id == account_id)
    }

    fn materialize(&mut self, ticket_id: &str) -> String {
        let seq = self.next_account_seq;
        self.next_account_seq += 1;
        let account_id = format!("{:012}", 900_000_000_000 + seq);

        let ticket = self
            .tickets
            .get_mut(ticket_id)
            .expect("ticket exists while materializing");
        ticket.account_id = Some(account_id.clone());
        let account = Account {
            id: account_id.clone(),
            email: ticket.email.clone(),
            name: ticket.name.clone(),
            status: AccountStatus::Active,
            arn: None,
            joined_at: None,
        };

        self.accounts.push(MockAccount {
            account,
            parents: vec![ROOT_UNIT_ID.to_string()],
        });
        account_id
    }
}

/// In-memory directory service
///
/// Accounts are listed in insertion order, `page_size` per page. Creation
/// requests follow the configured script, one entry per status poll; once the
/// script runs out the request succeeds. Every call is recorded.
///
/// # Examples
///
/// ```rust
/// use arcorg_test_utils::{AccountBuilder, MockDirectory};
///
/// let directory = MockDirectory::new();
/// directory.insert_account(AccountBuilder::new("111122223333").build(), "ou-closed");
/// assert_eq!(directory.parents("111122223333"), vec!["ou-closed".to_string()]);
/// ```
#[derive(Clone, Default)]
pub struct MockDirectory {
    state: Arc<Mutex<MockState>>,
}

impl MockDirectory {
    /// Create an empty directory
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty directory listing `page_size` accounts per page
    pub fn with_page_size(page_size: usize) -> Self {
        let directory = Self::new();
        directory.state.lock().unwrap().page_size = page_size.max(1);
        directory
    }

    /// Add an existing account under a single parent unit
    pub fn insert_account(&self, account: Account, parent_unit_id: &str) {
        self.insert_account_with_parents(account, vec![parent_unit_id.to_string()]);
    }

    /// Add an existing account under any number of parents
    pub fn insert_account_with_parents(&self, account: Account, parents: Vec<String>) {
        self.state
            .lock()
            .unwrap()
            .accounts
            .push(MockAccount { account, parents });
    }

    /// Remove an account, as if it was closed outside our control
    pub fn remove_account(&self, account_id: &str) {
        self.state
            .lock()
            .unwrap()
            .accounts
            .retain(|entry| entry.account.id != account_id);
    }

    /// Change the status of an account
    pub fn set_status(&self, account_id: &str, status: AccountStatus) {
        if let Some(entry) = self.state.lock().unwrap().find_mut(account_id) {
            entry.account.status = status;
        }
    }

    /// Move an account behind the reconciler's back
    pub fn set_parent(&self, account_id: &str, parent_unit_id: &str) {
        if let Some(entry) = self.state.lock().unwrap().find_mut(account_id) {
            entry.parents = vec![parent_unit_id.to_string()];
        }
    }

    /// Script the status polls of every future creation request
    pub fn set_creation_script(&self, script: Vec<ScriptedPoll>) {
        self.state.lock().unwrap().creation_script = script;
    }

    /// Fail the next call of `operation` with `error`
    pub fn fail_next(&self, operation: MockOperation, error: DirectoryError) {
        self.state
            .lock()
            .unwrap()
            .queued_failures
            .entry(operation)
            .or_default()
            .push_back(error);
    }

    /// Fail every call of `operation` with `error`
    pub fn fail_always(&self, operation: MockOperation, error: DirectoryError) {
        self.state
            .lock()
            .unwrap()
            .persistent_failures
            .insert(operation, error);
    }

    /// Stop failing `operation`
    pub fn clear_failures(&self, operation: MockOperation) {
        let mut state = self.state.lock().unwrap();
        state.queued_failures.remove(&operation);
        state.persistent_failures.remove(&operation);
    }

    /// Current snapshot of an account
    pub fn account(&self, account_id: &str) -> Option<Account> {
        self.state
            .lock()
            .unwrap()
            .accounts
            .iter()
            .find(|entry| entry.account.id == account_id)
            .map(|entry| entry.account.clone())
    }

    /// Current parents of an account
    pub fn parents(&self, account_id: &str) -> Vec<String> {
        self.state
            .lock()
            .unwrap()
            .accounts
            .iter()
            .find(|entry| entry.account.id == account_id)
            .map(|entry| entry.parents.clone())
            .unwrap_or_default()
    }

    /// Number of accounts in the directory
    pub fn account_count(&self) -> usize {
        self.state.lock().unwrap().accounts.len()
    }

    /// Every call made so far
    pub fn calls(&self) -> Vec<DirectoryCall> {
        self.state.lock().unwrap().calls.clone()
    }

    /// Calls of a single operation
    pub fn calls_of(&self, operation: MockOperation) -> Vec<DirectoryCall> {
        self.calls()
            .into_iter()
            .filter(|call| call.operation() == operation)
            .collect()
    }

    /// Number of calls of a single operation
    pub fn call_count(&self, operation: MockOperation) -> usize {
        self.calls_of(operation).len()
    }

    /// Calls that changed directory state
    pub fn mutating_calls(&self) -> Vec<DirectoryCall> {
        self.calls()
            .into_iter()
            .filter(DirectoryCall::is_mutating)
            .collect()
    }

    /// Forget recorded calls
    pub fn reset_calls(&self) {
        self.state.lock().unwrap().calls.clear();
    }
}

#[async_trait]
impl DirectoryService for MockDirectory {
    async fn list_accounts(&self, cursor: Option<&str>) -> DirectoryResult<AccountPage> {
        let mut state = self.state.lock().unwrap();
        state.record(DirectoryCall::ListAccounts {
            cursor: cursor.map(str::to_string),
        })?;

        let start = match cursor {
            None => 0,
            Some(token) => token
                .strip_prefix("page-")
                .and_then(|n| n.parse::<usize>().ok())
                .ok_or_else(|| {
                    DirectoryError::rejected(
                        "ListAccounts",
                        "InvalidInputException",
                        format!("bad token {token}"),
                    )
                })?,
        };

        let end = (start + state.page_size).min(state.accounts.len());
        let accounts = state
            .accounts
            .get(start..end)
            .unwrap_or_default()
            .iter()
            .map(|entry| entry.account.clone())
            .collect();

        Ok(if end < state.accounts.len() {
            AccountPage::with_cursor(accounts, format!("page-{end}"))
        } else {
            AccountPage::last(accounts)
        })
    }

    async fn create_account(&self, name: &str, email: &str) -> DirectoryResult<CreationTicket> {
        let mut state = self.state.lock().unwrap();
        state.record(DirectoryCall::CreateAccount {
            name: name.to_string(),
            email: email.to_string(),
        })?;

        let id = format!("car-{}", state.next_ticket_seq);
        state.next_ticket_seq += 1;
        let script = state.creation_script.iter().cloned().collect();
        state.tickets.insert(
            id.clone(),
            Ticket {
                name: name.to_string(),
                email: email.to_string(),
                script,
                account_id: None,
            },
        );

        Ok(CreationTicket { id })
    }

    async fn get_creation_status(&self, ticket_id: &str) -> DirectoryResult<CreationStatus> {
        let mut state = self.state.lock().unwrap();
        state.record(DirectoryCall::GetCreationStatus {
            ticket_id: ticket_id.to_string(),
        })?;

        let ticket = state.tickets.get_mut(ticket_id).ok_or_else(|| {
            DirectoryError::rejected(
                "DescribeCreateAccountStatus",
                "CreateAccountStatusNotFoundException",
                format!("unknown request {ticket_id}"),
            )
        })?;

        if let Some(account_id) = &ticket.account_id {
            return Ok(CreationStatus::succeeded(account_id.clone()));
        }

        match ticket.script.pop_front().unwrap_or(ScriptedPoll::Succeed) {
            ScriptedPoll::Pending => Ok(CreationStatus::pending()),
            ScriptedPoll::Fail(reason) => Ok(CreationStatus::failed(reason)),
            ScriptedPoll::NoState => Ok(CreationStatus {
                state: None,
                account_id: None,
                failure_reason: None,
            }),
            ScriptedPoll::Error(error) => Err(error),
            ScriptedPoll::Succeed => {
                let account_id = state.materialize(ticket_id);
                Ok(CreationStatus::succeeded(account_id))
            }
        }
    }

    async fn list_parents(&self, account_id: &str) -> DirectoryResult<Vec<String>> {
        let mut state = self.state.lock().unwrap();
        state.record(DirectoryCall::ListParents {
            account_id: account_id.to_string(),
        })?;

        state
            .find_mut(account_id)
            .map(|entry| entry.parents.clone())
            .ok_or_else(|| {
                DirectoryError::rejected(
                    "ListParents",
                    "ChildNotFoundException",
                    format!("unknown account {account_id}"),
                )
            })
    }

    async fn move_account(
        &self,
        account_id: &str,
        from_unit_id: Option<&str>,
        to_unit_id: &str,
    ) -> DirectoryResult<()> {
        let mut state = self.state.lock().unwrap();
        state.record(DirectoryCall::MoveAccount {
            account_id: account_id.to_string(),
            from_unit_id: from_unit_id.map(str::to_string),
            to_unit_id: to_unit_id.to_string(),
        })?;

        let entry = state.find_mut(account_id).ok_or_else(|| {
            DirectoryError::rejected(
                "MoveAccount",
                "AccountNotFoundException",
                format!("unknown account {account_id}"),
            )
        })?;

        let current = match entry.parents.as_slice() {
            [single] => single.clone(),
            _ => {
                return Err(DirectoryError::rejected(
                    "MoveAccount",
                    "SourceParentNotFoundException",
                    "account does not have a single parent",
                ));
            }
        };

        if let Some(from) = from_unit_id
            && from != current
        {
            return Err(DirectoryError::rejected(
                "MoveAccount",
                "SourceParentNotFoundException",
                format!("account {account_id} is not in {from}"),
            ));
        }

        entry.parents = vec![to_unit_id.to_string()];
        Ok(())
    }
}
