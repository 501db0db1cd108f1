//! AWS Organizations backed directory service
//!
//! Uses the official aws-sdk-organizations crate with the default credential
//! chain (environment, profile, IMDS, ...).

use crate::DirectoryConfig;
use crate::directory::DirectoryService;
use crate::directory::types::{
    Account, AccountPage, AccountStatus, CreationState, CreationStatus, CreationTicket,
};
use crate::error::{DirectoryError, DirectoryResult};
use async_trait::async_trait;
use aws_sdk_organizations::Client;
use aws_sdk_organizations::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_organizations::types::{self as orgs, CreateAccountState};
use log::{debug, info, warn};

const THROTTLING_CODE: &str = "TooManyRequestsException";

/// Directory service talking to AWS Organizations
#[derive(Debug, Clone)]
pub struct OrganizationsDirectory {
    client: Client,
}

impl OrganizationsDirectory {
    /// Build a client from the ambient AWS configuration plus overrides
    pub async fn from_config(config: &DirectoryConfig) -> Self {
        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest());

        if let Some(region) = &config.region {
            loader = loader.region(aws_config::Region::new(region.clone()));
        }
        if let Some(profile) = &config.profile {
            loader = loader.profile_name(profile);
        }
        if let Some(endpoint) = &config.endpoint_url {
            loader = loader.endpoint_url(endpoint);
        }

        let sdk_config = loader.load().await;
        info!(
            "AWS Organizations directory initialized (region: {:?}, profile: {:?})",
            sdk_config.region().map(|r| r.to_string()),
            config.profile
        );

        Self::new(Client::new(&sdk_config))
    }

    /// Wrap an existing SDK client
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    async fn current_parent(&self, account_id: &str) -> DirectoryResult<String> {
        let parents = self.list_parents(account_id).await?;
        match parents.as_slice() {
            [single] => Ok(single.clone()),
            _ => Err(DirectoryError::invalid_response(
                "ListParents",
                format!(
                    "account {account_id} has {} parents, cannot infer move source",
                    parents.len()
                ),
            )),
        }
    }
}

fn map_sdk_error<E, R>(operation: &str, err: SdkError<E, R>) -> DirectoryError
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
    R: std::fmt::Debug,
{
    match &err {
        SdkError::ServiceError(service) => {
            let inner = service.err();
            let code = inner.code().unwrap_or("Unknown");
            if code == THROTTLING_CODE {
                return DirectoryError::throttled(operation);
            }
            DirectoryError::rejected(operation, code, inner.message().unwrap_or_default())
        }
        _ => DirectoryError::transport(operation, DisplayErrorContext(&err).to_string()),
    }
}

fn convert_status(status: Option<&orgs::AccountStatus>) -> AccountStatus {
    match status.map(|s| s.as_str()) {
        Some("ACTIVE") => AccountStatus::Active,
        // Both spellings mean the account is on its way out
        Some("SUSPENDED") | Some("PENDING_CLOSURE") => AccountStatus::Suspended,
        Some(other) => AccountStatus::Other(other.to_string()),
        None => AccountStatus::Other("UNKNOWN".to_string()),
    }
}

fn convert_account(account: &orgs::Account) -> DirectoryResult<Account> {
    let id = account
        .id()
        .ok_or_else(|| DirectoryError::invalid_response("ListAccounts", "account without id"))?;

    Ok(Account {
        id: id.to_string(),
        email: account.email().unwrap_or_default().to_string(),
        name: account.name().unwrap_or_default().to_string(),
        status: convert_status(account.status()),
        arn: account.arn().map(str::to_string),
        joined_at: account
            .joined_timestamp()
            .and_then(|ts| chrono::DateTime::from_timestamp(ts.secs(), ts.subsec_nanos())),
    })
}

fn convert_creation_status(status: &orgs::CreateAccountStatus) -> CreationStatus {
    let state = status.state().and_then(|state| match state {
        CreateAccountState::Succeeded => Some(CreationState::Succeeded),
        CreateAccountState::Failed => Some(CreationState::Failed),
        CreateAccountState::InProgress => Some(CreationState::Pending),
        other => {
            warn!("Unrecognized creation state: {}", other.as_str());
            None
        }
    });

    CreationStatus {
        state,
        account_id: status.account_id().map(str::to_string),
        failure_reason: status.failure_reason().map(|r| r.as_str().to_string()),
    }
}

#[async_trait]
impl DirectoryService for OrganizationsDirectory {
    async fn list_accounts(&self, cursor: Option<&str>) -> DirectoryResult<AccountPage> {
        let output = self
            .client
            .list_accounts()
            .set_next_token(cursor.map(str::to_string))
            .send()
            .await
            .map_err(|e| map_sdk_error("ListAccounts", e))?;

        let accounts = output
            .accounts()
            .iter()
            .map(convert_account)
            .collect::<DirectoryResult<Vec<_>>>()?;

        Ok(AccountPage {
            accounts,
            next_cursor: output.next_token().map(str::to_string),
        })
    }

    async fn create_account(&self, name: &str, email: &str) -> DirectoryResult<CreationTicket> {
        let output = self
            .client
            .create_account()
            .account_name(name)
            .email(email)
            .send()
            .await
            .map_err(|e| map_sdk_error("CreateAccount", e))?;

        let id = output
            .create_account_status()
            .and_then(|status| status.id())
            .ok_or_else(|| {
                DirectoryError::invalid_response("CreateAccount", "response without request id")
            })?;

        Ok(CreationTicket { id: id.to_string() })
    }

    async fn get_creation_status(&self, ticket_id: &str) -> DirectoryResult<CreationStatus> {
        let output = self
            .client
            .describe_create_account_status()
            .create_account_request_id(ticket_id)
            .send()
            .await
            .map_err(|e| map_sdk_error("DescribeCreateAccountStatus", e))?;

        Ok(output
            .create_account_status()
            .map(convert_creation_status)
            .unwrap_or(CreationStatus {
                state: None,
                account_id: None,
                failure_reason: None,
            }))
    }

    async fn list_parents(&self, account_id: &str) -> DirectoryResult<Vec<String>> {
        let mut parents = Vec::new();
        let mut next_token: Option<String> = None;

        loop {
            let output = self
                .client
                .list_parents()
                .child_id(account_id)
                .set_next_token(next_token.take())
                .send()
                .await
                .map_err(|e| map_sdk_error("ListParents", e))?;

            for parent in output.parents() {
                let id = parent.id().ok_or_else(|| {
                    DirectoryError::invalid_response("ListParents", "parent without id")
                })?;
                parents.push(id.to_string());
            }

            match output.next_token() {
                Some(token) => next_token = Some(token.to_string()),
                None => break,
            }
        }

        Ok(parents)
    }

    async fn move_account(
        &self,
        account_id: &str,
        from_unit_id: Option<&str>,
        to_unit_id: &str,
    ) -> DirectoryResult<()> {
        // MoveAccount always needs a source; a new account sits under the root
        let source = match from_unit_id {
            Some(unit) => unit.to_string(),
            None => {
                let parent = self.current_parent(account_id).await?;
                debug!("Resolved implicit parent of {account_id}: {parent}");
                parent
            }
        };

        self.client
            .move_account()
            .account_id(account_id)
            .source_parent_id(source)
            .destination_parent_id(to_unit_id)
            .send()
            .await
            .map_err(|e| map_sdk_error("MoveAccount", e))?;

        Ok(())
    }
}
