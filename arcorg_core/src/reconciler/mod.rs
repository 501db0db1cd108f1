//! Account lifecycle state machine
//!
//! Drives one managed account through create, read, update, destroy and
//! import. Every transition re-fetches the account by email instead of
//! trusting stored state, which is what makes console edits made behind our
//! back detectable.
//!
//! Email is assumed to be unique within the organization. The directory does
//! not enforce this; with `strict_email_uniqueness` the reconciler checks it
//! and refuses to pick between duplicates.

pub mod types;

use crate::ReconcilerConfig;
use crate::directory::{Account, AccountDirectory, DirectoryService};
use crate::error::{ErrorCategory, LifecycleError, Result};
use crate::identity::ExternalId;
use crate::mover::UnitMover;
use crate::waiter::{Clock, CreationWaiter, TokioClock};
use log::{debug, info, warn};
use std::sync::Arc;
use std::time::Instant;

pub use types::{
    CreateOutcome, DesiredPlacement, ImportedAccount, LifecycleState, ManagedResourceRecord,
    ReadOutcome, Warning,
};

/// Orchestrates lookups, creation, polling and unit moves for one account at a time
#[derive(Clone)]
pub struct AccountReconciler {
    directory: AccountDirectory,
    mover: UnitMover,
    waiter: CreationWaiter,
    clock: Arc<dyn Clock>,
    config: ReconcilerConfig,
}

impl AccountReconciler {
    /// Create a reconciler over an injected directory service and clock
    pub fn new(
        service: Arc<dyn DirectoryService>,
        clock: Arc<dyn Clock>,
        config: ReconcilerConfig,
    ) -> Self {
        let directory = AccountDirectory::new(service.clone());
        let mover = UnitMover::new(service);
        let waiter = CreationWaiter::new(directory.clone(), clock.clone(), config.wait);

        Self {
            directory,
            mover,
            waiter,
            clock,
            config,
        }
    }

    /// Create a reconciler with the real clock
    pub fn with_config(service: Arc<dyn DirectoryService>, config: ReconcilerConfig) -> Self {
        Self::new(service, Arc::new(TokioClock), config)
    }

    pub fn config(&self) -> &ReconcilerConfig {
        &self.config
    }

    /// Deadline for an operation starting now, if a timeout is configured
    pub fn operation_deadline(&self) -> Option<Instant> {
        self.config.deadline_from(self.clock.now())
    }

    /// Create or adopt the account described by `desired`
    ///
    /// Returns the record to persist on success. `Skipped` means an account
    /// with this email already sits in some unit other than the closed one;
    /// it is left alone and nothing is persisted. Any error means no directory
    /// state was committed by this call beyond what the error reports.
    pub async fn create(
        &self,
        desired: &DesiredPlacement,
        deadline: Option<Instant>,
    ) -> Result<CreateOutcome> {
        desired.validate()?;
        debug!(
            "{} -> {} for {}",
            LifecycleState::Absent,
            LifecycleState::Reconciling,
            desired.email
        );

        let outcome = match self.lookup(&desired.email).await? {
            Some(account) => self.reconcile_existing(account, desired).await,
            None => self.create_new(desired, deadline).await,
        };

        match &outcome {
            Ok(outcome) => info!("{}: {}", desired.email, outcome.state()),
            Err(e) if e.category() == ErrorCategory::Conflict => {
                warn!("{}: {} ({e})", desired.email, LifecycleState::Conflict)
            }
            Err(e) => warn!("{}: create aborted: {e}", desired.email),
        }
        outcome
    }

    async fn lookup(&self, email: &str) -> Result<Option<Account>> {
        if !self.config.strict_email_uniqueness {
            return Ok(self.directory.find_by_email(email).await?);
        }

        let mut matches = self.directory.find_all_by_email(email).await?;
        if matches.len() > 1 {
            return Err(LifecycleError::DuplicateEmail {
                email: email.to_string(),
                account_ids: matches.into_iter().map(|a| a.id).collect(),
            }
            .into());
        }
        Ok(matches.pop())
    }

    async fn reconcile_existing(
        &self,
        account: Account,
        desired: &DesiredPlacement,
    ) -> Result<CreateOutcome> {
        debug!(
            "Found account {} for {} with status {}",
            account.id, desired.email, account.status
        );

        if account.status.is_suspended() {
            return Err(LifecycleError::pending_closure(&account.id, &account.email).into());
        }

        let parents = self.directory.parents_of(&account.id).await?;
        let parent = match parents.as_slice() {
            [single] => single,
            _ => {
                return Err(LifecycleError::parent_cardinality(&account.id, parents.len()).into());
            }
        };

        if *parent != desired.closed_unit_id {
            warn!(
                "Account {} for {} already sits in {parent}; leaving it untouched",
                account.id, desired.email
            );
            return Ok(CreateOutcome::Skipped(Warning {
                summary: "An account was already found in an organizational unit.".to_string(),
                detail: format!(
                    "Account {} with email {} sits in {parent}. If this account was not part of \
                     an earlier timed-out create, you may have duplicate account emails.",
                    account.id, desired.email
                ),
            }));
        }

        info!(
            "Adopting quarantined account {} from {}",
            account.id, desired.closed_unit_id
        );
        self.mover
            .relocate(
                &account.id,
                Some(desired.closed_unit_id.as_str()),
                &desired.active_unit_id,
            )
            .await?;

        Ok(CreateOutcome::Adopted(ManagedResourceRecord::placed(
            &account.id,
            desired,
        )))
    }

    async fn create_new(
        &self,
        desired: &DesiredPlacement,
        deadline: Option<Instant>,
    ) -> Result<CreateOutcome> {
        let ticket = self.directory.create(&desired.name, &desired.email).await?;
        let account_id = self
            .waiter
            .wait(&ticket.id, deadline)
            .await?
            .into_account_id(&ticket.id)?;

        info!("Account {account_id} created for {}", desired.email);
        self.mover
            .relocate(&account_id, None, &desired.active_unit_id)
            .await?;

        Ok(CreateOutcome::Created(ManagedResourceRecord::placed(
            &account_id,
            desired,
        )))
    }

    /// Refresh a record from directory truth
    ///
    /// Only identity is refreshed; placement is not re-verified. An account
    /// that can no longer be found by email is reported as `Gone`.
    pub async fn read(&self, record: &ManagedResourceRecord) -> Result<ReadOutcome> {
        let Some(account) = self.directory.find_by_email(&record.email).await? else {
            info!(
                "Account {} ({}) no longer found; dropping record",
                record.account_id, record.email
            );
            return Ok(ReadOutcome::Gone);
        };

        if account.id != record.account_id {
            warn!(
                "Email {} now resolves to account {} (recorded {})",
                record.email, account.id, record.account_id
            );
        }

        Ok(ReadOutcome::Present(ManagedResourceRecord {
            id: ExternalId::from_account_id(&account.id),
            account_id: account.id,
            ..record.clone()
        }))
    }

    /// Check a declared placement against the stored record
    ///
    /// No field can change in place. Makes no directory call.
    pub fn update(
        &self,
        stored: &ManagedResourceRecord,
        desired: &DesiredPlacement,
    ) -> Result<ManagedResourceRecord> {
        let fields = [
            ("email", &stored.email, &desired.email),
            ("name", &stored.name, &desired.name),
            (
                "active_unit_id",
                &stored.active_unit_id,
                &desired.active_unit_id,
            ),
            (
                "closed_unit_id",
                &stored.closed_unit_id,
                &desired.closed_unit_id,
            ),
        ];

        if let Some((field, before, after)) = fields.into_iter().find(|(_, a, b)| a != b) {
            return Err(LifecycleError::immutable_field(field, before, after).into());
        }

        Ok(stored.clone())
    }

    /// Quarantine the account by moving it into the closed unit
    ///
    /// On error the caller must keep the record: the account's placement is
    /// uncertain and the operator has to reconcile it by hand.
    pub async fn destroy(&self, record: &ManagedResourceRecord) -> Result<LifecycleState> {
        self.mover
            .relocate(
                &record.account_id,
                Some(record.active_unit_id.as_str()),
                &record.closed_unit_id,
            )
            .await?;

        info!(
            "Account {} moved to {}",
            record.account_id, record.closed_unit_id
        );
        Ok(LifecycleState::Quarantined)
    }

    /// Accept an external id for import
    ///
    /// Only the prefix is checked; the embedded account id is echoed back and
    /// validated by the next read.
    pub fn import(&self, external_id: &str) -> Result<ImportedAccount> {
        let id = ExternalId::parse(external_id)?;
        let account_id = id.account_id().to_string();
        debug!("Importing {id} (account {account_id})");
        Ok(ImportedAccount { id, account_id })
    }
}
