//! Manifest-versus-state reconciliation
//!
//! Coordinates the account reconciler, the manifest and the state store for
//! the plan, apply, refresh, destroy and import commands. Accounts are
//! reconciled concurrently up to the configured parallelism; state is saved
//! after each finished account so an interrupted run keeps what it did.
//!
//! `apply` quarantines undeclared records before converging declared ones,
//! and a record whose key was renamed in the manifest follows its email to
//! the new key instead of being quarantined.

use crate::error::{CliError, ErrorContext};
use crate::manifest::Manifest;
use crate::state::{StateFile, StateStore};
use anyhow::{Context, Result};
use arcorg_core::{
    AccountReconciler, CreateOutcome, DesiredPlacement, ManagedResourceRecord, ReadOutcome,
    Warning,
};
use log::{debug, info, warn};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::Semaphore;

/// What `apply` would do for one resource key
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum PlannedAction {
    /// Not in state; create or adopt
    Create,
    /// In state and matching the manifest
    Keep,
    /// In state with an immutable field changed; apply will refuse
    Replace {
        field: String,
        stored: String,
        desired: String,
    },
    /// Stored under another key with the same email; the record moves over
    Rename { from: String },
    /// In state but no longer declared; quarantine
    Destroy,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlanEntry {
    pub key: String,
    #[serde(flatten)]
    pub action: PlannedAction,
}

/// Offline comparison of manifest and state
#[derive(Debug, Clone, Default, Serialize)]
pub struct Plan {
    pub entries: Vec<PlanEntry>,
}

impl Plan {
    pub fn has_changes(&self) -> bool {
        self.entries
            .iter()
            .any(|entry| entry.action != PlannedAction::Keep)
    }

    pub fn count(&self, matches: impl Fn(&PlannedAction) -> bool) -> usize {
        self.entries.iter().filter(|e| matches(&e.action)).count()
    }
}

/// Effect of a command on one resource
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceChange {
    Created(ManagedResourceRecord),
    Adopted(ManagedResourceRecord),
    Unchanged(ManagedResourceRecord),
    /// An account with the declared email sits outside the managed units
    Skipped(Warning),
    Refreshed(ManagedResourceRecord),
    Imported(ManagedResourceRecord),
    /// The account can no longer be found; its record was dropped
    Gone,
    Quarantined,
}

impl ResourceChange {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Created(_) => "created",
            Self::Adopted(_) => "adopted",
            Self::Unchanged(_) => "unchanged",
            Self::Skipped(_) => "skipped",
            Self::Refreshed(_) => "refreshed",
            Self::Imported(_) => "imported",
            Self::Gone => "gone",
            Self::Quarantined => "quarantined",
        }
    }

    pub fn record(&self) -> Option<&ManagedResourceRecord> {
        match self {
            Self::Created(record)
            | Self::Adopted(record)
            | Self::Unchanged(record)
            | Self::Refreshed(record)
            | Self::Imported(record) => Some(record),
            Self::Skipped(_) | Self::Gone | Self::Quarantined => None,
        }
    }

    /// Fold this change into the state snapshot
    fn apply_to(&self, state: &mut StateFile, key: &str) {
        match self.record() {
            Some(record) => state.insert(key, record.clone()),
            None => {
                state.remove(key);
            }
        }
    }
}

/// Outcome for one resource key
#[derive(Debug)]
pub struct ResourceResult {
    pub key: String,
    pub outcome: std::result::Result<ResourceChange, arcorg_core::Error>,
}

/// Outcomes of one command, in manifest key order
#[derive(Debug, Default)]
pub struct RunReport {
    pub results: Vec<ResourceResult>,
}

impl RunReport {
    pub fn is_success(&self) -> bool {
        self.results.iter().all(|r| r.outcome.is_ok())
    }

    pub fn failure_count(&self) -> usize {
        self.results.iter().filter(|r| r.outcome.is_err()).count()
    }

    pub fn warnings(&self) -> impl Iterator<Item = (&str, &Warning)> {
        self.results.iter().filter_map(|r| match &r.outcome {
            Ok(ResourceChange::Skipped(warning)) => Some((r.key.as_str(), warning)),
            _ => None,
        })
    }

    /// Turn the first failure into the command's error
    pub fn into_error(self) -> Option<CliError> {
        let failures = self.failure_count();
        let first = self
            .results
            .into_iter()
            .find_map(|r| r.outcome.err().map(|e| (r.key, e)))?;

        let (key, error) = first;
        Some(
            CliError::from_core(error)
                .with_context("resource", &key)
                .with_context("failed_resources", &failures.to_string()),
        )
    }
}

/// Unit of work for one resource key
#[derive(Debug, Clone)]
enum Job {
    Converge {
        desired: DesiredPlacement,
        stored: Option<ManagedResourceRecord>,
    },
    Refresh(ManagedResourceRecord),
    Destroy(ManagedResourceRecord),
}

impl Job {
    async fn run(
        self,
        reconciler: &AccountReconciler,
    ) -> std::result::Result<ResourceChange, arcorg_core::Error> {
        match self {
            Self::Converge {
                desired,
                stored: None,
            } => create(reconciler, &desired).await,
            Self::Converge {
                desired,
                stored: Some(stored),
            } => match reconciler.read(&stored).await? {
                ReadOutcome::Present(current) => reconciler
                    .update(&current, &desired)
                    .map(ResourceChange::Unchanged),
                ReadOutcome::Gone => {
                    info!(
                        "Account {} for {} vanished; re-creating",
                        stored.account_id, stored.email
                    );
                    create(reconciler, &desired).await
                }
            },
            Self::Refresh(record) => Ok(match reconciler.read(&record).await? {
                ReadOutcome::Present(current) => ResourceChange::Refreshed(current),
                ReadOutcome::Gone => ResourceChange::Gone,
            }),
            Self::Destroy(record) => reconciler
                .destroy(&record)
                .await
                .map(|_| ResourceChange::Quarantined),
        }
    }
}

async fn create(
    reconciler: &AccountReconciler,
    desired: &DesiredPlacement,
) -> std::result::Result<ResourceChange, arcorg_core::Error> {
    let deadline = reconciler.operation_deadline();
    Ok(match reconciler.create(desired, deadline).await? {
        CreateOutcome::Created(record) => ResourceChange::Created(record),
        CreateOutcome::Adopted(record) => ResourceChange::Adopted(record),
        CreateOutcome::Skipped(warning) => ResourceChange::Skipped(warning),
    })
}

/// Orchestrator for the state-changing commands
pub struct ReconcileOrchestrator {
    reconciler: AccountReconciler,
    store: Arc<dyn StateStore>,
    parallelism: usize,
}

impl ReconcileOrchestrator {
    pub fn new(
        reconciler: AccountReconciler,
        store: Arc<dyn StateStore>,
        parallelism: usize,
    ) -> Self {
        Self {
            reconciler,
            store,
            parallelism: parallelism.max(1),
        }
    }

    /// Compare manifest and state without calling the directory
    pub async fn plan(&self, manifest: &Manifest) -> Result<Plan> {
        let mut state = self.store.load().await?;
        let renames = carry_over_renames(manifest, &mut state);
        let mut entries = Vec::new();

        for (key, desired) in &manifest.accounts {
            let action = match state.get(key) {
                None => PlannedAction::Create,
                Some(stored) => match self.reconciler.update(stored, desired) {
                    Ok(_) => match renames.iter().find(|(_, to)| to == key) {
                        Some((from, _)) => PlannedAction::Rename { from: from.clone() },
                        None => PlannedAction::Keep,
                    },
                    Err(arcorg_core::Error::Lifecycle(
                        arcorg_core::error::LifecycleError::ImmutableField {
                            field,
                            stored,
                            desired,
                        },
                    )) => PlannedAction::Replace {
                        field: field.to_string(),
                        stored,
                        desired,
                    },
                    Err(e) => return Err(e.into()),
                },
            };
            entries.push(PlanEntry {
                key: key.clone(),
                action,
            });
        }

        for key in state.keys() {
            if manifest.get(&key).is_none() {
                entries.push(PlanEntry {
                    key,
                    action: PlannedAction::Destroy,
                });
            }
        }

        Ok(Plan { entries })
    }

    /// Converge the directory towards the manifest
    ///
    /// Managed keys no longer declared are quarantined first; declared keys
    /// are then created, adopted or checked. Both phases run to completion
    /// before the combined report is returned.
    pub async fn apply(&self, manifest: &Manifest) -> Result<RunReport> {
        let mut state = self.store.load().await?;

        if !carry_over_renames(manifest, &mut state).is_empty() {
            self.store
                .save(&state)
                .await
                .context("Failed to save renamed resources")?;
        }

        let destroys: Vec<(String, Job)> = state
            .resources
            .iter()
            .filter(|(key, _)| manifest.get(key).is_none())
            .map(|(key, record)| (key.clone(), Job::Destroy(record.clone())))
            .collect();
        let mut report = self.run(destroys, &mut state).await?;

        let converges: Vec<(String, Job)> = manifest
            .accounts
            .iter()
            .map(|(key, desired)| {
                let job = Job::Converge {
                    desired: desired.clone(),
                    stored: state.get(key).cloned(),
                };
                (key.clone(), job)
            })
            .collect();
        let converged = self.run(converges, &mut state).await?;

        report.results.extend(converged.results);
        Ok(report)
    }

    /// Re-resolve every managed record by email
    pub async fn refresh(&self) -> Result<RunReport> {
        let mut state = self.store.load().await?;
        let jobs = state
            .resources
            .iter()
            .map(|(key, record)| (key.clone(), Job::Refresh(record.clone())))
            .collect();

        self.run(jobs, &mut state).await
    }

    /// Quarantine one managed account
    pub async fn destroy(&self, key: &str) -> Result<RunReport> {
        let mut state = self.store.load().await?;
        let Some(record) = state.get(key).cloned() else {
            return Err(CliError::unknown_resource(key, &state.keys()).into());
        };

        self.run(vec![(key.to_string(), Job::Destroy(record))], &mut state)
            .await
    }

    /// Bring an existing account under management as `key`
    ///
    /// The declared placement for `key` supplies the units; the account is
    /// then read back by email before anything is saved.
    pub async fn import(
        &self,
        manifest: &Manifest,
        key: &str,
        external_id: &str,
    ) -> Result<RunReport> {
        let Some(desired) = manifest.get(key) else {
            return Err(CliError::unknown_resource(key, &manifest.keys()).into());
        };

        let mut state = self.store.load().await?;
        if let Some(existing) = state.get(key) {
            return Err(CliError::misuse(&format!(
                "Resource '{key}' is already managed as {}",
                existing.id
            ))
            .with_suggestion("Run 'arcorg destroy' first to hand it over")
            .into());
        }

        let imported = self.reconciler.import(external_id)?;
        let imported_account_id = imported.account_id.clone();
        let record = ManagedResourceRecord::imported(imported, desired);

        let current = match self.reconciler.read(&record).await? {
            ReadOutcome::Present(current) => current,
            ReadOutcome::Gone => anyhow::bail!(
                "No account with email {} exists; nothing was imported",
                desired.email
            ),
        };
        if current.account_id != imported_account_id {
            warn!(
                "{external_id} was imported, but {} resolves to account {}",
                desired.email, current.account_id
            );
        }

        let change = ResourceChange::Imported(current);
        change.apply_to(&mut state, key);
        self.store.save(&state).await?;
        info!("Imported {key} into {}", self.store.location());

        Ok(RunReport {
            results: vec![ResourceResult {
                key: key.to_string(),
                outcome: Ok(change),
            }],
        })
    }

    /// Current state snapshot
    pub async fn show(&self) -> Result<StateFile> {
        self.store.load().await
    }

    async fn run(&self, jobs: Vec<(String, Job)>, state: &mut StateFile) -> Result<RunReport> {
        debug!(
            "Running {} job(s) with parallelism {}",
            jobs.len(),
            self.parallelism
        );

        let semaphore = Arc::new(Semaphore::new(self.parallelism));
        let mut handles = Vec::new();

        for (key, job) in jobs {
            let sem = semaphore.clone();
            let reconciler = self.reconciler.clone();

            let handle = tokio::spawn(async move {
                let _permit = sem.acquire_owned().await?;
                anyhow::Ok(job.run(&reconciler).await)
            });

            handles.push((key, handle));
        }

        let mut report = RunReport::default();
        let mut unsaved: Vec<String> = Vec::new();
        let mut task_failure: Option<anyhow::Error> = None;

        for (key, handle) in handles {
            let outcome = match handle.await.map_err(anyhow::Error::from).and_then(|r| r) {
                Ok(outcome) => outcome,
                Err(e) => {
                    warn!("Task for {key} did not complete: {e:#}");
                    if task_failure.is_none() {
                        task_failure = Some(e.context(format!("Task for {key} did not complete")));
                    }
                    continue;
                }
            };

            match &outcome {
                Ok(change) => {
                    change.apply_to(state, &key);
                    match self.store.save(state).await {
                        Ok(()) => unsaved.clear(),
                        Err(e) => {
                            warn!("Failed to save state after {key}: {e:#}");
                            unsaved.push(key.clone());
                        }
                    }
                    debug!("{key}: {}", change.label());
                }
                Err(e) => warn!("{key}: {e}"),
            }

            report.results.push(ResourceResult { key, outcome });
        }

        // Every save writes the whole snapshot, so one more attempt covers
        // all keys whose save failed.
        if !unsaved.is_empty() {
            self.store.save(state).await.with_context(|| {
                format!(
                    "Failed to save state to {}; changes not recorded for: {}",
                    self.store.location(),
                    unsaved.join(", ")
                )
            })?;
        }

        match task_failure {
            Some(e) => Err(e),
            None => Ok(report),
        }
    }
}

/// Move undeclared records to the declared key claiming the same email
///
/// Returns the `(from, to)` pairs that were moved. Only keys without a record
/// of their own can receive one.
fn carry_over_renames(manifest: &Manifest, state: &mut StateFile) -> Vec<(String, String)> {
    let mut renames = Vec::new();

    for key in state.keys() {
        if manifest.get(&key).is_some() {
            continue;
        }
        let Some(email) = state.get(&key).map(|r| r.email.clone()) else {
            continue;
        };
        let target = manifest
            .accounts
            .iter()
            .find(|(declared, desired)| desired.email == email && state.get(declared).is_none())
            .map(|(declared, _)| declared.clone());

        if let Some(target) = target
            && let Some(record) = state.remove(&key)
        {
            info!(
                "Resource {key} renamed to {target}; keeping account {}",
                record.account_id
            );
            state.insert(&target, record);
            renames.push((key, target));
        }
    }

    renames
}
