//! Types shared by the lifecycle state machine

use crate::error::ValidationError;
use crate::identity::ExternalId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Declared intent for one managed account
///
/// Immutable for the life of a managed resource instance; any change means
/// destroy and re-create.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DesiredPlacement {
    pub email: String,
    pub name: String,
    pub active_unit_id: String,
    pub closed_unit_id: String,
}

impl DesiredPlacement {
    pub fn new(
        email: impl Into<String>,
        name: impl Into<String>,
        active_unit_id: impl Into<String>,
        closed_unit_id: impl Into<String>,
    ) -> Self {
        Self {
            email: email.into(),
            name: name.into(),
            active_unit_id: active_unit_id.into(),
            closed_unit_id: closed_unit_id.into(),
        }
    }

    /// Reject placements no directory call should be made for
    pub fn validate(&self) -> Result<(), ValidationError> {
        for (field, value) in [
            ("email", &self.email),
            ("name", &self.name),
            ("active_unit_id", &self.active_unit_id),
            ("closed_unit_id", &self.closed_unit_id),
        ] {
            if value.trim().is_empty() {
                return Err(ValidationError::missing_field(field));
            }
        }

        if !self.email.contains('@') {
            return Err(ValidationError::invalid_parameter(
                "email",
                "must be an email address",
            ));
        }

        if self.active_unit_id == self.closed_unit_id {
            return Err(ValidationError::invalid_parameter(
                "closed_unit_id",
                "must differ from active_unit_id",
            ));
        }

        Ok(())
    }
}

/// Persisted link between a declared placement and a directory account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManagedResourceRecord {
    pub id: ExternalId,
    pub account_id: String,
    pub active_unit_id: String,
    pub closed_unit_id: String,
    pub email: String,
    pub name: String,
}

impl ManagedResourceRecord {
    /// Record for an account placed according to `desired`
    pub fn placed(account_id: &str, desired: &DesiredPlacement) -> Self {
        Self {
            id: ExternalId::from_account_id(account_id),
            account_id: account_id.to_string(),
            active_unit_id: desired.active_unit_id.clone(),
            closed_unit_id: desired.closed_unit_id.clone(),
            email: desired.email.clone(),
            name: desired.name.clone(),
        }
    }

    /// Record for an imported account, before its first refresh
    pub fn imported(imported: ImportedAccount, desired: &DesiredPlacement) -> Self {
        Self {
            id: imported.id,
            account_id: imported.account_id,
            active_unit_id: desired.active_unit_id.clone(),
            closed_unit_id: desired.closed_unit_id.clone(),
            email: desired.email.clone(),
            name: desired.name.clone(),
        }
    }

    /// The placement this record was created with
    pub fn placement(&self) -> DesiredPlacement {
        DesiredPlacement {
            email: self.email.clone(),
            name: self.name.clone(),
            active_unit_id: self.active_unit_id.clone(),
            closed_unit_id: self.closed_unit_id.clone(),
        }
    }
}

/// Identity echoed back by an import
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportedAccount {
    pub id: ExternalId,
    pub account_id: String,
}

/// Lifecycle of one managed resource instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LifecycleState {
    Absent,
    Reconciling,
    /// Account sits in the active unit and is recorded
    Placed,
    /// Create stopped on a state the operator must resolve
    Conflict,
    /// Account moved to the closed unit and the record dropped
    Quarantined,
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Absent => "ABSENT",
            Self::Reconciling => "RECONCILING",
            Self::Placed => "PLACED",
            Self::Conflict => "CONFLICT",
            Self::Quarantined => "QUARANTINED",
        };
        f.write_str(label)
    }
}

/// Non-fatal diagnostic surfaced to the operator
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Warning {
    pub summary: String,
    pub detail: String,
}

/// Result of a create transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreateOutcome {
    /// A new account was created and moved into the active unit
    Created(ManagedResourceRecord),
    /// A quarantined account was moved back from the closed unit
    Adopted(ManagedResourceRecord),
    /// An account with this email already sits elsewhere; nothing was changed
    Skipped(Warning),
}

impl CreateOutcome {
    /// Record to persist, if any
    pub fn record(&self) -> Option<&ManagedResourceRecord> {
        match self {
            Self::Created(record) | Self::Adopted(record) => Some(record),
            Self::Skipped(_) => None,
        }
    }

    pub fn into_record(self) -> Option<ManagedResourceRecord> {
        match self {
            Self::Created(record) | Self::Adopted(record) => Some(record),
            Self::Skipped(_) => None,
        }
    }

    pub fn state(&self) -> LifecycleState {
        match self {
            Self::Created(_) | Self::Adopted(_) => LifecycleState::Placed,
            Self::Skipped(_) => LifecycleState::Absent,
        }
    }
}

/// Result of a read transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadOutcome {
    /// Account still resolvable by email; identity refreshed
    Present(ManagedResourceRecord),
    /// No account with this email; the record should be dropped
    Gone,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn placement() -> DesiredPlacement {
        DesiredPlacement::new("ops@example.com", "ops", "ou-active", "ou-closed")
    }

    #[test]
    fn test_validate_accepts_complete_placement() {
        assert!(placement().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_blank_fields() {
        let mut desired = placement();
        desired.closed_unit_id = "  ".to_string();
        assert_eq!(
            desired.validate(),
            Err(ValidationError::missing_field("closed_unit_id"))
        );
    }

    #[test]
    fn test_validate_rejects_same_units() {
        let mut desired = placement();
        desired.closed_unit_id = desired.active_unit_id.clone();
        assert!(matches!(
            desired.validate(),
            Err(ValidationError::InvalidParameter { ref parameter, .. }) if parameter == "closed_unit_id"
        ));
    }

    #[test]
    fn test_validate_rejects_non_email() {
        let mut desired = placement();
        desired.email = "ops".to_string();
        assert!(desired.validate().is_err());
    }

    #[test]
    fn test_record_round_trips_placement() {
        let record = ManagedResourceRecord::placed("111122223333", &placement());
        assert_eq!(record.id.as_str(), "arcorg:111122223333");
        assert_eq!(record.placement(), placement());
    }

    #[test]
    fn test_record_json_shape() {
        let record = ManagedResourceRecord::placed("111122223333", &placement());
        let json = serde_json::to_value(&record).unwrap();

        for key in ["id", "account_id", "active_unit_id", "closed_unit_id", "email", "name"] {
            assert!(json.get(key).is_some(), "missing {key}");
        }
        assert_eq!(json["id"], "arcorg:111122223333");
    }

    #[test]
    fn test_skipped_outcome_has_no_record() {
        let outcome = CreateOutcome::Skipped(Warning {
            summary: "s".to_string(),
            detail: "d".to_string(),
        });
        assert!(outcome.record().is_none());
        assert_eq!(outcome.state(), LifecycleState::Absent);
    }
}
