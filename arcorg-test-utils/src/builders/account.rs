//! Account and placement builders

use arcorg_core::directory::{Account, AccountStatus};
use arcorg_core::reconciler::DesiredPlacement;

pub const ACTIVE_UNIT_ID: &str = "ou-active";
pub const CLOSED_UNIT_ID: &str = "ou-closed";

/// Builder for directory accounts
#[derive(Debug, Clone)]
pub struct AccountBuilder {
    id: String,
    email: Option<String>,
    name: Option<String>,
    status: AccountStatus,
}

impl AccountBuilder {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            email: None,
            name: None,
            status: AccountStatus::Active,
        }
    }

    pub fn email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn status(mut self, status: AccountStatus) -> Self {
        self.status = status;
        self
    }

    pub fn suspended(self) -> Self {
        self.status(AccountStatus::Suspended)
    }

    pub fn build(self) -> Account {
        let email = self
            .email
            .unwrap_or_else(|| format!("account-{}@example.com", self.id));
        let name = self.name.unwrap_or_else(|| format!("account-{}", self.id));

        Account {
            arn: Some(format!(
                "arn:aws:organizations::000000000000:account/o-test/{}",
                self.id
            )),
            id: self.id,
            email,
            name,
            status: self.status,
            joined_at: None,
        }
    }
}

/// Builder for declared placements, defaulting to `ou-active` / `ou-closed`
#[derive(Debug, Clone)]
pub struct PlacementBuilder {
    email: String,
    name: String,
    active_unit_id: String,
    closed_unit_id: String,
}

impl PlacementBuilder {
    pub fn new(email: impl Into<String>) -> Self {
        let email = email.into();
        let name = email.split('@').next().unwrap_or_default().to_string();
        Self {
            email,
            name,
            active_unit_id: ACTIVE_UNIT_ID.to_string(),
            closed_unit_id: CLOSED_UNIT_ID.to_string(),
        }
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn active_unit(mut self, unit_id: impl Into<String>) -> Self {
        self.active_unit_id = unit_id.into();
        self
    }

    pub fn closed_unit(mut self, unit_id: impl Into<String>) -> Self {
        self.closed_unit_id = unit_id.into();
        self
    }

    pub fn build(self) -> DesiredPlacement {
        DesiredPlacement::new(
            self.email,
            self.name,
            self.active_unit_id,
            self.closed_unit_id,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_account_defaults_derive_from_id() {
        let account = AccountBuilder::new("111122223333").build();
        assert_eq!(account.email, "account-111122223333@example.com");
        assert_eq!(account.status, AccountStatus::Active);
    }

    #[test]
    fn test_placement_defaults() {
        let desired = PlacementBuilder::new("ops@example.com").build();
        assert_eq!(desired.name, "ops");
        assert_eq!(desired.active_unit_id, ACTIVE_UNIT_ID);
        assert_eq!(desired.closed_unit_id, CLOSED_UNIT_ID);
        assert!(desired.validate().is_ok());
    }
}
