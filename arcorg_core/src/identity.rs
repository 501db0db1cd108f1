//! External identifiers for managed accounts
//!
//! The external id is the opaque handle persisted in state and used for
//! import. It is the directory account id behind a fixed prefix, and is only
//! ever parsed back when importing.

use crate::error::ValidationError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Fixed prefix of every external id
pub const EXTERNAL_ID_PREFIX: &str = "arcorg";

/// Opaque composite identifier `arcorg:<account_id>`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExternalId(String);

impl ExternalId {
    /// Derive the external id of a directory account
    pub fn from_account_id(account_id: &str) -> Self {
        Self(format!("{EXTERNAL_ID_PREFIX}:{account_id}"))
    }

    /// Parse an operator-supplied id, as done on import
    pub fn parse(value: &str) -> Result<Self, ValidationError> {
        let invalid = || ValidationError::InvalidExternalId {
            value: value.to_string(),
            prefix: EXTERNAL_ID_PREFIX,
        };

        let (prefix, account_id) = value.split_once(':').ok_or_else(invalid)?;
        if prefix != EXTERNAL_ID_PREFIX || account_id.is_empty() || account_id.contains(':') {
            return Err(invalid());
        }

        Ok(Self(value.to_string()))
    }

    /// Directory account id embedded in this id
    pub fn account_id(&self) -> &str {
        &self.0[EXTERNAL_ID_PREFIX.len() + 1..]
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ExternalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ExternalId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
