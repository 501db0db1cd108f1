//! Declared accounts
//!
//! The manifest is a TOML file with one `[accounts.<key>]` table per managed
//! account:
//!
//! ```toml
//! [accounts.sandbox]
//! email = "sandbox@example.com"
//! name = "sandbox"
//! active_unit_id = "ou-abcd-11111111"
//! closed_unit_id = "ou-abcd-22222222"
//! ```

use anyhow::{Context, Result};
use arcorg_core::DesiredPlacement;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

/// All declared accounts, keyed by resource key
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
    #[serde(default)]
    pub accounts: BTreeMap<String, DesiredPlacement>,
}

impl Manifest {
    /// Read and validate a manifest file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read manifest {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("Invalid manifest {}", path.display()))
    }

    /// Parse and validate manifest text
    pub fn parse(content: &str) -> Result<Self> {
        let manifest: Self = toml::from_str(content)?;
        manifest.validate()?;
        Ok(manifest)
    }

    /// Placement declared for `key`
    pub fn get(&self, key: &str) -> Option<&DesiredPlacement> {
        self.accounts.get(key)
    }

    pub fn keys(&self) -> Vec<String> {
        self.accounts.keys().cloned().collect()
    }

    /// Check every entry, and that no two entries claim the same email
    ///
    /// Two resources resolving to one account would race each other on every
    /// apply.
    pub fn validate(&self) -> Result<()> {
        let mut owners: HashMap<&str, &str> = HashMap::new();

        for (key, desired) in &self.accounts {
            if !is_valid_key(key) {
                anyhow::bail!(
                    "Invalid resource key '{key}': use letters, digits, '-' and '_' only"
                );
            }

            desired
                .validate()
                .with_context(|| format!("Invalid account '{key}'"))?;

            if let Some(other) = owners.insert(desired.email.as_str(), key.as_str()) {
                anyhow::bail!(
                    "Accounts '{other}' and '{key}' both declare email {}",
                    desired.email
                );
            }
        }

        Ok(())
    }
}

fn is_valid_key(key: &str) -> bool {
    !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    const MANIFEST: &str = r#"
[accounts.sandbox]
email = "sandbox@example.com"
name = "sandbox"
active_unit_id = "ou-active"
closed_unit_id = "ou-closed"

[accounts.billing]
email = "billing@example.com"
name = "billing"
active_unit_id = "ou-active"
closed_unit_id = "ou-closed"
"#;

    #[test]
    fn test_parse_manifest() {
        let manifest = Manifest::parse(MANIFEST).unwrap();
        assert_eq!(manifest.keys(), vec!["billing", "sandbox"]);
        assert_eq!(
            manifest.get("sandbox").map(|d| d.email.as_str()),
            Some("sandbox@example.com")
        );
    }

    #[test]
    fn test_empty_manifest_is_valid() {
        let manifest = Manifest::parse("").unwrap();
        assert!(manifest.accounts.is_empty());
    }

    #[test]
    fn test_missing_field_is_rejected() {
        let content = r#"
[accounts.sandbox]
email = "sandbox@example.com"
name = "sandbox"
active_unit_id = "ou-active"
"#;
        assert!(Manifest::parse(content).is_err());
    }

    #[test]
    fn test_duplicate_email_is_rejected() {
        let content = MANIFEST.replace("billing@example.com", "sandbox@example.com");
        let err = Manifest::parse(&content).unwrap_err();
        assert!(err.to_string().contains("both declare email"));
    }

    #[test]
    fn test_same_units_are_rejected() {
        let content = MANIFEST.replacen("ou-closed", "ou-active", 1);
        assert!(Manifest::parse(&content).is_err());
    }

    #[test]
    fn test_bad_key_is_rejected() {
        let content = MANIFEST.replace("[accounts.sandbox]", "[accounts.\"sand box\"]");
        assert!(Manifest::parse(&content).is_err());
    }
}
