//! Organizational unit moves

use crate::directory::DirectoryService;
use crate::error::{LifecycleError, Result};
use log::{debug, warn};
use std::sync::Arc;

/// Moves accounts between organizational units
///
/// The move is atomic from the directory's point of view. The postcondition is
/// not verified here; callers that need certainty re-query placement.
#[derive(Clone)]
pub struct UnitMover {
    service: Arc<dyn DirectoryService>,
}

impl UnitMover {
    pub fn new(service: Arc<dyn DirectoryService>) -> Self {
        Self { service }
    }

    /// Move `account_id` into `to_unit_id`
    ///
    /// `from_unit_id` is omitted when moving a brand-new account out of the
    /// implicit placement the directory assigned at creation.
    pub async fn relocate(
        &self,
        account_id: &str,
        from_unit_id: Option<&str>,
        to_unit_id: &str,
    ) -> Result<()> {
        debug!(
            "Moving account {account_id} from {} to {to_unit_id}",
            from_unit_id.unwrap_or("<implicit>")
        );

        self.service
            .move_account(account_id, from_unit_id, to_unit_id)
            .await
            .map_err(|e| {
                warn!("Move of account {account_id} to {to_unit_id} failed: {e}");
                LifecycleError::move_failed(account_id, from_unit_id, to_unit_id, e)
            })?;

        Ok(())
    }
}
