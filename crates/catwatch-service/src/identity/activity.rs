//! Sign-in activity tracking.

use std::sync::Arc;

use chrono::Utc;
use tracing::debug;

use catwatch_core::error::AppError;
use catwatch_core::result::AppResult;
use catwatch_core::types::IdentityId;
use catwatch_database::IdentityStore;
use catwatch_entity::Identity;
use catwatch_entity::identity::model::IP_MAX_LEN;

/// Records sign-in events on identities.
#[derive(Debug, Clone)]
pub struct ActivityTracker {
    store: Arc<dyn IdentityStore>,
}

impl ActivityTracker {
    pub fn new(store: Arc<dyn IdentityStore>) -> Self {
        Self { store }
    }

    /// Record one sign-in from `ip` at the current time.
    ///
    /// Every call counts: the previous current sign-in moves to the last
    /// slot and the counter goes up by one.
    pub async fn record_sign_in(&self, id: IdentityId, ip: &str) -> AppResult<Identity> {
        if ip.len() > IP_MAX_LEN {
            return Err(AppError::validation(format!(
                "IP address must be at most {IP_MAX_LEN} characters"
            )));
        }

        let identity = self.store.record_sign_in(id, ip, Utc::now()).await?;
        debug!(identity_id = %id, count = identity.sign_in_count, "Sign-in recorded");
        Ok(identity)
    }
}
