//! Guard against removing the last administrator.
//!
//! A change that demotes an admin or deactivates an active identity is
//! refused while the system has a single admin or a single active identity.
//! [`AdminSafeguard::forbids_change`] answers the question from a snapshot;
//! [`AdminSafeguard::commit_change`] is the path that actually writes, and
//! it re-evaluates the rule inside the store's serialized access change.

use std::sync::Arc;

use tracing::{info, warn};

use catwatch_core::error::AppError;
use catwatch_core::result::AppResult;
use catwatch_core::types::IdentityId;
use catwatch_database::{AccessOutcome, CountFilter, IdentityStore};
use catwatch_entity::{AccessChange, AdminCensus, Identity, Role};

/// Enforces that an administrator always remains.
#[derive(Debug, Clone)]
pub struct AdminSafeguard {
    store: Arc<dyn IdentityStore>,
}

impl AdminSafeguard {
    /// Creates a safeguard over `store`.
    pub fn new(store: Arc<dyn IdentityStore>) -> Self {
        Self { store }
    }

    /// Decide whether `change` to `identity` must be refused given `census`.
    pub fn evaluate(identity: &Identity, change: &AccessChange, census: AdminCensus) -> bool {
        change.removes_last_admin(identity, census)
    }

    /// Whether setting `role`/`active` on `identity` would be refused now.
    ///
    /// Reads the census outside any critical section, so the answer may be
    /// stale by the time a change is written. Use [`Self::commit_change`]
    /// to apply.
    pub async fn forbids_change(
        &self,
        identity: &Identity,
        role: Role,
        active: bool,
    ) -> AppResult<bool> {
        let census = AdminCensus {
            admins: self.store.count(CountFilter::Role(Role::Admin)).await?,
            active: self.store.count(CountFilter::Active(true)).await?,
        };
        Ok(Self::evaluate(identity, &AccessChange::new(role, active), census))
    }

    /// Apply `change` to identity `id` unless the safeguard refuses it.
    pub async fn commit_change(&self, id: IdentityId, change: AccessChange) -> AppResult<Identity> {
        match self
            .store
            .change_access(id, change, &Self::evaluate)
            .await?
        {
            AccessOutcome::Applied(identity) => {
                info!(
                    identity_id = %id,
                    role = %identity.role,
                    active = identity.active,
                    "Access changed"
                );
                Ok(identity)
            }
            AccessOutcome::Forbidden { census } => {
                warn!(
                    identity_id = %id,
                    admins = census.admins,
                    active = census.active,
                    "Refused to remove the last administrator"
                );
                Err(AppError::forbidden(
                    "Change would leave the system without an active administrator",
                ))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use catwatch_entity::NewIdentity;

    use super::*;

    fn identity(role: Role, active: bool) -> Identity {
        NewIdentity::new("x@example.com", None, "")
            .with_role(role)
            .with_active(active)
            .into_identity(Utc::now())
    }

    fn census(admins: u64, active: u64) -> AdminCensus {
        AdminCensus { admins, active }
    }

    #[test]
    fn test_demoting_the_only_admin_is_refused() {
        let admin = identity(Role::Admin, true);
        let demote = AccessChange::new(Role::Member, true);

        assert!(AdminSafeguard::evaluate(&admin, &demote, census(1, 5)));
        assert!(!AdminSafeguard::evaluate(&admin, &demote, census(2, 5)));
    }

    #[test]
    fn test_deactivating_the_only_active_identity_is_refused() {
        let member = identity(Role::Member, true);
        let deactivate = AccessChange::new(Role::Member, false);

        assert!(AdminSafeguard::evaluate(&member, &deactivate, census(3, 1)));
        assert!(!AdminSafeguard::evaluate(&member, &deactivate, census(3, 2)));
    }

    #[test]
    fn test_harmless_changes_are_always_allowed() {
        let member = identity(Role::Member, true);
        let inactive = identity(Role::Guest, false);

        assert!(!AdminSafeguard::evaluate(
            &member,
            &AccessChange::new(Role::Admin, true),
            census(1, 1)
        ));
        assert!(!AdminSafeguard::evaluate(
            &inactive,
            &AccessChange::default(),
            census(1, 1)
        ));
        // Re-affirming the sole admin's current state is not a removal.
        let admin = identity(Role::Admin, true);
        assert!(!AdminSafeguard::evaluate(
            &admin,
            &AccessChange::default(),
            census(1, 1)
        ));
    }
}
