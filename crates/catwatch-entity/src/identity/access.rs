//! Role/activation changes and the administrator census they are judged by.

use serde::{Deserialize, Serialize};

use super::model::Identity;
use super::role::Role;

/// A pending change to an identity's role and/or activation state.
///
/// Fields left as `None` keep whatever the stored row holds at the moment
/// the change is applied, so a role change never rewrites the activation
/// flag it did not ask about.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessChange {
    /// Role after the change.
    pub role: Option<Role>,
    /// Activation state after the change.
    pub active: Option<bool>,
}

impl AccessChange {
    /// A change that sets both role and activation.
    pub fn new(role: Role, active: bool) -> Self {
        Self {
            role: Some(role),
            active: Some(active),
        }
    }

    /// Set the role.
    pub fn with_role(mut self, role: Role) -> Self {
        self.role = Some(role);
        self
    }

    /// Set the activation state.
    pub fn with_active(mut self, active: bool) -> Self {
        self.active = Some(active);
        self
    }

    /// Role and activation `identity` ends up with once this change applies.
    pub fn resolve(&self, identity: &Identity) -> (Role, bool) {
        (
            self.role.unwrap_or(identity.role),
            self.active.unwrap_or(identity.active),
        )
    }

    /// Whether this change strips admin rights from `identity`.
    pub fn demotes(&self, identity: &Identity) -> bool {
        identity.role.is_admin() && self.role.is_some_and(|role| !role.is_admin())
    }

    /// Whether this change deactivates `identity`.
    pub fn deactivates(&self, identity: &Identity) -> bool {
        identity.active && self.active == Some(false)
    }

    /// Whether applying this change to `identity` could leave the system
    /// without an active administrator.
    ///
    /// Demotions and deactivations are refused while `census` shows a single
    /// admin or a single active identity. Anything else is allowed.
    pub fn removes_last_admin(&self, identity: &Identity, census: AdminCensus) -> bool {
        let removing = self.demotes(identity) || self.deactivates(identity);
        removing && (census.admins == 1 || census.active == 1)
    }
}

/// Counts observed over the whole identity set when judging an access change.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminCensus {
    /// Identities whose role is admin.
    pub admins: u64,
    /// Identities that are active.
    pub active: u64,
}
