//! Capabilities the identity type provides to collaborators.

use chrono::{DateTime, Utc};

use catwatch_core::types::IdentityId;

use super::model::Identity;

/// What an authentication layer needs from an account.
pub trait Authenticatable {
    fn identity_id(&self) -> IdentityId;

    /// Whether the account may sign in.
    fn is_active(&self) -> bool;

    /// Stored credential hash; empty when no password was set.
    fn password_hash(&self) -> &str;

    fn has_credential(&self) -> bool {
        !self.password_hash().is_empty()
    }
}

/// Creation and modification stamps of a persisted resource.
pub trait ResourceAuditable {
    fn created_at(&self) -> DateTime<Utc>;
    fn updated_at(&self) -> DateTime<Utc>;
}

impl Authenticatable for Identity {
    fn identity_id(&self) -> IdentityId {
        self.id
    }

    fn is_active(&self) -> bool {
        self.active
    }

    fn password_hash(&self) -> &str {
        &self.password_hash
    }
}

impl ResourceAuditable for Identity {
    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;
    use crate::identity::{AccessChange, NewIdentity, Role};

    #[test]
    fn test_audit_stamps_follow_mutations() {
        let created = Utc::now();
        let mut identity = NewIdentity::new("a@example.com", None, "").into_identity(created);
        assert_eq!(ResourceAuditable::created_at(&identity), created);
        assert_eq!(ResourceAuditable::updated_at(&identity), created);

        let later = created + Duration::seconds(30);
        identity.apply_access(&AccessChange::default().with_role(Role::Admin), later);
        assert_eq!(ResourceAuditable::created_at(&identity), created);
        assert_eq!(ResourceAuditable::updated_at(&identity), later);
    }

    #[test]
    fn test_authenticatable_view() {
        let identity = NewIdentity::new("a@example.com", None, "$argon2id$x")
            .with_active(false)
            .into_identity(Utc::now());

        assert_eq!(identity.identity_id(), identity.id);
        assert!(!Authenticatable::is_active(&identity));
        assert_eq!(Authenticatable::password_hash(&identity), "$argon2id$x");
        assert!(Authenticatable::has_credential(&identity));
    }
}
