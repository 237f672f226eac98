//! Identity facade: registration, sign-in, password and access management.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use catwatch_auth::{PasswordHasher, TokenService};
use catwatch_core::config::AuthConfig;
use catwatch_core::error::AppError;
use catwatch_core::result::AppResult;
use catwatch_core::types::IdentityId;
use catwatch_database::IdentityStore;
use catwatch_entity::{AccessChange, Identity, NewIdentity, Role};

use super::{ActivityTracker, AdminSafeguard, IdentityLookup};

/// Request to create a new identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterIdentity {
    /// Email address (unique).
    pub email: String,
    /// Login name (unique, stored lowercase).
    pub username: Option<String>,
    /// Initial password; empty leaves the identity without a credential.
    #[serde(skip_serializing)]
    pub password: String,
    /// Display name.
    pub name: Option<String>,
    /// Role assignment.
    #[serde(default)]
    pub role: Role,
}

/// Composes hashing, tokens, lookup, the admin safeguard and activity
/// tracking over one identity store.
#[derive(Debug, Clone)]
pub struct IdentityService {
    store: Arc<dyn IdentityStore>,
    hasher: Arc<PasswordHasher>,
    tokens: Arc<TokenService>,
    lookup: IdentityLookup,
    safeguard: AdminSafeguard,
    activity: ActivityTracker,
}

impl IdentityService {
    /// Creates the service from auth settings and a store.
    pub fn new(config: &AuthConfig, store: Arc<dyn IdentityStore>) -> AppResult<Self> {
        let hasher = Arc::new(PasswordHasher::new(config)?);
        let tokens = Arc::new(TokenService::new(config, store.clone()));

        Ok(Self {
            lookup: IdentityLookup::new(store.clone()),
            safeguard: AdminSafeguard::new(store.clone()),
            activity: ActivityTracker::new(store.clone()),
            store,
            hasher,
            tokens,
        })
    }

    pub fn lookup(&self) -> &IdentityLookup {
        &self.lookup
    }

    pub fn safeguard(&self) -> &AdminSafeguard {
        &self.safeguard
    }

    pub fn activity(&self) -> &ActivityTracker {
        &self.activity
    }

    pub fn tokens(&self) -> &TokenService {
        &self.tokens
    }

    pub fn hasher(&self) -> &PasswordHasher {
        &self.hasher
    }

    /// Fetch an identity that must exist.
    pub async fn get(&self, id: IdentityId) -> AppResult<Identity> {
        self.store
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Identity {id} not found")))
    }

    /// Create a new identity.
    pub async fn register(&self, req: RegisterIdentity) -> AppResult<Identity> {
        let mut new = NewIdentity::new(req.email, req.username.as_deref(), String::new())
            .with_role(req.role);
        if let Some(name) = req.name.filter(|n| !n.trim().is_empty()) {
            new = new.with_name(name.trim());
        }
        new.validate()?;
        new.password_hash = self.hasher.hash(&req.password)?;

        let identity = self.store.insert(&new).await?;
        info!(identity_id = %identity.id, role = %identity.role, "Identity registered");
        Ok(identity)
    }

    /// Authenticate `login` (email or username) with `password` and record
    /// the sign-in from `ip`.
    ///
    /// Unknown logins and wrong passwords yield `Ok(None)`. A correct
    /// password on a deactivated identity is an authentication error.
    pub async fn sign_in(
        &self,
        login: &str,
        password: &str,
        ip: &str,
    ) -> AppResult<Option<Identity>> {
        let Some(identity) = self.lookup.find_by_identity(login).await? else {
            debug!("Sign-in for unknown login");
            return Ok(None);
        };

        if !self.hasher.authenticated(&identity, true, password) {
            debug!(identity_id = %identity.id, "Sign-in with wrong password");
            return Ok(None);
        }

        if !identity.active {
            return Err(AppError::authentication("Account is deactivated"));
        }

        self.activity.record_sign_in(identity.id, ip).await.map(Some)
    }

    /// Replace the password of identity `id`.
    ///
    /// Auth tokens issued before the change stop resolving.
    pub async fn change_password(&self, id: IdentityId, new_password: &str) -> AppResult<Identity> {
        if new_password.is_empty() {
            return Err(AppError::validation("Password cannot be empty"));
        }

        let hash = self.hasher.hash(new_password)?;
        let identity = self.store.update_password(id, &hash).await?;
        info!(identity_id = %id, "Password changed");
        Ok(identity)
    }

    /// Change role and activation of identity `id` under the admin safeguard.
    pub async fn change_access(&self, id: IdentityId, change: AccessChange) -> AppResult<Identity> {
        self.safeguard.commit_change(id, change).await
    }

    /// Issue a password-reset token for the identity behind `login`.
    ///
    /// Returns `None` when no identity matches.
    pub async fn request_password_reset(&self, login: &str) -> AppResult<Option<String>> {
        match self.lookup.find_by_identity(login).await? {
            Some(identity) => {
                let token = self.tokens.issue_default_action_token(&identity)?;
                info!(identity_id = %identity.id, "Password reset requested");
                Ok(Some(token))
            }
            None => Ok(None),
        }
    }

    /// Set a new password using a reset token.
    pub async fn reset_password(&self, token: &str, new_password: &str) -> AppResult<Identity> {
        let identity = self.tokens.resolve_action_token(token).await?;
        self.change_password(identity.id, new_password).await
    }
}
