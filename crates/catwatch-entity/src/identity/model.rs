//! Identity entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use catwatch_core::error::AppError;
use catwatch_core::result::AppResult;
use catwatch_core::types::IdentityId;

use super::access::AccessChange;
use super::role::Role;

/// Maximum stored username length.
pub const USERNAME_MAX_LEN: usize = 24;
/// Maximum stored email length.
pub const EMAIL_MAX_LEN: usize = 255;
/// Maximum stored display name length.
pub const NAME_MAX_LEN: usize = 128;
/// Maximum stored IP address length (fits a full IPv6 textual form).
pub const IP_MAX_LEN: usize = 45;

/// An account of the application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Identity {
    /// Unique identifier.
    pub id: IdentityId,
    /// Role of the account.
    pub role: Role,
    /// Whether the account may sign in.
    #[sqlx(rename = "is_active")]
    pub active: bool,
    /// Unique login name, stored lowercase.
    pub username: Option<String>,
    /// Unique email address.
    pub email: String,
    /// Argon2 password hash; empty when no credential was ever set.
    #[serde(skip_serializing)]
    pub password_hash: String,
    /// Display name.
    pub name: Option<String>,
    /// Customer id at the billing provider.
    pub external_billing_id: Option<String>,
    /// When the subscription was cancelled, if it was.
    pub subscription_cancelled_at: Option<DateTime<Utc>>,
    /// Number of successful sign-ins.
    pub sign_in_count: i32,
    pub current_sign_in_at: Option<DateTime<Utc>>,
    pub current_sign_in_ip: Option<String>,
    pub last_sign_in_at: Option<DateTime<Utc>>,
    pub last_sign_in_ip: Option<String>,
    /// When the identity was created.
    pub created_at: DateTime<Utc>,
    /// When the identity was last updated.
    pub updated_at: DateTime<Utc>,
}

/// A recorded sign-in: when and from where.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignIn {
    pub at: DateTime<Utc>,
    pub ip: Option<String>,
}

impl Identity {
    /// Check if this identity has admin privileges.
    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }

    /// Whether a password was ever set.
    pub fn has_credential(&self) -> bool {
        !self.password_hash.is_empty()
    }

    /// Key under which billing records (credit card, subscription, invoices)
    /// reference this identity.
    pub fn billing_key(&self) -> IdentityId {
        self.id
    }

    /// The most recent sign-in, if any.
    pub fn current_sign_in(&self) -> Option<SignIn> {
        self.current_sign_in_at.map(|at| SignIn {
            at,
            ip: self.current_sign_in_ip.clone(),
        })
    }

    /// The sign-in before the most recent one, if any.
    pub fn last_sign_in(&self) -> Option<SignIn> {
        self.last_sign_in_at.map(|at| SignIn {
            at,
            ip: self.last_sign_in_ip.clone(),
        })
    }

    /// Apply one sign-in event: bump the counter, shift the current sign-in
    /// into the last slot and record the new one.
    pub fn apply_sign_in(&mut self, ip: &str, at: DateTime<Utc>) {
        self.sign_in_count += 1;
        self.last_sign_in_at = self.current_sign_in_at.take();
        self.last_sign_in_ip = self.current_sign_in_ip.take();
        self.current_sign_in_at = Some(at);
        self.current_sign_in_ip = Some(ip.to_string());
        self.updated_at = at;
    }

    /// Apply a role/activation change; unset fields keep their value.
    pub fn apply_access(&mut self, change: &AccessChange, at: DateTime<Utc>) {
        (self.role, self.active) = change.resolve(self);
        self.updated_at = at;
    }
}

/// Lowercase a username the way it is stored. Blank usernames are dropped.
pub fn normalize_username(username: &str) -> Option<String> {
    let trimmed = username.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_lowercase())
    }
}

/// Data required to create a new identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewIdentity {
    /// Email address.
    pub email: String,
    /// Normalized username.
    pub username: Option<String>,
    /// Pre-hashed password (empty for "no password").
    #[serde(skip_serializing)]
    pub password_hash: String,
    /// Display name.
    pub name: Option<String>,
    /// Assigned role.
    pub role: Role,
    /// Initial activation state.
    pub active: bool,
}

impl NewIdentity {
    /// Create a member identity; the username is normalized to lowercase.
    pub fn new(
        email: impl Into<String>,
        username: Option<&str>,
        password_hash: impl Into<String>,
    ) -> Self {
        Self {
            email: email.into().trim().to_string(),
            username: username.and_then(normalize_username),
            password_hash: password_hash.into(),
            name: None,
            role: Role::default(),
            active: true,
        }
    }

    /// Set the role.
    pub fn with_role(mut self, role: Role) -> Self {
        self.role = role;
        self
    }

    /// Set the display name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the activation state.
    pub fn with_active(mut self, active: bool) -> Self {
        self.active = active;
        self
    }

    /// Check field shapes before the record reaches the store.
    pub fn validate(&self) -> AppResult<()> {
        if self.email.is_empty() || !self.email.contains('@') {
            return Err(AppError::validation("A valid email address is required"));
        }
        if self.email.len() > EMAIL_MAX_LEN {
            return Err(AppError::validation(format!(
                "Email must be at most {EMAIL_MAX_LEN} characters"
            )));
        }
        if let Some(username) = &self.username {
            if username.len() > USERNAME_MAX_LEN {
                return Err(AppError::validation(format!(
                    "Username must be at most {USERNAME_MAX_LEN} characters"
                )));
            }
            if !username
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '.')
            {
                return Err(AppError::validation(
                    "Username may only contain letters, digits, '_', '-' and '.'",
                ));
            }
        }
        if self.name.as_ref().is_some_and(|n| n.len() > NAME_MAX_LEN) {
            return Err(AppError::validation(format!(
                "Name must be at most {NAME_MAX_LEN} characters"
            )));
        }
        Ok(())
    }

    /// Materialize the record with a fresh id and timestamps.
    pub fn into_identity(self, now: DateTime<Utc>) -> Identity {
        Identity {
            id: IdentityId::new(),
            role: self.role,
            active: self.active,
            username: self.username,
            email: self.email,
            password_hash: self.password_hash,
            name: self.name,
            external_billing_id: None,
            subscription_cancelled_at: None,
            sign_in_count: 0,
            current_sign_in_at: None,
            current_sign_in_ip: None,
            last_sign_in_at: None,
            last_sign_in_ip: None,
            created_at: now,
            updated_at: now,
        }
    }
}
