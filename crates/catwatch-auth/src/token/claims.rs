//! Claims carried by auth and action tokens.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use catwatch_core::types::IdentityId;

/// Distinguishes the two token classes so neither is accepted as the other.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
    /// Long-lived "remember me" token bound to the password hash.
    Auth,
    /// Short-lived one-off token (password reset).
    Action,
}

/// Payload of an auth token. Has no expiry; it dies when the password changes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AuthClaims {
    /// Subject: the identity id.
    pub sub: IdentityId,
    /// Digest of the password hash at issuance.
    pub pwd: String,
    /// Issued-at timestamp (seconds since epoch).
    pub iat: i64,
    pub kind: TokenKind,
}

/// Payload of an action token.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ActionClaims {
    /// Email of the identity the action is for.
    pub email: String,
    /// Issued-at timestamp (seconds since epoch).
    pub iat: i64,
    /// Expiration timestamp (seconds since epoch).
    pub exp: i64,
    pub kind: TokenKind,
}

impl ActionClaims {
    /// Returns the expiration as a `DateTime<Utc>`.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.exp, 0)
    }
}

/// Hex SHA-256 of a stored password hash, as embedded in auth tokens.
pub fn password_digest(password_hash: &str) -> String {
    format!("{:x}", Sha256::digest(password_hash.as_bytes()))
}
