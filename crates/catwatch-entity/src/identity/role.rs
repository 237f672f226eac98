//! Identity role enumeration.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Roles an identity can hold.
///
/// Declaration order is the presentation order used by forms and listings;
/// it carries no privilege semantics.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type,
)]
#[sqlx(type_name = "role_types", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Visitor with no paid membership.
    Guest,
    /// Regular account holder.
    #[default]
    Member,
    /// Administrator of the application.
    Admin,
}

impl Role {
    /// All roles in presentation order.
    pub const ALL: [Role; 3] = [Role::Guest, Role::Member, Role::Admin];

    /// Check if this role is an admin.
    pub fn is_admin(&self) -> bool {
        matches!(self, Self::Admin)
    }

    /// Return the role as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Guest => "guest",
            Self::Member => "member",
            Self::Admin => "admin",
        }
    }

    /// Human-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Guest => "Guest",
            Self::Member => "Member",
            Self::Admin => "Admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Role {
    type Err = catwatch_core::AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "guest" => Ok(Self::Guest),
            "member" => Ok(Self::Member),
            "admin" => Ok(Self::Admin),
            _ => Err(catwatch_core::AppError::validation(format!(
                "Invalid role: '{s}'. Expected one of: guest, member, admin"
            ))),
        }
    }
}
