//! Search predicates over identities.
//!
//! A predicate is a plain value: stores translate it into their own query
//! language, and [`SearchPredicate::matches`] evaluates it in memory.

use serde::{Deserialize, Serialize};

use crate::identity::Identity;

/// Text fields an identity search can match against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchField {
    Email,
    Name,
    Username,
}

impl SearchField {
    /// Fields searched when the caller does not pick any.
    pub const DEFAULT: [SearchField; 2] = [SearchField::Email, SearchField::Name];

    /// Column name in the identity table.
    pub fn column(&self) -> &'static str {
        match self {
            Self::Email => "email",
            Self::Name => "name",
            Self::Username => "username",
        }
    }

    fn value<'a>(&self, identity: &'a Identity) -> Option<&'a str> {
        match self {
            Self::Email => Some(identity.email.as_str()),
            Self::Name => identity.name.as_deref(),
            Self::Username => identity.username.as_deref(),
        }
    }
}

/// A filter over the identity set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SearchPredicate {
    /// No filter: every identity matches.
    All,
    /// Case-insensitive substring match of `needle` on any of `fields`.
    AnyContains {
        needle: String,
        fields: Vec<SearchField>,
    },
}

impl SearchPredicate {
    /// Whether this predicate filters nothing out.
    pub fn is_match_all(&self) -> bool {
        matches!(self, Self::All)
    }

    /// Evaluate the predicate against a single identity.
    pub fn matches(&self, identity: &Identity) -> bool {
        match self {
            Self::All => true,
            Self::AnyContains { needle, fields } => {
                let needle = needle.to_lowercase();
                fields.iter().any(|field| {
                    field
                        .value(identity)
                        .is_some_and(|v| v.to_lowercase().contains(&needle))
                })
            }
        }
    }
}
