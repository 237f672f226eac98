//! Identity persistence.
//!
//! [`IdentityStore`] is the minimum query surface the identity services
//! need: exact lookup, case-insensitive search, count by predicate, and a
//! handful of atomic mutations. Two implementations are provided:
//! - [`PgIdentityStore`] backed by PostgreSQL
//! - [`MemoryIdentityStore`] backed by a `tokio::sync::Mutex`

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use catwatch_core::result::AppResult;
use catwatch_core::types::IdentityId;
use catwatch_entity::{AccessChange, AdminCensus, Identity, NewIdentity, Role, SearchPredicate};

pub use memory::MemoryIdentityStore;
pub use postgres::PgIdentityStore;

/// Predicate for [`IdentityStore::count`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CountFilter {
    /// Identities holding the given role.
    Role(Role),
    /// Identities with the given activation state.
    Active(bool),
}

impl CountFilter {
    /// Evaluate the filter against a single identity.
    pub fn matches(&self, identity: &Identity) -> bool {
        match self {
            Self::Role(role) => identity.role == *role,
            Self::Active(active) => identity.active == *active,
        }
    }
}

/// Veto callback evaluated inside [`IdentityStore::change_access`].
///
/// Receives the identity as currently stored, the pending change, and a
/// census taken in the same critical section. Returns `true` to forbid.
pub type AccessGuard<'a> = &'a (dyn Fn(&Identity, &AccessChange, AdminCensus) -> bool + Send + Sync);

/// Result of a guarded access change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessOutcome {
    /// The change was committed; carries the updated identity.
    Applied(Identity),
    /// The guard vetoed the change; nothing was written.
    Forbidden {
        /// Census the guard was shown.
        census: AdminCensus,
    },
}

/// Storage collaborator for identities.
#[async_trait]
pub trait IdentityStore: Send + Sync + 'static {
    /// Persist a new identity. Duplicate email or username is a conflict.
    async fn insert(&self, new: &NewIdentity) -> AppResult<Identity>;

    /// Find an identity by primary key.
    async fn find_by_id(&self, id: IdentityId) -> AppResult<Option<Identity>>;

    /// Find the identity whose email equals `email` or whose username equals
    /// `username`. Both comparisons are exact; an email match wins.
    async fn find_by_login(&self, email: &str, username: &str) -> AppResult<Option<Identity>>;

    /// Return all identities matching `predicate`, ordered by email.
    async fn search(&self, predicate: &SearchPredicate) -> AppResult<Vec<Identity>>;

    /// Count identities matching `filter`.
    async fn count(&self, filter: CountFilter) -> AppResult<u64>;

    /// Replace the stored password hash.
    async fn update_password(&self, id: IdentityId, password_hash: &str) -> AppResult<Identity>;

    /// Record one sign-in atomically: increment the counter, shift current
    /// sign-in data into the last slot, store `at`/`ip` as current.
    async fn record_sign_in(
        &self,
        id: IdentityId,
        ip: &str,
        at: DateTime<Utc>,
    ) -> AppResult<Identity>;

    /// Apply a role/activation change if `guard` allows it.
    ///
    /// Reading the identity, taking the census, and writing the change form
    /// one serialized unit: no other access change can commit in between.
    async fn change_access(
        &self,
        id: IdentityId,
        change: AccessChange,
        guard: AccessGuard<'_>,
    ) -> AppResult<AccessOutcome>;

    /// Check that the backend is reachable.
    async fn health_check(&self) -> AppResult<bool>;
}

impl std::fmt::Debug for dyn IdentityStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("dyn IdentityStore")
    }
}
