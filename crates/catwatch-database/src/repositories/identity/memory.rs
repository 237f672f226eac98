//! In-memory identity store using a Tokio mutex.
//!
//! Suitable for single-process deployments and tests. Every operation holds
//! the mutex for its whole duration, which makes guarded access changes
//! serializable.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tracing::debug;

use catwatch_core::error::AppError;
use catwatch_core::result::AppResult;
use catwatch_core::types::IdentityId;
use catwatch_entity::{AccessChange, AdminCensus, Identity, NewIdentity, SearchPredicate};

use super::{AccessGuard, AccessOutcome, CountFilter, IdentityStore};

/// In-memory [`IdentityStore`].
#[derive(Debug, Clone, Default)]
pub struct MemoryIdentityStore {
    identities: Arc<Mutex<HashMap<IdentityId, Identity>>>,
}

impl MemoryIdentityStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored identities.
    pub async fn len(&self) -> usize {
        self.identities.lock().await.len()
    }

    /// Whether the store is empty.
    pub async fn is_empty(&self) -> bool {
        self.identities.lock().await.is_empty()
    }
}

fn census(identities: &HashMap<IdentityId, Identity>) -> AdminCensus {
    AdminCensus {
        admins: count_matching(identities, CountFilter::Role(catwatch_entity::Role::Admin)),
        active: count_matching(identities, CountFilter::Active(true)),
    }
}

fn count_matching(identities: &HashMap<IdentityId, Identity>, filter: CountFilter) -> u64 {
    identities.values().filter(|i| filter.matches(i)).count() as u64
}

fn missing(id: IdentityId) -> AppError {
    AppError::not_found(format!("Identity {id} not found"))
}

#[async_trait]
impl IdentityStore for MemoryIdentityStore {
    async fn insert(&self, new: &NewIdentity) -> AppResult<Identity> {
        let mut identities = self.identities.lock().await;

        if identities.values().any(|i| i.email == new.email) {
            return Err(AppError::conflict("Email already in use"));
        }
        if let Some(username) = &new.username {
            if identities
                .values()
                .any(|i| i.username.as_deref() == Some(username.as_str()))
            {
                return Err(AppError::conflict(format!(
                    "Username '{username}' already exists"
                )));
            }
        }

        let identity = new.clone().into_identity(Utc::now());
        identities.insert(identity.id, identity.clone());
        debug!(identity_id = %identity.id, "Identity inserted");
        Ok(identity)
    }

    async fn find_by_id(&self, id: IdentityId) -> AppResult<Option<Identity>> {
        Ok(self.identities.lock().await.get(&id).cloned())
    }

    async fn find_by_login(&self, email: &str, username: &str) -> AppResult<Option<Identity>> {
        let identities = self.identities.lock().await;

        let by_email = identities.values().find(|i| i.email == email);
        let found = by_email.or_else(|| {
            identities
                .values()
                .find(|i| i.username.as_deref() == Some(username))
        });
        Ok(found.cloned())
    }

    async fn search(&self, predicate: &SearchPredicate) -> AppResult<Vec<Identity>> {
        let identities = self.identities.lock().await;
        let mut found: Vec<Identity> = identities
            .values()
            .filter(|i| predicate.matches(i))
            .cloned()
            .collect();
        found.sort_by(|a, b| a.email.cmp(&b.email));
        Ok(found)
    }

    async fn count(&self, filter: CountFilter) -> AppResult<u64> {
        Ok(count_matching(&*self.identities.lock().await, filter))
    }

    async fn update_password(&self, id: IdentityId, password_hash: &str) -> AppResult<Identity> {
        let mut identities = self.identities.lock().await;
        let identity = identities.get_mut(&id).ok_or_else(|| missing(id))?;
        identity.password_hash = password_hash.to_string();
        identity.updated_at = Utc::now();
        Ok(identity.clone())
    }

    async fn record_sign_in(
        &self,
        id: IdentityId,
        ip: &str,
        at: DateTime<Utc>,
    ) -> AppResult<Identity> {
        let mut identities = self.identities.lock().await;
        let identity = identities.get_mut(&id).ok_or_else(|| missing(id))?;
        identity.apply_sign_in(ip, at);
        Ok(identity.clone())
    }

    async fn change_access(
        &self,
        id: IdentityId,
        change: AccessChange,
        guard: AccessGuard<'_>,
    ) -> AppResult<AccessOutcome> {
        let mut identities = self.identities.lock().await;

        let current = identities.get(&id).cloned().ok_or_else(|| missing(id))?;
        let census = census(&identities);
        if guard(&current, &change, census) {
            return Ok(AccessOutcome::Forbidden { census });
        }

        let identity = identities.get_mut(&id).ok_or_else(|| missing(id))?;
        identity.apply_access(&change, Utc::now());
        Ok(AccessOutcome::Applied(identity.clone()))
    }

    async fn health_check(&self) -> AppResult<bool> {
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use catwatch_core::ErrorKind;
    use catwatch_entity::{Role, SearchField};

    use super::*;

    async fn seeded() -> MemoryIdentityStore {
        let store = MemoryIdentityStore::new();
        store
            .insert(&NewIdentity::new("root@example.com", Some("Root"), "h").with_role(Role::Admin))
            .await
            .unwrap();
        store
            .insert(&NewIdentity::new("bob@example.com", Some("bob"), "h").with_name("Bob Stone"))
            .await
            .unwrap();
        store
    }

    #[tokio::test]
    async fn test_insert_rejects_duplicates() {
        let store = seeded().await;

        let dup_email = store
            .insert(&NewIdentity::new("bob@example.com", None, ""))
            .await
            .unwrap_err();
        assert!(dup_email.is(ErrorKind::Conflict));

        let dup_username = store
            .insert(&NewIdentity::new("other@example.com", Some("BOB"), ""))
            .await
            .unwrap_err();
        assert!(dup_username.is(ErrorKind::Conflict));
        assert_eq!(store.len().await, 2);
    }

    #[tokio::test]
    async fn test_find_by_login_matches_email_or_username() {
        let store = seeded().await;

        let by_email = store.find_by_login("bob@example.com", "x").await.unwrap();
        assert_eq!(by_email.unwrap().username.as_deref(), Some("bob"));

        let by_username = store.find_by_login("root", "root").await.unwrap();
        assert_eq!(by_username.unwrap().email, "root@example.com");

        assert!(store.find_by_login("nobody", "nobody").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_search_and_count() {
        let store = seeded().await;

        let all = store.search(&SearchPredicate::All).await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].email, "bob@example.com");

        let stones = store
            .search(&SearchPredicate::AnyContains {
                needle: "stone".to_string(),
                fields: SearchField::DEFAULT.to_vec(),
            })
            .await
            .unwrap();
        assert_eq!(stones.len(), 1);

        assert_eq!(store.count(CountFilter::Role(Role::Admin)).await.unwrap(), 1);
        assert_eq!(store.count(CountFilter::Active(true)).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_change_access_respects_guard() {
        let store = seeded().await;
        let root = store.find_by_login("root@example.com", "").await.unwrap().unwrap();
        let demote = AccessChange::new(Role::Member, true);

        let outcome = store
            .change_access(root.id, demote, &|_, _, census| census.admins == 1)
            .await
            .unwrap();
        assert_eq!(
            outcome,
            AccessOutcome::Forbidden {
                census: AdminCensus { admins: 1, active: 2 }
            }
        );

        let outcome = store
            .change_access(root.id, demote, &|_, _, _| false)
            .await
            .unwrap();
        match outcome {
            AccessOutcome::Applied(identity) => assert_eq!(identity.role, Role::Member),
            other => panic!("expected applied change, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_mutations_on_missing_identity() {
        let store = MemoryIdentityStore::new();
        let err = store
            .record_sign_in(IdentityId::new(), "127.0.0.1", Utc::now())
            .await
            .unwrap_err();
        assert!(err.is(ErrorKind::NotFound));
    }
}
