//! End-to-end behavior of the identity services over the in-memory store.

use std::sync::Arc;

use catwatch_core::ErrorKind;
use catwatch_core::config::AuthConfig;
use catwatch_database::{IdentityStore, MemoryIdentityStore};
use catwatch_entity::{AccessChange, Identity, Role, SearchField};
use catwatch_service::{IdentityService, RegisterIdentity};

fn test_config() -> AuthConfig {
    AuthConfig {
        secret_key: "integration-secret".to_string(),
        password_hash_memory_kib: 1024,
        password_hash_iterations: 1,
        ..AuthConfig::default()
    }
}

fn setup() -> (IdentityService, Arc<MemoryIdentityStore>) {
    let store = Arc::new(MemoryIdentityStore::new());
    let service = IdentityService::new(&test_config(), store.clone()).unwrap();
    (service, store)
}

fn request(email: &str, username: Option<&str>, password: &str, role: Role) -> RegisterIdentity {
    RegisterIdentity {
        email: email.to_string(),
        username: username.map(str::to_string),
        password: password.to_string(),
        name: None,
        role,
    }
}

async fn register(service: &IdentityService, email: &str, role: Role) -> Identity {
    service
        .register(request(email, None, "hunter22", role))
        .await
        .unwrap()
}

#[tokio::test]
async fn test_register_normalizes_and_rejects_duplicates() {
    let (service, _) = setup();

    let bob = service
        .register(request("bob@example.com", Some("BOB"), "pw", Role::Member))
        .await
        .unwrap();
    assert_eq!(bob.username.as_deref(), Some("bob"));
    assert!(bob.password_hash.starts_with("$argon2id$"));

    let err = service
        .register(request("other@example.com", Some("Bob"), "pw", Role::Member))
        .await
        .unwrap_err();
    assert!(err.is(ErrorKind::Conflict));

    let err = service
        .register(request("not-an-email", None, "pw", Role::Member))
        .await
        .unwrap_err();
    assert!(err.is(ErrorKind::Validation));
}

#[tokio::test]
async fn test_find_by_identity_matches_email_or_username() {
    let (service, _) = setup();
    let bob = service
        .register(request("Bob@Example.com", Some("BOB"), "pw", Role::Member))
        .await
        .unwrap();

    let lookup = service.lookup();
    assert_eq!(lookup.find_by_identity("Bob").await.unwrap().unwrap().id, bob.id);
    assert_eq!(lookup.find_by_identity("bob").await.unwrap().unwrap().id, bob.id);
    assert_eq!(
        lookup.find_by_identity("Bob@Example.com").await.unwrap().unwrap().id,
        bob.id
    );
    assert!(lookup.find_by_identity("carol").await.unwrap().is_none());
    assert!(lookup.find_by_identity("").await.unwrap().is_none());
}

#[tokio::test]
async fn test_search_with_blank_query_returns_everyone() {
    let (service, _) = setup();
    register(&service, "alice@example.com", Role::Admin).await;
    service
        .register(RegisterIdentity {
            name: Some("Bob Stone".to_string()),
            ..request("bob@example.com", None, "pw", Role::Member)
        })
        .await
        .unwrap();

    let lookup = service.lookup();
    assert_eq!(lookup.search("", &SearchField::DEFAULT).await.unwrap().len(), 2);

    let hits = lookup.search("STONE", &SearchField::DEFAULT).await.unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].email, "bob@example.com");

    assert!(lookup.search("stone", &[SearchField::Email]).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_sign_in_records_activity() {
    let (service, _) = setup();
    let bob = service
        .register(request("bob@example.com", Some("bob"), "secret", Role::Member))
        .await
        .unwrap();

    assert!(service.sign_in("bob", "wrong", "10.0.0.1").await.unwrap().is_none());
    assert!(service.sign_in("nobody", "secret", "10.0.0.1").await.unwrap().is_none());

    let first = service
        .sign_in("bob", "secret", "10.0.0.1")
        .await
        .unwrap()
        .unwrap();
    let second = service
        .sign_in("bob@example.com", "secret", "10.0.0.2")
        .await
        .unwrap()
        .unwrap();

    assert_eq!(second.id, bob.id);
    assert_eq!(second.sign_in_count, 2);
    assert_eq!(second.last_sign_in_at, first.current_sign_in_at);
    assert_eq!(second.last_sign_in_ip.as_deref(), Some("10.0.0.1"));
    assert_eq!(second.current_sign_in_ip.as_deref(), Some("10.0.0.2"));
}

#[tokio::test]
async fn test_sign_in_rejects_deactivated_identity() {
    let (service, _) = setup();
    register(&service, "root@example.com", Role::Admin).await;
    let bob = register(&service, "bob@example.com", Role::Member).await;

    service
        .change_access(bob.id, AccessChange::new(Role::Member, false))
        .await
        .unwrap();

    let err = service
        .sign_in("bob@example.com", "hunter22", "10.0.0.1")
        .await
        .unwrap_err();
    assert!(err.is(ErrorKind::Authentication));
}

#[tokio::test]
async fn test_record_sign_in_rejects_oversized_ip() {
    let (service, _) = setup();
    let bob = register(&service, "bob@example.com", Role::Member).await;

    let err = service
        .activity()
        .record_sign_in(bob.id, &"1".repeat(46))
        .await
        .unwrap_err();
    assert!(err.is(ErrorKind::Validation));
}

#[tokio::test]
async fn test_password_change_revokes_auth_tokens() {
    let (service, _) = setup();
    let bob = register(&service, "bob@example.com", Role::Member).await;

    let token = service.tokens().issue_auth_token(&bob).unwrap();
    assert_eq!(service.tokens().resolve_auth_token(&token).await.unwrap().id, bob.id);

    let updated = service.change_password(bob.id, "new-password").await.unwrap();
    assert!(service.hasher().verify(&updated.password_hash, "new-password"));

    let err = service.tokens().resolve_auth_token(&token).await.unwrap_err();
    assert!(err.is(ErrorKind::Authentication));

    let fresh = service.tokens().issue_auth_token(&updated).unwrap();
    assert!(service.tokens().resolve_auth_token(&fresh).await.is_ok());
}

#[tokio::test]
async fn test_password_reset_flow() {
    let (service, _) = setup();
    let bob = register(&service, "bob@example.com", Role::Member).await;

    assert!(service.request_password_reset("nobody").await.unwrap().is_none());

    let token = service
        .request_password_reset("bob@example.com")
        .await
        .unwrap()
        .unwrap();
    let updated = service.reset_password(&token, "reset-pw").await.unwrap();
    assert_eq!(updated.id, bob.id);
    assert!(service.sign_in("bob@example.com", "reset-pw", "::1").await.unwrap().is_some());

    let err = service.reset_password("garbage", "x").await.unwrap_err();
    assert!(err.is(ErrorKind::Authentication));
}

#[tokio::test]
async fn test_forbids_change_follows_admin_count() {
    let (service, _) = setup();
    let alice = register(&service, "alice@example.com", Role::Admin).await;
    register(&service, "bob@example.com", Role::Member).await;

    let safeguard = service.safeguard();
    assert!(safeguard.forbids_change(&alice, Role::Member, true).await.unwrap());

    register(&service, "carol@example.com", Role::Admin).await;
    assert!(!safeguard.forbids_change(&alice, Role::Member, true).await.unwrap());
}

#[tokio::test]
async fn test_last_admin_cannot_be_demoted() {
    let (service, store) = setup();
    let alice = register(&service, "alice@example.com", Role::Admin).await;
    register(&service, "bob@example.com", Role::Member).await;

    let err = service
        .change_access(alice.id, AccessChange::new(Role::Member, true))
        .await
        .unwrap_err();
    assert!(err.is(ErrorKind::Forbidden));

    let stored = store.find_by_id(alice.id).await.unwrap().unwrap();
    assert_eq!(stored.role, Role::Admin);
}

#[tokio::test]
async fn test_role_change_keeps_activation_set_after_lookup() {
    let (service, store) = setup();
    register(&service, "alice@example.com", Role::Admin).await;
    register(&service, "carol@example.com", Role::Admin).await;
    let bob = register(&service, "bob@example.com", Role::Member).await;
    assert!(bob.active);

    // Another operator deactivates bob after `bob` was read.
    service
        .change_access(bob.id, AccessChange::default().with_active(false))
        .await
        .unwrap();

    let updated = service
        .change_access(bob.id, AccessChange::default().with_role(Role::Admin))
        .await
        .unwrap();
    assert_eq!(updated.role, Role::Admin);
    assert!(!updated.active);

    let stored = store.find_by_id(bob.id).await.unwrap().unwrap();
    assert_eq!((stored.role, stored.active), (Role::Admin, false));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_concurrent_demotions_leave_one_admin() {
    let (service, store) = setup();
    let a = register(&service, "a@example.com", Role::Admin).await;
    let b = register(&service, "b@example.com", Role::Admin).await;
    register(&service, "c@example.com", Role::Member).await;

    let demote = AccessChange::new(Role::Member, true);
    let (sa, sb) = (service.clone(), service.clone());
    let ta = tokio::spawn(async move { sa.change_access(a.id, demote).await });
    let tb = tokio::spawn(async move { sb.change_access(b.id, demote).await });

    let results = [ta.await.unwrap(), tb.await.unwrap()];
    let committed = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(committed, 1);
    assert!(
        results
            .iter()
            .any(|r| r.as_ref().is_err_and(|e| e.is(ErrorKind::Forbidden)))
    );

    let admins = store
        .search(&catwatch_entity::SearchPredicate::All)
        .await
        .unwrap()
        .into_iter()
        .filter(Identity::is_admin)
        .count();
    assert_eq!(admins, 1);
}

#[tokio::test]
async fn test_change_access_on_missing_identity() {
    let (service, _) = setup();
    let err = service
        .change_access(
            catwatch_core::types::IdentityId::new(),
            AccessChange::new(Role::Member, true),
        )
        .await
        .unwrap_err();
    assert!(err.is(ErrorKind::NotFound));
}
