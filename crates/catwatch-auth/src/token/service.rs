//! Issuing and resolving signed tokens.
//!
//! Both token classes are HS256 JWTs signed with the configured secret.
//! Resolution fails closed: every failure (bad signature, malformed payload,
//! wrong kind, expiry, unknown identity, stale password digest) collapses
//! into the same authentication error so callers learn nothing about which
//! check tripped. Only storage failures surface separately.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use catwatch_core::config::AuthConfig;
use catwatch_core::error::AppError;
use catwatch_core::result::AppResult;
use catwatch_database::IdentityStore;
use catwatch_entity::Identity;

use super::claims::{ActionClaims, AuthClaims, TokenKind, password_digest};

/// Message of every token rejection.
const INVALID_TOKEN: &str = "Invalid or expired token";

fn invalid_token() -> AppError {
    AppError::authentication(INVALID_TOKEN)
}

/// Creates and verifies auth and action tokens.
#[derive(Clone)]
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    /// Lifetime used by [`TokenService::issue_default_action_token`].
    default_action_ttl_seconds: u64,
    store: Arc<dyn IdentityStore>,
}

impl std::fmt::Debug for TokenService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenService")
            .field("default_action_ttl_seconds", &self.default_action_ttl_seconds)
            .finish()
    }
}

impl TokenService {
    /// Creates a token service keyed by `config.secret_key`.
    pub fn new(config: &AuthConfig, store: Arc<dyn IdentityStore>) -> Self {
        if config.uses_default_secret() {
            warn!("Signing tokens with the default secret key; set auth.secret_key");
        }

        Self {
            encoding_key: EncodingKey::from_secret(config.secret_key.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.secret_key.as_bytes()),
            default_action_ttl_seconds: config.action_token_ttl_seconds,
            store,
        }
    }

    /// Issues a long-lived token bound to the identity's current password.
    pub fn issue_auth_token(&self, identity: &Identity) -> AppResult<String> {
        let claims = AuthClaims {
            sub: identity.id,
            pwd: password_digest(&identity.password_hash),
            iat: Utc::now().timestamp(),
            kind: TokenKind::Auth,
        };

        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| AppError::internal(format!("Failed to encode auth token: {e}")))
    }

    /// Resolves an auth token to the identity it was issued for.
    ///
    /// Fails once the identity's password has changed since issuance.
    pub async fn resolve_auth_token(&self, token: &str) -> AppResult<Identity> {
        let claims: AuthClaims = self.decode_claims(token, auth_validation())?;
        if claims.kind != TokenKind::Auth {
            debug!("Rejected token: expected auth token");
            return Err(invalid_token());
        }

        let identity = self
            .store
            .find_by_id(claims.sub)
            .await?
            .ok_or_else(invalid_token)?;

        if password_digest(&identity.password_hash) != claims.pwd {
            debug!(identity_id = %identity.id, "Rejected auth token: password changed");
            return Err(invalid_token());
        }

        Ok(identity)
    }

    /// Issues a one-off token for `identity` that expires after `ttl_seconds`.
    pub fn issue_action_token(&self, identity: &Identity, ttl_seconds: u64) -> AppResult<String> {
        let now = Utc::now();
        let exp = i64::try_from(ttl_seconds)
            .ok()
            .and_then(Duration::try_seconds)
            .and_then(|ttl| now.checked_add_signed(ttl))
            .ok_or_else(|| AppError::validation("Token lifetime is too large"))?;

        let claims = ActionClaims {
            email: identity.email.clone(),
            iat: now.timestamp(),
            exp: exp.timestamp(),
            kind: TokenKind::Action,
        };

        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| AppError::internal(format!("Failed to encode action token: {e}")))
    }

    /// Issues an action token with the configured default lifetime.
    pub fn issue_default_action_token(&self, identity: &Identity) -> AppResult<String> {
        self.issue_action_token(identity, self.default_action_ttl_seconds)
    }

    /// Resolves an unexpired action token to the identity owning its email.
    pub async fn resolve_action_token(&self, token: &str) -> AppResult<Identity> {
        let claims: ActionClaims = self.decode_claims(token, action_validation())?;
        if claims.kind != TokenKind::Action {
            debug!("Rejected token: expected action token");
            return Err(invalid_token());
        }

        self.store
            .find_by_login(&claims.email, &claims.email)
            .await?
            .filter(|identity| identity.email == claims.email)
            .ok_or_else(invalid_token)
    }

    fn decode_claims<T: DeserializeOwned + Clone>(
        &self,
        token: &str,
        validation: Validation,
    ) -> AppResult<T> {
        decode::<T>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| {
                debug!(reason = %e, "Rejected token");
                invalid_token()
            })
    }
}

/// Signature only: auth tokens carry no expiry.
fn auth_validation() -> Validation {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = false;
    validation.required_spec_claims = HashSet::new();
    validation
}

/// Signature plus strict expiry.
fn action_validation() -> Validation {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = true;
    validation.leeway = 0;
    validation
}

#[cfg(test)]
mod tests {
    use catwatch_core::ErrorKind;
    use catwatch_database::MemoryIdentityStore;
    use catwatch_entity::NewIdentity;

    use super::*;

    fn config(secret: &str) -> AuthConfig {
        AuthConfig {
            secret_key: secret.to_string(),
            ..AuthConfig::default()
        }
    }

    async fn setup() -> (TokenService, Arc<MemoryIdentityStore>, Identity) {
        let store = Arc::new(MemoryIdentityStore::new());
        let identity = store
            .insert(&NewIdentity::new("cat@example.com", Some("cat"), "$argon2id$first"))
            .await
            .unwrap();
        let service = TokenService::new(&config("test-secret"), store.clone());
        (service, store, identity)
    }

    #[tokio::test]
    async fn test_auth_token_resolves_to_identity() {
        let (service, _, identity) = setup().await;
        let token = service.issue_auth_token(&identity).unwrap();

        assert!(!token.contains(['+', '/', '=']));
        assert_eq!(service.resolve_auth_token(&token).await.unwrap(), identity);
    }

    #[tokio::test]
    async fn test_password_change_revokes_auth_token() {
        let (service, store, identity) = setup().await;
        let token = service.issue_auth_token(&identity).unwrap();

        store
            .update_password(identity.id, "$argon2id$second")
            .await
            .unwrap();

        let err = service.resolve_auth_token(&token).await.unwrap_err();
        assert!(err.is(ErrorKind::Authentication));
        assert_eq!(err.message, INVALID_TOKEN);
    }

    #[tokio::test]
    async fn test_tokens_from_another_secret_are_rejected() {
        let (service, store, identity) = setup().await;
        let forger = TokenService::new(&config("other-secret"), store);
        let token = forger.issue_auth_token(&identity).unwrap();

        assert!(service.resolve_auth_token(&token).await.is_err());
    }

    #[tokio::test]
    async fn test_token_kinds_are_not_interchangeable() {
        let (service, _, identity) = setup().await;
        let auth = service.issue_auth_token(&identity).unwrap();
        let action = service.issue_action_token(&identity, 60).unwrap();

        assert!(service.resolve_action_token(&auth).await.is_err());
        assert!(service.resolve_auth_token(&action).await.is_err());
    }

    #[tokio::test]
    async fn test_garbage_is_rejected_uniformly() {
        let (service, _, _) = setup().await;
        for token in ["", "abc", "a.b.c"] {
            let auth_err = service.resolve_auth_token(token).await.unwrap_err();
            let action_err = service.resolve_action_token(token).await.unwrap_err();
            assert_eq!(auth_err.message, INVALID_TOKEN);
            assert_eq!(action_err.message, INVALID_TOKEN);
        }
    }

    #[tokio::test]
    async fn test_action_token_resolves_then_expires() {
        let (service, _, identity) = setup().await;
        let token = service.issue_action_token(&identity, 1).unwrap();

        assert_eq!(service.resolve_action_token(&token).await.unwrap().id, identity.id);
        // Reuse inside the window is allowed.
        assert!(service.resolve_action_token(&token).await.is_ok());

        tokio::time::sleep(std::time::Duration::from_millis(2_100)).await;
        let err = service.resolve_action_token(&token).await.unwrap_err();
        assert!(err.is(ErrorKind::Authentication));
    }

    #[tokio::test]
    async fn test_oversized_action_ttl_is_rejected() {
        let (service, _, identity) = setup().await;

        for ttl in [1u64 << 60, i64::MAX as u64, u64::MAX] {
            let err = service.issue_action_token(&identity, ttl).unwrap_err();
            assert!(err.is(ErrorKind::Validation));
        }

        // Ten years still fits.
        assert!(service.issue_action_token(&identity, 10 * 365 * 86_400).is_ok());
    }

    #[tokio::test]
    async fn test_oversized_default_ttl_is_rejected() {
        let store = Arc::new(MemoryIdentityStore::new());
        let identity = store
            .insert(&NewIdentity::new("cat@example.com", None, ""))
            .await
            .unwrap();
        let service = TokenService::new(
            &AuthConfig {
                action_token_ttl_seconds: u64::MAX,
                ..config("test-secret")
            },
            store,
        );

        let err = service.issue_default_action_token(&identity).unwrap_err();
        assert!(err.is(ErrorKind::Validation));
    }

    #[tokio::test]
    async fn test_default_action_ttl_comes_from_config() {
        let (service, _, identity) = setup().await;
        let token = service.issue_default_action_token(&identity).unwrap();

        let claims: ActionClaims = service.decode_claims(&token, action_validation()).unwrap();
        assert_eq!(claims.exp - claims.iat, 3600);
        let expires_at = claims.expires_at().unwrap();
        assert_eq!(expires_at.timestamp(), claims.exp);
        assert!(expires_at > Utc::now());
    }

    #[tokio::test]
    async fn test_action_token_for_unknown_email_is_rejected() {
        let (service, _, mut identity) = setup().await;
        identity.email = "ghost@example.com".to_string();
        let token = service.issue_action_token(&identity, 60).unwrap();

        assert!(service.resolve_action_token(&token).await.is_err());
    }
}
