//! Argon2id password hashing and verification.

use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{
        PasswordHash, PasswordHasher as ArgonHasher, PasswordVerifier, SaltString, rand_core::OsRng,
    },
};

use catwatch_core::config::AuthConfig;
use catwatch_core::error::AppError;
use catwatch_entity::Authenticatable;

/// Hashes and verifies passwords using Argon2id with fixed cost parameters.
#[derive(Debug, Clone)]
pub struct PasswordHasher {
    params: Params,
}

impl PasswordHasher {
    /// Creates a hasher with the cost parameters from `config`.
    pub fn new(config: &AuthConfig) -> Result<Self, AppError> {
        let params = Params::new(
            config.password_hash_memory_kib,
            config.password_hash_iterations,
            config.password_hash_parallelism,
            None,
        )
        .map_err(|e| AppError::configuration(format!("Invalid password hash parameters: {e}")))?;

        Ok(Self { params })
    }

    fn argon2(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }

    /// Hashes a plaintext password with a random salt.
    ///
    /// An empty password yields an empty hash: the account is left without
    /// a usable credential.
    pub fn hash(&self, plaintext: &str) -> Result<String, AppError> {
        if plaintext.is_empty() {
            return Ok(String::new());
        }

        let salt = SaltString::generate(&mut OsRng);
        let hash = self
            .argon2()
            .hash_password(plaintext.as_bytes(), &salt)
            .map_err(|e| AppError::internal(format!("Password hashing failed: {e}")))?;

        Ok(hash.to_string())
    }

    /// Checks `plaintext` against a stored hash in constant time.
    ///
    /// Empty, malformed, or unsupported hashes never verify.
    pub fn verify(&self, hash: &str, plaintext: &str) -> bool {
        if hash.is_empty() {
            return false;
        }
        let Ok(parsed) = PasswordHash::new(hash) else {
            return false;
        };
        // Cost parameters are read from the hash itself.
        Argon2::default()
            .verify_password(plaintext.as_bytes(), &parsed)
            .is_ok()
    }

    /// Authenticate an account, optionally requiring its password.
    pub fn authenticated(
        &self,
        account: &impl Authenticatable,
        with_password: bool,
        password: &str,
    ) -> bool {
        if with_password {
            self.verify(account.password_hash(), password)
        } else {
            true
        }
    }
}
