//! Authentication configuration.

use serde::{Deserialize, Serialize};

/// Placeholder secret shipped as the default; never acceptable in production.
pub const DEFAULT_SECRET_KEY: &str = "CHANGE_ME_IN_PRODUCTION";

/// Credential hashing and token signing configuration.
#[derive(Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Process-wide secret used to sign auth and action tokens (HMAC-SHA256).
    ///
    /// Must stay stable across restarts for auth tokens to remain valid.
    #[serde(default = "default_secret_key")]
    pub secret_key: String,
    /// Default lifetime of action tokens (password reset links) in seconds.
    #[serde(default = "default_action_ttl")]
    pub action_token_ttl_seconds: u64,
    /// Argon2 memory cost in KiB.
    #[serde(default = "default_memory_kib")]
    pub password_hash_memory_kib: u32,
    /// Argon2 iteration count.
    #[serde(default = "default_iterations")]
    pub password_hash_iterations: u32,
    /// Argon2 degree of parallelism.
    #[serde(default = "default_parallelism")]
    pub password_hash_parallelism: u32,
}

impl AuthConfig {
    /// Whether the placeholder secret is still in use.
    pub fn uses_default_secret(&self) -> bool {
        self.secret_key == DEFAULT_SECRET_KEY
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            secret_key: default_secret_key(),
            action_token_ttl_seconds: default_action_ttl(),
            password_hash_memory_kib: default_memory_kib(),
            password_hash_iterations: default_iterations(),
            password_hash_parallelism: default_parallelism(),
        }
    }
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("secret_key", &"****")
            .field("action_token_ttl_seconds", &self.action_token_ttl_seconds)
            .field("password_hash_memory_kib", &self.password_hash_memory_kib)
            .field("password_hash_iterations", &self.password_hash_iterations)
            .field("password_hash_parallelism", &self.password_hash_parallelism)
            .finish()
    }
}

fn default_secret_key() -> String {
    DEFAULT_SECRET_KEY.to_string()
}

fn default_action_ttl() -> u64 {
    3600
}

fn default_memory_kib() -> u32 {
    19_456
}

fn default_iterations() -> u32 {
    2
}

fn default_parallelism() -> u32 {
    1
}
