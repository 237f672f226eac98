//! # catwatch-auth
//!
//! Credential primitives for the identity kernel.
//!
//! ## Modules
//!
//! - `password`: Argon2id password hashing and verification
//! - `token`: signed auth tokens (bound to the password hash) and
//!   expiring action tokens (password reset links)

pub mod password;
pub mod token;

pub use password::PasswordHasher;
pub use token::TokenService;
