//! Signed auth and action tokens.

pub mod claims;
pub mod service;

pub use claims::{ActionClaims, AuthClaims, TokenKind};
pub use service::TokenService;
