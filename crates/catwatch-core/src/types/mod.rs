//! Core type definitions used across the Catwatch workspace.

pub mod id;

pub use id::IdentityId;
