//! # catwatch-service
//!
//! Identity use cases built on an [`IdentityStore`](catwatch_database::IdentityStore):
//! lookup and search, the last-administrator safeguard, sign-in tracking,
//! and the [`IdentityService`] facade that ties them to password hashing
//! and tokens.
//!
//! Services take their collaborators at construction time via `Arc`.

pub mod identity;

pub use identity::{
    ActivityTracker, AdminSafeguard, IdentityLookup, IdentityService, RegisterIdentity,
};
