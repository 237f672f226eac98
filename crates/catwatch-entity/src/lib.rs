//! # catwatch-entity
//!
//! Domain model for the identity kernel: the [`identity::Identity`] entity,
//! its role enumeration, access-change and sign-in value types, and the
//! search predicate used by lookups.

pub mod identity;
pub mod search;

pub use identity::{
    AccessChange, AdminCensus, Authenticatable, BillingRelation, Identity, NewIdentity,
    ResourceAuditable, Role, SignIn,
};
pub use search::{SearchField, SearchPredicate};
