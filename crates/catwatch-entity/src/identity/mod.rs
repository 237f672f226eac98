//! Identity domain entities.

pub mod access;
pub mod billing;
pub mod model;
pub mod role;
pub mod traits;

pub use access::{AccessChange, AdminCensus};
pub use billing::BillingRelation;
pub use model::{Identity, NewIdentity, SignIn, normalize_username};
pub use role::Role;
pub use traits::{Authenticatable, ResourceAuditable};
