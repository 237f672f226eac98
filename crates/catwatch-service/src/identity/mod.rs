//! Identity services.

pub mod activity;
pub mod lookup;
pub mod safeguard;
pub mod service;

pub use activity::ActivityTracker;
pub use lookup::IdentityLookup;
pub use safeguard::AdminSafeguard;
pub use service::{IdentityService, RegisterIdentity};
