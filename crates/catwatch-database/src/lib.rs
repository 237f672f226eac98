//! # catwatch-database
//!
//! PostgreSQL connection management and the [`IdentityStore`] query
//! interface, with a Postgres implementation and an in-memory one for
//! single-process deployments and tests.

pub mod connection;
pub mod repositories;

pub use connection::DatabasePool;
pub use repositories::identity::{
    AccessGuard, AccessOutcome, CountFilter, IdentityStore, MemoryIdentityStore,
    PgIdentityStore,
};
