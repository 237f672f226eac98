//! Repository implementations.

pub mod identity;
