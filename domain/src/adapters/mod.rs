//! Test-only adapters that live inside the domain crate for convenience.
//!
//! These are intended for unit testing and local demos. The SQLite adapter
//! lives in its own crate.

pub mod memory_repo;
