//! # Permit Shared Library
//!
//! This crate contains the domain types, storage abstraction and RBAC logic
//! used by the Permit admin API server.
//!
//! ## Module Organization
//!
//! - `models`: Database models (users, roles, menus, join tables)
//! - `store`: Entity store trait with PostgreSQL and in-memory backends
//! - `rbac`: Permission resolution and menu tree construction
//! - `auth`: Password hashing, JWT tokens and the access gate
//! - `services`: Admin operations with validation and integrity guards
//! - `db`: Connection pool and migrations
//! - `error`: Domain error taxonomy

pub mod auth;
pub mod db;
pub mod error;
pub mod models;
pub mod rbac;
pub mod services;
pub mod store;

/// Current version of the Permit shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
