//! # Company HQ Shared Library
//!
//! This crate contains the domain core used by the Company HQ API server and
//! the pipeline trigger binary.
//!
//! ## Module Organization
//!
//! - `db`: Connection pool and migrations
//! - `models`: Database models (users, sessions, tasks, notes, events, AI log)
//! - `auth`: Password hashing, session tokens, identity store, authorization
//! - `resource`: Generic ownership-scoped CRUD controller
//! - `quota`: Daily AI request quota
//! - `ai`: AI gateway and upstream generation providers
//! - `serde_util`: Serde helpers shared by request payloads
//! - `validation`: Field-level validation errors

pub mod ai;
pub mod auth;
pub mod db;
pub mod models;
pub mod quota;
pub mod resource;
pub mod serde_util;
pub mod validation;

/// Current version of the Company HQ shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
