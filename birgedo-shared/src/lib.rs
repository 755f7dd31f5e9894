//! # BirgeDo Shared Library
//!
//! Types and business logic shared by the BirgeDo API server and the reset
//! worker.
//!
//! ## Module Organization
//!
//! - `db`: Connection pool, migrations and the per-operation timeout
//! - `models`: Users, rooms, memberships, tasks, assignments and tokens
//! - `auth`: Passwords, JWTs, credential resolution and room authorization
//! - `validation`: Declarative input validation

pub mod auth;
pub mod db;
pub mod models;
pub mod validation;

/// Current version of the BirgeDo shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
