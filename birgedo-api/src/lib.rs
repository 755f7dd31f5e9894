//! # BirgeDo API Server Library
//!
//! JSON API for collaborative task tracking: users, rooms, room membership,
//! tasks and each member's own completion of them.
//!
//! ## Modules
//!
//! - `app`: Application state and router builder
//! - `config`: Configuration from flags and environment
//! - `error`: Error handling and HTTP response mapping
//! - `middleware`: Security headers, rate limiting, authentication, CSRF
//! - `routes`: API route handlers

pub mod app;
pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;
