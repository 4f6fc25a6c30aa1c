//! # GlobeTrotter Shared Library
//!
//! Storage, models, and account logic used by the GlobeTrotter API server.
//!
//! ## Module Organization
//!
//! - `store`: document store trait with in-memory and PostgreSQL backends
//! - `models`: user, counter, and trip documents
//! - `accounts`: transactional signup and login verification
//! - `auth`: password hashing
//! - `db`: PostgreSQL pool and migrations

pub mod accounts;
pub mod auth;
pub mod db;
pub mod models;
pub mod store;

/// Current version of the GlobeTrotter shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
