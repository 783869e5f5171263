//! # Taskboard Shared Library
//!
//! Domain types and business logic used by the Taskboard API server.
//!
//! ## Module Organization
//!
//! - `models`: Users, tasks and activity entries, with their Postgres queries
//! - `auth`: Password hashing, bearer tokens, the auth gate and access checks
//! - `query`: Scope, filter, sort and pagination of task lists
//! - `store`: The `Store` trait with Postgres and in-memory backends
//! - `stats`: Scoped count summaries
//! - `db`: Connection pool and migrations
//! - `demo`: Demo dataset for the in-memory backend

pub mod auth;
pub mod db;
pub mod demo;
pub mod models;
pub mod query;
pub mod stats;
pub mod store;

/// Current version of the Taskboard shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
