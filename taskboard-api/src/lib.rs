//! # Taskboard API Server Library
//!
//! HTTP surface of the task manager: authentication, task CRUD with
//! owner scoping, user administration, statistics and the activity feed.
//!
//! ## Modules
//!
//! - `app`: Application state and router builder
//! - `config`: Configuration from environment variables
//! - `error`: Error handling and HTTP response mapping
//! - `middleware`: Auth gates and security headers
//! - `routes`: API route handlers

pub mod app;
pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;
