/// API route handlers, one module per resource
///
/// - `health`: banner and health check
/// - `auth`: register, login, verify, logout
/// - `tasks`: task CRUD and listing
/// - `users`: user listing and role changes (admin)
/// - `stats`: scoped task counts
/// - `activity`: activity feed (admin)

pub mod activity;
pub mod auth;
pub mod health;
pub mod stats;
pub mod tasks;
pub mod users;

use uuid::Uuid;

use crate::error::ApiError;

/// Parses a path identifier; malformed ids report the same error as absent ones
pub(crate) fn parse_id(raw: &str, not_found: fn() -> ApiError) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw.trim()).map_err(|_| not_found())
}
