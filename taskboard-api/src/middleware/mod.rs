/// Middleware for the API server
///
/// - `security`: security response headers
/// - `auth`: bearer authentication and the admin gate

pub mod auth;
pub mod security;
