/// Data models for Taskboard
///
/// Each model owns its Postgres queries; the [`crate::store`] layer wraps
/// them behind the `Store` trait so handlers never see a pool directly.
///
/// # Models
///
/// - `user`: Accounts, roles and display-safe projections
/// - `task`: Tasks, their status/priority enums and update payloads
/// - `activity_log`: Append-only audit trail of task mutations

pub mod activity_log;
pub mod task;
pub mod user;
