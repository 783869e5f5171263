//! Storage seam
//!
//! Handlers and the stats aggregator only ever talk to [`Store`]. The handle
//! is constructed once at startup, shared as [`SharedStore`] and closed on
//! shutdown.
//!
//! - [`postgres::PgStore`]: production backend on a sqlx pool
//! - [`memory::MemoryStore`]: in-process maps, used by tests and demo mode
//!
//! Task updates and deletes take a [`TaskScope`] and apply it inside the
//! write itself. A write that matches nothing (task gone, or caller no
//! longer allowed) returns `None` rather than touching another row.

use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

use crate::models::activity_log::{ActivityLog, CreateActivityLog};
use crate::models::task::{CreateTask, Task, TaskDetails, UpdateTask};
use crate::models::user::{CreateUser, Role, User};
use crate::query::{TaskFilter, TaskQuery, TaskScope};

pub mod memory;
pub mod postgres;

/// Store handle shared across request handlers
pub type SharedStore = Arc<dyn Store>;

/// Error type for store operations
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("User already exists")]
    DuplicateEmail,

    /// A referenced user does not exist
    #[error("Referenced user does not exist")]
    UnknownUser,

    #[error("Database error: {0}")]
    Database(sqlx::Error),

    /// Stored data violates an invariant (e.g. dangling user reference)
    #[error("Inconsistent store state: {0}")]
    Inconsistent(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.is_unique_violation() && db_err.constraint() == Some("users_email_key") {
                return StoreError::DuplicateEmail;
            }
            if db_err.is_foreign_key_violation() {
                return StoreError::UnknownUser;
            }
        }
        StoreError::Database(err)
    }
}

#[async_trait]
pub trait Store: Send + Sync {
    /// Short backend name reported by the health endpoint
    fn backend(&self) -> &'static str;

    async fn health_check(&self) -> Result<(), StoreError>;

    /// Inserts a user; the email must already be normalized
    async fn create_user(&self, data: CreateUser) -> Result<User, StoreError>;

    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError>;

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    /// All users, oldest first
    async fn list_users(&self) -> Result<Vec<User>, StoreError>;

    async fn update_user_role(&self, id: Uuid, role: Role) -> Result<Option<User>, StoreError>;

    /// Inserts a task; both user references must exist
    async fn create_task(&self, data: CreateTask) -> Result<TaskDetails, StoreError>;

    async fn find_task(&self, id: Uuid) -> Result<Option<Task>, StoreError>;

    async fn find_task_details(&self, id: Uuid) -> Result<Option<TaskDetails>, StoreError>;

    /// Applies `data` only if the task exists and `scope` permits it
    async fn update_task(
        &self,
        id: Uuid,
        scope: TaskScope,
        data: UpdateTask,
    ) -> Result<Option<TaskDetails>, StoreError>;

    /// Deletes only if the task exists and `scope` permits it
    async fn delete_task(&self, id: Uuid, scope: TaskScope) -> Result<Option<Task>, StoreError>;

    /// One page of tasks: filter, sort, skip, limit
    async fn list_tasks(&self, query: &TaskQuery) -> Result<Vec<TaskDetails>, StoreError>;

    async fn count_tasks(&self, filter: &TaskFilter) -> Result<u64, StoreError>;

    async fn append_activity(&self, entry: CreateActivityLog) -> Result<ActivityLog, StoreError>;

    /// Most recent entries first, optionally for one task
    async fn list_activity(
        &self,
        task_id: Option<Uuid>,
        limit: u32,
    ) -> Result<Vec<ActivityLog>, StoreError>;

    /// Releases backend resources
    async fn close(&self);
}
