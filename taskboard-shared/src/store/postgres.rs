//! Postgres-backed [`Store`]

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::{Store, StoreError};
use crate::db::pool::{close_pool, health_check};
use crate::models::activity_log::{ActivityLog, CreateActivityLog};
use crate::models::task::{CreateTask, Task, TaskDetails, UpdateTask};
use crate::models::user::{CreateUser, Role, User};
use crate::query::{TaskFilter, TaskQuery, TaskScope};

#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl Store for PgStore {
    fn backend(&self) -> &'static str {
        "postgres"
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        health_check(&self.pool).await?;
        Ok(())
    }

    async fn create_user(&self, data: CreateUser) -> Result<User, StoreError> {
        Ok(User::create(&self.pool, data).await?)
    }

    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        Ok(User::find_by_id(&self.pool, id).await?)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        Ok(User::find_by_email(&self.pool, email).await?)
    }

    async fn list_users(&self) -> Result<Vec<User>, StoreError> {
        Ok(User::list(&self.pool).await?)
    }

    async fn update_user_role(&self, id: Uuid, role: Role) -> Result<Option<User>, StoreError> {
        Ok(User::update_role(&self.pool, id, role).await?)
    }

    async fn create_task(&self, data: CreateTask) -> Result<TaskDetails, StoreError> {
        let mut tx = self.pool.begin().await?;

        let task = Task::create(&mut *tx, data).await?;
        let details = Task::find_details(&mut *tx, task.id)
            .await?
            .ok_or_else(|| StoreError::Inconsistent(format!("task {} vanished after insert", task.id)))?;

        tx.commit().await?;
        Ok(details)
    }

    async fn find_task(&self, id: Uuid) -> Result<Option<Task>, StoreError> {
        Ok(Task::find_by_id(&self.pool, id).await?)
    }

    async fn find_task_details(&self, id: Uuid) -> Result<Option<TaskDetails>, StoreError> {
        Ok(Task::find_details(&self.pool, id).await?)
    }

    async fn update_task(
        &self,
        id: Uuid,
        scope: TaskScope,
        data: UpdateTask,
    ) -> Result<Option<TaskDetails>, StoreError> {
        let mut tx = self.pool.begin().await?;

        // Dropping the transaction on the early return rolls it back
        let Some(updated) = Task::update_scoped(&mut *tx, id, scope, data).await? else {
            return Ok(None);
        };
        let details = Task::find_details(&mut *tx, updated).await?;

        tx.commit().await?;
        Ok(details)
    }

    async fn delete_task(&self, id: Uuid, scope: TaskScope) -> Result<Option<Task>, StoreError> {
        Ok(Task::delete_scoped(&self.pool, id, scope).await?)
    }

    async fn list_tasks(&self, query: &TaskQuery) -> Result<Vec<TaskDetails>, StoreError> {
        Ok(Task::list(&self.pool, query).await?)
    }

    async fn count_tasks(&self, filter: &TaskFilter) -> Result<u64, StoreError> {
        let count = Task::count(&self.pool, filter).await?;
        Ok(count.max(0) as u64)
    }

    async fn append_activity(&self, entry: CreateActivityLog) -> Result<ActivityLog, StoreError> {
        Ok(ActivityLog::create(&self.pool, entry).await?)
    }

    async fn list_activity(
        &self,
        task_id: Option<Uuid>,
        limit: u32,
    ) -> Result<Vec<ActivityLog>, StoreError> {
        Ok(ActivityLog::list_recent(&self.pool, task_id, i64::from(limit)).await?)
    }

    async fn close(&self) {
        close_pool(&self.pool).await;
    }
}
