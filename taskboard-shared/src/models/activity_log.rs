/// Activity log model
///
/// Append-only audit trail of task mutations. Entries are written after the
/// mutation they describe and are never updated or deleted.
///
/// `task_id` is intentionally not a foreign key: the entry recording a
/// deletion must outlive the task it refers to.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE activity_logs (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     task_id UUID NOT NULL,
///     user_id UUID NOT NULL REFERENCES users(id),
///     action activity_action NOT NULL,
///     details TEXT NOT NULL,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "activity_action", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ActivityAction {
    Create,
    Update,
    Delete,
}

impl ActivityAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityAction::Create => "create",
            ActivityAction::Update => "update",
            ActivityAction::Delete => "delete",
        }
    }

    fn past_tense(&self) -> &'static str {
        match self {
            ActivityAction::Create => "created",
            ActivityAction::Update => "updated",
            ActivityAction::Delete => "deleted",
        }
    }
}

impl fmt::Display for ActivityAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ActivityLog {
    pub id: Uuid,

    /// Task the action was performed on (may no longer exist)
    pub task_id: Uuid,

    /// Acting user
    pub user_id: Uuid,

    pub action: ActivityAction,

    /// Human-readable summary
    pub details: String,

    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CreateActivityLog {
    pub task_id: Uuid,
    pub user_id: Uuid,
    pub action: ActivityAction,
    pub details: String,
}

impl CreateActivityLog {
    /// Builds an entry with the standard summary, e.g. `Task "Ship release" created`
    pub fn for_task(task_id: Uuid, title: &str, user_id: Uuid, action: ActivityAction) -> Self {
        Self {
            task_id,
            user_id,
            action,
            details: format!("Task \"{}\" {}", title, action.past_tense()),
        }
    }
}

const ACTIVITY_COLUMNS: &str = "id, task_id, user_id, action, details, created_at";

impl ActivityLog {
    /// Appends an entry
    pub async fn create(pool: &PgPool, data: CreateActivityLog) -> Result<Self, sqlx::Error> {
        let entry = sqlx::query_as::<_, ActivityLog>(&format!(
            r#"
            INSERT INTO activity_logs (task_id, user_id, action, details)
            VALUES ($1, $2, $3, $4)
            RETURNING {ACTIVITY_COLUMNS}
            "#
        ))
        .bind(data.task_id)
        .bind(data.user_id)
        .bind(data.action)
        .bind(data.details)
        .fetch_one(pool)
        .await?;

        Ok(entry)
    }

    /// Lists the most recent entries, newest first, optionally for one task
    pub async fn list_recent(
        pool: &PgPool,
        task_id: Option<Uuid>,
        limit: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let entries = sqlx::query_as::<_, ActivityLog>(&format!(
            r#"
            SELECT {ACTIVITY_COLUMNS}
            FROM activity_logs
            WHERE ($1::uuid IS NULL OR task_id = $1)
            ORDER BY created_at DESC, id DESC
            LIMIT $2
            "#
        ))
        .bind(task_id)
        .bind(limit)
        .fetch_all(pool)
        .await?;

        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_text() {
        let task_id = Uuid::new_v4();
        let user_id = Uuid::new_v4();

        let entry = CreateActivityLog::for_task(task_id, "Ship release", user_id, ActivityAction::Delete);

        assert_eq!(entry.details, "Task \"Ship release\" deleted");
        assert_eq!(entry.action, ActivityAction::Delete);
        assert_eq!(entry.task_id, task_id);
        assert_eq!(entry.user_id, user_id);
    }

    #[test]
    fn test_action_wire_format() {
        assert_eq!(serde_json::to_string(&ActivityAction::Create).unwrap(), "\"create\"");
        assert_eq!(ActivityAction::Update.to_string(), "update");
    }
}
