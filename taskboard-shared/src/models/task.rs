/// Task model and database operations
///
/// Tasks reference two users: the assignee (who does the work) and the
/// creator (immutable after creation). Reads that go back to clients use
/// [`TaskDetails`], which resolves both references to [`UserSummary`]
/// projections so the password hash can never leak through a join.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE tasks (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     title TEXT NOT NULL,
///     description TEXT,
///     status task_status NOT NULL DEFAULT 'todo',
///     priority task_priority NOT NULL DEFAULT 'medium',
///     due_date TIMESTAMPTZ,
///     tags TEXT[] NOT NULL DEFAULT '{}',
///     assignee_id UUID NOT NULL REFERENCES users(id),
///     created_by UUID NOT NULL REFERENCES users(id),
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgExecutor, Postgres, QueryBuilder};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::user::UserSummary;
use crate::query::{TaskFilter, TaskQuery, TaskScope};

/// Task workflow status
///
/// Declaration order is the sort order (and matches the Postgres enum).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, sqlx::Type,
)]
#[sqlx(type_name = "task_status", rename_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum TaskStatus {
    Todo,
    InProgress,
    Done,
}

impl TaskStatus {
    pub const ALL: [TaskStatus; 3] = [TaskStatus::Todo, TaskStatus::InProgress, TaskStatus::Done];

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Todo => "todo",
            TaskStatus::InProgress => "in-progress",
            TaskStatus::Done => "done",
        }
    }
}

impl Default for TaskStatus {
    fn default() -> Self {
        TaskStatus::Todo
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TaskStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| format!("Status must be one of: todo, in-progress, done (got '{}')", s))
    }
}

/// Task priority, sorted low < medium < high
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, sqlx::Type,
)]
#[sqlx(type_name = "task_priority", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TaskPriority {
    Low,
    Medium,
    High,
}

impl TaskPriority {
    pub const ALL: [TaskPriority; 3] = [TaskPriority::Low, TaskPriority::Medium, TaskPriority::High];

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskPriority::Low => "low",
            TaskPriority::Medium => "medium",
            TaskPriority::High => "high",
        }
    }
}

impl Default for TaskPriority {
    fn default() -> Self {
        TaskPriority::Medium
    }
}

impl fmt::Display for TaskPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskPriority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TaskPriority::ALL
            .into_iter()
            .find(|priority| priority.as_str() == s)
            .ok_or_else(|| format!("Priority must be one of: low, medium, high (got '{}')", s))
    }
}

/// Parses a due date from an RFC 3339 timestamp or a bare `YYYY-MM-DD`
/// date (interpreted as midnight UTC).
pub fn parse_due_date(value: &str) -> Result<DateTime<Utc>, String> {
    let value = value.trim();

    if let Ok(timestamp) = DateTime::parse_from_rfc3339(value) {
        return Ok(timestamp.with_timezone(&Utc));
    }

    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
        .ok_or_else(|| "Due date must be a valid date".to_string())
}

/// Stored task row
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct Task {
    pub id: Uuid,

    /// Required, non-empty
    pub title: String,

    pub description: Option<String>,

    pub status: TaskStatus,

    pub priority: TaskPriority,

    pub due_date: Option<DateTime<Utc>>,

    /// Ordered list, may be empty
    pub tags: Vec<String>,

    /// Defaults to the creator
    pub assignee_id: Uuid,

    /// Immutable after creation
    pub created_by: Uuid,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

/// Task with both user references resolved, as returned to clients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskDetails {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub due_date: Option<DateTime<Utc>>,
    pub tags: Vec<String>,
    pub assignee: UserSummary,
    pub created_by: UserSummary,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TaskDetails {
    pub fn from_parts(task: Task, assignee: UserSummary, created_by: UserSummary) -> Self {
        Self {
            id: task.id,
            title: task.title,
            description: task.description,
            status: task.status,
            priority: task.priority,
            due_date: task.due_date,
            tags: task.tags,
            assignee,
            created_by,
            created_at: task.created_at,
            updated_at: task.updated_at,
        }
    }
}

/// Input for creating a task
#[derive(Debug, Clone)]
pub struct CreateTask {
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub due_date: Option<DateTime<Utc>>,
    pub tags: Vec<String>,
    pub assignee_id: Uuid,
    pub created_by: Uuid,
}

/// Input for updating a task
///
/// Only `Some` fields are written. The nested options clear nullable
/// columns with `Some(None)`. The creator is not updatable.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateTask {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub due_date: Option<Option<DateTime<Utc>>>,
    pub tags: Option<Vec<String>>,
    pub assignee_id: Option<Uuid>,
}

impl UpdateTask {
    /// Applies the changes to an in-memory task and bumps `updated_at`
    pub fn apply_to(self, task: &mut Task, now: DateTime<Utc>) {
        if let Some(title) = self.title {
            task.title = title;
        }
        if let Some(description) = self.description {
            task.description = description;
        }
        if let Some(status) = self.status {
            task.status = status;
        }
        if let Some(priority) = self.priority {
            task.priority = priority;
        }
        if let Some(due_date) = self.due_date {
            task.due_date = due_date;
        }
        if let Some(tags) = self.tags {
            task.tags = tags;
        }
        if let Some(assignee_id) = self.assignee_id {
            task.assignee_id = assignee_id;
        }
        task.updated_at = now;
    }
}

const TASK_COLUMNS: &str = "t.id, t.title, t.description, t.status, t.priority, t.due_date, \
     t.tags, t.assignee_id, t.created_by, t.created_at, t.updated_at";

const DETAILS_SELECT: &str = "SELECT t.id, t.title, t.description, t.status, t.priority, \
     t.due_date, t.tags, t.assignee_id, t.created_by, t.created_at, t.updated_at, \
     a.name AS assignee_name, a.email AS assignee_email, \
     c.name AS creator_name, c.email AS creator_email \
     FROM tasks t \
     JOIN users a ON a.id = t.assignee_id \
     JOIN users c ON c.id = t.created_by";

/// Flat row produced by the details join
#[derive(Debug, sqlx::FromRow)]
struct TaskDetailsRow {
    #[sqlx(flatten)]
    task: Task,
    assignee_name: String,
    assignee_email: String,
    creator_name: String,
    creator_email: String,
}

impl From<TaskDetailsRow> for TaskDetails {
    fn from(row: TaskDetailsRow) -> Self {
        let assignee = UserSummary {
            id: row.task.assignee_id,
            name: row.assignee_name,
            email: row.assignee_email,
        };
        let created_by = UserSummary {
            id: row.task.created_by,
            name: row.creator_name,
            email: row.creator_email,
        };
        TaskDetails::from_parts(row.task, assignee, created_by)
    }
}

impl Task {
    /// Inserts a task and returns the stored row
    pub async fn create<'e, E>(executor: E, data: CreateTask) -> Result<Self, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let task = sqlx::query_as::<_, Task>(&format!(
            r#"
            INSERT INTO tasks AS t
                (title, description, status, priority, due_date, tags, assignee_id, created_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {TASK_COLUMNS}
            "#
        ))
        .bind(data.title)
        .bind(data.description)
        .bind(data.status)
        .bind(data.priority)
        .bind(data.due_date)
        .bind(data.tags)
        .bind(data.assignee_id)
        .bind(data.created_by)
        .fetch_one(executor)
        .await?;

        Ok(task)
    }

    /// Finds a task row by ID
    pub async fn find_by_id<'e, E>(executor: E, id: Uuid) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let task = sqlx::query_as::<_, Task>(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks t WHERE t.id = $1"
        ))
        .bind(id)
        .fetch_optional(executor)
        .await?;

        Ok(task)
    }

    /// Finds a task by ID with assignee and creator resolved
    pub async fn find_details<'e, E>(
        executor: E,
        id: Uuid,
    ) -> Result<Option<TaskDetails>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let row = sqlx::query_as::<_, TaskDetailsRow>(&format!("{DETAILS_SELECT} WHERE t.id = $1"))
            .bind(id)
            .fetch_optional(executor)
            .await?;

        Ok(row.map(TaskDetails::from))
    }

    /// Conditionally updates a task
    ///
    /// The scope predicate is part of the `WHERE` clause, so a caller who
    /// lost access (or a task deleted concurrently) results in `None`
    /// instead of a write.
    pub async fn update_scoped<'e, E>(
        executor: E,
        id: Uuid,
        scope: TaskScope,
        data: UpdateTask,
    ) -> Result<Option<Uuid>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let mut qb = QueryBuilder::<Postgres>::new("UPDATE tasks AS t SET updated_at = NOW()");

        if let Some(title) = data.title {
            qb.push(", title = ").push_bind(title);
        }
        if let Some(description) = data.description {
            qb.push(", description = ").push_bind(description);
        }
        if let Some(status) = data.status {
            qb.push(", status = ").push_bind(status);
        }
        if let Some(priority) = data.priority {
            qb.push(", priority = ").push_bind(priority);
        }
        if let Some(due_date) = data.due_date {
            qb.push(", due_date = ").push_bind(due_date);
        }
        if let Some(tags) = data.tags {
            qb.push(", tags = ").push_bind(tags);
        }
        if let Some(assignee_id) = data.assignee_id {
            qb.push(", assignee_id = ").push_bind(assignee_id);
        }

        qb.push(" WHERE t.id = ").push_bind(id);
        scope.push_sql(&mut qb);
        qb.push(" RETURNING t.id");

        let updated = qb
            .build_query_scalar::<Uuid>()
            .fetch_optional(executor)
            .await?;

        Ok(updated)
    }

    /// Conditionally deletes a task, returning the removed row
    pub async fn delete_scoped<'e, E>(
        executor: E,
        id: Uuid,
        scope: TaskScope,
    ) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let mut qb = QueryBuilder::<Postgres>::new("DELETE FROM tasks AS t WHERE t.id = ");
        qb.push_bind(id);
        scope.push_sql(&mut qb);
        qb.push(" RETURNING ").push(TASK_COLUMNS);

        let task = qb.build_query_as::<Task>().fetch_optional(executor).await?;

        Ok(task)
    }

    /// Runs a list query: filter, sort, then skip/limit
    pub async fn list<'e, E>(executor: E, query: &TaskQuery) -> Result<Vec<TaskDetails>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let mut qb = QueryBuilder::<Postgres>::new(DETAILS_SELECT);
        query.filter.push_sql(&mut qb);
        query.sort.push_sql(&mut qb);
        qb.push(" LIMIT ")
            .push_bind(i64::try_from(query.page.limit).unwrap_or(i64::MAX))
            .push(" OFFSET ")
            .push_bind(i64::try_from(query.page.offset()).unwrap_or(i64::MAX));

        let rows = qb
            .build_query_as::<TaskDetailsRow>()
            .fetch_all(executor)
            .await?;

        Ok(rows.into_iter().map(TaskDetails::from).collect())
    }

    /// Counts tasks matching a filter (pagination ignored)
    pub async fn count<'e, E>(
        executor: E,
        filter: &TaskFilter,
    ) -> Result<i64, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM tasks t");
        filter.push_sql(&mut qb);

        let count = qb.build_query_scalar::<i64>().fetch_one(executor).await?;

        Ok(count)
    }
}
