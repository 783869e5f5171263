/// Task endpoints
///
/// # Endpoints
///
/// - `GET /api/tasks` - Scoped, filtered, sorted, paginated list
/// - `POST /api/tasks` - Create a task (any authenticated user)
/// - `GET /api/tasks/:id` - Read one task (admin, assignee or creator)
/// - `PUT /api/tasks/:id` - Update (admin, assignee or creator)
/// - `DELETE /api/tasks/:id` - Delete (admin, assignee or creator)
///
/// Malformed ids answer 404 exactly like missing ones. Access is checked
/// after loading the task, and writes carry the caller's scope again so a
/// concurrent delete or reassignment cannot be overwritten.
///
/// Each successful mutation appends one activity entry after the write.
/// A failed append is logged and does not change the response.

use crate::{
    app::AppState,
    error::{validation_details, ApiError, ApiResult, ValidationErrorDetail},
    routes::{auth::MessageResponse, parse_id},
};
use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    Extension, Json,
};
use serde::{Deserialize, Deserializer, Serialize};
use taskboard_shared::{
    auth::{authorization::require_task_access, middleware::AuthContext},
    models::{
        activity_log::{ActivityAction, CreateActivityLog},
        task::{parse_due_date, CreateTask, TaskDetails, TaskPriority, TaskStatus, UpdateTask},
    },
    query::{Pagination, TaskListParams, TaskQuery, TaskScope},
    store::Store,
};
use uuid::Uuid;
use validator::Validate;

/// Create request
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateTaskRequest {
    #[serde(default)]
    #[validate(length(min = 1, message = "Title is required"))]
    pub title: String,

    pub description: Option<String>,

    pub status: Option<String>,

    pub priority: Option<String>,

    /// RFC 3339 timestamp or `YYYY-MM-DD`
    pub due_date: Option<String>,

    #[serde(default)]
    pub tags: Vec<String>,

    /// User id; defaults to the caller
    pub assignee: Option<String>,
}

/// Update request
///
/// Absent fields are left alone. `description` and `dueDate` may be `null`
/// to clear them. Anything else in the body, `createdBy` included, is ignored.
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTaskRequest {
    #[validate(length(min = 1, message = "Title cannot be empty"))]
    pub title: Option<String>,

    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,

    pub status: Option<String>,

    pub priority: Option<String>,

    #[serde(default, deserialize_with = "double_option")]
    pub due_date: Option<Option<String>>,

    pub tags: Option<Vec<String>>,

    pub assignee: Option<String>,
}

/// Distinguishes an explicit `null` (`Some(None)`) from an absent field (`None`)
fn double_option<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TaskListResponse {
    pub tasks: Vec<TaskDetails>,
    pub pagination: Pagination,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn clean_tags(tags: Vec<String>) -> Vec<String> {
    tags.into_iter()
        .map(|tag| tag.trim().to_string())
        .filter(|tag| !tag.is_empty())
        .collect()
}

/// Field parsers that append to a shared error list
struct FieldParser {
    errors: Vec<ValidationErrorDetail>,
}

impl FieldParser {
    fn new(validation: Result<(), validator::ValidationErrors>) -> Self {
        Self {
            errors: validation.err().map(|e| validation_details(&e)).unwrap_or_default(),
        }
    }

    fn status(&mut self, raw: Option<&str>) -> Option<TaskStatus> {
        self.parse("status", raw, |v| v.parse::<TaskStatus>())
    }

    fn priority(&mut self, raw: Option<&str>) -> Option<TaskPriority> {
        self.parse("priority", raw, |v| v.parse::<TaskPriority>())
    }

    fn due_date(&mut self, raw: Option<&str>) -> Option<chrono::DateTime<chrono::Utc>> {
        self.parse("dueDate", raw, parse_due_date)
    }

    fn assignee(&mut self, raw: Option<&str>) -> Option<Uuid> {
        self.parse("assignee", raw, |v| {
            Uuid::parse_str(v).map_err(|_| "Assignee does not exist".to_string())
        })
    }

    fn parse<T>(
        &mut self,
        field: &str,
        raw: Option<&str>,
        parse: impl FnOnce(&str) -> Result<T, String>,
    ) -> Option<T> {
        let raw = raw.map(str::trim).filter(|v| !v.is_empty())?;
        match parse(raw) {
            Ok(value) => Some(value),
            Err(message) => {
                self.errors.push(ValidationErrorDetail::new(field, message));
                None
            }
        }
    }

    fn finish(self) -> ApiResult<()> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(ApiError::ValidationError(self.errors))
        }
    }
}

/// Rejects assignees that do not resolve to a user
async fn ensure_assignee_exists(store: &dyn Store, assignee_id: Uuid) -> ApiResult<()> {
    if store.find_user_by_id(assignee_id).await?.is_none() {
        return Err(ApiError::ValidationError(vec![ValidationErrorDetail::new(
            "assignee",
            "Assignee does not exist",
        )]));
    }
    Ok(())
}

async fn record_activity(
    store: &dyn Store,
    auth: &AuthContext,
    task_id: Uuid,
    title: &str,
    action: ActivityAction,
) {
    let entry = CreateActivityLog::for_task(task_id, title, auth.user_id, action);

    if let Err(e) = store.append_activity(entry).await {
        tracing::warn!(
            task_id = %task_id,
            user_id = %auth.user_id,
            action = %action,
            error = %e,
            "Failed to record activity"
        );
    }
}

/// Lists tasks visible to the caller
///
/// Query: `search`, `status`, `priority`, `page`, `limit`, `sortBy`, `sortOrder`
pub async fn list_tasks(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    params: Result<Query<TaskListParams>, QueryRejection>,
) -> ApiResult<Json<TaskListResponse>> {
    let Query(params) = params?;
    let query = TaskQuery::from_params(TaskScope::for_caller(&auth), &params)?;

    let (tasks, total) = tokio::try_join!(
        state.store.list_tasks(&query),
        state.store.count_tasks(&query.filter),
    )?;

    Ok(Json(TaskListResponse {
        tasks,
        pagination: Pagination::new(query.page, total),
    }))
}

pub async fn get_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(raw_id): Path<String>,
) -> ApiResult<Json<TaskDetails>> {
    let id = parse_id(&raw_id, ApiError::task_not_found)?;

    let task = state
        .store
        .find_task_details(id)
        .await?
        .ok_or_else(ApiError::task_not_found)?;

    require_task_access(&auth, task.assignee.id, task.created_by.id)?;

    Ok(Json(task))
}

pub async fn create_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    payload: Result<Json<CreateTaskRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<TaskDetails>)> {
    let Json(mut req) = payload?;
    req.title = req.title.trim().to_string();

    let mut fields = FieldParser::new(req.validate());
    let status = fields.status(req.status.as_deref()).unwrap_or_default();
    let priority = fields.priority(req.priority.as_deref()).unwrap_or_default();
    let due_date = fields.due_date(req.due_date.as_deref());
    let assignee_id = fields.assignee(req.assignee.as_deref());
    fields.finish()?;

    let assignee_id = match assignee_id {
        Some(id) => {
            ensure_assignee_exists(state.store.as_ref(), id).await?;
            id
        }
        None => auth.user_id,
    };

    let task = state
        .store
        .create_task(CreateTask {
            title: req.title,
            description: non_empty(req.description),
            status,
            priority,
            due_date,
            tags: clean_tags(req.tags),
            assignee_id,
            created_by: auth.user_id,
        })
        .await?;

    tracing::info!(task_id = %task.id, user_id = %auth.user_id, "Task created");
    record_activity(
        state.store.as_ref(),
        &auth,
        task.id,
        &task.title,
        ActivityAction::Create,
    )
    .await;

    Ok((StatusCode::CREATED, Json(task)))
}

pub async fn update_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(raw_id): Path<String>,
    payload: Result<Json<UpdateTaskRequest>, JsonRejection>,
) -> ApiResult<Json<TaskDetails>> {
    let id = parse_id(&raw_id, ApiError::task_not_found)?;
    let Json(mut req) = payload?;
    req.title = req.title.map(|title| title.trim().to_string());

    let mut fields = FieldParser::new(req.validate());
    let status = fields.status(req.status.as_deref());
    let priority = fields.priority(req.priority.as_deref());
    let due_date = match req.due_date {
        Some(Some(ref raw)) if !raw.trim().is_empty() => {
            fields.due_date(Some(raw.as_str())).map(Some)
        }
        // null or "" clears the due date
        Some(_) => Some(None),
        None => None,
    };
    let assignee_id = fields.assignee(req.assignee.as_deref());
    fields.finish()?;

    let existing = state
        .store
        .find_task(id)
        .await?
        .ok_or_else(ApiError::task_not_found)?;

    require_task_access(&auth, existing.assignee_id, existing.created_by)?;

    if let Some(assignee_id) = assignee_id {
        ensure_assignee_exists(state.store.as_ref(), assignee_id).await?;
    }

    let changes = UpdateTask {
        title: req.title,
        description: req.description.map(non_empty),
        status,
        priority,
        due_date,
        tags: req.tags.map(clean_tags),
        assignee_id,
    };

    // None here means the task was deleted or reassigned after the access check
    let task = state
        .store
        .update_task(id, TaskScope::for_caller(&auth), changes)
        .await?
        .ok_or_else(ApiError::task_not_found)?;

    tracing::info!(task_id = %task.id, user_id = %auth.user_id, "Task updated");
    record_activity(
        state.store.as_ref(),
        &auth,
        task.id,
        &task.title,
        ActivityAction::Update,
    )
    .await;

    Ok(Json(task))
}

pub async fn delete_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(raw_id): Path<String>,
) -> ApiResult<Json<MessageResponse>> {
    let id = parse_id(&raw_id, ApiError::task_not_found)?;

    let existing = state
        .store
        .find_task(id)
        .await?
        .ok_or_else(ApiError::task_not_found)?;

    require_task_access(&auth, existing.assignee_id, existing.created_by)?;

    let task = state
        .store
        .delete_task(id, TaskScope::for_caller(&auth))
        .await?
        .ok_or_else(ApiError::task_not_found)?;

    tracing::info!(task_id = %task.id, user_id = %auth.user_id, "Task deleted");
    record_activity(
        state.store.as_ref(),
        &auth,
        task.id,
        &task.title,
        ActivityAction::Delete,
    )
    .await;

    Ok(Json(MessageResponse {
        message: "Task deleted successfully".to_string(),
    }))
}
