/// Activity feed endpoint (admin only)
///
/// `GET /api/activity?task=<id>&limit=<n>` returns the most recent entries,
/// newest first. `limit` falls back to 50 when absent or not a positive
/// integer.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult, ValidationErrorDetail},
};
use axum::{
    extract::{rejection::QueryRejection, Query, State},
    Json,
};
use serde::Deserialize;
use taskboard_shared::models::activity_log::ActivityLog;
use uuid::Uuid;

pub const DEFAULT_ACTIVITY_LIMIT: u32 = 50;

#[derive(Debug, Default, Deserialize)]
pub struct ActivityParams {
    pub task: Option<String>,
    pub limit: Option<String>,
}

impl ActivityParams {
    fn task_id(&self) -> ApiResult<Option<Uuid>> {
        match self.task.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(raw) => Uuid::parse_str(raw).map(Some).map_err(|_| {
                ApiError::ValidationError(vec![ValidationErrorDetail::new(
                    "task",
                    "Task must be a valid id",
                )])
            }),
        }
    }

    fn limit(&self) -> u32 {
        self.limit
            .as_deref()
            .and_then(|raw| raw.trim().parse::<u32>().ok())
            .filter(|limit| *limit > 0)
            .unwrap_or(DEFAULT_ACTIVITY_LIMIT)
    }
}

pub async fn list_activity(
    State(state): State<AppState>,
    params: Result<Query<ActivityParams>, QueryRejection>,
) -> ApiResult<Json<Vec<ActivityLog>>> {
    let Query(params) = params?;

    let entries = state
        .store
        .list_activity(params.task_id()?, params.limit())
        .await?;

    Ok(Json(entries))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limit_defaults() {
        let params = ActivityParams::default();
        assert_eq!(params.limit(), DEFAULT_ACTIVITY_LIMIT);

        let params = ActivityParams {
            limit: Some("0".to_string()),
            ..Default::default()
        };
        assert_eq!(params.limit(), DEFAULT_ACTIVITY_LIMIT);

        let params = ActivityParams {
            limit: Some("5".to_string()),
            ..Default::default()
        };
        assert_eq!(params.limit(), 5);
    }

    #[test]
    fn test_task_filter() {
        let params = ActivityParams {
            task: Some("nope".to_string()),
            ..Default::default()
        };
        assert!(matches!(params.task_id(), Err(ApiError::ValidationError(_))));

        let id = Uuid::new_v4();
        let params = ActivityParams {
            task: Some(id.to_string()),
            ..Default::default()
        };
        assert_eq!(params.task_id().unwrap(), Some(id));
    }
}
