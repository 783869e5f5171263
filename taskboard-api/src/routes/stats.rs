/// Task statistics endpoint
///
/// `GET /api/stats/overview` counts the tasks visible to the caller: all
/// tasks for admins, assigned or created tasks for members.

use crate::{app::AppState, error::ApiResult};
use axum::{extract::State, Extension, Json};
use taskboard_shared::{auth::middleware::AuthContext, query::TaskScope, stats::TaskStats};

pub async fn overview(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<TaskStats>> {
    let stats = TaskStats::collect(
        state.store.as_ref(),
        TaskScope::for_caller(&auth),
        chrono::Utc::now(),
    )
    .await?;

    Ok(Json(stats))
}
