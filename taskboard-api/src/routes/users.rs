/// User administration endpoints (admin only)
///
/// # Endpoints
///
/// - `GET /api/users` - All users, password hashes excluded
/// - `PATCH /api/users/:id/role` - Change a user's role
///
/// Role changes take effect on the user's next request because the auth
/// gate re-reads the role from the store.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    routes::parse_id,
};
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Extension, Json,
};
use serde::Deserialize;
use taskboard_shared::{
    auth::middleware::AuthContext,
    models::user::{PublicUser, Role},
};

#[derive(Debug, Deserialize)]
pub struct UpdateRoleRequest {
    #[serde(default)]
    pub role: Option<String>,
}

fn user_not_found() -> ApiError {
    ApiError::NotFound("User not found".to_string())
}

pub async fn list_users(State(state): State<AppState>) -> ApiResult<Json<Vec<PublicUser>>> {
    let users = state.store.list_users().await?;
    Ok(Json(users.iter().map(|user| user.to_public()).collect()))
}

/// Change a user's role
///
/// ```text
/// PATCH /api/users/:id/role
///
/// { "role": "admin" }
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: Role is missing or not `admin`/`member`
/// - `404 Not Found`: Unknown or malformed user id
pub async fn update_role(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(raw_id): Path<String>,
    payload: Result<Json<UpdateRoleRequest>, JsonRejection>,
) -> ApiResult<Json<PublicUser>> {
    let Json(req) = payload?;

    let role = req
        .role
        .as_deref()
        .map(str::trim)
        .and_then(|raw| raw.parse::<Role>().ok())
        .ok_or_else(|| ApiError::BadRequest("Invalid role".to_string()))?;

    let id = parse_id(&raw_id, user_not_found)?;

    let user = state
        .store
        .update_user_role(id, role)
        .await?
        .ok_or_else(user_not_found)?;

    tracing::info!(
        user_id = %user.id,
        role = %user.role,
        changed_by = %auth.user_id,
        "User role updated"
    );

    Ok(Json(user.to_public()))
}
