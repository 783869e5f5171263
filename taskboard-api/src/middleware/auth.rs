/// Authentication and admin gates
///
/// Both are plain `from_fn_with_state`/`from_fn` middleware. The admin gate
/// reads the [`AuthContext`] inserted by [`jwt_auth_layer`], so it must be
/// layered inside it.

use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
    Extension,
};
use taskboard_shared::auth::{
    authorization::require_admin,
    middleware::{authenticate, AuthContext},
};

use crate::{app::AppState, error::ApiError};

/// Resolves the bearer token and injects [`AuthContext`] into request extensions
pub async fn jwt_auth_layer(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let auth_header = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);

    let auth = authenticate(state.store.as_ref(), state.jwt_secret(), auth_header.as_deref()).await?;

    tracing::debug!(user_id = %auth.user_id, role = %auth.role, "Authenticated request");
    req.extensions_mut().insert(auth);

    Ok(next.run(req).await)
}

/// Rejects non-admin callers with 403
pub async fn admin_layer(
    Extension(auth): Extension<AuthContext>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    require_admin(&auth)?;
    Ok(next.run(req).await)
}
