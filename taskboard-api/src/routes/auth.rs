/// Authentication endpoints
///
/// # Endpoints
///
/// - `POST /api/auth/register` - Create an account, returns a token
/// - `POST /api/auth/login` - Exchange credentials for a token
/// - `GET /api/auth/verify` - Current user (authenticated)
/// - `POST /api/auth/logout` - Acknowledge logout (authenticated)
///
/// Tokens are stateless, so logout only tells the client to drop its copy.

use crate::{
    app::AppState,
    error::{validation_details, ApiError, ApiResult, ValidationErrorDetail},
};
use axum::{extract::rejection::JsonRejection, extract::State, http::StatusCode, Extension, Json};
use serde::{Deserialize, Serialize};
use taskboard_shared::{
    auth::{jwt, middleware::AuthContext, password},
    models::user::{normalize_email, CreateUser, PublicUser, Role, User},
};
use validator::Validate;

/// Register request
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[serde(default)]
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,

    #[serde(default)]
    #[validate(email(message = "Valid email is required"))]
    pub email: String,

    #[serde(default)]
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,

    /// `admin` or `member`; defaults to member
    pub role: Option<String>,
}

/// Login request
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[serde(default)]
    #[validate(email(message = "Valid email is required"))]
    pub email: String,

    #[serde(default)]
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// Register and login response
#[derive(Debug, Serialize, Deserialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: PublicUser,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct VerifyResponse {
    pub user: PublicUser,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

fn issue_token(state: &AppState, user: &User) -> ApiResult<AuthResponse> {
    let claims = jwt::Claims::new(user.id, state.config.jwt.expires_in());
    let token = jwt::create_token(&claims, state.jwt_secret())?;

    Ok(AuthResponse {
        token,
        user: user.to_public(),
    })
}

/// Register a new user
///
/// ```text
/// POST /api/auth/register
///
/// { "name": "Jane", "email": "jane@example.com", "password": "secret1", "role": "member" }
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: Validation failed, invalid role, or email already registered
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<AuthResponse>)> {
    let Json(mut req) = payload?;
    req.name = req.name.trim().to_string();
    req.email = normalize_email(&req.email);

    let mut errors = match req.validate() {
        Ok(()) => Vec::new(),
        Err(e) => validation_details(&e),
    };

    let role = match req.role.as_deref().map(str::trim) {
        None | Some("") => Role::default(),
        Some(raw) => raw.parse::<Role>().unwrap_or_else(|_| {
            errors.push(ValidationErrorDetail::new("role", "Invalid role"));
            Role::default()
        }),
    };

    if !errors.is_empty() {
        return Err(ApiError::ValidationError(errors));
    }

    if state.store.find_user_by_email(&req.email).await?.is_some() {
        return Err(ApiError::BadRequest("User already exists".to_string()));
    }

    let password_hash = password::hash_password(&req.password)?;

    // The unique constraint still catches a concurrent registration
    let user = state
        .store
        .create_user(CreateUser {
            name: req.name,
            email: req.email,
            password_hash,
            role,
        })
        .await?;

    tracing::info!(user_id = %user.id, role = %user.role, "User registered");

    Ok((StatusCode::CREATED, Json(issue_token(&state, &user)?)))
}

/// Log in with email and password
///
/// # Errors
///
/// - `400 Bad Request`: Validation failed or invalid credentials
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> ApiResult<Json<AuthResponse>> {
    let Json(mut req) = payload?;
    req.email = normalize_email(&req.email);
    req.validate()?;

    let invalid = || ApiError::BadRequest("Invalid credentials".to_string());

    let user = state
        .store
        .find_user_by_email(&req.email)
        .await?
        .ok_or_else(invalid)?;

    if !password::verify_password(&req.password, &user.password_hash)? {
        tracing::debug!(user_id = %user.id, "Login rejected: wrong password");
        return Err(invalid());
    }

    Ok(Json(issue_token(&state, &user)?))
}

/// Returns the authenticated user
pub async fn verify(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<VerifyResponse>> {
    let user = state
        .store
        .find_user_by_id(auth.user_id)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("Token is not valid".to_string()))?;

    Ok(Json(VerifyResponse {
        user: user.to_public(),
    }))
}

pub async fn logout(Extension(auth): Extension<AuthContext>) -> Json<MessageResponse> {
    tracing::debug!(user_id = %auth.user_id, "User logged out");

    Json(MessageResponse {
        message: "Logged out successfully".to_string(),
    })
}
