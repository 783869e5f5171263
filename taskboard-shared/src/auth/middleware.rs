/// Bearer credential resolution
///
/// The auth gate reads `Authorization: Bearer <token>`, validates the token
/// and then loads the user from the store. The resolved identity is placed in
/// request extensions as an [`AuthContext`]; handlers pick it up with Axum's
/// `Extension` extractor.
///
/// Looking the user up on every request means role changes take effect
/// immediately and tokens of users that no longer exist stop working.
///
/// # Example
///
/// ```
/// use axum::Extension;
/// use taskboard_shared::auth::middleware::AuthContext;
///
/// async fn handler(Extension(auth): Extension<AuthContext>) -> String {
///     format!("User: {}, admin: {}", auth.user_id, auth.is_admin())
/// }
/// ```

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::jwt::{validate_token, JwtError};
use crate::models::user::{Role, User};
use crate::store::{Store, StoreError};

/// Identity attached to an authenticated request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthContext {
    pub user_id: Uuid,
    pub role: Role,
}

impl AuthContext {
    pub fn new(user_id: Uuid, role: Role) -> Self {
        Self { user_id, role }
    }

    pub fn from_user(user: &User) -> Self {
        Self::new(user.id, user.role)
    }

    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }
}

/// Error type for credential resolution
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("No token, authorization denied")]
    MissingCredentials,

    #[error("{0}")]
    InvalidFormat(String),

    #[error("{0}")]
    InvalidToken(String),

    /// Token is valid but its subject no longer exists
    #[error("User not found")]
    UnknownUser,

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// Extracts the token from an `Authorization` header value
pub fn bearer_token(header: &str) -> Result<&str, AuthError> {
    let token = header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .ok_or_else(|| AuthError::InvalidFormat("Expected Bearer token".to_string()))?;

    if token.is_empty() {
        return Err(AuthError::InvalidFormat("Expected Bearer token".to_string()));
    }

    Ok(token)
}

/// Resolves an `Authorization` header value to an [`AuthContext`]
pub async fn authenticate(
    store: &dyn Store,
    secret: &str,
    header: Option<&str>,
) -> Result<AuthContext, AuthError> {
    let header = header.ok_or(AuthError::MissingCredentials)?;
    let token = bearer_token(header)?;

    let claims = validate_token(token, secret).map_err(|e| match e {
        JwtError::Expired => AuthError::InvalidToken("Token expired".to_string()),
        JwtError::InvalidIssuer => AuthError::InvalidToken("Invalid token issuer".to_string()),
        _ => AuthError::InvalidToken("Token is not valid".to_string()),
    })?;

    let user = store
        .find_user_by_id(claims.sub)
        .await?
        .ok_or(AuthError::UnknownUser)?;

    Ok(AuthContext::from_user(&user))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::jwt::{create_token, Claims};
    use crate::models::user::CreateUser;
    use crate::store::memory::MemoryStore;
    use chrono::Duration;

    const SECRET: &str = "middleware-test-secret-0123456789abcdef";

    async fn store_with_user(role: Role) -> (MemoryStore, User) {
        let store = MemoryStore::new();
        let user = store
            .create_user(CreateUser {
                name: "Test".to_string(),
                email: "test@example.com".to_string(),
                password_hash: "hash".to_string(),
                role,
            })
            .await
            .unwrap();
        (store, user)
    }

    #[test]
    fn test_bearer_token() {
        assert_eq!(bearer_token("Bearer abc").unwrap(), "abc");
        assert!(matches!(bearer_token("Basic abc"), Err(AuthError::InvalidFormat(_))));
        assert!(matches!(bearer_token("Bearer "), Err(AuthError::InvalidFormat(_))));
    }

    #[tokio::test]
    async fn test_authenticate_resolves_role_from_store() {
        let (store, user) = store_with_user(Role::Admin).await;
        let token = create_token(&Claims::new(user.id, Duration::hours(1)), SECRET).unwrap();
        let header = format!("Bearer {}", token);

        let auth = authenticate(&store, SECRET, Some(&header)).await.unwrap();
        assert_eq!(auth.user_id, user.id);
        assert!(auth.is_admin());
    }

    #[tokio::test]
    async fn test_authenticate_rejections() {
        let (store, user) = store_with_user(Role::Member).await;

        let result = authenticate(&store, SECRET, None).await;
        assert!(matches!(result, Err(AuthError::MissingCredentials)));

        let result = authenticate(&store, SECRET, Some("Bearer garbage")).await;
        assert!(matches!(result, Err(AuthError::InvalidToken(_))));

        let expired = create_token(&Claims::new(user.id, Duration::seconds(-60)), SECRET).unwrap();
        let header = format!("Bearer {}", expired);
        let result = authenticate(&store, SECRET, Some(&header)).await;
        assert!(matches!(result, Err(AuthError::InvalidToken(msg)) if msg == "Token expired"));

        let stranger = create_token(&Claims::new(Uuid::new_v4(), Duration::hours(1)), SECRET).unwrap();
        let header = format!("Bearer {}", stranger);
        let result = authenticate(&store, SECRET, Some(&header)).await;
        assert!(matches!(result, Err(AuthError::UnknownUser)));
    }
}
