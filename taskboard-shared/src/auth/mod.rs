/// Authentication and authorization utilities
///
/// # Modules
///
/// - [`password`]: Argon2id password hashing and verification
/// - [`jwt`]: Bearer token issuing and validation
/// - [`middleware`]: Resolves a bearer credential to an [`middleware::AuthContext`]
/// - [`authorization`]: Admin gate and per-task access checks
///
/// # Example
///
/// ```no_run
/// use taskboard_shared::auth::jwt::{create_token, validate_token, Claims};
/// use taskboard_shared::auth::password::{hash_password, verify_password};
/// use chrono::Duration;
/// use uuid::Uuid;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let hash = hash_password("user_password")?;
/// assert!(verify_password("user_password", &hash)?);
///
/// let claims = Claims::new(Uuid::new_v4(), Duration::days(7));
/// let token = create_token(&claims, "secret-key")?;
/// let validated = validate_token(&token, "secret-key")?;
/// assert_eq!(validated.sub, claims.sub);
/// # Ok(())
/// # }
/// ```

pub mod authorization;
pub mod jwt;
pub mod middleware;
pub mod password;
