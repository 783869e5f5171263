/// Authorization checks
///
/// Two rules exist:
///
/// 1. **Admin gate**: user listing, role changes and the activity feed are
///    admin only.
/// 2. **Task access**: a non-admin may read or change a task only when they
///    are its assignee or its creator. The same rule scopes list queries and
///    stats through [`crate::query::TaskScope`].
///
/// # Example
///
/// ```
/// use taskboard_shared::auth::authorization::{require_admin, require_task_access};
/// use taskboard_shared::auth::middleware::AuthContext;
/// use taskboard_shared::models::user::Role;
/// use uuid::Uuid;
///
/// let member = AuthContext::new(Uuid::new_v4(), Role::Member);
/// assert!(require_admin(&member).is_err());
/// assert!(require_task_access(&member, member.user_id, Uuid::new_v4()).is_ok());
/// ```

use uuid::Uuid;

use super::middleware::AuthContext;
use crate::query::TaskScope;

/// Error type for authorization checks
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthzError {
    #[error("Admin access required")]
    AdminRequired,

    #[error("Not authorized to access this task")]
    NotAuthorized,
}

pub fn require_admin(auth: &AuthContext) -> Result<(), AuthzError> {
    if auth.is_admin() {
        Ok(())
    } else {
        Err(AuthzError::AdminRequired)
    }
}

/// Checks that the caller may access a task with the given owners
pub fn require_task_access(
    auth: &AuthContext,
    assignee_id: Uuid,
    created_by: Uuid,
) -> Result<(), AuthzError> {
    if TaskScope::for_caller(auth).permits(assignee_id, created_by) {
        Ok(())
    } else {
        Err(AuthzError::NotAuthorized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::user::Role;

    #[test]
    fn test_require_admin() {
        assert!(require_admin(&AuthContext::new(Uuid::new_v4(), Role::Admin)).is_ok());
        assert_eq!(
            require_admin(&AuthContext::new(Uuid::new_v4(), Role::Member)),
            Err(AuthzError::AdminRequired)
        );
    }

    #[test]
    fn test_task_access() {
        let member = AuthContext::new(Uuid::new_v4(), Role::Member);
        let other = Uuid::new_v4();

        // Assignee
        assert!(require_task_access(&member, member.user_id, other).is_ok());
        // Creator
        assert!(require_task_access(&member, other, member.user_id).is_ok());
        // Neither
        assert_eq!(
            require_task_access(&member, other, other),
            Err(AuthzError::NotAuthorized)
        );

        let admin = AuthContext::new(Uuid::new_v4(), Role::Admin);
        assert!(require_task_access(&admin, other, other).is_ok());
    }
}
