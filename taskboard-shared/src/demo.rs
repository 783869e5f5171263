//! Demo dataset
//!
//! Seeds an admin, two members and six tasks (two per user) into an empty
//! store. Only ever run against the in-memory backend, and only when demo
//! mode is switched on explicitly.

use chrono::{Duration, Utc};
use tracing::info;

use crate::auth::password::{hash_password, PasswordError};
use crate::models::task::{CreateTask, TaskPriority, TaskStatus};
use crate::models::user::{CreateUser, Role};
use crate::store::{Store, StoreError};

/// Password shared by every demo account
pub const DEMO_PASSWORD: &str = "password123";

#[derive(Debug, thiserror::Error)]
pub enum SeedError {
    #[error(transparent)]
    Password(#[from] PasswordError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

struct DemoTask {
    title: &'static str,
    description: &'static str,
    status: TaskStatus,
    priority: TaskPriority,
    due_in_days: i64,
    tags: &'static [&'static str],
}

const DEMO_USERS: [(&str, &str, Role, [DemoTask; 2]); 3] = [
    (
        "Admin User",
        "admin@example.com",
        Role::Admin,
        [
            DemoTask {
                title: "Review Team Performance",
                description: "Conduct quarterly performance reviews for all team members",
                status: TaskStatus::InProgress,
                priority: TaskPriority::High,
                due_in_days: 3,
                tags: &["management", "reviews"],
            },
            DemoTask {
                title: "Plan Company Meeting",
                description: "Organize the annual company-wide meeting with all departments",
                status: TaskStatus::Todo,
                priority: TaskPriority::Medium,
                due_in_days: 8,
                tags: &["event", "management"],
            },
        ],
    ),
    (
        "John Developer",
        "john@example.com",
        Role::Member,
        [
            DemoTask {
                title: "Complete Frontend Development",
                description: "Finish the React components for the user dashboard",
                status: TaskStatus::InProgress,
                priority: TaskPriority::High,
                due_in_days: 6,
                tags: &["development", "frontend"],
            },
            DemoTask {
                title: "Write API Documentation",
                description: "Create comprehensive documentation for the new REST API endpoints",
                status: TaskStatus::Todo,
                priority: TaskPriority::Medium,
                due_in_days: -2,
                tags: &["documentation", "backend"],
            },
        ],
    ),
    (
        "Sarah Designer",
        "sarah@example.com",
        Role::Member,
        [
            DemoTask {
                title: "Design User Interface",
                description: "Create UI mockups for the new mobile application",
                status: TaskStatus::Done,
                priority: TaskPriority::High,
                due_in_days: -4,
                tags: &["design", "ui/ux"],
            },
            DemoTask {
                title: "User Testing Session",
                description: "Conduct usability testing with focus group participants",
                status: TaskStatus::InProgress,
                priority: TaskPriority::Medium,
                due_in_days: 7,
                tags: &["testing", "feedback"],
            },
        ],
    ),
];

/// Seeds the demo users and tasks
pub async fn seed(store: &dyn Store) -> Result<(), SeedError> {
    // One hash for all accounts; Argon2 at these parameters is slow
    let password_hash = hash_password(DEMO_PASSWORD)?;
    let now = Utc::now();
    let mut tasks = 0;

    for (name, email, role, demo_tasks) in DEMO_USERS {
        let user = store
            .create_user(CreateUser {
                name: name.to_string(),
                email: email.to_string(),
                password_hash: password_hash.clone(),
                role,
            })
            .await?;

        for task in demo_tasks {
            store
                .create_task(CreateTask {
                    title: task.title.to_string(),
                    description: Some(task.description.to_string()),
                    status: task.status,
                    priority: task.priority,
                    due_date: Some(now + Duration::days(task.due_in_days)),
                    tags: task.tags.iter().map(|tag| tag.to_string()).collect(),
                    assignee_id: user.id,
                    created_by: user.id,
                })
                .await?;
            tasks += 1;
        }
    }

    info!(users = DEMO_USERS.len(), tasks, "Seeded demo data");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::password::verify_password;
    use crate::query::{TaskFilter, TaskScope};
    use crate::store::memory::MemoryStore;

    #[tokio::test]
    async fn test_seed() {
        let store = MemoryStore::new();
        seed(&store).await.unwrap();

        let users = store.list_users().await.unwrap();
        assert_eq!(users.len(), 3);
        assert_eq!(users.iter().filter(|u| u.role.is_admin()).count(), 1);

        let admin = store.find_user_by_email("admin@example.com").await.unwrap().unwrap();
        assert!(verify_password(DEMO_PASSWORD, &admin.password_hash).unwrap());

        assert_eq!(store.count_tasks(&TaskFilter::new(TaskScope::All)).await.unwrap(), 6);

        let john = store.find_user_by_email("john@example.com").await.unwrap().unwrap();
        assert_eq!(
            store.count_tasks(&TaskFilter::new(TaskScope::Owner(john.id))).await.unwrap(),
            2
        );
    }
}
