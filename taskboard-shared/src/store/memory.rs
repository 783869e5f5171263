//! In-process [`Store`] used by tests and the demo mode
//!
//! All state sits behind one `tokio::sync::RwLock`, so every operation is
//! atomic with respect to the others. Query semantics come from
//! [`TaskFilter::matches`] and [`crate::query::TaskSort::compare`].

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{Store, StoreError};
use crate::models::activity_log::{ActivityLog, CreateActivityLog};
use crate::models::task::{CreateTask, Task, TaskDetails, UpdateTask};
use crate::models::user::{CreateUser, Role, User};
use crate::query::{TaskFilter, TaskQuery, TaskScope};

#[derive(Debug, Default)]
struct State {
    users: HashMap<Uuid, User>,
    tasks: HashMap<Uuid, Task>,

    /// Append order
    activity: Vec<ActivityLog>,
}

impl State {
    fn details(&self, task: &Task) -> Result<TaskDetails, StoreError> {
        let lookup = |id: Uuid| {
            self.users
                .get(&id)
                .map(User::summary)
                .ok_or_else(|| StoreError::Inconsistent(format!("task {} references missing user {}", task.id, id)))
        };

        Ok(TaskDetails::from_parts(
            task.clone(),
            lookup(task.assignee_id)?,
            lookup(task.created_by)?,
        ))
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn create_user(&self, data: CreateUser) -> Result<User, StoreError> {
        let mut state = self.state.write().await;

        if state.users.values().any(|user| user.email == data.email) {
            return Err(StoreError::DuplicateEmail);
        }

        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            name: data.name,
            email: data.email,
            password_hash: data.password_hash,
            role: data.role,
            created_at: now,
            updated_at: now,
        };
        state.users.insert(user.id, user.clone());

        Ok(user)
    }

    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        Ok(self.state.read().await.users.get(&id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let state = self.state.read().await;
        Ok(state.users.values().find(|user| user.email == email).cloned())
    }

    async fn list_users(&self) -> Result<Vec<User>, StoreError> {
        let state = self.state.read().await;
        let mut users: Vec<User> = state.users.values().cloned().collect();
        users.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(users)
    }

    async fn update_user_role(&self, id: Uuid, role: Role) -> Result<Option<User>, StoreError> {
        let mut state = self.state.write().await;

        Ok(state.users.get_mut(&id).map(|user| {
            user.role = role;
            user.updated_at = Utc::now();
            user.clone()
        }))
    }

    async fn create_task(&self, data: CreateTask) -> Result<TaskDetails, StoreError> {
        let mut state = self.state.write().await;

        if !state.users.contains_key(&data.assignee_id) || !state.users.contains_key(&data.created_by) {
            return Err(StoreError::UnknownUser);
        }

        let now = Utc::now();
        let task = Task {
            id: Uuid::new_v4(),
            title: data.title,
            description: data.description,
            status: data.status,
            priority: data.priority,
            due_date: data.due_date,
            tags: data.tags,
            assignee_id: data.assignee_id,
            created_by: data.created_by,
            created_at: now,
            updated_at: now,
        };
        let details = state.details(&task)?;
        state.tasks.insert(task.id, task);

        Ok(details)
    }

    async fn find_task(&self, id: Uuid) -> Result<Option<Task>, StoreError> {
        Ok(self.state.read().await.tasks.get(&id).cloned())
    }

    async fn find_task_details(&self, id: Uuid) -> Result<Option<TaskDetails>, StoreError> {
        let state = self.state.read().await;
        state.tasks.get(&id).map(|task| state.details(task)).transpose()
    }

    async fn update_task(
        &self,
        id: Uuid,
        scope: TaskScope,
        data: UpdateTask,
    ) -> Result<Option<TaskDetails>, StoreError> {
        let mut state = self.state.write().await;

        if let Some(assignee_id) = data.assignee_id {
            if !state.users.contains_key(&assignee_id) {
                return Err(StoreError::UnknownUser);
            }
        }

        let Some(task) = state.tasks.get(&id).filter(|task| scope.permits_task(task)) else {
            return Ok(None);
        };

        let mut updated = task.clone();
        data.apply_to(&mut updated, Utc::now());
        let details = state.details(&updated)?;
        state.tasks.insert(id, updated);

        Ok(Some(details))
    }

    async fn delete_task(&self, id: Uuid, scope: TaskScope) -> Result<Option<Task>, StoreError> {
        let mut state = self.state.write().await;

        let permitted = state.tasks.get(&id).is_some_and(|task| scope.permits_task(task));
        if !permitted {
            return Ok(None);
        }

        Ok(state.tasks.remove(&id))
    }

    async fn list_tasks(&self, query: &TaskQuery) -> Result<Vec<TaskDetails>, StoreError> {
        let state = self.state.read().await;

        let mut matching: Vec<&Task> = state
            .tasks
            .values()
            .filter(|task| query.filter.matches(task))
            .collect();
        matching.sort_by(|a, b| query.sort.compare(a, b));

        let offset = usize::try_from(query.page.offset()).unwrap_or(usize::MAX);
        matching
            .into_iter()
            .skip(offset)
            .take(usize::try_from(query.page.limit).unwrap_or(usize::MAX))
            .map(|task| state.details(task))
            .collect()
    }

    async fn count_tasks(&self, filter: &TaskFilter) -> Result<u64, StoreError> {
        let state = self.state.read().await;
        Ok(state.tasks.values().filter(|task| filter.matches(task)).count() as u64)
    }

    async fn append_activity(&self, entry: CreateActivityLog) -> Result<ActivityLog, StoreError> {
        let mut state = self.state.write().await;

        let log = ActivityLog {
            id: Uuid::new_v4(),
            task_id: entry.task_id,
            user_id: entry.user_id,
            action: entry.action,
            details: entry.details,
            created_at: Utc::now(),
        };
        state.activity.push(log.clone());

        Ok(log)
    }

    async fn list_activity(
        &self,
        task_id: Option<Uuid>,
        limit: u32,
    ) -> Result<Vec<ActivityLog>, StoreError> {
        let state = self.state.read().await;

        Ok(state
            .activity
            .iter()
            .rev()
            .filter(|entry| task_id.map_or(true, |id| entry.task_id == id))
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn close(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::activity_log::ActivityAction;
    use crate::models::task::{TaskPriority, TaskStatus};
    use crate::query::{PageRequest, TaskSort};

    async fn user(store: &MemoryStore, email: &str, role: Role) -> User {
        store
            .create_user(CreateUser {
                name: email.split('@').next().unwrap_or(email).to_string(),
                email: email.to_string(),
                password_hash: "hash".to_string(),
                role,
            })
            .await
            .unwrap()
    }

    fn new_task(title: &str, assignee: Uuid, creator: Uuid) -> CreateTask {
        CreateTask {
            title: title.to_string(),
            description: None,
            status: TaskStatus::Todo,
            priority: TaskPriority::Medium,
            due_date: None,
            tags: vec![],
            assignee_id: assignee,
            created_by: creator,
        }
    }

    #[tokio::test]
    async fn test_duplicate_email_rejected() {
        let store = MemoryStore::new();
        user(&store, "a@example.com", Role::Member).await;

        let result = store
            .create_user(CreateUser {
                name: "Again".to_string(),
                email: "a@example.com".to_string(),
                password_hash: "hash".to_string(),
                role: Role::Member,
            })
            .await;

        assert!(matches!(result, Err(StoreError::DuplicateEmail)));
    }

    #[tokio::test]
    async fn test_create_task_requires_known_users() {
        let store = MemoryStore::new();
        let alice = user(&store, "alice@example.com", Role::Member).await;

        let result = store.create_task(new_task("Orphan", Uuid::new_v4(), alice.id)).await;
        assert!(matches!(result, Err(StoreError::UnknownUser)));

        let details = store.create_task(new_task("Ok", alice.id, alice.id)).await.unwrap();
        assert_eq!(details.assignee.email, "alice@example.com");
        assert_eq!(details.created_by.id, alice.id);
    }

    #[tokio::test]
    async fn test_scoped_writes() {
        let store = MemoryStore::new();
        let alice = user(&store, "alice@example.com", Role::Member).await;
        let bob = user(&store, "bob@example.com", Role::Member).await;
        let task = store.create_task(new_task("Alice's", alice.id, alice.id)).await.unwrap();

        let update = UpdateTask {
            status: Some(TaskStatus::Done),
            ..Default::default()
        };

        // Bob is neither assignee nor creator
        let denied = store
            .update_task(task.id, TaskScope::Owner(bob.id), update.clone())
            .await
            .unwrap();
        assert!(denied.is_none());
        assert!(store.delete_task(task.id, TaskScope::Owner(bob.id)).await.unwrap().is_none());

        let updated = store
            .update_task(task.id, TaskScope::Owner(alice.id), update)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.status, TaskStatus::Done);
        assert!(updated.updated_at >= updated.created_at);

        let removed = store.delete_task(task.id, TaskScope::All).await.unwrap();
        assert_eq!(removed.map(|t| t.id), Some(task.id));
        assert!(store.find_task(task.id).await.unwrap().is_none());

        // Already gone
        assert!(store.delete_task(task.id, TaskScope::All).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_pages_and_counts() {
        let store = MemoryStore::new();
        let alice = user(&store, "alice@example.com", Role::Member).await;
        let bob = user(&store, "bob@example.com", Role::Member).await;

        for i in 0..5 {
            store.create_task(new_task(&format!("A{}", i), alice.id, alice.id)).await.unwrap();
        }
        store.create_task(new_task("B", bob.id, bob.id)).await.unwrap();

        let query = TaskQuery {
            filter: TaskFilter::new(TaskScope::Owner(alice.id)),
            sort: TaskSort::default(),
            page: PageRequest { page: 2, limit: 2 },
        };

        let page = store.list_tasks(&query).await.unwrap();
        assert_eq!(page.len(), 2);
        assert!(page.iter().all(|t| t.assignee.id == alice.id));
        assert_eq!(store.count_tasks(&query.filter).await.unwrap(), 5);
        assert_eq!(store.count_tasks(&TaskFilter::new(TaskScope::All)).await.unwrap(), 6);

        let beyond = TaskQuery {
            page: PageRequest { page: 4, limit: 2 },
            ..query
        };
        assert!(store.list_tasks(&beyond).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_activity_newest_first() {
        let store = MemoryStore::new();
        let alice = user(&store, "alice@example.com", Role::Member).await;
        let task_a = Uuid::new_v4();
        let task_b = Uuid::new_v4();

        for (task, action) in [
            (task_a, ActivityAction::Create),
            (task_b, ActivityAction::Create),
            (task_a, ActivityAction::Delete),
        ] {
            store
                .append_activity(CreateActivityLog::for_task(task, "t", alice.id, action))
                .await
                .unwrap();
        }

        let all = store.list_activity(None, 10).await.unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].action, ActivityAction::Delete);

        let for_a = store.list_activity(Some(task_a), 10).await.unwrap();
        assert_eq!(for_a.len(), 2);
        assert!(for_a.iter().all(|e| e.task_id == task_a));

        assert_eq!(store.list_activity(None, 1).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_role_update() {
        let store = MemoryStore::new();
        let alice = user(&store, "alice@example.com", Role::Member).await;

        let updated = store.update_user_role(alice.id, Role::Admin).await.unwrap().unwrap();
        assert_eq!(updated.role, Role::Admin);
        assert!(store.update_user_role(Uuid::new_v4(), Role::Admin).await.unwrap().is_none());
    }
}
