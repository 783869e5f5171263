//! Task count summaries
//!
//! Every count runs through the same [`TaskScope`], so a member's totals
//! only ever cover tasks they are assigned to or created.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::task::{TaskPriority, TaskStatus};
use crate::query::{TaskFilter, TaskScope};
use crate::store::{Store, StoreError};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusCounts {
    pub todo: u64,
    pub in_progress: u64,
    pub done: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriorityCounts {
    pub high: u64,
    pub medium: u64,
    pub low: u64,
}

/// Body of `GET /api/stats/overview`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskStats {
    pub total_tasks: u64,
    pub status: StatusCounts,
    pub priority: PriorityCounts,

    /// Due strictly before `now` and not done
    pub overdue: u64,
}

impl TaskStats {
    /// Runs the eight counts concurrently against the store
    pub async fn collect(
        store: &dyn Store,
        scope: TaskScope,
        now: DateTime<Utc>,
    ) -> Result<Self, StoreError> {
        let base = TaskFilter::new(scope);

        let total = base.clone();
        let todo = base.clone().with_status(TaskStatus::Todo);
        let in_progress = base.clone().with_status(TaskStatus::InProgress);
        let done = base.clone().with_status(TaskStatus::Done);
        let high = base.clone().with_priority(TaskPriority::High);
        let medium = base.clone().with_priority(TaskPriority::Medium);
        let low = base.clone().with_priority(TaskPriority::Low);
        let overdue = base.overdue_at(now);

        let (total_tasks, todo, in_progress, done, high, medium, low, overdue) = tokio::try_join!(
            store.count_tasks(&total),
            store.count_tasks(&todo),
            store.count_tasks(&in_progress),
            store.count_tasks(&done),
            store.count_tasks(&high),
            store.count_tasks(&medium),
            store.count_tasks(&low),
            store.count_tasks(&overdue),
        )?;

        Ok(Self {
            total_tasks,
            status: StatusCounts {
                todo,
                in_progress,
                done,
            },
            priority: PriorityCounts { high, medium, low },
            overdue,
        })
    }
}
