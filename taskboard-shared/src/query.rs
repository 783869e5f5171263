//! Task query pipeline: scope, filter, sort and pagination
//!
//! Every task read goes through the types in this module. A [`TaskQuery`] is
//! built from the caller's identity plus the raw list parameters, and each
//! store backend evaluates it the same way:
//!
//! - [`TaskScope`] restricts non-admins to tasks they are assigned to or created
//! - [`TaskFilter`] ANDs search/status/priority predicates onto the scope
//! - [`TaskSort`] orders results, with deterministic tie-breaking
//! - [`PageRequest`] selects the page; [`Pagination`] reports it back
//!
//! Postgres evaluates these through `push_sql`; the in-memory store uses
//! `matches`/`compare`. Both must agree, and the tests here pin the
//! in-memory semantics.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Postgres, QueryBuilder};
use std::cmp::Ordering;
use std::num::IntErrorKind;
use std::str::FromStr;
use uuid::Uuid;

use crate::auth::middleware::AuthContext;
use crate::models::task::{Task, TaskPriority, TaskStatus};

pub const DEFAULT_PAGE: u64 = 1;
pub const DEFAULT_LIMIT: u64 = 10;

/// Errors produced while turning raw parameters into a query
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueryError {
    #[error("{0}")]
    InvalidStatus(String),

    #[error("{0}")]
    InvalidPriority(String),

    #[error("Sort field must be one of: title, status, priority, dueDate, createdAt, updatedAt (got '{0}')")]
    InvalidSortField(String),
}

impl QueryError {
    /// Query parameter the error refers to
    pub fn field(&self) -> &'static str {
        match self {
            QueryError::InvalidStatus(_) => "status",
            QueryError::InvalidPriority(_) => "priority",
            QueryError::InvalidSortField(_) => "sortBy",
        }
    }
}

/// Ownership scope of a query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskScope {
    /// No ownership restriction (admins)
    All,

    /// Only tasks where the user is assignee or creator
    Owner(Uuid),
}

impl TaskScope {
    pub fn for_caller(auth: &AuthContext) -> Self {
        if auth.is_admin() {
            TaskScope::All
        } else {
            TaskScope::Owner(auth.user_id)
        }
    }

    pub fn permits(&self, assignee_id: Uuid, created_by: Uuid) -> bool {
        match self {
            TaskScope::All => true,
            TaskScope::Owner(user_id) => *user_id == assignee_id || *user_id == created_by,
        }
    }

    pub fn permits_task(&self, task: &Task) -> bool {
        self.permits(task.assignee_id, task.created_by)
    }

    /// Appends ` AND (<scope>)` against the `t` alias; no-op for `All`
    pub fn push_sql(&self, qb: &mut QueryBuilder<'_, Postgres>) {
        if let TaskScope::Owner(user_id) = *self {
            qb.push(" AND (t.assignee_id = ")
                .push_bind(user_id)
                .push(" OR t.created_by = ")
                .push_bind(user_id)
                .push(")");
        }
    }
}

/// Scope plus optional predicates, combined with AND
#[derive(Debug, Clone, PartialEq)]
pub struct TaskFilter {
    pub scope: TaskScope,

    /// Case-insensitive substring over title, description and tags (OR'd)
    pub search: Option<String>,

    pub status: Option<TaskStatus>,

    pub priority: Option<TaskPriority>,

    /// When set, only tasks due strictly before this instant and not done
    pub overdue_at: Option<DateTime<Utc>>,
}

impl TaskFilter {
    pub fn new(scope: TaskScope) -> Self {
        Self {
            scope,
            search: None,
            status: None,
            priority: None,
            overdue_at: None,
        }
    }

    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        let search = search.into();
        self.search = if search.is_empty() { None } else { Some(search) };
        self
    }

    pub fn with_status(mut self, status: TaskStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_priority(mut self, priority: TaskPriority) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn overdue_at(mut self, now: DateTime<Utc>) -> Self {
        self.overdue_at = Some(now);
        self
    }

    /// Evaluates the filter against a single task
    pub fn matches(&self, task: &Task) -> bool {
        if !self.scope.permits_task(task) {
            return false;
        }

        if let Some(search) = &self.search {
            let needle = search.to_lowercase();
            let contains = |haystack: &str| haystack.to_lowercase().contains(&needle);

            let hit = contains(task.title.as_str())
                || task.description.as_deref().is_some_and(contains)
                || task.tags.iter().any(|tag| contains(tag.as_str()));
            if !hit {
                return false;
            }
        }

        if self.status.is_some_and(|status| task.status != status) {
            return false;
        }

        if self.priority.is_some_and(|priority| task.priority != priority) {
            return false;
        }

        if let Some(now) = self.overdue_at {
            let overdue = task.status != TaskStatus::Done && task.due_date.is_some_and(|due| due < now);
            if !overdue {
                return false;
            }
        }

        true
    }

    /// Appends the `WHERE` clause against the `t` alias
    pub fn push_sql(&self, qb: &mut QueryBuilder<'_, Postgres>) {
        qb.push(" WHERE TRUE");
        self.scope.push_sql(qb);

        if let Some(search) = &self.search {
            let pattern = like_pattern(search);
            qb.push(" AND (t.title ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR t.description ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR EXISTS (SELECT 1 FROM unnest(t.tags) AS tag WHERE tag ILIKE ")
                .push_bind(pattern)
                .push("))");
        }

        if let Some(status) = self.status {
            qb.push(" AND t.status = ").push_bind(status);
        }

        if let Some(priority) = self.priority {
            qb.push(" AND t.priority = ").push_bind(priority);
        }

        if let Some(now) = self.overdue_at {
            qb.push(" AND t.due_date < ")
                .push_bind(now)
                .push(" AND t.status <> ")
                .push_bind(TaskStatus::Done);
        }
    }
}

/// Wraps a literal search term for `ILIKE`, escaping `\`, `%` and `_`
fn like_pattern(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for ch in term.chars() {
        if matches!(ch, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(ch);
    }
    pattern.push('%');
    pattern
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    Title,
    Status,
    Priority,
    DueDate,
    CreatedAt,
    UpdatedAt,
}

impl SortField {
    fn column(&self) -> &'static str {
        match self {
            // byte order, so Postgres and the in-memory store agree
            SortField::Title => "t.title COLLATE \"C\"",
            SortField::Status => "t.status",
            SortField::Priority => "t.priority",
            SortField::DueDate => "t.due_date",
            SortField::CreatedAt => "t.created_at",
            SortField::UpdatedAt => "t.updated_at",
        }
    }
}

impl FromStr for SortField {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "title" => Ok(SortField::Title),
            "status" => Ok(SortField::Status),
            "priority" => Ok(SortField::Priority),
            "dueDate" => Ok(SortField::DueDate),
            "createdAt" => Ok(SortField::CreatedAt),
            "updatedAt" => Ok(SortField::UpdatedAt),
            other => Err(QueryError::InvalidSortField(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    /// `desc` means descending; anything else (including absence) ascending
    pub fn from_param(value: Option<&str>) -> Self {
        match value {
            Some("desc") => SortOrder::Desc,
            _ => SortOrder::Asc,
        }
    }
}

/// Sort specification
///
/// Missing due dates sort last ascending and first descending. Ties fall
/// back to newest-created first, then id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskSort {
    pub field: SortField,
    pub order: SortOrder,
}

impl Default for TaskSort {
    fn default() -> Self {
        Self {
            field: SortField::DueDate,
            order: SortOrder::Asc,
        }
    }
}

impl TaskSort {
    pub fn compare(&self, a: &Task, b: &Task) -> Ordering {
        let primary = match self.field {
            SortField::Title => a.title.cmp(&b.title),
            SortField::Status => a.status.cmp(&b.status),
            SortField::Priority => a.priority.cmp(&b.priority),
            SortField::DueDate => compare_due_dates(a.due_date, b.due_date),
            SortField::CreatedAt => a.created_at.cmp(&b.created_at),
            SortField::UpdatedAt => a.updated_at.cmp(&b.updated_at),
        };
        let primary = match self.order {
            SortOrder::Asc => primary,
            SortOrder::Desc => primary.reverse(),
        };

        primary
            .then_with(|| b.created_at.cmp(&a.created_at))
            .then_with(|| a.id.cmp(&b.id))
    }

    pub fn push_sql(&self, qb: &mut QueryBuilder<'_, Postgres>) {
        let direction = match self.order {
            SortOrder::Asc => "ASC NULLS LAST",
            SortOrder::Desc => "DESC NULLS FIRST",
        };
        qb.push(" ORDER BY ")
            .push(self.field.column())
            .push(" ")
            .push(direction)
            .push(", t.created_at DESC, t.id ASC");
    }
}

/// `None` compares greater than any date
fn compare_due_dates(a: Option<DateTime<Utc>>, b: Option<DateTime<Utc>>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Requested page; both values are at least 1
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u64,
    pub limit: u64,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE,
            limit: DEFAULT_LIMIT,
        }
    }
}

impl PageRequest {
    /// Parses raw parameters; anything that is not a positive integer
    /// falls back to the default. There is no upper bound on `limit`.
    pub fn from_params(page: Option<&str>, limit: Option<&str>) -> Self {
        Self {
            page: parse_positive(page).unwrap_or(DEFAULT_PAGE),
            limit: parse_positive(limit).unwrap_or(DEFAULT_LIMIT),
        }
    }

    /// Rows to skip; saturates instead of overflowing
    pub fn offset(&self) -> u64 {
        self.page.saturating_sub(1).saturating_mul(self.limit)
    }
}

/// Positive integers only; values too large for `u64` saturate
fn parse_positive(value: Option<&str>) -> Option<u64> {
    let raw = value?.trim();
    let parsed = match raw.parse::<u64>() {
        Ok(n) => n,
        Err(e) if *e.kind() == IntErrorKind::PosOverflow => u64::MAX,
        Err(_) => return None,
    };
    Some(parsed).filter(|n| *n > 0)
}

/// Pagination metadata returned with a page of results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub page: u64,
    pub limit: u64,

    /// Matching records before pagination
    pub total: u64,

    /// `ceil(total / limit)`
    pub pages: u64,
}

impl Pagination {
    pub fn new(request: PageRequest, total: u64) -> Self {
        Self {
            page: request.page,
            limit: request.limit,
            total,
            pages: total.div_ceil(request.limit),
        }
    }
}

/// Raw list parameters as they arrive on the query string
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskListParams {
    pub search: Option<String>,
    pub status: Option<String>,
    pub priority: Option<String>,
    pub page: Option<String>,
    pub limit: Option<String>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
}

/// A fully-typed list query
#[derive(Debug, Clone, PartialEq)]
pub struct TaskQuery {
    pub filter: TaskFilter,
    pub sort: TaskSort,
    pub page: PageRequest,
}

impl TaskQuery {
    /// Builds a query for `scope`, collecting every invalid parameter
    ///
    /// Empty strings are treated as absent, matching how HTML forms submit
    /// unset filters.
    pub fn from_params(scope: TaskScope, params: &TaskListParams) -> Result<Self, Vec<QueryError>> {
        let present = |value: &Option<String>| {
            value
                .as_deref()
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .map(str::to_string)
        };

        let mut errors = Vec::new();
        let mut filter = TaskFilter::new(scope);

        // Whitespace decides presence only; the term itself is matched verbatim
        if let Some(search) = params.search.as_deref() {
            if !search.trim().is_empty() {
                filter = filter.with_search(search);
            }
        }

        if let Some(status) = present(&params.status) {
            match status.parse::<TaskStatus>() {
                Ok(status) => filter = filter.with_status(status),
                Err(message) => errors.push(QueryError::InvalidStatus(message)),
            }
        }

        if let Some(priority) = present(&params.priority) {
            match priority.parse::<TaskPriority>() {
                Ok(priority) => filter = filter.with_priority(priority),
                Err(message) => errors.push(QueryError::InvalidPriority(message)),
            }
        }

        let sort = match present(&params.sort_by) {
            Some(field) => match field.parse::<SortField>() {
                Ok(field) => TaskSort {
                    field,
                    order: SortOrder::from_param(params.sort_order.as_deref()),
                },
                Err(err) => {
                    errors.push(err);
                    TaskSort::default()
                }
            },
            None => TaskSort::default(),
        };

        if !errors.is_empty() {
            return Err(errors);
        }

        Ok(Self {
            filter,
            sort,
            page: PageRequest::from_params(params.page.as_deref(), params.limit.as_deref()),
        })
    }
}
