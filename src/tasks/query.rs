//! Filtered, paginated task listings.
//!
//! Raw query-string values are parsed exactly once, in
//! [`TaskQueryParams::parse`], into a typed [`TaskFilter`] and [`PageRequest`].
//! Anything malformed is rejected there, before the store is touched.
//!
//! Listings are ordered by ascending task id so that, for a fixed filter and
//! data set, consecutive pages never overlap or skip a task.

use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::config::DEFAULT_PAGE_SIZE;
use crate::error::AppError;
use crate::models::{Task, TaskPage, TaskPriority, TaskStatus};
use crate::store::TaskRepository;

/// Independently optional predicates, combined with AND. `None` means no constraint.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskFilter {
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub category_id: Option<i32>,
    /// Trimmed, non-empty search text matched against title or description.
    pub search: Option<String>,
}

impl TaskFilter {
    /// In-process evaluation of the filter, used by the memory store.
    pub fn matches(&self, task: &Task) -> bool {
        if self.status.is_some_and(|status| status != task.status) {
            return false;
        }
        if self.priority.is_some_and(|priority| priority != task.priority) {
            return false;
        }
        if self
            .category_id
            .is_some_and(|category_id| task.category_id != Some(category_id))
        {
            return false;
        }
        match &self.search {
            Some(search) => {
                let needle = search.to_lowercase();
                task.title.to_lowercase().contains(&needle)
                    || task
                        .description
                        .as_deref()
                        .is_some_and(|description| description.to_lowercase().contains(&needle))
            }
            None => true,
        }
    }
}

/// A validated 1-based page position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: i64,
    pub page_size: i64,
}

impl PageRequest {
    /// Number of filtered tasks preceding this page.
    pub fn offset(&self) -> i64 {
        (self.page - 1) * self.page_size
    }
}

/// Query-string shape of `GET /api/tasks`. Every value is optional and kept
/// as text until [`parse`](Self::parse) so that bad numbers become validation
/// errors rather than routing failures.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskQueryParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_size: Option<String>,
}

/// Treats missing and blank values alike.
fn present(raw: &Option<String>) -> Option<&str> {
    raw.as_deref().map(str::trim).filter(|value| !value.is_empty())
}

fn number<T: FromStr>(name: &str, raw: &Option<String>, errors: &mut Vec<String>) -> Option<T> {
    let value = present(raw)?;
    match value.parse() {
        Ok(parsed) => Some(parsed),
        Err(_) => {
            errors.push(format!("{} must be a whole number", name));
            None
        }
    }
}

impl TaskQueryParams {
    /// Builds the query string for a typed filter and page.
    pub fn new(filter: &TaskFilter, page: PageRequest) -> Self {
        Self {
            status: filter.status.map(|status| i32::from(status).to_string()),
            priority: filter.priority.map(|priority| i32::from(priority).to_string()),
            category_id: filter.category_id.map(|id| id.to_string()),
            search: filter.search.clone(),
            page: Some(page.page.to_string()),
            page_size: Some(page.page_size.to_string()),
        }
    }

    /// Validates every parameter, reporting all problems at once.
    ///
    /// `page` below 1 is clamped to 1. `pageSize` defaults to 10 (or
    /// `max_page_size` if that is smaller) and must lie in `1..=max_page_size`.
    pub fn parse(&self, max_page_size: i64) -> Result<(TaskFilter, PageRequest), AppError> {
        let mut errors = Vec::new();

        let status = number::<i32>("status", &self.status, &mut errors).and_then(|raw| {
            TaskStatus::try_from(raw).map_err(|e| errors.push(e)).ok()
        });
        let priority = number::<i32>("priority", &self.priority, &mut errors).and_then(|raw| {
            TaskPriority::try_from(raw).map_err(|e| errors.push(e)).ok()
        });
        let category_id = number::<i32>("categoryId", &self.category_id, &mut errors);
        let search = present(&self.search).map(String::from);

        let page = number::<i64>("page", &self.page, &mut errors).unwrap_or(1).max(1);
        let page_size = number::<i64>("pageSize", &self.page_size, &mut errors)
            .unwrap_or_else(|| DEFAULT_PAGE_SIZE.min(max_page_size));
        if !(1..=max_page_size).contains(&page_size) {
            errors.push(format!("pageSize must be between 1 and {}", max_page_size));
        } else if (page - 1).checked_mul(page_size).is_none() {
            errors.push("page is out of range".to_string());
        }

        if !errors.is_empty() {
            return Err(AppError::ValidationFailed {
                message: "Invalid query parameters".into(),
                errors,
            });
        }

        Ok((
            TaskFilter {
                status,
                priority,
                category_id,
                search,
            },
            PageRequest { page, page_size },
        ))
    }
}

/// Serves filtered pages of the caller's tasks.
#[derive(Clone)]
pub struct TaskQueryEngine {
    tasks: Arc<dyn TaskRepository>,
    max_page_size: i64,
}

impl TaskQueryEngine {
    pub fn new(tasks: Arc<dyn TaskRepository>, max_page_size: i64) -> Self {
        Self {
            tasks,
            max_page_size,
        }
    }

    pub fn max_page_size(&self) -> i64 {
        self.max_page_size
    }

    /// Parses raw parameters and runs the query.
    pub async fn query(&self, owner_id: i32, params: &TaskQueryParams) -> Result<TaskPage, AppError> {
        let (filter, page) = params.parse(self.max_page_size)?;
        self.run(owner_id, &filter, page).await
    }

    /// Runs an already validated query.
    pub async fn run(
        &self,
        owner_id: i32,
        filter: &TaskFilter,
        page: PageRequest,
    ) -> Result<TaskPage, AppError> {
        let slice = self.tasks.query_tasks(owner_id, filter, &page).await?;
        log::debug!(
            "task query for user {}: {:?} page {} -> {} of {}",
            owner_id,
            filter,
            page.page,
            slice.items.len(),
            slice.total_count
        );

        Ok(TaskPage {
            items: slice.items,
            total_count: slice.total_count,
            page: page.page,
            page_size: page.page_size,
        })
    }
}
