use std::sync::Arc;

use validator::Validate;

use crate::error::AppError;
use crate::models::task::parse_due_date;
use crate::models::{NewTask, Task, TaskInput, TaskPriority, TaskStatus};
use crate::store::{CategoryRepository, TaskRepository};

/// Validated single-task writes (and the single-task read).
///
/// Every operation is scoped to `owner_id`; another user's task is
/// indistinguishable from a missing one.
#[derive(Clone)]
pub struct TaskGateway {
    tasks: Arc<dyn TaskRepository>,
    categories: Arc<dyn CategoryRepository>,
}

fn not_found() -> AppError {
    AppError::NotFound("Task not found".into())
}

/// Trims text fields and turns blank optional ones into `None`.
fn normalize(input: TaskInput) -> TaskInput {
    let blank_to_none = |value: Option<String>| {
        value
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty())
    };
    TaskInput {
        title: input.title.trim().to_string(),
        description: blank_to_none(input.description),
        due_date: blank_to_none(input.due_date),
        ..input
    }
}

impl TaskGateway {
    pub fn new(tasks: Arc<dyn TaskRepository>, categories: Arc<dyn CategoryRepository>) -> Self {
        Self { tasks, categories }
    }

    pub async fn get(&self, owner_id: i32, id: i32) -> Result<Task, AppError> {
        self.tasks.find_task(owner_id, id).await?.ok_or_else(not_found)
    }

    pub async fn create(&self, owner_id: i32, input: TaskInput) -> Result<Task, AppError> {
        let task = self.validate(input).await?;
        let created = self.tasks.insert_task(owner_id, &task).await?;
        log::info!("user {} created task {}", owner_id, created.id);
        Ok(created)
    }

    /// Full replacement of every field.
    pub async fn update(&self, owner_id: i32, id: i32, input: TaskInput) -> Result<Task, AppError> {
        let task = self.validate(input).await?;
        let updated = self
            .tasks
            .update_task(owner_id, id, &task)
            .await?
            .ok_or_else(not_found)?;
        log::info!("user {} updated task {}", owner_id, id);
        Ok(updated)
    }

    pub async fn delete(&self, owner_id: i32, id: i32) -> Result<(), AppError> {
        if !self.tasks.delete_task(owner_id, id).await? {
            return Err(not_found());
        }
        log::info!("user {} deleted task {}", owner_id, id);
        Ok(())
    }

    /// Field checks run first and need no store access; the category lookup
    /// only happens for otherwise valid input.
    async fn validate(&self, input: TaskInput) -> Result<NewTask, AppError> {
        let input = normalize(input);
        input.validate()?;

        let status = TaskStatus::try_from(input.status).map_err(AppError::validation)?;
        let priority = TaskPriority::try_from(input.priority).map_err(AppError::validation)?;
        let due_date = match input.due_date.as_deref() {
            Some(raw) => Some(parse_due_date(raw).ok_or_else(|| {
                AppError::validation("Due date must be a calendar date (YYYY-MM-DD)")
            })?),
            None => None,
        };

        if let Some(category_id) = input.category_id {
            if !self.categories.category_exists(category_id).await? {
                return Err(AppError::invalid_input(vec![format!(
                    "Category {} does not exist",
                    category_id
                )]));
            }
        }

        Ok(NewTask {
            title: input.title,
            description: input.description,
            status,
            priority,
            due_date,
            category_id: input.category_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use chrono::{TimeZone, Utc};

    fn gateway() -> TaskGateway {
        let store = Arc::new(MemoryStore::with_default_categories());
        TaskGateway::new(store.clone(), store)
    }

    fn input(title: &str) -> TaskInput {
        TaskInput {
            title: title.to_string(),
            description: Some("  details  ".to_string()),
            status: 0,
            priority: 1,
            due_date: Some("2025-06-01".to_string()),
            category_id: Some(1),
        }
    }

    #[actix_rt::test]
    async fn test_create_normalizes_fields() {
        let task = gateway().create(7, input("  Write report  ")).await.unwrap();

        assert_eq!(task.title, "Write report");
        assert_eq!(task.description.as_deref(), Some("details"));
        assert_eq!(task.status, TaskStatus::Todo);
        assert_eq!(task.priority, TaskPriority::Medium);
        assert_eq!(task.due_date, Some(Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap()));
        assert_eq!(task.owner_id, 7);
    }

    #[actix_rt::test]
    async fn test_blank_title_is_rejected() {
        let result = gateway().create(7, input("   ")).await;
        assert!(matches!(result, Err(AppError::ValidationFailed { .. })));
    }

    #[actix_rt::test]
    async fn test_blank_optional_fields_become_none() {
        let task = gateway()
            .create(
                7,
                TaskInput {
                    description: Some("   ".to_string()),
                    due_date: Some(String::new()),
                    category_id: None,
                    ..input("Minimal")
                },
            )
            .await
            .unwrap();

        assert!(task.description.is_none());
        assert!(task.due_date.is_none());
        assert!(task.category_id.is_none());
    }

    #[actix_rt::test]
    async fn test_unknown_category_is_rejected() {
        let result = gateway()
            .create(
                7,
                TaskInput {
                    category_id: Some(99),
                    ..input("Orphan")
                },
            )
            .await;

        match result {
            Err(AppError::ValidationFailed { errors, .. }) => {
                assert_eq!(errors, vec!["Category 99 does not exist".to_string()])
            }
            other => panic!("expected validation failure, got {:?}", other),
        }
    }

    #[actix_rt::test]
    async fn test_update_replaces_every_field() {
        let gateway = gateway();
        let created = gateway.create(7, input("Original")).await.unwrap();

        let updated = gateway
            .update(
                7,
                created.id,
                TaskInput {
                    title: "Replaced".to_string(),
                    description: None,
                    status: 2,
                    priority: 2,
                    due_date: None,
                    category_id: None,
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.id, created.id);
        assert_eq!(updated.title, "Replaced");
        assert!(updated.description.is_none());
        assert_eq!(updated.status, TaskStatus::Done);
        assert_eq!(updated.priority, TaskPriority::High);
        assert!(updated.due_date.is_none());
        assert!(updated.category_id.is_none());
        assert_eq!(gateway.get(7, created.id).await.unwrap(), updated);
    }

    #[actix_rt::test]
    async fn test_missing_and_foreign_tasks_are_not_found() {
        let gateway = gateway();
        let created = gateway.create(7, input("Mine")).await.unwrap();

        assert!(matches!(gateway.get(8, created.id).await, Err(AppError::NotFound(_))));
        assert!(matches!(
            gateway.update(7, 999, input("Ghost")).await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(gateway.delete(8, created.id).await, Err(AppError::NotFound(_))));

        gateway.delete(7, created.id).await.unwrap();
        assert!(matches!(gateway.delete(7, created.id).await, Err(AppError::NotFound(_))));
    }

    #[actix_rt::test]
    async fn test_update_validates_before_lookup() {
        let result = gateway()
            .update(
                7,
                999,
                TaskInput {
                    status: 9,
                    ..input("Bad status")
                },
            )
            .await;
        assert!(matches!(result, Err(AppError::ValidationFailed { .. })));
    }
}
