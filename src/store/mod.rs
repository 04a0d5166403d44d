//! Repository traits the services are written against, and their adapters.
//!
//! Services never see SQL. They hold `Arc<dyn ...Repository>` handles and the
//! binary decides which adapter backs them: [`PgStore`] in production,
//! [`MemoryStore`] in tests and local experiments.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{Category, NewPayment, NewTask, NewUser, Payment, Task, User};
use crate::tasks::query::{PageRequest, TaskFilter};

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Failures raised by store adapters.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The email is already taken. Raised by the store's own uniqueness
    /// guarantee, never by a separate read.
    #[error("email already registered")]
    DuplicateEmail,
    /// Anything else the backend reported.
    #[error("store failure: {0}")]
    Backend(String),
}

/// A page of tasks plus the size of the whole filtered set.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskSlice {
    pub items: Vec<Task>,
    pub total_count: i64,
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Insert a user. Must fail with [`StoreError::DuplicateEmail`] when an
    /// email equal ignoring case already exists, atomically with the insert.
    async fn insert_user(&self, user: NewUser) -> Result<User, StoreError>;

    /// Case-insensitive lookup by email.
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;
}

#[async_trait]
pub trait TaskRepository: Send + Sync {
    /// Filtered, id-ordered page of the owner's tasks.
    async fn query_tasks(
        &self,
        owner_id: i32,
        filter: &TaskFilter,
        page: &PageRequest,
    ) -> Result<TaskSlice, StoreError>;

    async fn find_task(&self, owner_id: i32, id: i32) -> Result<Option<Task>, StoreError>;

    async fn insert_task(&self, owner_id: i32, task: &NewTask) -> Result<Task, StoreError>;

    /// Replace every field of an existing task. `None` when no such task is owned by `owner_id`.
    async fn update_task(
        &self,
        owner_id: i32,
        id: i32,
        task: &NewTask,
    ) -> Result<Option<Task>, StoreError>;

    /// Returns whether a row was removed.
    async fn delete_task(&self, owner_id: i32, id: i32) -> Result<bool, StoreError>;
}

#[async_trait]
pub trait CategoryRepository: Send + Sync {
    /// All categories ordered by id.
    async fn list_categories(&self) -> Result<Vec<Category>, StoreError>;

    async fn category_exists(&self, id: i32) -> Result<bool, StoreError>;
}

#[async_trait]
pub trait PaymentRepository: Send + Sync {
    /// The owner's payments ordered by id.
    async fn list_payments(&self, owner_id: i32) -> Result<Vec<Payment>, StoreError>;

    async fn insert_payment(&self, owner_id: i32, payment: &NewPayment) -> Result<Payment, StoreError>;
}

/// Categories seeded into a fresh store. Mirrors `migrations/0001_init.sql`.
pub const DEFAULT_CATEGORIES: [&str; 4] = ["Work", "Personal", "Shopping", "Health"];
