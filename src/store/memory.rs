use std::collections::BTreeMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::Utc;

use super::{
    CategoryRepository, PaymentRepository, StoreError, TaskRepository, TaskSlice, UserRepository,
    DEFAULT_CATEGORIES,
};
use crate::models::{Category, NewPayment, NewTask, NewUser, Payment, Task, User};
use crate::tasks::query::{PageRequest, TaskFilter};

#[derive(Debug, Default)]
struct Tables {
    users: Vec<User>,
    // BTreeMap keeps tasks in id order, which is the listing order.
    tasks: BTreeMap<i32, Task>,
    categories: Vec<Category>,
    payments: Vec<Payment>,
    next_user_id: i32,
    next_task_id: i32,
    next_payment_id: i32,
}

/// Process-local store. Every operation takes the single table lock, so the
/// email check and the insert in [`UserRepository::insert_user`] cannot interleave.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    /// An empty store with no categories.
    pub fn new() -> Self {
        Self::default()
    }

    /// An empty store seeded with [`DEFAULT_CATEGORIES`] (ids 1..=4).
    pub fn with_default_categories() -> Self {
        let store = Self::new();
        if let Ok(mut tables) = store.tables.write() {
            tables.categories = DEFAULT_CATEGORIES
                .iter()
                .zip(1..)
                .map(|(name, id)| Category {
                    id,
                    name: (*name).to_string(),
                })
                .collect();
        }
        store
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Tables>, StoreError> {
        self.tables
            .read()
            .map_err(|_| StoreError::Backend("memory store lock poisoned".into()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Tables>, StoreError> {
        self.tables
            .write()
            .map_err(|_| StoreError::Backend("memory store lock poisoned".into()))
    }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn insert_user(&self, user: NewUser) -> Result<User, StoreError> {
        let mut tables = self.write()?;
        let key = user.email.to_lowercase();
        if tables
            .users
            .iter()
            .any(|existing| existing.email.to_lowercase() == key)
        {
            return Err(StoreError::DuplicateEmail);
        }

        tables.next_user_id += 1;
        let created = User {
            id: tables.next_user_id,
            name: user.name,
            email: user.email,
            password_hash: user.password_hash,
            created_at: Utc::now(),
        };
        tables.users.push(created.clone());
        Ok(created)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        // Same folding as the LOWER(email) index in Postgres.
        let key = email.to_lowercase();
        Ok(self
            .read()?
            .users
            .iter()
            .find(|user| user.email.to_lowercase() == key)
            .cloned())
    }
}

#[async_trait]
impl TaskRepository for MemoryStore {
    async fn query_tasks(
        &self,
        owner_id: i32,
        filter: &TaskFilter,
        page: &PageRequest,
    ) -> Result<TaskSlice, StoreError> {
        let tables = self.read()?;
        let matching: Vec<&Task> = tables
            .tasks
            .values()
            .filter(|task| task.owner_id == owner_id && filter.matches(task))
            .collect();

        let offset = usize::try_from(page.offset()).unwrap_or(usize::MAX);
        let limit = usize::try_from(page.page_size).unwrap_or(usize::MAX);
        Ok(TaskSlice {
            total_count: matching.len() as i64,
            items: matching
                .into_iter()
                .skip(offset)
                .take(limit)
                .cloned()
                .collect(),
        })
    }

    async fn find_task(&self, owner_id: i32, id: i32) -> Result<Option<Task>, StoreError> {
        Ok(self
            .read()?
            .tasks
            .get(&id)
            .filter(|task| task.owner_id == owner_id)
            .cloned())
    }

    async fn insert_task(&self, owner_id: i32, task: &NewTask) -> Result<Task, StoreError> {
        let mut tables = self.write()?;
        tables.next_task_id += 1;
        let now = Utc::now();
        let created = Task {
            id: tables.next_task_id,
            title: task.title.clone(),
            description: task.description.clone(),
            status: task.status,
            priority: task.priority,
            due_date: task.due_date,
            category_id: task.category_id,
            owner_id,
            created_at: now,
            updated_at: now,
        };
        tables.tasks.insert(created.id, created.clone());
        Ok(created)
    }

    async fn update_task(
        &self,
        owner_id: i32,
        id: i32,
        task: &NewTask,
    ) -> Result<Option<Task>, StoreError> {
        let mut tables = self.write()?;
        let Some(existing) = tables
            .tasks
            .get_mut(&id)
            .filter(|existing| existing.owner_id == owner_id)
        else {
            return Ok(None);
        };

        existing.title = task.title.clone();
        existing.description = task.description.clone();
        existing.status = task.status;
        existing.priority = task.priority;
        existing.due_date = task.due_date;
        existing.category_id = task.category_id;
        existing.updated_at = Utc::now();
        Ok(Some(existing.clone()))
    }

    async fn delete_task(&self, owner_id: i32, id: i32) -> Result<bool, StoreError> {
        let mut tables = self.write()?;
        let owned = tables
            .tasks
            .get(&id)
            .is_some_and(|task| task.owner_id == owner_id);
        if owned {
            tables.tasks.remove(&id);
        }
        Ok(owned)
    }
}

#[async_trait]
impl CategoryRepository for MemoryStore {
    async fn list_categories(&self) -> Result<Vec<Category>, StoreError> {
        let mut categories = self.read()?.categories.clone();
        categories.sort_by_key(|category| category.id);
        Ok(categories)
    }

    async fn category_exists(&self, id: i32) -> Result<bool, StoreError> {
        Ok(self.read()?.categories.iter().any(|category| category.id == id))
    }
}

#[async_trait]
impl PaymentRepository for MemoryStore {
    async fn list_payments(&self, owner_id: i32) -> Result<Vec<Payment>, StoreError> {
        Ok(self
            .read()?
            .payments
            .iter()
            .filter(|payment| payment.owner_id == owner_id)
            .cloned()
            .collect())
    }

    async fn insert_payment(&self, owner_id: i32, payment: &NewPayment) -> Result<Payment, StoreError> {
        let mut tables = self.write()?;
        tables.next_payment_id += 1;
        let created = Payment {
            id: tables.next_payment_id,
            amount: payment.amount,
            description: payment.description.clone(),
            owner_id,
            created_at: Utc::now(),
        };
        tables.payments.push(created.clone());
        Ok(created)
    }
}
