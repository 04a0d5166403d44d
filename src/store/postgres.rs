use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};

use super::{
    CategoryRepository, PaymentRepository, StoreError, TaskRepository, TaskSlice, UserRepository,
};
use crate::models::{Amount, Category, NewPayment, NewTask, NewUser, Payment, Task, User};
use crate::tasks::query::{PageRequest, TaskFilter};

const TASK_COLUMNS: &str =
    "id, title, description, status, priority, due_date, category_id, owner_id, created_at, updated_at";

/// PostgreSQL-backed store. Schema lives in `migrations/`.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

/// Row shape of `tasks`; status and priority are stored as plain integers.
#[derive(Debug, FromRow)]
struct TaskRow {
    id: i32,
    title: String,
    description: Option<String>,
    status: i32,
    priority: i32,
    due_date: Option<DateTime<Utc>>,
    category_id: Option<i32>,
    owner_id: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<TaskRow> for Task {
    type Error = StoreError;

    fn try_from(row: TaskRow) -> Result<Self, Self::Error> {
        Ok(Task {
            id: row.id,
            title: row.title,
            description: row.description,
            status: row.status.try_into().map_err(StoreError::Backend)?,
            priority: row.priority.try_into().map_err(StoreError::Backend)?,
            due_date: row.due_date,
            category_id: row.category_id,
            owner_id: row.owner_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

const PAYMENT_COLUMNS: &str = "id, amount_cents, description, owner_id, created_at";

/// Row shape of `payments`; the amount is stored in cents.
#[derive(Debug, FromRow)]
struct PaymentRow {
    id: i32,
    amount_cents: i64,
    description: Option<String>,
    owner_id: i32,
    created_at: DateTime<Utc>,
}

impl TryFrom<PaymentRow> for Payment {
    type Error = StoreError;

    fn try_from(row: PaymentRow) -> Result<Self, Self::Error> {
        let amount = Amount::from_cents(row.amount_cents).ok_or_else(|| {
            StoreError::Backend(format!("payment {} has an out of range amount", row.id))
        })?;
        Ok(Payment {
            id: row.id,
            amount,
            description: row.description,
            owner_id: row.owner_id,
            created_at: row.created_at,
        })
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(error: sqlx::Error) -> StoreError {
        StoreError::Backend(error.to_string())
    }
}

/// Escapes LIKE metacharacters so user search text only ever matches literally,
/// then wraps it for a substring match.
fn like_pattern(search: &str) -> String {
    let escaped = search
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

/// Appends the owner scope and every active predicate as a WHERE clause.
fn push_filter(builder: &mut QueryBuilder<'_, Postgres>, owner_id: i32, filter: &TaskFilter) {
    builder.push(" WHERE owner_id = ").push_bind(owner_id);

    if let Some(status) = filter.status {
        builder.push(" AND status = ").push_bind(i32::from(status));
    }
    if let Some(priority) = filter.priority {
        builder.push(" AND priority = ").push_bind(i32::from(priority));
    }
    if let Some(category_id) = filter.category_id {
        builder.push(" AND category_id = ").push_bind(category_id);
    }
    if let Some(search) = &filter.search {
        let pattern = like_pattern(search);
        builder
            .push(" AND (title ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR description ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Opens a pool against `database_url`.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        Ok(Self::new(pool))
    }

    /// Applies pending migrations from `migrations/`.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| StoreError::Backend(format!("migration failed: {}", e)))
    }
}

#[async_trait]
impl UserRepository for PgStore {
    async fn insert_user(&self, user: NewUser) -> Result<User, StoreError> {
        // Uniqueness comes from the users_email_lower_key index, not from a prior SELECT.
        sqlx::query_as::<_, User>(
            "INSERT INTO users (name, email, password_hash) VALUES ($1, $2, $3)
             RETURNING id, name, email, password_hash, created_at",
        )
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(|error| {
            if let sqlx::Error::Database(db_error) = &error {
                if db_error.is_unique_violation() {
                    return StoreError::DuplicateEmail;
                }
            }
            StoreError::from(error)
        })
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, name, email, password_hash, created_at FROM users WHERE LOWER(email) = LOWER($1)",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }
}

#[async_trait]
impl TaskRepository for PgStore {
    async fn query_tasks(
        &self,
        owner_id: i32,
        filter: &TaskFilter,
        page: &PageRequest,
    ) -> Result<TaskSlice, StoreError> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM tasks");
        push_filter(&mut count, owner_id, filter);
        let total_count: i64 = count.build_query_scalar().fetch_one(&self.pool).await?;

        let mut select = QueryBuilder::<Postgres>::new(format!("SELECT {} FROM tasks", TASK_COLUMNS));
        push_filter(&mut select, owner_id, filter);
        select
            .push(" ORDER BY id ASC LIMIT ")
            .push_bind(page.page_size)
            .push(" OFFSET ")
            .push_bind(page.offset());

        let rows: Vec<TaskRow> = select.build_query_as().fetch_all(&self.pool).await?;
        let items = rows
            .into_iter()
            .map(Task::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(TaskSlice { items, total_count })
    }

    async fn find_task(&self, owner_id: i32, id: i32) -> Result<Option<Task>, StoreError> {
        let sql = format!("SELECT {} FROM tasks WHERE id = $1 AND owner_id = $2", TASK_COLUMNS);
        sqlx::query_as::<_, TaskRow>(&sql)
            .bind(id)
            .bind(owner_id)
            .fetch_optional(&self.pool)
            .await?
            .map(Task::try_from)
            .transpose()
    }

    async fn insert_task(&self, owner_id: i32, task: &NewTask) -> Result<Task, StoreError> {
        let sql = format!(
            "INSERT INTO tasks (title, description, status, priority, due_date, category_id, owner_id)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING {}",
            TASK_COLUMNS
        );
        let row = sqlx::query_as::<_, TaskRow>(&sql)
            .bind(&task.title)
            .bind(&task.description)
            .bind(i32::from(task.status))
            .bind(i32::from(task.priority))
            .bind(task.due_date)
            .bind(task.category_id)
            .bind(owner_id)
            .fetch_one(&self.pool)
            .await?;
        Task::try_from(row)
    }

    async fn update_task(
        &self,
        owner_id: i32,
        id: i32,
        task: &NewTask,
    ) -> Result<Option<Task>, StoreError> {
        let sql = format!(
            "UPDATE tasks
             SET title = $1, description = $2, status = $3, priority = $4, due_date = $5,
                 category_id = $6, updated_at = NOW()
             WHERE id = $7 AND owner_id = $8
             RETURNING {}",
            TASK_COLUMNS
        );
        sqlx::query_as::<_, TaskRow>(&sql)
            .bind(&task.title)
            .bind(&task.description)
            .bind(i32::from(task.status))
            .bind(i32::from(task.priority))
            .bind(task.due_date)
            .bind(task.category_id)
            .bind(id)
            .bind(owner_id)
            .fetch_optional(&self.pool)
            .await?
            .map(Task::try_from)
            .transpose()
    }

    async fn delete_task(&self, owner_id: i32, id: i32) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = $1 AND owner_id = $2")
            .bind(id)
            .bind(owner_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl CategoryRepository for PgStore {
    async fn list_categories(&self) -> Result<Vec<Category>, StoreError> {
        let categories = sqlx::query_as::<_, Category>("SELECT id, name FROM categories ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        Ok(categories)
    }

    async fn category_exists(&self, id: i32) -> Result<bool, StoreError> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM categories WHERE id = $1)")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;
        Ok(exists)
    }
}

#[async_trait]
impl PaymentRepository for PgStore {
    async fn list_payments(&self, owner_id: i32) -> Result<Vec<Payment>, StoreError> {
        let sql = format!("SELECT {} FROM payments WHERE owner_id = $1 ORDER BY id", PAYMENT_COLUMNS);
        sqlx::query_as::<_, PaymentRow>(&sql)
            .bind(owner_id)
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(Payment::try_from)
            .collect()
    }

    async fn insert_payment(&self, owner_id: i32, payment: &NewPayment) -> Result<Payment, StoreError> {
        let sql = format!(
            "INSERT INTO payments (amount_cents, description, owner_id) VALUES ($1, $2, $3)
             RETURNING {}",
            PAYMENT_COLUMNS
        );
        let row = sqlx::query_as::<_, PaymentRow>(&sql)
            .bind(payment.amount.cents())
            .bind(&payment.description)
            .bind(owner_id)
            .fetch_one(&self.pool)
            .await?;
        Payment::try_from(row)
    }
}
