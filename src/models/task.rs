use std::borrow::Cow;

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::{Validate, ValidationError};

/// Progress state of a task. Travels as `0`, `1` or `2` on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i32", into = "i32")]
pub enum TaskStatus {
    Todo,
    InProgress,
    Done,
}

impl TryFrom<i32> for TaskStatus {
    type Error = String;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(TaskStatus::Todo),
            1 => Ok(TaskStatus::InProgress),
            2 => Ok(TaskStatus::Done),
            other => Err(format!("Status {} is not one of 0 (Todo), 1 (In Progress), 2 (Done)", other)),
        }
    }
}

impl From<TaskStatus> for i32 {
    fn from(status: TaskStatus) -> i32 {
        match status {
            TaskStatus::Todo => 0,
            TaskStatus::InProgress => 1,
            TaskStatus::Done => 2,
        }
    }
}

/// Urgency of a task. Travels as `0`, `1` or `2` on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i32", into = "i32")]
pub enum TaskPriority {
    Low,
    Medium,
    High,
}

impl TryFrom<i32> for TaskPriority {
    type Error = String;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(TaskPriority::Low),
            1 => Ok(TaskPriority::Medium),
            2 => Ok(TaskPriority::High),
            other => Err(format!("Priority {} is not one of 0 (Low), 1 (Medium), 2 (High)", other)),
        }
    }
}

impl From<TaskPriority> for i32 {
    fn from(priority: TaskPriority) -> i32 {
        match priority {
            TaskPriority::Low => 0,
            TaskPriority::Medium => 1,
            TaskPriority::High => 2,
        }
    }
}

/// A task as stored and returned by the API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: i32,
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    /// Always midnight UTC of the due day.
    pub due_date: Option<DateTime<Utc>>,
    pub category_id: Option<i32>,
    pub owner_id: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Request body for creating or replacing a task.
///
/// Status and priority arrive as raw integers and the due date as a raw string
/// so that bad values are reported as validation failures by the mutation
/// gateway instead of as JSON decoding errors.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct TaskInput {
    #[validate(length(min = 1, max = 200, message = "Title is required and must be at most 200 characters"))]
    pub title: String,
    #[serde(default)]
    #[validate(length(max = 1000, message = "Description must be at most 1000 characters"))]
    pub description: Option<String>,
    #[validate(range(min = 0, max = 2, message = "Status must be 0 (Todo), 1 (In Progress) or 2 (Done)"))]
    pub status: i32,
    #[validate(range(min = 0, max = 2, message = "Priority must be 0 (Low), 1 (Medium) or 2 (High)"))]
    pub priority: i32,
    #[serde(default)]
    #[validate(custom = "check_due_date")]
    pub due_date: Option<String>,
    #[serde(default)]
    pub category_id: Option<i32>,
}

/// Parses a due date given as `YYYY-MM-DD` or as an RFC 3339 timestamp and
/// returns midnight UTC of that calendar day (the UTC day for timestamps).
pub fn parse_due_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    let day = NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok().or_else(|| {
        DateTime::parse_from_rfc3339(raw)
            .ok()
            .map(|instant| instant.with_timezone(&Utc).date_naive())
    })?;
    day.and_hms_opt(0, 0, 0)
        .map(|midnight| Utc.from_utc_datetime(&midnight))
}

fn check_due_date(raw: &str) -> Result<(), ValidationError> {
    match parse_due_date(raw) {
        Some(_) => Ok(()),
        None => {
            let mut error = ValidationError::new("due_date");
            error.message = Some(Cow::from("Due date must be a calendar date (YYYY-MM-DD)"));
            Err(error)
        }
    }
}

/// A fully validated set of task fields, ready for the store.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTask {
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub due_date: Option<DateTime<Utc>>,
    pub category_id: Option<i32>,
}

/// Reference data a task may point at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Category {
    pub id: i32,
    pub name: String,
}

/// One page of a filtered task listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskPage {
    pub items: Vec<Task>,
    /// Size of the filtered set before pagination.
    pub total_count: i64,
    pub page: i64,
    pub page_size: i64,
}
