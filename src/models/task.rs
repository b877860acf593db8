use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

use crate::error::AppError;
use crate::models::user::ensure_allowed_fields;

/// Fields a client may change through `PATCH /tasks/{id}`.
pub const TASK_UPDATABLE_FIELDS: &[&str] = &["description", "completed"];

/// Represents a task entity as stored and returned by the API.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct Task {
    /// Unique identifier for the task (UUID v4).
    pub id: Uuid,
    /// Identifier of the user who owns the task.
    pub author: Uuid,
    /// What needs doing.
    pub description: String,
    /// Whether the task is done.
    pub completed: bool,
    /// Timestamp of when the task was created.
    pub created_at: DateTime<Utc>,
    /// Timestamp of the last update to the task.
    pub updated_at: DateTime<Utc>,
}

/// Input structure for creating a task.
///
/// There is deliberately no `author` field: unknown keys are ignored and the
/// author is always the authenticated caller.
#[derive(Debug, Deserialize, Validate)]
pub struct TaskInput {
    /// Must be non-empty once trimmed.
    #[validate(length(min = 1, message = "Description is required"))]
    pub description: String,
    #[serde(default)]
    pub completed: bool,
}

impl TaskInput {
    pub fn normalize(mut self) -> Self {
        self.description = self.description.trim().to_string();
        self
    }
}

impl Task {
    /// Creates a new `Task` owned by `author`.
    pub fn new(input: TaskInput, author: Uuid) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            author,
            description: input.description.trim().to_string(),
            completed: input.completed,
            created_at: now,
            updated_at: now,
        }
    }

    /// Applies a validated update in place.
    pub fn apply(&mut self, update: TaskUpdate) {
        if let Some(description) = update.description {
            self.description = description;
        }
        if let Some(completed) = update.completed {
            self.completed = completed;
        }
        self.updated_at = Utc::now();
    }
}

/// Partial task update, built only from payloads that pass the allow-list.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct TaskUpdate {
    #[validate(length(min = 1, message = "Description is required"))]
    pub description: Option<String>,
    pub completed: Option<bool>,
}

impl TaskUpdate {
    pub fn from_payload(payload: Map<String, Value>) -> Result<Self, AppError> {
        ensure_allowed_fields(&payload, TASK_UPDATABLE_FIELDS)?;
        let mut update: TaskUpdate = serde_json::from_value(Value::Object(payload))
            .map_err(|e| AppError::ValidationError(e.to_string()))?;
        update.description = update.description.map(|d| d.trim().to_string());
        update.validate()?;
        Ok(update)
    }
}

/// Columns a task list may be ordered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    CreatedAt,
    UpdatedAt,
    Description,
    Completed,
}

impl SortField {
    fn parse(name: &str) -> Option<Self> {
        match name {
            "created_at" | "createdAt" => Some(SortField::CreatedAt),
            "updated_at" | "updatedAt" => Some(SortField::UpdatedAt),
            "description" => Some(SortField::Description),
            "completed" => Some(SortField::Completed),
            _ => None,
        }
    }

    pub fn column(&self) -> &'static str {
        match self {
            SortField::CreatedAt => "created_at",
            SortField::UpdatedAt => "updated_at",
            SortField::Description => "description",
            SortField::Completed => "completed",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskSort {
    pub field: SortField,
    pub direction: SortDirection,
}

/// Raw query parameters accepted by `GET /tasks`.
///
/// Everything arrives as text so a bad value never fails the request;
/// `TaskFilter::from` decides what to keep.
#[derive(Debug, Default, Deserialize)]
pub struct TaskQuery {
    pub completed: Option<String>,
    #[serde(rename = "sortBy")]
    pub sort_by: Option<String>,
    pub limit: Option<String>,
    pub skip: Option<String>,
}

/// Parsed listing options. The author is never part of this: it comes from
/// the authenticated request.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TaskFilter {
    pub completed: Option<bool>,
    pub sort: Option<TaskSort>,
    pub limit: Option<usize>,
    pub skip: Option<usize>,
}

impl From<&TaskQuery> for TaskFilter {
    fn from(query: &TaskQuery) -> Self {
        let sort = query.sort_by.as_deref().and_then(|raw| {
            // A bare field name ("created_at") has no direction suffix.
            let (field, direction) = match SortField::parse(raw) {
                Some(field) => (field, ""),
                None => {
                    let (field, direction) = raw.rsplit_once('_')?;
                    (SortField::parse(field)?, direction)
                }
            };
            Some(TaskSort {
                field,
                direction: if direction == "asc" {
                    SortDirection::Asc
                } else {
                    SortDirection::Desc
                },
            })
        });

        Self {
            completed: query.completed.as_deref().map(|value| value == "true"),
            sort,
            // limit=0 means "no limit"
            limit: parse_count(query.limit.as_deref()).filter(|&n| n > 0),
            skip: parse_count(query.skip.as_deref()),
        }
    }
}

/// Non-negative integers only; anything else is ignored.
fn parse_count(raw: Option<&str>) -> Option<usize> {
    raw.and_then(|value| value.trim().parse::<usize>().ok())
}
