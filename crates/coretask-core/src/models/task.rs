use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::Priority;

/// Task
///
/// `project_id` and `assignee_id` may dangle after the referenced record is
/// deleted; readers resolve a missing reference to "unassigned" rather than
/// failing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: u64,
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub project_id: Option<u64>,
    #[serde(default)]
    pub assignee_id: Option<u64>,
    pub created_by: u64,
    pub priority: Priority,
    #[serde(rename = "type")]
    pub kind: TaskKind,
    pub status: TaskStatus,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub estimated_hours: Option<f64>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub attachments: Vec<String>,
    #[serde(default)]
    pub custom_fields: Map<String, Value>,
    #[serde(default)]
    pub comments: Vec<Comment>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Todo,
    InProgress,
    Review,
    Done,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Todo => "todo",
            Self::InProgress => "in_progress",
            Self::Review => "review",
            Self::Done => "done",
        }
    }

    pub const ALL: [TaskStatus; 4] = [Self::Todo, Self::InProgress, Self::Review, Self::Done];
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    Task,
    Bug,
    Feature,
    Epic,
}

impl TaskKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Task => "task",
            Self::Bug => "bug",
            Self::Feature => "feature",
            Self::Epic => "epic",
        }
    }
}

/// Comment attached to a task; `author` is the display name captured at
/// write time, not a user reference.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: u64,
    pub text: String,
    pub author: String,
    pub created_at: DateTime<Utc>,
}

/// Input for creating a task
#[derive(Debug, Clone)]
pub struct NewTask {
    pub title: String,
    pub description: String,
    pub project_id: Option<u64>,
    pub assignee_id: Option<u64>,
    pub created_by: u64,
    pub priority: Priority,
    pub kind: TaskKind,
    pub status: TaskStatus,
    pub due_date: Option<NaiveDate>,
    pub estimated_hours: Option<f64>,
    pub tags: Vec<String>,
    pub attachments: Vec<String>,
    pub custom_fields: Map<String, Value>,
}

impl NewTask {
    /// A todo-status task with the common defaults filled in
    pub fn new(title: impl Into<String>, created_by: u64) -> Self {
        Self {
            title: title.into(),
            description: String::new(),
            project_id: None,
            assignee_id: None,
            created_by,
            priority: Priority::Medium,
            kind: TaskKind::Task,
            status: TaskStatus::Todo,
            due_date: None,
            estimated_hours: None,
            tags: Vec::new(),
            attachments: Vec::new(),
            custom_fields: Map::new(),
        }
    }
}

/// Partial update; `None` fields are left untouched
#[derive(Debug, Clone, Default)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub project_id: Option<u64>,
    pub assignee_id: Option<u64>,
    pub priority: Option<Priority>,
    pub kind: Option<TaskKind>,
    pub status: Option<TaskStatus>,
    pub due_date: Option<NaiveDate>,
    pub estimated_hours: Option<f64>,
    pub tags: Option<Vec<String>>,
    pub attachments: Option<Vec<String>>,
    pub custom_fields: Option<Map<String, Value>>,
}

/// Exact-match conjunction over task fields, plus the derived overdue
/// predicate (due date in the past and status not done).
#[derive(Debug, Clone, Default)]
pub struct TaskFilter {
    pub status: Option<TaskStatus>,
    pub priority: Option<Priority>,
    pub assignee_id: Option<u64>,
    pub project_id: Option<u64>,
    pub kind: Option<TaskKind>,
    pub overdue: bool,
}

impl Task {
    /// Overdue means a past due date on a task that is not done.
    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        match self.due_date {
            Some(due) => due < today && self.status != TaskStatus::Done,
            None => false,
        }
    }
}
