use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle of a parsing task. Tasks written by this service are always
/// `Completed`. The table is shared, so any other word read back is kept
/// verbatim in `Other` and serialized unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TaskStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Other(String),
}

impl TaskStatus {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Other(raw) => raw,
        }
    }
}

impl From<String> for TaskStatus {
    fn from(value: String) -> Self {
        match value.as_str() {
            "pending" => Self::Pending,
            "running" => Self::Running,
            "completed" => Self::Completed,
            "failed" => Self::Failed,
            _ => Self::Other(value),
        }
    }
}

impl From<TaskStatus> for String {
    fn from(status: TaskStatus) -> Self {
        match status {
            TaskStatus::Other(raw) => raw,
            known => known.as_str().to_string(),
        }
    }
}

/// A row of `parsing_tasks`.
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct ParsingTask {
    pub id: i64,
    pub url: String,
    pub selector: String,
    #[sqlx(try_from = "String")]
    pub status: TaskStatus,
    pub completed_at: Option<DateTime<Utc>>,
    pub total_items: i32,
    pub created_at: DateTime<Utc>,
}

/// A row of `parsed_items`.
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct ParsedItem {
    pub id: i64,
    pub task_id: i64,
    pub title: Option<String>,
    pub content: Option<String>,
    pub link: Option<String>,
}

/// One extracted record as submitted by a client.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct NewItem {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub link: Option<String>,
}

/// A validated save request, ready to be written.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTask {
    pub url: String,
    pub selector: String,
    pub items: Vec<NewItem>,
    /// Equals `items.len()`, checked to fit the `total_items` column.
    pub total_items: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SavedTask {
    pub task_id: i64,
    pub items_saved: usize,
}
