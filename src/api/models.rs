use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::models::{NewItem, NewTask, ParsedItem, ParsingTask, SavedTask};

pub const SAVED_MESSAGE: &str = "Results saved successfully";
pub const MISSING_FIELDS: &str = "url and selector are required";
pub const TASK_NOT_FOUND: &str = "Task not found";
pub const TOO_MANY_ITEMS: &str = "too many items";

#[derive(Debug, Default, Deserialize)]
pub struct SaveRequest {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub selector: Option<String>,
    #[serde(default)]
    pub items: Option<Vec<NewItem>>,
}

impl SaveRequest {
    /// An empty body reads as `{}`, which then fails validation.
    pub fn from_body(body: &[u8]) -> Result<Self> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::default());
        }
        serde_json::from_slice(body).map_err(|e| AppError::Validation(format!("Invalid JSON body: {}", e)))
    }

    pub fn validate(self) -> Result<NewTask> {
        let url = self.url.filter(|url| !url.is_empty());
        let selector = self.selector.filter(|selector| !selector.is_empty());

        match (url, selector) {
            (Some(url), Some(selector)) => {
                let items = self.items.unwrap_or_default();
                let total_items = item_total(items.len())?;
                Ok(NewTask {
                    url,
                    selector,
                    items,
                    total_items,
                })
            }
            _ => Err(AppError::Validation(MISSING_FIELDS.to_string())),
        }
    }
}

/// `total_items` is an INTEGER column.
fn item_total(len: usize) -> Result<i32> {
    i32::try_from(len).map_err(|_| AppError::Validation(TOO_MANY_ITEMS.to_string()))
}

#[derive(Debug, Serialize)]
pub struct SaveResponse {
    pub task_id: i64,
    pub items_saved: usize,
    pub message: &'static str,
}

impl From<SavedTask> for SaveResponse {
    fn from(saved: SavedTask) -> Self {
        Self {
            task_id: saved.task_id,
            items_saved: saved.items_saved,
            message: SAVED_MESSAGE,
        }
    }
}

#[derive(Debug, Default, PartialEq)]
pub struct HistoryQuery {
    pub task_id: Option<String>,
}

impl HistoryQuery {
    /// The last `task_id` wins when the parameter repeats.
    pub fn from_pairs(pairs: Vec<(String, String)>) -> Self {
        let task_id = pairs
            .into_iter()
            .filter(|(key, _)| key == "task_id")
            .map(|(_, value)| value)
            .last();
        Self { task_id }
    }
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum HistoryResponse {
    Detail { task: ParsingTask, items: Vec<ParsedItem> },
    List { tasks: Vec<ParsingTask> },
}
