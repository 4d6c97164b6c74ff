#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{HeaderMap, Request, StatusCode},
    Router,
};
use chrono::{DateTime, Utc};
use scrape_history::{
    api::routes::create_router,
    error::{AppError, Result},
    models::{NewTask, ParsedItem, ParsingTask, SavedTask, TaskStatus},
    store::HistoryStore,
    AppState,
};
use serde_json::Value;
use std::sync::{Arc, Mutex};
use tower::ServiceExt;

#[derive(Default)]
struct Tables {
    tasks: Vec<ParsingTask>,
    items: Vec<ParsedItem>,
    next_task_id: i64,
    next_item_id: i64,
}

/// In-memory store with the same ordering and atomicity rules as the
/// Postgres one.
#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<Mutex<Tables>>,
    calls: Arc<Mutex<usize>>,
    fail_item_insert: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store whose item insert always fails after the task row is staged.
    pub fn failing_item_insert() -> Self {
        Self {
            fail_item_insert: true,
            ..Self::default()
        }
    }

    pub fn seed_task(&self, url: &str, created_at: DateTime<Utc>) -> i64 {
        self.seed_task_with_status(url, TaskStatus::Completed, created_at)
    }

    pub fn seed_task_with_status(&self, url: &str, status: TaskStatus, created_at: DateTime<Utc>) -> i64 {
        let mut tables = self.tables.lock().unwrap();
        tables.next_task_id += 1;
        let id = tables.next_task_id;
        tables.tasks.push(ParsingTask {
            id,
            url: url.to_string(),
            selector: ".seed".to_string(),
            status,
            completed_at: Some(created_at),
            total_items: 0,
            created_at,
        });
        id
    }

    pub fn task(&self, id: i64) -> Option<ParsingTask> {
        let tables = self.tables.lock().unwrap();
        tables.tasks.iter().find(|task| task.id == id).cloned()
    }

    pub fn task_count(&self) -> usize {
        self.tables.lock().unwrap().tasks.len()
    }

    pub fn items_for(&self, task_id: i64) -> Vec<ParsedItem> {
        let tables = self.tables.lock().unwrap();
        tables.items.iter().filter(|item| item.task_id == task_id).cloned().collect()
    }

    pub fn item_count(&self) -> usize {
        self.tables.lock().unwrap().items.len()
    }

    pub fn calls(&self) -> usize {
        *self.calls.lock().unwrap()
    }

    fn record_call(&self) {
        *self.calls.lock().unwrap() += 1;
    }
}

#[async_trait]
impl HistoryStore for MemoryStore {
    async fn recent_tasks(&self, limit: i64) -> Result<Vec<ParsingTask>> {
        self.record_call();
        let tables = self.tables.lock().unwrap();
        let mut tasks = tables.tasks.clone();
        tasks.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        tasks.truncate(usize::try_from(limit).unwrap_or(0));
        Ok(tasks)
    }

    async fn task_with_items(&self, task_id: i64) -> Result<Option<(ParsingTask, Vec<ParsedItem>)>> {
        self.record_call();
        let tables = self.tables.lock().unwrap();
        let Some(task) = tables.tasks.iter().find(|task| task.id == task_id).cloned() else {
            return Ok(None);
        };
        let mut items: Vec<ParsedItem> = tables
            .items
            .iter()
            .filter(|item| item.task_id == task_id)
            .cloned()
            .collect();
        items.sort_by_key(|item| item.id);
        Ok(Some((task, items)))
    }

    async fn save_results(&self, task: NewTask) -> Result<SavedTask> {
        self.record_call();
        let mut tables = self.tables.lock().unwrap();

        // Work on a copy and swap it in only on success, like a transaction.
        let mut staged = Tables {
            tasks: tables.tasks.clone(),
            items: tables.items.clone(),
            next_task_id: tables.next_task_id + 1,
            next_item_id: tables.next_item_id,
        };
        let task_id = staged.next_task_id;
        let now = Utc::now();
        staged.tasks.push(ParsingTask {
            id: task_id,
            url: task.url,
            selector: task.selector,
            status: TaskStatus::Completed,
            completed_at: Some(now),
            total_items: task.total_items,
            created_at: now,
        });

        if !task.items.is_empty() && self.fail_item_insert {
            return Err(AppError::Database(sqlx::Error::Protocol("item insert failed".to_string())));
        }

        for item in &task.items {
            staged.next_item_id += 1;
            staged.items.push(ParsedItem {
                id: staged.next_item_id,
                task_id,
                title: item.title.clone(),
                content: item.content.clone(),
                link: item.link.clone(),
            });
        }

        *tables = staged;
        Ok(SavedTask {
            task_id,
            items_saved: task.items.len(),
        })
    }
}

pub fn app(store: &MemoryStore) -> Router {
    create_router(AppState::new(store.clone()))
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl TestResponse {
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).expect("response body is JSON")
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|value| value.to_str().ok())
    }
}

pub async fn send(app: &Router, request: Request<Body>) -> TestResponse {
    let response = app.clone().oneshot(request).await.expect("router is infallible");
    let status = response.status();
    let headers = response.headers().clone();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap().to_vec();
    TestResponse { status, headers, body }
}

pub fn request(method: &str, uri: &str) -> Request<Body> {
    Request::builder().method(method).uri(uri).body(Body::empty()).unwrap()
}

pub fn post_json(uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}
