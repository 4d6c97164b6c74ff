pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod schema;
pub mod store;
pub mod telemetry;

use std::sync::Arc;
use store::HistoryStore;

/// Application state that will be shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn HistoryStore>,
}

impl AppState {
    pub fn new<S: HistoryStore + 'static>(store: S) -> Self {
        Self {
            store: Arc::new(store),
        }
    }
}
