use axum::{
    body::Bytes,
    extract::{rejection::QueryRejection, Json, Query, State},
    http::{header, Method},
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use std::time::Duration;

use crate::api::models::{HistoryQuery, HistoryResponse, SaveRequest, SaveResponse, TASK_NOT_FOUND};
use crate::error::{AppError, Result};
use crate::AppState;

/// Upper bound on tasks returned by a history listing.
pub const HISTORY_LIMIT: i64 = 50;

const PREFLIGHT_MAX_AGE: Duration = Duration::from_secs(86400);

pub fn create_router(app_state: AppState) -> Router {
    Router::new()
        .route(
            "/history",
            get(history_handler)
                .fallback(method_not_allowed)
                .layer(cors([Method::GET, Method::OPTIONS])),
        )
        .route(
            "/save",
            post(save_handler)
                .fallback(method_not_allowed)
                .layer(cors([Method::GET, Method::POST, Method::OPTIONS])),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}

/// Any OPTIONS request is answered here with an empty 200, before it reaches
/// a handler.
fn cors<const N: usize>(methods: [Method; N]) -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(methods)
        .allow_headers([header::CONTENT_TYPE])
        .max_age(PREFLIGHT_MAX_AGE)
}

async fn method_not_allowed(method: Method) -> AppError {
    tracing::debug!(%method, "rejecting unsupported method");
    AppError::MethodNotAllowed
}

async fn history_handler(
    State(state): State<AppState>,
    query: std::result::Result<Query<Vec<(String, String)>>, QueryRejection>,
) -> Result<Json<HistoryResponse>> {
    let Query(pairs) = query.map_err(|rejection| AppError::Validation(rejection.body_text()))?;
    let task_id = HistoryQuery::from_pairs(pairs).task_id.filter(|id| !id.is_empty());

    let Some(raw_id) = task_id else {
        let tasks = state.store.recent_tasks(HISTORY_LIMIT).await?;
        tracing::debug!(count = tasks.len(), "listed recent tasks");
        return Ok(Json(HistoryResponse::List { tasks }));
    };

    // Identifiers are integers; anything else cannot name a stored task.
    let id = raw_id
        .trim()
        .parse::<i64>()
        .map_err(|_| AppError::NotFound(TASK_NOT_FOUND.to_string()))?;

    match state.store.task_with_items(id).await? {
        Some((task, items)) => {
            tracing::debug!(task_id = id, items = items.len(), "loaded task");
            Ok(Json(HistoryResponse::Detail { task, items }))
        }
        None => {
            tracing::debug!(task_id = id, "task not found");
            Err(AppError::NotFound(TASK_NOT_FOUND.to_string()))
        }
    }
}

async fn save_handler(State(state): State<AppState>, body: Bytes) -> Result<Json<SaveResponse>> {
    let task = SaveRequest::from_body(&body)?.validate()?;
    tracing::debug!(url = %task.url, selector = %task.selector, items = task.items.len(), "saving results");

    let saved = state.store.save_results(task).await?;
    tracing::info!(task_id = saved.task_id, items_saved = saved.items_saved, "results saved");

    Ok(Json(SaveResponse::from(saved)))
}
