use super::auth::Authorized;
use super::response::{ApiError, ApiResponse};
use super::AppState;
use crate::domain::MediaItem;
use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

/// `?url=` or `?path=`; the URL wins when both are given.
#[derive(Debug, Deserialize)]
pub struct SourceParams {
    url: Option<String>,
    path: Option<String>,
}

impl SourceParams {
    fn into_item(self) -> Result<MediaItem, ApiError> {
        self.url
            .filter(|url| !url.is_empty())
            .or(self.path.filter(|path| !path.is_empty()))
            .map(MediaItem::new)
            .ok_or(ApiError::MissingSource)
    }
}

pub async fn status(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "running",
        "server": "mychannel",
        "fallback_video": state.control.fallback(),
    }))
}

pub async fn list(State(state): State<AppState>) -> Json<Value> {
    let queue = state.control.list_all();
    Json(json!({
        "size": queue.len(),
        "queue": queue,
    }))
}

pub async fn add(
    _: Authorized,
    State(state): State<AppState>,
    Query(params): Query<SourceParams>,
) -> Result<ApiResponse, ApiError> {
    let item = params.into_item()?;
    state.control.enqueue(item.clone());
    Ok(ApiResponse::success("Item added to queue").with_item(item))
}

pub async fn priority(
    _: Authorized,
    State(state): State<AppState>,
    Query(params): Query<SourceParams>,
) -> Result<ApiResponse, ApiError> {
    let item = params.into_item()?;
    state.control.enqueue_priority(item.clone()).await;
    Ok(ApiResponse::success("High-priority item added and current stream interrupted").with_item(item))
}

pub async fn clear(_: Authorized, State(state): State<AppState>) -> ApiResponse {
    state.control.clear();
    ApiResponse::success("Queue cleared")
}

pub async fn interrupt(_: Authorized, State(state): State<AppState>) -> ApiResponse {
    let generation = state.control.interrupt_current().await;
    ApiResponse::success(format!("Current stream interrupted (generation {generation})"))
}
