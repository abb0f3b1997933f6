use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;

use crate::{AppState, status_for};

const DEFAULT_LIMIT: u32 = 100;
const MAX_LIMIT: u32 = 500;

#[derive(Debug, Deserialize)]
pub struct MessageQuery {
    #[serde(default = "default_limit")]
    pub limit: u32,
}

fn default_limit() -> u32 {
    DEFAULT_LIMIT
}

/// Latest public messages, oldest first.
pub async fn recent(
    State(state): State<AppState>,
    Query(query): Query<MessageQuery>,
) -> Result<impl IntoResponse, StatusCode> {
    let limit = query.limit.min(MAX_LIMIT);
    let messages = state
        .gateway
        .blocking("load recent messages", move |store| store.recent_messages(limit))
        .await
        .map_err(status_for)?;
    Ok(Json(messages))
}

/// Private messages exchanged between `a` and `b`, in either direction.
pub async fn private_thread(
    State(state): State<AppState>,
    Path((a, b)): Path<(String, String)>,
    Query(query): Query<MessageQuery>,
) -> Result<impl IntoResponse, StatusCode> {
    let limit = query.limit.min(MAX_LIMIT);
    let messages = state
        .gateway
        .blocking("load private thread", move |store| store.private_thread(&a, &b, limit))
        .await
        .map_err(status_for)?;
    Ok(Json(messages))
}
