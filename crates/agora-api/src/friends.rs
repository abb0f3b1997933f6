use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};

use crate::{AppState, status_for};

/// Accepted friends, colored the way `username` sees them.
pub async fn list(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Result<impl IntoResponse, StatusCode> {
    let friends = state.gateway.friends_of(&username).await.map_err(status_for)?;
    Ok(Json(friends))
}

pub async fn requests(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Result<impl IntoResponse, StatusCode> {
    let requests = state
        .gateway
        .friend_requests_of(&username)
        .await
        .map_err(status_for)?;
    Ok(Json(requests))
}
