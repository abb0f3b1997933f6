use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

use agora_types::api::{ReactionRequest, ReactionsResponse};

use crate::{AppState, status_for};

pub async fn get_reactions(
    State(state): State<AppState>,
    Path(message_id): Path<Uuid>,
) -> Result<impl IntoResponse, StatusCode> {
    let reactions = state.gateway.reactions(message_id).await.map_err(status_for)?;
    Ok(Json(ReactionsResponse { message_id, reactions }))
}

/// Same effect as an `add_reaction` frame, including the broadcast.
pub async fn add_reaction(
    State(state): State<AppState>,
    Path(message_id): Path<Uuid>,
    Json(req): Json<ReactionRequest>,
) -> Result<impl IntoResponse, StatusCode> {
    let reactions = state
        .gateway
        .add_reaction(message_id, &req.username, &req.emoji)
        .await
        .map_err(status_for)?;
    Ok(Json(ReactionsResponse { message_id, reactions }))
}

pub async fn remove_reaction(
    State(state): State<AppState>,
    Path(message_id): Path<Uuid>,
    Json(req): Json<ReactionRequest>,
) -> Result<impl IntoResponse, StatusCode> {
    let reactions = state
        .gateway
        .remove_reaction(message_id, &req.username, &req.emoji)
        .await
        .map_err(status_for)?;
    Ok(Json(ReactionsResponse { message_id, reactions }))
}
