use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use tracing::info;

use agora_types::api::NotificationSettingsRequest;

use crate::{AppState, status_for};

const MAX_PHONE_LEN: usize = 32;

#[derive(Debug, Deserialize)]
pub struct LeaderboardQuery {
    #[serde(default = "default_limit")]
    pub limit: u32,
}

fn default_limit() -> u32 {
    10
}

/// Chat users ranked by accumulated time online.
pub async fn leaderboard(
    State(state): State<AppState>,
    Query(query): Query<LeaderboardQuery>,
) -> Result<impl IntoResponse, StatusCode> {
    let limit = query.limit.min(100);
    let users = state
        .gateway
        .blocking("load leaderboard", move |store| store.leaderboard(limit))
        .await
        .map_err(status_for)?;
    Ok(Json(users))
}

pub async fn update_notifications(
    State(state): State<AppState>,
    Path(username): Path<String>,
    Json(req): Json<NotificationSettingsRequest>,
) -> Result<impl IntoResponse, StatusCode> {
    let phone = req
        .phone_number
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty());
    if phone.as_ref().is_some_and(|p| p.len() > MAX_PHONE_LEN) {
        return Err(StatusCode::BAD_REQUEST);
    }
    // Opting in without a number would never deliver anything.
    if req.notify_on_friend_online && phone.is_none() {
        return Err(StatusCode::BAD_REQUEST);
    }

    let user = username.clone();
    let enabled = req.notify_on_friend_online;
    let updated = state
        .gateway
        .blocking("update notification settings", move |store| {
            store.set_notification_settings(&user, phone.as_deref(), enabled)
        })
        .await
        .map_err(status_for)?;
    if !updated {
        return Err(StatusCode::NOT_FOUND);
    }

    info!("{} set friend-online notifications to {}", username, enabled);
    Ok(StatusCode::NO_CONTENT)
}
