use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::Reactions;

// -- Reactions --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReactionRequest {
    pub username: String,
    pub emoji: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReactionsResponse {
    pub message_id: Uuid,
    pub reactions: Reactions,
}

// -- Users --

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NotificationSettingsRequest {
    #[serde(default)]
    pub phone_number: Option<String>,
    pub notify_on_friend_online: bool,
}
