//! HTTP surface next to the WebSocket gateway: history, reactions, the
//! leaderboard, friend lists and notification settings.

use std::sync::Arc;

use axum::{
    Router,
    http::StatusCode,
    routing::{get, put},
};
use tracing::error;

use agora_gateway::{Gateway, GatewayError};

pub mod friends;
pub mod messages;
pub mod reactions;
pub mod users;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub gateway: Gateway,
}

/// All `/api` routes, ready to be nested by the server.
pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/messages", get(messages::recent))
        .route("/messages/private/{a}/{b}", get(messages::private_thread))
        .route(
            "/messages/{message_id}/reactions",
            get(reactions::get_reactions)
                .post(reactions::add_reaction)
                .delete(reactions::remove_reaction),
        )
        .route("/leaderboard", get(users::leaderboard))
        .route("/users/{username}/notifications", put(users::update_notifications))
        .route("/friends/{username}", get(friends::list))
        .route("/friends/{username}/requests", get(friends::requests))
        .with_state(state)
}

/// Map a core failure onto the response status.
pub(crate) fn status_for(err: GatewayError) -> StatusCode {
    match err {
        GatewayError::NotFound(_)
        | GatewayError::UnknownUser(_)
        | GatewayError::RelationshipNotFound(_) => StatusCode::NOT_FOUND,
        GatewayError::RelationshipConflict(_)
        | GatewayError::UsernameTaken(_)
        | GatewayError::AlreadyJoined => StatusCode::CONFLICT,
        GatewayError::PersistenceFailure => StatusCode::INTERNAL_SERVER_ERROR,
        GatewayError::Internal(e) => {
            error!("internal error: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        }
        _ => StatusCode::BAD_REQUEST,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agora_gateway::ConflictKind;
    use uuid::Uuid;

    #[test]
    fn core_failures_map_to_statuses() {
        assert_eq!(status_for(GatewayError::NotFound(Uuid::new_v4())), StatusCode::NOT_FOUND);
        assert_eq!(
            status_for(GatewayError::RelationshipConflict(ConflictKind::DuplicateRequest)),
            StatusCode::CONFLICT
        );
        assert_eq!(status_for(GatewayError::PersistenceFailure), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(status_for(GatewayError::InvalidEmoji), StatusCode::BAD_REQUEST);
    }
}
