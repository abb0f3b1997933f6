use thiserror::Error;
use uuid::Uuid;

/// Why a friend request was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ConflictKind {
    #[error("You cannot send a friend request to yourself")]
    SelfRequest,

    #[error("You are already friends")]
    AlreadyFriends,

    #[error("A friend request between you is already pending")]
    DuplicateRequest,
}

/// Failures of a single inbound frame. Recovered at the frame boundary: the
/// originating connection gets an `error` frame (or nothing, for `Internal`)
/// and stays open.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Username \"{0}\" is already taken")]
    UsernameTaken(String),

    #[error("That username is not allowed")]
    UsernameUnsafe,

    #[error("You have already joined the chat")]
    AlreadyJoined,

    /// Informational: the message was still delivered, redacted.
    #[error("Your message was filtered for inappropriate content")]
    ContentFiltered,

    /// Informational: the private message was saved and echoed to the sender.
    #[error("{0} is not online right now")]
    RecipientOffline(String),

    #[error("Message is too long (max {0} characters)")]
    MessageTooLong(usize),

    #[error("Invalid voice message: {0}")]
    InvalidVoice(&'static str),

    #[error("Invalid reaction")]
    InvalidEmoji,

    #[error("Invalid color")]
    InvalidColor,

    #[error("{0}")]
    RelationshipConflict(ConflictKind),

    #[error("No matching friend request or friendship with {0}")]
    RelationshipNotFound(String),

    #[error("User {0} does not exist")]
    UnknownUser(String),

    #[error("Message {0} not found")]
    NotFound(Uuid),

    /// The cause is logged where the store call failed.
    #[error("Could not save your change, please try again")]
    PersistenceFailure,

    #[error("internal error: {0}")]
    Internal(String),
}

impl GatewayError {
    /// Text for the `error` frame, or `None` if the failure is only logged.
    pub fn client_text(&self) -> Option<String> {
        match self {
            Self::Internal(_) => None,
            other => Some(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn internal_errors_are_not_shown_to_clients() {
        assert_eq!(GatewayError::Internal("join error".into()).client_text(), None);
        assert_eq!(
            GatewayError::RelationshipConflict(ConflictKind::AlreadyFriends).client_text(),
            Some("You are already friends".to_string())
        );
    }
}
