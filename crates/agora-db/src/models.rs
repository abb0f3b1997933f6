/// Database row types and store outcomes that are not errors.
/// Wire/domain types live in agora-types.
use agora_types::models::{ChatMessage, ChatUser};

/// What a successful join wrote and read, as one unit.
#[derive(Debug, Clone)]
pub struct JoinRecord {
    pub user: ChatUser,
    /// Public messages before the join notice, oldest first.
    pub history: Vec<ChatMessage>,
    pub notice: ChatMessage,
}

/// Result of asking the store to open a friend request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FriendRequestOutcome {
    Created,
    /// An accepted row already exists for the pair, in either direction.
    AlreadyFriends,
    /// A pending row already exists for the pair, in either direction.
    DuplicateRequest,
    /// The addressee has no user row.
    UnknownUser,
}

pub struct ChatUserRow {
    pub id: String,
    pub username: String,
    pub is_active: bool,
    pub role: String,
    pub avatar: String,
    pub join_time: i64,
    pub last_active: i64,
    pub total_time_online: i64,
}

pub struct MessageRow {
    pub id: String,
    pub sender: String,
    pub text: String,
    pub timestamp: i64,
    pub kind: String,
    pub recipient: Option<String>,
    pub is_private: bool,
    pub is_voice: bool,
    pub voice_data: Option<String>,
    pub voice_duration: Option<f64>,
    pub reactions: String,
}
