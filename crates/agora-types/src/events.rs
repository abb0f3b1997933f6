use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{
    Avatar, ChatMessage, ChatMode, Friend, FriendRequest, Reactions, Region, Room, SessionView,
};

/// Frames sent FROM client TO server over `/ws`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum ClientFrame {
    /// Claim a username and start a session on this connection
    Join { username: String },

    /// End the session; the transport stays open
    Leave,

    Chat { text: String },

    VoiceMessage {
        #[serde(default)]
        text: String,
        voice_data: String,
        voice_duration: f64,
    },

    PrivateMessage { text: String, recipient: String },

    VoiceMessagePrivate {
        #[serde(default)]
        text: String,
        recipient: String,
        voice_data: String,
        voice_duration: f64,
    },

    UpdateChatMode { mode: ChatMode },

    UpdateRegion { region: Region },

    UpdateChatroom { room: Room },

    UpdateAvatar { avatar: Avatar },

    AddReaction { message_id: Uuid, emoji: String },

    RemoveReaction { message_id: Uuid, emoji: String },

    FriendRequest { friend_username: String },

    FriendAccept { friend_username: String },

    FriendReject { friend_username: String },

    FriendRemove { friend_username: String },

    FriendColorUpdate {
        friend_username: String,
        friend_color: String,
    },

    /// Ask for fresh `friend_list_update` and `friend_requests` frames
    FriendList,
}

/// Frames sent FROM server TO client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum ServerFrame {
    /// Full snapshot of live sessions
    Users { users: Vec<SessionView> },

    /// Live sessions per room
    RoomCounts { counts: BTreeMap<Room, usize> },

    /// Recent public messages, oldest first. Sent once after join.
    History { messages: Vec<ChatMessage> },

    Chat(ChatMessage),

    VoiceMessage(ChatMessage),

    PrivateMessage(ChatMessage),

    VoiceMessagePrivate(ChatMessage),

    /// "{user} has joined the chat"
    Join(ChatMessage),

    /// "{user} has left the chat"
    Leave(ChatMessage),

    /// Server notice addressed to one connection
    System(ChatMessage),

    /// Non-fatal, informational
    Error { text: String },

    UpdateReactions {
        message_id: Uuid,
        reactions: Reactions,
    },

    FriendListUpdate { friends: Vec<Friend> },

    FriendRequests { requests: Vec<FriendRequest> },
}

impl ServerFrame {
    pub fn error(text: impl Into<String>) -> Self {
        Self::Error { text: text.into() }
    }

    /// Wire name of the frame, for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Users { .. } => "users",
            Self::RoomCounts { .. } => "room_counts",
            Self::History { .. } => "history",
            Self::Chat(_) => "chat",
            Self::VoiceMessage(_) => "voice_message",
            Self::PrivateMessage(_) => "private_message",
            Self::VoiceMessagePrivate(_) => "voice_message_private",
            Self::Join(_) => "join",
            Self::Leave(_) => "leave",
            Self::System(_) => "system",
            Self::Error { .. } => "error",
            Self::UpdateReactions { .. } => "update_reactions",
            Self::FriendListUpdate { .. } => "friend_list_update",
            Self::FriendRequests { .. } => "friend_requests",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn client_frames_use_flat_camel_case_fields() {
        let frame: ClientFrame = serde_json::from_value(json!({
            "type": "voice_message_private",
            "text": "listen",
            "recipient": "bob",
            "voiceData": "AAAA",
            "voiceDuration": 2.5
        }))
        .unwrap();

        assert_eq!(
            frame,
            ClientFrame::VoiceMessagePrivate {
                text: "listen".into(),
                recipient: "bob".into(),
                voice_data: "AAAA".into(),
                voice_duration: 2.5,
            }
        );

        let leave: ClientFrame = serde_json::from_value(json!({ "type": "leave" })).unwrap();
        assert_eq!(leave, ClientFrame::Leave);
    }

    #[test]
    fn unknown_frame_type_is_rejected() {
        let result = serde_json::from_value::<ClientFrame>(json!({ "type": "nope" }));
        assert!(result.is_err());
    }

    #[test]
    fn chat_frame_flattens_message() {
        let mut msg = ChatMessage::transient_system("hi");
        msg.sender = "bob".into();
        let value = serde_json::to_value(ServerFrame::Chat(msg)).unwrap();

        assert_eq!(value["type"], "chat");
        assert_eq!(value["username"], "bob");
        assert_eq!(value["text"], "hi");
        assert_eq!(value["isPrivate"], false);
        assert!(value.get("recipient").is_none());
    }

    #[test]
    fn room_counts_use_room_names_as_keys() {
        let counts = Room::ALL.iter().map(|r| (*r, 0)).collect();
        let value = serde_json::to_value(ServerFrame::RoomCounts { counts }).unwrap();
        assert_eq!(value["counts"]["GENERAL"], 0);
        assert_eq!(value["counts"]["GAMING"], 0);
    }

    #[test]
    fn region_codes() {
        let region: Region = serde_json::from_value(json!("EU")).unwrap();
        assert_eq!(region, Region::Europe);
        assert_eq!(serde_json::to_value(Region::Global).unwrap(), "GLOBAL");
    }
}
