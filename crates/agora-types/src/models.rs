use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Indigo, used for default avatars and default friend colors.
pub const DEFAULT_COLOR: &str = "rgb(99,102,241)";

/// emoji -> usernames that reacted with it. Never holds an empty set.
pub type Reactions = BTreeMap<String, BTreeSet<String>>;

/// Per-session broadcast scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatMode {
    /// Region-partitioned chat.
    Local,
    /// One flat room shared by every global-mode session.
    #[default]
    Global,
}

impl fmt::Display for ChatMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local => f.write_str("local"),
            Self::Global => f.write_str("global"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub enum Region {
    #[default]
    #[serde(rename = "GLOBAL")]
    Global,
    #[serde(rename = "NA")]
    NorthAmerica,
    #[serde(rename = "SA")]
    SouthAmerica,
    #[serde(rename = "EU")]
    Europe,
    #[serde(rename = "AF")]
    Africa,
    #[serde(rename = "AS")]
    Asia,
    #[serde(rename = "OC")]
    Oceania,
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let code = match self {
            Self::Global => "GLOBAL",
            Self::NorthAmerica => "NA",
            Self::SouthAmerica => "SA",
            Self::Europe => "EU",
            Self::Africa => "AF",
            Self::Asia => "AS",
            Self::Oceania => "OC",
        };
        f.write_str(code)
    }
}

/// Topical sub-channel. Tracked for presence counts only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Room {
    #[default]
    General,
    Casual,
    Tech,
    Gaming,
}

impl Room {
    pub const ALL: [Room; 4] = [Room::General, Room::Casual, Room::Tech, Room::Gaming];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AvatarShape {
    #[default]
    Circle,
    Square,
    Rounded,
    Hexagon,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Avatar {
    pub color: String,
    #[serde(default)]
    pub shape: AvatarShape,
    pub initials: String,
}

impl Avatar {
    /// Indigo circle with the first letter of the username.
    pub fn default_for(username: &str) -> Self {
        let initials = username
            .chars()
            .next()
            .map(|c| c.to_uppercase().collect())
            .unwrap_or_default();
        Self {
            color: DEFAULT_COLOR.to_string(),
            shape: AvatarShape::Circle,
            initials,
        }
    }
}

/// Public view of a live session, as carried in `users` snapshots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    pub username: String,
    pub mode: ChatMode,
    pub region: Region,
    pub room: Room,
    pub avatar: Avatar,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    #[default]
    User,
    System,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: Uuid,
    #[serde(rename = "username")]
    pub sender: String,
    pub text: String,
    pub timestamp: DateTime<Utc>,
    pub kind: MessageKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipient: Option<String>,
    pub is_private: bool,
    pub is_voice: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voice_data: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voice_duration: Option<f64>,
    #[serde(default)]
    pub reactions: Reactions,
}

impl ChatMessage {
    /// Server-originated notice that is never persisted.
    pub fn transient_system(text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            sender: "System".to_string(),
            text: text.into(),
            timestamp: Utc::now(),
            kind: MessageKind::System,
            recipient: None,
            is_private: false,
            is_voice: false,
            voice_data: None,
            voice_duration: None,
            reactions: Reactions::new(),
        }
    }
}

/// A message before the store has assigned its id and timestamp.
#[derive(Debug, Clone, PartialEq)]
pub struct NewMessage {
    pub sender: String,
    pub text: String,
    pub kind: MessageKind,
    pub recipient: Option<String>,
    pub voice: Option<VoiceClip>,
}

impl NewMessage {
    pub fn system(text: impl Into<String>) -> Self {
        Self {
            sender: "System".to_string(),
            text: text.into(),
            kind: MessageKind::System,
            recipient: None,
            voice: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct VoiceClip {
    pub data: String,
    pub duration_seconds: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Moderator,
    Owner,
}

impl Role {
    pub fn parse(s: &str) -> Self {
        match s {
            "moderator" => Self::Moderator,
            "owner" => Self::Owner,
            _ => Self::User,
        }
    }
}

/// Durable presence record with time-online statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatUser {
    pub id: Uuid,
    pub username: String,
    pub is_active: bool,
    pub role: Role,
    pub avatar: Avatar,
    pub join_time: DateTime<Utc>,
    pub last_active: DateTime<Utc>,
    /// Accumulated seconds.
    pub total_time_online: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FriendshipStatus {
    Pending,
    Accepted,
    Rejected,
}

impl FriendshipStatus {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "accepted" => Some(Self::Accepted),
            "rejected" => Some(Self::Rejected),
            _ => None,
        }
    }
}

/// One accepted friend from the viewer's point of view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Friend {
    pub username: String,
    pub status: FriendshipStatus,
    /// The viewer's color for this friend.
    pub color: String,
    pub since: DateTime<Utc>,
    #[serde(default)]
    pub is_online: bool,
}

/// A pending request addressed to the viewer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FriendRequest {
    pub requester: String,
    pub status: FriendshipStatus,
    pub created_at: DateTime<Utc>,
}

/// A friend who asked to be texted when the viewer comes online.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotifyTarget {
    pub username: String,
    pub phone_number: String,
}
