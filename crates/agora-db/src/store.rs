use agora_types::models::{
    Avatar, ChatMessage, ChatUser, Friend, FriendRequest, NewMessage, NotifyTarget, Reactions,
};
use anyhow::Result;
use uuid::Uuid;

use crate::models::{FriendRequestOutcome, JoinRecord};
use crate::Database;

/// Durable state the gateway depends on. Calls are blocking; async callers
/// should run them on the blocking pool.
pub trait ChatStore: Send + Sync + 'static {
    // -- Users --
    fn set_notification_settings(&self, username: &str, phone_number: Option<&str>, enabled: bool) -> Result<bool>;

    // -- Presence --
    fn join_chat(&self, username: &str, avatar: &Avatar, notice: &NewMessage, history_limit: u32) -> Result<JoinRecord>;
    fn record_activity(&self, username: &str) -> Result<()>;
    fn leave_chat(&self, username: &str, notice: &NewMessage) -> Result<ChatMessage>;
    fn leaderboard(&self, limit: u32) -> Result<Vec<ChatUser>>;

    // -- Messages --
    fn insert_message(&self, msg: &NewMessage) -> Result<ChatMessage>;
    fn recent_messages(&self, limit: u32) -> Result<Vec<ChatMessage>>;
    fn private_thread(&self, a: &str, b: &str, limit: u32) -> Result<Vec<ChatMessage>>;

    // -- Reactions (None = unknown message) --
    fn reactions(&self, message_id: Uuid) -> Result<Option<Reactions>>;
    fn add_reaction(&self, message_id: Uuid, username: &str, emoji: &str) -> Result<Option<Reactions>>;
    fn remove_reaction(&self, message_id: Uuid, username: &str, emoji: &str) -> Result<Option<Reactions>>;

    // -- Friendships --
    fn send_friend_request(&self, requester: &str, addressee: &str) -> Result<FriendRequestOutcome>;
    fn accept_friend_request(&self, requester: &str, addressee: &str) -> Result<bool>;
    fn reject_friend_request(&self, requester: &str, addressee: &str) -> Result<bool>;
    fn remove_friend(&self, a: &str, b: &str) -> Result<bool>;
    fn update_friend_color(&self, viewer: &str, friend: &str, color: &str) -> Result<bool>;
    fn friends(&self, username: &str) -> Result<Vec<Friend>>;
    fn friend_requests(&self, username: &str) -> Result<Vec<FriendRequest>>;
    fn friends_to_notify(&self, username: &str) -> Result<Vec<NotifyTarget>>;
}

impl ChatStore for Database {
    fn set_notification_settings(&self, username: &str, phone_number: Option<&str>, enabled: bool) -> Result<bool> {
        Database::set_notification_settings(self, username, phone_number, enabled)
    }

    fn join_chat(&self, username: &str, avatar: &Avatar, notice: &NewMessage, history_limit: u32) -> Result<JoinRecord> {
        Database::join_chat(self, username, avatar, notice, history_limit)
    }

    fn record_activity(&self, username: &str) -> Result<()> {
        Database::record_activity(self, username)
    }

    fn leave_chat(&self, username: &str, notice: &NewMessage) -> Result<ChatMessage> {
        Database::leave_chat(self, username, notice)
    }

    fn leaderboard(&self, limit: u32) -> Result<Vec<ChatUser>> {
        Database::leaderboard(self, limit)
    }

    fn insert_message(&self, msg: &NewMessage) -> Result<ChatMessage> {
        Database::insert_message(self, msg)
    }

    fn recent_messages(&self, limit: u32) -> Result<Vec<ChatMessage>> {
        Database::recent_messages(self, limit)
    }

    fn private_thread(&self, a: &str, b: &str, limit: u32) -> Result<Vec<ChatMessage>> {
        Database::private_thread(self, a, b, limit)
    }

    fn reactions(&self, message_id: Uuid) -> Result<Option<Reactions>> {
        self.get_reactions(message_id)
    }

    fn add_reaction(&self, message_id: Uuid, username: &str, emoji: &str) -> Result<Option<Reactions>> {
        Database::add_reaction(self, message_id, username, emoji)
    }

    fn remove_reaction(&self, message_id: Uuid, username: &str, emoji: &str) -> Result<Option<Reactions>> {
        Database::remove_reaction(self, message_id, username, emoji)
    }

    fn send_friend_request(&self, requester: &str, addressee: &str) -> Result<FriendRequestOutcome> {
        Database::send_friend_request(self, requester, addressee)
    }

    fn accept_friend_request(&self, requester: &str, addressee: &str) -> Result<bool> {
        Database::accept_friend_request(self, requester, addressee)
    }

    fn reject_friend_request(&self, requester: &str, addressee: &str) -> Result<bool> {
        Database::reject_friend_request(self, requester, addressee)
    }

    fn remove_friend(&self, a: &str, b: &str) -> Result<bool> {
        Database::remove_friend(self, a, b)
    }

    fn update_friend_color(&self, viewer: &str, friend: &str, color: &str) -> Result<bool> {
        Database::update_friend_color(self, viewer, friend, color)
    }

    fn friends(&self, username: &str) -> Result<Vec<Friend>> {
        self.get_friends(username)
    }

    fn friend_requests(&self, username: &str) -> Result<Vec<FriendRequest>> {
        self.get_friend_requests(username)
    }

    fn friends_to_notify(&self, username: &str) -> Result<Vec<NotifyTarget>> {
        Database::friends_to_notify(self, username)
    }
}
