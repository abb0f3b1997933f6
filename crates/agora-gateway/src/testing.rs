//! In-crate test helpers: a store that can stall selected calls.

use std::sync::Arc;
use std::time::Duration;

use agora_db::{ChatStore, Database, FriendRequestOutcome, JoinRecord};
use agora_types::events::{ClientFrame, ServerFrame};
use agora_types::models::{
    Avatar, ChatMessage, ChatUser, Friend, FriendRequest, NewMessage, NotifyTarget, Reactions,
};
use anyhow::Result;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::gateway::{Gateway, GatewayConfig};
use crate::moderation::Moderator;
use crate::notify::LogNotifier;
use crate::registry::ConnId;

/// In-memory store whose joins (for one username) and message inserts can be
/// made to sleep before they run.
pub(crate) struct SlowStore {
    pub db: Database,
    slow_join: Option<(String, Duration)>,
    slow_insert: Option<Duration>,
}

impl SlowStore {
    pub fn new() -> Self {
        Self {
            db: Database::open_in_memory().unwrap(),
            slow_join: None,
            slow_insert: None,
        }
    }

    pub fn slow_join(mut self, username: &str, delay: Duration) -> Self {
        self.slow_join = Some((username.to_string(), delay));
        self
    }

    pub fn slow_insert(mut self, delay: Duration) -> Self {
        self.slow_insert = Some(delay);
        self
    }
}

pub(crate) fn gateway_over(store: Arc<SlowStore>) -> Gateway {
    Gateway::new(store, Moderator::default(), Arc::new(LogNotifier), GatewayConfig::default())
}

/// Connect and join `username`, discarding the join frames.
pub(crate) async fn joined(gateway: &Gateway, username: &str) -> (ConnId, mpsc::UnboundedReceiver<ServerFrame>) {
    let (conn, mut rx) = gateway.connect().await;
    gateway
        .dispatch(conn, ClientFrame::Join { username: username.to_string() })
        .await;
    while rx.try_recv().is_ok() {}
    (conn, rx)
}

impl ChatStore for SlowStore {
    fn set_notification_settings(&self, username: &str, phone_number: Option<&str>, enabled: bool) -> Result<bool> {
        self.db.set_notification_settings(username, phone_number, enabled)
    }

    fn join_chat(&self, username: &str, avatar: &Avatar, notice: &NewMessage, history_limit: u32) -> Result<JoinRecord> {
        if let Some((slow, delay)) = &self.slow_join {
            if slow == username {
                std::thread::sleep(*delay);
            }
        }
        self.db.join_chat(username, avatar, notice, history_limit)
    }

    fn record_activity(&self, username: &str) -> Result<()> {
        self.db.record_activity(username)
    }

    fn leave_chat(&self, username: &str, notice: &NewMessage) -> Result<ChatMessage> {
        self.db.leave_chat(username, notice)
    }

    fn leaderboard(&self, limit: u32) -> Result<Vec<ChatUser>> {
        self.db.leaderboard(limit)
    }

    fn insert_message(&self, msg: &NewMessage) -> Result<ChatMessage> {
        if let Some(delay) = self.slow_insert {
            std::thread::sleep(delay);
        }
        self.db.insert_message(msg)
    }

    fn recent_messages(&self, limit: u32) -> Result<Vec<ChatMessage>> {
        self.db.recent_messages(limit)
    }

    fn private_thread(&self, a: &str, b: &str, limit: u32) -> Result<Vec<ChatMessage>> {
        self.db.private_thread(a, b, limit)
    }

    fn reactions(&self, message_id: Uuid) -> Result<Option<Reactions>> {
        self.db.get_reactions(message_id)
    }

    fn add_reaction(&self, message_id: Uuid, username: &str, emoji: &str) -> Result<Option<Reactions>> {
        self.db.add_reaction(message_id, username, emoji)
    }

    fn remove_reaction(&self, message_id: Uuid, username: &str, emoji: &str) -> Result<Option<Reactions>> {
        self.db.remove_reaction(message_id, username, emoji)
    }

    fn send_friend_request(&self, requester: &str, addressee: &str) -> Result<FriendRequestOutcome> {
        self.db.send_friend_request(requester, addressee)
    }

    fn accept_friend_request(&self, requester: &str, addressee: &str) -> Result<bool> {
        self.db.accept_friend_request(requester, addressee)
    }

    fn reject_friend_request(&self, requester: &str, addressee: &str) -> Result<bool> {
        self.db.reject_friend_request(requester, addressee)
    }

    fn remove_friend(&self, a: &str, b: &str) -> Result<bool> {
        self.db.remove_friend(a, b)
    }

    fn update_friend_color(&self, viewer: &str, friend: &str, color: &str) -> Result<bool> {
        self.db.update_friend_color(viewer, friend, color)
    }

    fn friends(&self, username: &str) -> Result<Vec<Friend>> {
        self.db.get_friends(username)
    }

    fn friend_requests(&self, username: &str) -> Result<Vec<FriendRequest>> {
        self.db.get_friend_requests(username)
    }

    fn friends_to_notify(&self, username: &str) -> Result<Vec<NotifyTarget>> {
        self.db.friends_to_notify(username)
    }
}
