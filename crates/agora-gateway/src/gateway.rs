use std::sync::Arc;

use tokio::sync::{RwLock, mpsc};
use tracing::{debug, error, warn};

use agora_db::ChatStore;
use agora_types::events::{ClientFrame, ServerFrame};
use agora_types::models::{Avatar, ChatMessage, ChatMode, DEFAULT_COLOR};

use crate::error::GatewayError;
use crate::moderation::Moderator;
use crate::notify::Notifier;
use crate::registry::{ConnId, Registry, Session, SessionUpdate};

/// Limits the core enforces on inbound frames.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Messages in the `history` batch sent after join.
    pub history_limit: u32,
    /// Characters of chat text or voice caption.
    pub max_message_len: usize,
    /// Decoded bytes of a voice payload.
    pub max_voice_bytes: usize,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            history_limit: 100,
            max_message_len: 2000,
            max_voice_bytes: 1024 * 1024,
        }
    }
}

/// The connection-state and message-routing engine. Cheap to clone.
#[derive(Clone)]
pub struct Gateway {
    inner: Arc<GatewayInner>,
}

struct GatewayInner {
    registry: Registry,
    store: Arc<dyn ChatStore>,
    moderator: Arc<Moderator>,
    notifier: Arc<dyn Notifier>,
    config: GatewayConfig,
    /// Held shared while a public message or leave notice is stored and
    /// delivered, exclusively while a join reads history and goes live.
    /// Acquire before any registry lock.
    history_gate: RwLock<()>,
}

impl Gateway {
    pub fn new(
        store: Arc<dyn ChatStore>,
        moderator: Moderator,
        notifier: Arc<dyn Notifier>,
        config: GatewayConfig,
    ) -> Self {
        let moderator = Arc::new(moderator);
        Self {
            inner: Arc::new(GatewayInner {
                registry: Registry::new(moderator.clone()),
                store,
                moderator,
                notifier,
                config,
                history_gate: RwLock::new(()),
            }),
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.inner.registry
    }

    pub fn store(&self) -> &Arc<dyn ChatStore> {
        &self.inner.store
    }

    pub(crate) fn moderator(&self) -> &Moderator {
        &self.inner.moderator
    }

    pub(crate) fn notifier(&self) -> &Arc<dyn Notifier> {
        &self.inner.notifier
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.inner.config
    }

    pub(crate) fn history_gate(&self) -> &RwLock<()> {
        &self.inner.history_gate
    }

    /// Open a connection. Frames for it arrive on the returned receiver.
    pub async fn connect(&self) -> (ConnId, mpsc::UnboundedReceiver<ServerFrame>) {
        self.registry().attach().await
    }

    /// Transport closed. Runs the leave transition if the connection was
    /// still joined, then forgets the connection.
    pub async fn disconnect(&self, conn_id: ConnId) {
        if let Err(e) = self.leave(conn_id).await {
            warn!("leave on disconnect of {} failed: {}", conn_id, e);
        }
        self.registry().detach(conn_id).await;
    }

    /// Handle one inbound frame. Errors become an `error` frame to the
    /// originating connection; unclassified ones are logged and dropped.
    pub async fn dispatch(&self, conn_id: ConnId, frame: ClientFrame) {
        if let Err(err) = self.handle_frame(conn_id, frame).await {
            match err.client_text() {
                Some(text) => {
                    debug!("frame from {} refused: {}", conn_id, text);
                    self.registry().send_to(conn_id, ServerFrame::error(text)).await;
                }
                None => error!("frame from {} dropped: {}", conn_id, err),
            }
        }
    }

    pub async fn handle_frame(&self, conn_id: ConnId, frame: ClientFrame) -> Result<(), GatewayError> {
        match frame {
            ClientFrame::Join { username } => self.join(conn_id, &username).await,

            ClientFrame::Leave => self.leave(conn_id).await,

            ClientFrame::Chat { text } => self.handle_chat(conn_id, &text).await,

            ClientFrame::VoiceMessage {
                text,
                voice_data,
                voice_duration,
            } => self.handle_voice(conn_id, &text, voice_data, voice_duration).await,

            ClientFrame::PrivateMessage { text, recipient } => {
                self.handle_private(conn_id, &text, &recipient).await
            }

            ClientFrame::VoiceMessagePrivate {
                text,
                recipient,
                voice_data,
                voice_duration,
            } => {
                self.handle_private_voice(conn_id, &text, &recipient, voice_data, voice_duration)
                    .await
            }

            ClientFrame::UpdateChatMode { mode } => {
                self.update_session(conn_id, SessionUpdate { mode: Some(mode), ..Default::default() })
                    .await
            }

            ClientFrame::UpdateRegion { region } => {
                self.update_session(conn_id, SessionUpdate { region: Some(region), ..Default::default() })
                    .await
            }

            ClientFrame::UpdateChatroom { room } => {
                self.update_session(conn_id, SessionUpdate { room: Some(room), ..Default::default() })
                    .await
            }

            ClientFrame::UpdateAvatar { avatar } => {
                let avatar = normalize_avatar(avatar);
                self.update_session(conn_id, SessionUpdate { avatar: Some(avatar), ..Default::default() })
                    .await
            }

            ClientFrame::AddReaction { message_id, emoji } => {
                let Some(session) = self.joined(conn_id).await else { return Ok(()) };
                self.add_reaction(message_id, &session.username, &emoji).await.map(|_| ())
            }

            ClientFrame::RemoveReaction { message_id, emoji } => {
                let Some(session) = self.joined(conn_id).await else { return Ok(()) };
                self.remove_reaction(message_id, &session.username, &emoji).await.map(|_| ())
            }

            ClientFrame::FriendRequest { friend_username } => {
                let Some(session) = self.joined(conn_id).await else { return Ok(()) };
                self.send_friend_request(&session.username, &friend_username).await
            }

            ClientFrame::FriendAccept { friend_username } => {
                let Some(session) = self.joined(conn_id).await else { return Ok(()) };
                self.accept_friend_request(&friend_username, &session.username).await
            }

            ClientFrame::FriendReject { friend_username } => {
                let Some(session) = self.joined(conn_id).await else { return Ok(()) };
                self.reject_friend_request(&friend_username, &session.username).await
            }

            ClientFrame::FriendRemove { friend_username } => {
                let Some(session) = self.joined(conn_id).await else { return Ok(()) };
                self.remove_friend(&session.username, &friend_username).await
            }

            ClientFrame::FriendColorUpdate {
                friend_username,
                friend_color,
            } => {
                let Some(session) = self.joined(conn_id).await else { return Ok(()) };
                self.update_friend_color(&session.username, &friend_username, &friend_color)
                    .await
            }

            ClientFrame::FriendList => {
                let Some(session) = self.joined(conn_id).await else { return Ok(()) };
                self.push_friend_list(&session.username).await;
                self.push_friend_requests(&session.username).await;
                Ok(())
            }
        }
    }

    /// Session for `conn_id`, or `None` (logged) if the connection has not joined.
    pub(crate) async fn joined(&self, conn_id: ConnId) -> Option<Session> {
        let session = self.registry().get(conn_id).await;
        if session.is_none() {
            debug!("ignoring frame from {} before join", conn_id);
        }
        session
    }

    async fn update_session(&self, conn_id: ConnId, update: SessionUpdate) -> Result<(), GatewayError> {
        let scope_changed = update.mode.is_some() || update.region.is_some();
        let Some(session) = self.registry().update(conn_id, update).await else {
            debug!("ignoring session update from {} before join", conn_id);
            return Ok(());
        };

        if scope_changed {
            let text = match session.mode {
                ChatMode::Global => "You are now chatting globally".to_string(),
                ChatMode::Local => format!("You are now chatting locally in {}", session.region),
            };
            self.registry()
                .send_to(conn_id, ServerFrame::System(ChatMessage::transient_system(text)))
                .await;
        }

        self.registry().broadcast_presence().await;
        Ok(())
    }

    /// Run a store call on the blocking pool. Store failures are logged here
    /// and surface as `PersistenceFailure`.
    pub async fn blocking<F, T>(&self, op: &'static str, f: F) -> Result<T, GatewayError>
    where
        F: FnOnce(&dyn ChatStore) -> anyhow::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let store = self.inner.store.clone();
        tokio::task::spawn_blocking(move || f(store.as_ref()))
            .await
            .map_err(|e| GatewayError::Internal(format!("spawn_blocking join error: {e}")))?
            .map_err(|e| {
                error!("store operation {} failed: {:#}", op, e);
                GatewayError::PersistenceFailure
            })
    }
}

fn normalize_avatar(mut avatar: Avatar) -> Avatar {
    avatar.initials = avatar.initials.trim().chars().take(3).collect::<String>().to_uppercase();
    if avatar.color.trim().is_empty() || avatar.color.len() > 64 {
        avatar.color = DEFAULT_COLOR.to_string();
    }
    avatar
}
