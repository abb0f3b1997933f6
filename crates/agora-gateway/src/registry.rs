use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use tokio::sync::{RwLock, mpsc};
use tracing::debug;
use uuid::Uuid;

use agora_types::events::ServerFrame;
use agora_types::models::{Avatar, ChatMode, Region, Room, SessionView};

use crate::error::GatewayError;
use crate::moderation::Moderator;
use crate::router::{self, Audience, Delivery};

/// Opaque handle for one live transport connection.
pub type ConnId = Uuid;

/// Attributes of a joined connection. Owned by the registry.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub conn_id: ConnId,
    pub username: String,
    pub mode: ChatMode,
    pub region: Region,
    pub room: Room,
    pub avatar: Avatar,
}

impl Session {
    fn new(conn_id: ConnId, username: &str) -> Self {
        Self {
            conn_id,
            username: username.to_string(),
            mode: ChatMode::Global,
            region: Region::Global,
            room: Room::General,
            avatar: Avatar::default_for(username),
        }
    }

    pub fn view(&self) -> SessionView {
        SessionView {
            username: self.username.clone(),
            mode: self.mode,
            region: self.region,
            room: self.room,
            avatar: self.avatar.clone(),
        }
    }
}

/// Partial update of a session's mutable attributes.
#[derive(Debug, Clone, Default)]
pub struct SessionUpdate {
    pub mode: Option<ChatMode>,
    pub region: Option<Region>,
    pub room: Option<Room>,
    pub avatar: Option<Avatar>,
}

struct Connection {
    tx: mpsc::UnboundedSender<ServerFrame>,
    /// `None` until the connection joins, and again after it leaves.
    session: Option<Session>,
    /// False while the join is still being persisted. A pending session
    /// holds its username but is not routed to or listed.
    active: bool,
}

impl Connection {
    fn live(&self) -> Option<&Session> {
        self.session.as_ref().filter(|_| self.active)
    }
}

/// Every live connection and, for joined ones, its session.
///
/// One lock guards both, so a username check and the insert that follows are
/// a single step, and routing a frame iterates a snapshot no disconnect can
/// mutate mid-way.
#[derive(Clone)]
pub struct Registry {
    inner: Arc<RegistryInner>,
}

struct RegistryInner {
    connections: RwLock<HashMap<ConnId, Connection>>,
    moderator: Arc<Moderator>,
}

impl Registry {
    pub fn new(moderator: Arc<Moderator>) -> Self {
        Self {
            inner: Arc::new(RegistryInner {
                connections: RwLock::new(HashMap::new()),
                moderator,
            }),
        }
    }

    /// Track a new transport connection. Returns (conn_id, outbound receiver).
    pub async fn attach(&self) -> (ConnId, mpsc::UnboundedReceiver<ServerFrame>) {
        let conn_id = Uuid::new_v4();
        let (tx, rx) = mpsc::unbounded_channel();
        self.inner
            .connections
            .write()
            .await
            .insert(conn_id, Connection { tx, session: None, active: false });
        (conn_id, rx)
    }

    /// Forget a transport connection. Returns its session if it was still joined.
    pub async fn detach(&self, conn_id: ConnId) -> Option<Session> {
        self.inner
            .connections
            .write()
            .await
            .remove(&conn_id)
            .and_then(|conn| conn.active.then_some(conn.session).flatten())
    }

    /// Claim `username` for `conn_id` with default attributes. The session
    /// stays pending, invisible to routing and snapshots, until [`activate`].
    ///
    /// [`activate`]: Registry::activate
    pub async fn register(&self, conn_id: ConnId, username: &str) -> Result<Session, GatewayError> {
        if !self.inner.moderator.is_username_safe(username) {
            return Err(GatewayError::UsernameUnsafe);
        }

        let mut connections = self.inner.connections.write().await;

        let taken = connections
            .values()
            .filter_map(|c| c.session.as_ref())
            .any(|s| s.username.eq_ignore_ascii_case(username));
        if taken {
            return Err(GatewayError::UsernameTaken(username.to_string()));
        }

        let conn = connections
            .get_mut(&conn_id)
            .ok_or_else(|| GatewayError::Internal(format!("connection {conn_id} is not attached")))?;
        if conn.session.is_some() {
            return Err(GatewayError::AlreadyJoined);
        }

        let session = Session::new(conn_id, username);
        conn.session = Some(session.clone());
        conn.active = false;
        Ok(session)
    }

    pub async fn is_pending(&self, conn_id: ConnId) -> bool {
        self.inner
            .connections
            .read()
            .await
            .get(&conn_id)
            .is_some_and(|conn| conn.session.is_some() && !conn.active)
    }

    /// Make a pending session visible. `None` if there was nothing pending.
    pub async fn activate(&self, conn_id: ConnId) -> Option<Session> {
        let mut connections = self.inner.connections.write().await;
        let conn = connections.get_mut(&conn_id)?;
        if conn.active {
            return None;
        }
        let session = conn.session.clone()?;
        conn.active = true;
        Some(session)
    }

    /// End the session on `conn_id`. Returns it only to the first caller,
    /// and never for a session that was still pending.
    pub async fn unregister(&self, conn_id: ConnId) -> Option<Session> {
        let mut connections = self.inner.connections.write().await;
        let conn = connections.get_mut(&conn_id)?;
        let was_active = std::mem::replace(&mut conn.active, false);
        let session = conn.session.take()?;
        was_active.then_some(session)
    }

    pub async fn get(&self, conn_id: ConnId) -> Option<Session> {
        self.inner
            .connections
            .read()
            .await
            .get(&conn_id)
            .and_then(|conn| conn.live().cloned())
    }

    pub async fn update(&self, conn_id: ConnId, update: SessionUpdate) -> Option<Session> {
        let mut connections = self.inner.connections.write().await;
        let conn = connections.get_mut(&conn_id)?;
        if !conn.active {
            return None;
        }
        let session = conn.session.as_mut()?;

        if let Some(mode) = update.mode {
            session.mode = mode;
        }
        if let Some(region) = update.region {
            session.region = region;
        }
        if let Some(room) = update.room {
            session.room = room;
        }
        if let Some(avatar) = update.avatar {
            session.avatar = avatar;
        }
        Some(session.clone())
    }

    /// All joined sessions, ordered by username.
    pub async fn all(&self) -> Vec<Session> {
        let mut sessions: Vec<Session> = self
            .inner
            .connections
            .read()
            .await
            .values()
            .filter_map(|c| c.live().cloned())
            .collect();
        sessions.sort_by(|a, b| a.username.cmp(&b.username));
        sessions
    }

    pub async fn is_online(&self, username: &str) -> bool {
        self.canonical_username(username).await.is_some()
    }

    /// The spelling an online user joined with, matched ignoring case.
    pub async fn canonical_username(&self, username: &str) -> Option<String> {
        self.inner
            .connections
            .read()
            .await
            .values()
            .filter_map(Connection::live)
            .find(|s| s.username.eq_ignore_ascii_case(username))
            .map(|s| s.username.clone())
    }

    /// Send to one connection, joined or not.
    pub async fn send_to(&self, conn_id: ConnId, frame: ServerFrame) -> bool {
        let connections = self.inner.connections.read().await;
        match connections.get(&conn_id) {
            Some(conn) => conn.tx.send(frame).is_ok(),
            None => false,
        }
    }

    /// Send to the session holding `username`, if any.
    pub async fn send_to_user(&self, username: &str, frame: ServerFrame) -> bool {
        let connections = self.inner.connections.read().await;
        let target = connections
            .values()
            .find(|c| c.live().is_some_and(|s| s.username.eq_ignore_ascii_case(username)));
        match target {
            Some(conn) => conn.tx.send(frame).is_ok(),
            None => false,
        }
    }

    /// Route `frame` over the current sessions and push it to each target.
    pub async fn deliver(&self, audience: &Audience<'_>, frame: ServerFrame) -> Delivery {
        let connections = self.inner.connections.read().await;
        let delivery = router::route(audience, connections.values().filter_map(Connection::live));

        for conn_id in &delivery.targets {
            if let Some(conn) = connections.get(conn_id) {
                let _ = conn.tx.send(frame.clone());
            }
        }
        debug!("{} frame delivered to {} sessions", frame.kind(), delivery.targets.len());
        delivery
    }

    /// Push `users` and `room_counts` snapshots to every session.
    pub async fn broadcast_presence(&self) {
        let connections = self.inner.connections.read().await;

        let mut users: Vec<SessionView> = connections
            .values()
            .filter_map(|c| c.live().map(Session::view))
            .collect();
        users.sort_by(|a, b| a.username.cmp(&b.username));

        let mut counts: BTreeMap<Room, usize> = Room::ALL.iter().map(|r| (*r, 0)).collect();
        for user in &users {
            *counts.entry(user.room).or_default() += 1;
        }

        let users_frame = ServerFrame::Users { users };
        let counts_frame = ServerFrame::RoomCounts { counts };
        for conn in connections.values().filter(|c| c.live().is_some()) {
            let _ = conn.tx.send(users_frame.clone());
            let _ = conn.tx.send(counts_frame.clone());
        }
    }
}
