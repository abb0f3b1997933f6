use tracing::{info, warn};

use agora_types::events::ServerFrame;
use agora_types::models::NewMessage;

use crate::error::GatewayError;
use crate::gateway::Gateway;
use crate::registry::{ConnId, Session};
use crate::router::Audience;

impl Gateway {
    /// Absent -> Active. Claims the name, persists presence and the join
    /// notice, broadcasts the new snapshot, then sends history to the joiner.
    pub async fn join(&self, conn_id: ConnId, username: &str) -> Result<(), GatewayError> {
        let session = self.registry().register(conn_id, username.trim()).await?;

        if let Err(e) = self.enter(&session).await {
            // Nobody has been told about this session yet; just release the name.
            self.registry().unregister(conn_id).await;
            return Err(e);
        }

        info!("{} joined on {}", session.username, conn_id);
        self.notify_friends_online(&session.username);
        Ok(())
    }

    async fn enter(&self, session: &Session) -> Result<(), GatewayError> {
        let _gate = self.history_gate().write().await;
        if !self.registry().is_pending(session.conn_id).await {
            return Err(GatewayError::Internal(format!(
                "{} left before the join completed",
                session.username
            )));
        }

        let username = session.username.clone();
        let avatar = session.avatar.clone();
        let limit = self.config().history_limit;
        let record = self
            .blocking("join", move |store| {
                let notice = NewMessage::system(format!("{username} has joined the chat"));
                store.join_chat(&username, &avatar, &notice, limit)
            })
            .await?;

        // No message can be stored or delivered while the gate is held, so
        // the history batch and the live stream neither overlap nor miss.
        self.registry().activate(session.conn_id).await;
        self.registry().broadcast_presence().await;
        self.registry()
            .deliver(&Audience::Everyone, ServerFrame::Join(record.notice))
            .await;
        self.registry()
            .send_to(session.conn_id, ServerFrame::History { messages: record.history })
            .await;
        Ok(())
    }

    /// Active -> Absent. Explicit LEAVE and transport close both land here;
    /// only the first call for a session does anything.
    pub async fn leave(&self, conn_id: ConnId) -> Result<(), GatewayError> {
        let _gate = self.history_gate().read().await;
        let Some(session) = self.registry().unregister(conn_id).await else {
            return Ok(());
        };
        info!("{} left from {}", session.username, conn_id);

        let username = session.username.clone();
        let stored = self
            .blocking("leave", move |store| {
                store.leave_chat(&username, &NewMessage::system(format!("{username} has left the chat")))
            })
            .await;

        // The session is already gone from the registry, so the snapshot goes
        // out regardless; only the notice depends on the store.
        self.registry().broadcast_presence().await;

        let notice = stored?;
        self.registry()
            .deliver(&Audience::Everyone, ServerFrame::Leave(notice))
            .await;
        Ok(())
    }

    /// Text every accepted friend who opted in. Runs detached; failures are
    /// logged and never affect the join.
    fn notify_friends_online(&self, username: &str) {
        let gateway = self.clone();
        let username = username.to_string();

        tokio::spawn(async move {
            let lookup = username.clone();
            let targets = match gateway
                .blocking("friends to notify", move |store| store.friends_to_notify(&lookup))
                .await
            {
                Ok(targets) => targets,
                Err(e) => {
                    warn!("could not load friends of {} to notify: {}", username, e);
                    return;
                }
            };

            let body = format!("Your friend {username} is now online");
            for target in targets {
                if gateway.notifier().notify(&target.phone_number, &body).await {
                    info!("notified {} that {} is online", target.username, username);
                } else {
                    warn!("failed to notify {} that {} is online", target.username, username);
                }
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use agora_types::events::{ClientFrame, ServerFrame};

    use crate::testing::{SlowStore, gateway_over, joined};

    #[tokio::test]
    async fn message_sent_while_joining_arrives_once_after_history() {
        let store = Arc::new(SlowStore::new().slow_join("bob", Duration::from_millis(300)));
        let gateway = gateway_over(store);
        let (alice, _alice_rx) = joined(&gateway, "alice").await;

        let (bob, mut bob_rx) = gateway.connect().await;
        let joining = tokio::spawn({
            let gateway = gateway.clone();
            async move {
                gateway
                    .dispatch(bob, ClientFrame::Join { username: "bob".into() })
                    .await
            }
        });
        tokio::time::sleep(Duration::from_millis(100)).await;
        gateway.dispatch(alice, ClientFrame::Chat { text: "hi".into() }).await;
        joining.await.unwrap();

        let mut kinds = Vec::new();
        let mut copies = 0;
        while let Ok(frame) = bob_rx.try_recv() {
            kinds.push(frame.kind());
            match frame {
                ServerFrame::History { messages } => {
                    copies += messages.iter().filter(|m| m.text == "hi").count();
                }
                ServerFrame::Chat(m) => {
                    assert!(kinds.contains(&"history"), "chat before history: {kinds:?}");
                    copies += usize::from(m.text == "hi");
                }
                _ => {}
            }
        }
        assert_eq!(copies, 1, "frames: {kinds:?}");
        assert_eq!(&kinds[..4], &["users", "room_counts", "join", "history"]);
    }

    #[tokio::test]
    async fn leaving_before_the_join_lands_announces_nothing() {
        let store = Arc::new(SlowStore::new());
        let gateway = gateway_over(store.clone());
        let (_alice, mut alice_rx) = joined(&gateway, "alice").await;

        let (bob, _bob_rx) = gateway.connect().await;
        gateway.registry().register(bob, "bob").await.unwrap();
        gateway.leave(bob).await.unwrap();
        gateway.disconnect(bob).await;

        assert!(alice_rx.try_recv().is_err());
        assert!(!gateway.registry().is_online("bob").await);
        assert!(store.db.get_chat_user("bob").unwrap().is_none());
    }
}
