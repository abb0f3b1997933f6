use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::Notify;

use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, Stream, StreamExt};
use tracing::{info, trace, warn};

use agora_types::events::{ClientFrame, ServerFrame};

use crate::gateway::Gateway;
use crate::registry::ConnId;

/// Heartbeat interval: server sends a Ping every 15 seconds.
/// If 2 consecutive Pongs are missed (~30s), the connection is dropped.
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(15);

/// Drive one `/ws` connection until either side goes away.
///
/// Inbound frames are handled strictly one at a time, so a connection's
/// frames are processed in the order they arrived. Outbound frames come from
/// the registry through this connection's channel.
pub async fn handle_connection(socket: WebSocket, gateway: Gateway) {
    let (mut sender, receiver) = socket.split();
    let (conn_id, mut outbound) = gateway.connect().await;
    info!("connection {} opened", conn_id);

    let pong_received = Arc::new(AtomicBool::new(true));
    let pong_flag_send = pong_received.clone();

    // Forward registry frames -> client, with heartbeat
    let mut send_task = tokio::spawn(async move {
        let mut heartbeat = tokio::time::interval(HEARTBEAT_INTERVAL);
        heartbeat.tick().await;
        let mut missed_heartbeats: u8 = 0;

        loop {
            tokio::select! {
                frame = outbound.recv() => {
                    let Some(frame) = frame else { break };
                    let text = match serde_json::to_string(&frame) {
                        Ok(text) => text,
                        Err(e) => {
                            warn!("could not encode {} frame: {}", frame.kind(), e);
                            continue;
                        }
                    };
                    trace!("-> {} {}", conn_id, frame.kind());
                    if sender.send(Message::Text(text.into())).await.is_err() {
                        break;
                    }
                }
                _ = heartbeat.tick() => {
                    if pong_flag_send.swap(false, Ordering::Acquire) {
                        missed_heartbeats = 0;
                    } else {
                        missed_heartbeats += 1;
                        if missed_heartbeats >= 2 {
                            warn!("Heartbeat timeout on {} (missed {} pongs), dropping connection", conn_id, missed_heartbeats);
                            break;
                        }
                    }
                    if sender.send(Message::Ping(Vec::<u8>::new().into())).await.is_err() {
                        break;
                    }
                }
            }
        }
    });

    // Read frames from client
    let shutdown = Arc::new(Notify::new());
    let mut recv_task = tokio::spawn(read_frames(
        receiver,
        gateway.clone(),
        conn_id,
        shutdown.clone(),
        pong_received,
    ));

    // Wait for either task to finish. A frame already being dispatched is
    // allowed to complete, so a stored message is always delivered.
    tokio::select! {
        _ = &mut send_task => {
            shutdown.notify_one();
            let _ = recv_task.await;
        }
        _ = &mut recv_task => send_task.abort(),
    }

    gateway.disconnect(conn_id).await;
    info!("connection {} closed", conn_id);
}

/// Dispatch inbound frames one at a time until the client closes or
/// `shutdown` fires. Shutdown is only observed between frames.
pub(crate) async fn read_frames<S>(
    mut receiver: S,
    gateway: Gateway,
    conn_id: ConnId,
    shutdown: Arc<Notify>,
    pong_received: Arc<AtomicBool>,
) where
    S: Stream<Item = Result<Message, axum::Error>> + Unpin,
{
    loop {
        let next = tokio::select! {
            biased;
            _ = shutdown.notified() => break,
            next = receiver.next() => next,
        };
        let Some(Ok(msg)) = next else { break };

        match msg {
            Message::Text(text) => match serde_json::from_str::<ClientFrame>(text.as_str()) {
                Ok(frame) => gateway.dispatch(conn_id, frame).await,
                Err(e) => {
                    warn!(
                        "{} bad frame: {} -- raw: {}",
                        conn_id,
                        e,
                        text.as_str().chars().take(200).collect::<String>()
                    );
                    gateway
                        .registry()
                        .send_to(conn_id, ServerFrame::error("Malformed frame"))
                        .await;
                }
            },
            Message::Pong(_) => {
                pong_received.store(true, Ordering::Release);
            }
            Message::Close(_) => break,
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::stream;

    use crate::testing::{SlowStore, gateway_over, joined};

    #[tokio::test]
    async fn shutdown_waits_for_the_frame_in_flight() {
        let store = Arc::new(SlowStore::new().slow_insert(Duration::from_millis(200)));
        let gateway = gateway_over(store);
        let (alice, _alice_rx) = joined(&gateway, "alice").await;
        let (_bob, mut bob_rx) = joined(&gateway, "bob").await;

        let chat = r#"{"type":"chat","text":"last words"}"#;
        let frames = stream::iter([Ok::<_, axum::Error>(Message::Text(chat.into()))]).chain(stream::pending());
        let shutdown = Arc::new(Notify::new());
        let reader = tokio::spawn(read_frames(
            frames,
            gateway.clone(),
            alice,
            shutdown.clone(),
            Arc::new(AtomicBool::new(true)),
        ));

        tokio::time::sleep(Duration::from_millis(50)).await;
        shutdown.notify_one();
        tokio::time::timeout(Duration::from_secs(2), reader)
            .await
            .expect("reader stopped after shutdown")
            .unwrap();

        match bob_rx.try_recv() {
            Ok(ServerFrame::Chat(msg)) => assert_eq!(msg.text, "last words"),
            other => panic!("expected the chat, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn shutdown_stops_an_idle_reader() {
        let gateway = gateway_over(Arc::new(SlowStore::new()));
        let (conn, _rx) = gateway.connect().await;
        let shutdown = Arc::new(Notify::new());
        shutdown.notify_one();

        let idle = stream::pending::<Result<Message, axum::Error>>();
        tokio::time::timeout(
            Duration::from_secs(1),
            read_frames(idle, gateway, conn, shutdown, Arc::new(AtomicBool::new(true))),
        )
        .await
        .expect("reader stopped");
    }
}
