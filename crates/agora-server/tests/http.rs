//! `/api` routes driven in-process with `tower::ServiceExt::oneshot`.

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use serde_json::{Value, json};
use tokio::sync::mpsc;
use tower::ServiceExt;
use uuid::Uuid;

use agora_db::Database;
use agora_gateway::{ConnId, Gateway, GatewayConfig, LogNotifier, Moderator};
use agora_server::build_app;
use agora_types::events::{ClientFrame, ServerFrame};

struct TestApp {
    app: Router,
    gateway: Gateway,
}

impl TestApp {
    fn new() -> Self {
        let db = Arc::new(Database::open_in_memory().unwrap());
        let gateway = Gateway::new(db, Moderator::default(), Arc::new(LogNotifier), GatewayConfig::default());
        Self {
            app: build_app(gateway.clone()),
            gateway,
        }
    }

    async fn join(&self, username: &str) -> (ConnId, mpsc::UnboundedReceiver<ServerFrame>) {
        let (conn, rx) = self.gateway.connect().await;
        self.gateway
            .dispatch(conn, ClientFrame::Join { username: username.into() })
            .await;
        (conn, rx)
    }

    async fn request(&self, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let body = body.map_or_else(Body::empty, |b| Body::from(b.to_string()));
        let req = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(body)
            .unwrap();
        let resp = self.app.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, value)
    }

    async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.request(Method::GET, uri, None).await
    }
}

fn drain(rx: &mut mpsc::UnboundedReceiver<ServerFrame>) -> Vec<ServerFrame> {
    let mut frames = Vec::new();
    while let Ok(frame) = rx.try_recv() {
        frames.push(frame);
    }
    frames
}

#[tokio::test]
async fn recent_messages_are_chronological_and_limited() {
    let t = TestApp::new();
    let (alice, _rx) = t.join("alice").await;
    t.gateway.dispatch(alice, ClientFrame::Chat { text: "first".into() }).await;
    t.gateway.dispatch(alice, ClientFrame::Chat { text: "second".into() }).await;

    let (status, body) = t.get("/api/messages").await;
    assert_eq!(status, StatusCode::OK);
    let texts: Vec<_> = body.as_array().unwrap().iter().map(|m| m["text"].as_str().unwrap()).collect();
    assert_eq!(texts, vec!["alice has joined the chat", "first", "second"]);

    let (_, body) = t.get("/api/messages?limit=1").await;
    let messages = body.as_array().unwrap();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0]["text"], "second");
    assert_eq!(messages[0]["username"], "alice");
}

#[tokio::test]
async fn private_thread_matches_either_direction() {
    let t = TestApp::new();
    let (alice, _rx) = t.join("alice").await;
    t.gateway
        .dispatch(alice, ClientFrame::PrivateMessage { text: "later".into(), recipient: "bob".into() })
        .await;

    let (status, body) = t.get("/api/messages/private/bob/alice").await;
    assert_eq!(status, StatusCode::OK);
    let thread = body.as_array().unwrap();
    assert_eq!(thread.len(), 1);
    assert_eq!(thread[0]["isPrivate"], true);
    assert_eq!(thread[0]["recipient"], "bob");

    let (_, public) = t.get("/api/messages").await;
    assert!(public.as_array().unwrap().iter().all(|m| m["isPrivate"] == false));
}

#[tokio::test]
async fn reactions_over_http_broadcast_to_sessions() {
    let t = TestApp::new();
    let (alice, mut rx) = t.join("alice").await;
    t.gateway.dispatch(alice, ClientFrame::Chat { text: "party".into() }).await;
    let message_id = drain(&mut rx)
        .into_iter()
        .find_map(|f| match f {
            ServerFrame::Chat(m) => Some(m.id),
            _ => None,
        })
        .unwrap();

    let uri = format!("/api/messages/{message_id}/reactions");
    let (status, body) = t
        .request(Method::POST, &uri, Some(json!({ "username": "bob", "emoji": "🎉" })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["reactions"], json!({ "🎉": ["bob"] }));
    assert!(drain(&mut rx).iter().any(|f| matches!(f, ServerFrame::UpdateReactions { .. })));

    let (_, body) = t.get(&uri).await;
    assert_eq!(body["messageId"], message_id.to_string());

    let (status, body) = t
        .request(Method::DELETE, &uri, Some(json!({ "username": "bob", "emoji": "🎉" })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["reactions"], json!({}));

    let (status, _) = t.get(&format!("/api/messages/{}/reactions", Uuid::new_v4())).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = t
        .request(Method::POST, &uri, Some(json!({ "username": "bob", "emoji": "🎉", "extra": 1 })))
        .await;
    assert!(status.is_client_error());
}

#[tokio::test]
async fn leaderboard_lists_chat_users() {
    let t = TestApp::new();
    let _alice = t.join("alice").await;
    let _bob = t.join("bob").await;

    let (status, body) = t.get("/api/leaderboard?limit=5").await;
    assert_eq!(status, StatusCode::OK);
    let names: Vec<_> = body.as_array().unwrap().iter().map(|u| u["username"].as_str().unwrap()).collect();
    assert_eq!(names.len(), 2);
    assert!(names.contains(&"alice") && names.contains(&"bob"));
}

#[tokio::test]
async fn notification_settings() {
    let t = TestApp::new();
    let _alice = t.join("alice").await;

    let (status, _) = t
        .request(
            Method::PUT,
            "/api/users/alice/notifications",
            Some(json!({ "phoneNumber": "+15550100", "notifyOnFriendOnline": true })),
        )
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = t
        .request(
            Method::PUT,
            "/api/users/alice/notifications",
            Some(json!({ "notifyOnFriendOnline": true })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = t
        .request(
            Method::PUT,
            "/api/users/nobody/notifications",
            Some(json!({ "notifyOnFriendOnline": false })),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn friend_lists_over_http() {
    let t = TestApp::new();
    let _alice = t.join("alice").await;
    let _bob = t.join("bob").await;
    t.gateway.send_friend_request("alice", "bob").await.unwrap();

    let (status, body) = t.get("/api/friends/bob/requests").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[0]["requester"], "alice");
    assert_eq!(body[0]["status"], "pending");

    t.gateway.accept_friend_request("alice", "bob").await.unwrap();
    let (_, body) = t.get("/api/friends/alice").await;
    assert_eq!(body[0]["username"], "bob");
    assert_eq!(body[0]["isOnline"], true);
    let (_, body) = t.get("/api/friends/bob/requests").await;
    assert_eq!(body, json!([]));
}
