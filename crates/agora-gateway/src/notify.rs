//! Outbound SMS-style notifications.

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tracing::{info, warn};

#[async_trait]
pub trait Notifier: Send + Sync + 'static {
    /// Deliver `message` to `recipient` (a phone number). Returns success.
    async fn notify(&self, recipient: &str, message: &str) -> bool;
}

/// Logs instead of sending. Used when no delivery endpoint is configured.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, recipient: &str, message: &str) -> bool {
        info!("notification to {}: {}", recipient, message);
        true
    }
}

#[derive(Serialize)]
struct WebhookBody<'a> {
    to: &'a str,
    body: &'a str,
}

/// POSTs `{ "to": ..., "body": ... }` to an SMS gateway webhook.
pub struct WebhookNotifier {
    client: reqwest::Client,
    url: String,
}

impl WebhookNotifier {
    pub fn new(url: impl Into<String>) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn notify(&self, recipient: &str, message: &str) -> bool {
        let result = self
            .client
            .post(&self.url)
            .json(&WebhookBody { to: recipient, body: message })
            .send()
            .await;

        match result {
            Ok(resp) if resp.status().is_success() => true,
            Ok(resp) => {
                warn!("notification webhook returned {}", resp.status());
                false
            }
            Err(e) => {
                warn!("notification webhook failed: {}", e);
                false
            }
        }
    }
}
