use base64::Engine;
use base64::engine::general_purpose::STANDARD as B64;
use tracing::{debug, info};

use agora_types::events::ServerFrame;
use agora_types::models::{ChatMessage, MessageKind, NewMessage, VoiceClip};

use crate::error::GatewayError;
use crate::gateway::Gateway;
use crate::registry::ConnId;
use crate::router::Audience;

/// An inbound chat-shaped event before moderation.
struct Draft<'a> {
    text: &'a str,
    recipient: Option<&'a str>,
    voice: Option<VoiceClip>,
}

impl Gateway {
    pub async fn handle_chat(&self, conn_id: ConnId, text: &str) -> Result<(), GatewayError> {
        self.publish(conn_id, Draft { text, recipient: None, voice: None }).await
    }

    pub async fn handle_voice(
        &self,
        conn_id: ConnId,
        text: &str,
        voice_data: String,
        duration_seconds: f64,
    ) -> Result<(), GatewayError> {
        let voice = Some(VoiceClip { data: voice_data, duration_seconds });
        self.publish(conn_id, Draft { text, recipient: None, voice }).await
    }

    pub async fn handle_private(&self, conn_id: ConnId, text: &str, recipient: &str) -> Result<(), GatewayError> {
        self.publish(conn_id, Draft { text, recipient: Some(recipient), voice: None }).await
    }

    pub async fn handle_private_voice(
        &self,
        conn_id: ConnId,
        text: &str,
        recipient: &str,
        voice_data: String,
        duration_seconds: f64,
    ) -> Result<(), GatewayError> {
        let voice = Some(VoiceClip { data: voice_data, duration_seconds });
        self.publish(conn_id, Draft { text, recipient: Some(recipient), voice }).await
    }

    /// Resolve, moderate, record activity, persist, then route and push.
    /// Nothing is pushed to anyone but the sender unless the message was stored.
    async fn publish(&self, conn_id: ConnId, draft: Draft<'_>) -> Result<(), GatewayError> {
        let Some(session) = self.joined(conn_id).await else {
            return Ok(());
        };

        // Whitespace only decides emptiness; the text is stored as sent.
        let text = draft.text;
        if text.trim().is_empty() && draft.voice.is_none() {
            debug!("{} sent an empty message, ignoring", session.username);
            return Ok(());
        }
        if text.chars().count() > self.config().max_message_len {
            return Err(GatewayError::MessageTooLong(self.config().max_message_len));
        }
        if let Some(voice) = &draft.voice {
            self.validate_voice(voice)?;
        }
        let recipient = match draft.recipient.map(str::trim) {
            Some("") => return Err(GatewayError::UnknownUser(String::new())),
            other => other,
        };

        // Voice audio is never inspected, only its caption.
        let filtered = self.moderator().filter(text);
        if filtered.flagged {
            info!("filtered message from {}", session.username);
            self.registry()
                .send_to(conn_id, ServerFrame::error(GatewayError::ContentFiltered.to_string()))
                .await;
        }

        let _gate = self.history_gate().read().await;
        // Stored under the spelling the recipient joined with when online.
        let recipient = match recipient {
            Some(name) => Some(
                self.registry()
                    .canonical_username(name)
                    .await
                    .unwrap_or_else(|| name.to_string()),
            ),
            None => None,
        };

        let new_message = NewMessage {
            sender: session.username.clone(),
            text: filtered.cleaned,
            kind: MessageKind::User,
            recipient: recipient.clone(),
            voice: draft.voice,
        };
        let username = session.username.clone();
        let message = self
            .blocking("persist message", move |store| {
                store.record_activity(&username)?;
                store.insert_message(&new_message)
            })
            .await?;

        let audience = match recipient.as_deref() {
            Some(recipient) => Audience::private(&session, recipient),
            None => Audience::content_from(&session),
        };
        let delivery = self.registry().deliver(&audience, frame_for(message)).await;

        if delivery.recipient_offline {
            if let Some(recipient) = recipient {
                let text = GatewayError::RecipientOffline(recipient).to_string();
                self.registry().send_to(conn_id, ServerFrame::error(text)).await;
            }
        }
        Ok(())
    }

    fn validate_voice(&self, voice: &VoiceClip) -> Result<(), GatewayError> {
        if !voice.duration_seconds.is_finite() || voice.duration_seconds < 0.0 {
            return Err(GatewayError::InvalidVoice("bad duration"));
        }
        // Data URLs carry a "data:audio/...;base64," prefix.
        let payload = voice
            .data
            .split_once(";base64,")
            .map_or(voice.data.as_str(), |(_, rest)| rest);
        if payload.is_empty() {
            return Err(GatewayError::InvalidVoice("empty payload"));
        }
        let decoded = B64
            .decode(payload)
            .map_err(|_| GatewayError::InvalidVoice("payload is not base64"))?;
        if decoded.len() > self.config().max_voice_bytes {
            return Err(GatewayError::InvalidVoice("payload too large"));
        }
        Ok(())
    }
}

/// Wire frame type follows from the privacy/voice flags of the stored message.
fn frame_for(message: ChatMessage) -> ServerFrame {
    match (message.is_private, message.is_voice) {
        (false, false) => ServerFrame::Chat(message),
        (false, true) => ServerFrame::VoiceMessage(message),
        (true, false) => ServerFrame::PrivateMessage(message),
        (true, true) => ServerFrame::VoiceMessagePrivate(message),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_type_follows_message_flags() {
        let mut msg = ChatMessage::transient_system("x");
        assert_eq!(frame_for(msg.clone()).kind(), "chat");
        msg.is_voice = true;
        assert_eq!(frame_for(msg.clone()).kind(), "voice_message");
        msg.is_private = true;
        assert_eq!(frame_for(msg.clone()).kind(), "voice_message_private");
        msg.is_voice = false;
        assert_eq!(frame_for(msg).kind(), "private_message");
    }
}
