use tracing::debug;
use uuid::Uuid;

use agora_types::events::ServerFrame;
use agora_types::models::Reactions;

use crate::error::GatewayError;
use crate::gateway::Gateway;
use crate::router::Audience;

const MAX_EMOJI_BYTES: usize = 32;

impl Gateway {
    /// Set-union `username` into `emoji`'s contributors and broadcast the full map.
    pub async fn add_reaction(&self, message_id: Uuid, username: &str, emoji: &str) -> Result<Reactions, GatewayError> {
        let emoji = valid_emoji(emoji)?;
        let (user, em) = (username.to_string(), emoji.to_string());
        let reactions = self
            .blocking("add reaction", move |store| store.add_reaction(message_id, &user, &em))
            .await?
            .ok_or(GatewayError::NotFound(message_id))?;

        debug!("{} reacted {} to {}", username, emoji, message_id);
        self.broadcast_reactions(message_id, &reactions).await;
        Ok(reactions)
    }

    /// Remove `username` from `emoji`'s contributors and broadcast the full map.
    pub async fn remove_reaction(&self, message_id: Uuid, username: &str, emoji: &str) -> Result<Reactions, GatewayError> {
        let emoji = valid_emoji(emoji)?;
        let (user, em) = (username.to_string(), emoji.to_string());
        let reactions = self
            .blocking("remove reaction", move |store| store.remove_reaction(message_id, &user, &em))
            .await?
            .ok_or(GatewayError::NotFound(message_id))?;

        debug!("{} removed {} from {}", username, emoji, message_id);
        self.broadcast_reactions(message_id, &reactions).await;
        Ok(reactions)
    }

    pub async fn reactions(&self, message_id: Uuid) -> Result<Reactions, GatewayError> {
        self.blocking("load reactions", move |store| store.reactions(message_id))
            .await?
            .ok_or(GatewayError::NotFound(message_id))
    }

    /// Reactions are visible to every session, whatever its chat scope.
    async fn broadcast_reactions(&self, message_id: Uuid, reactions: &Reactions) {
        let frame = ServerFrame::UpdateReactions {
            message_id,
            reactions: reactions.clone(),
        };
        self.registry().deliver(&Audience::Everyone, frame).await;
    }
}

fn valid_emoji(emoji: &str) -> Result<&str, GatewayError> {
    let emoji = emoji.trim();
    if emoji.is_empty() || emoji.len() > MAX_EMOJI_BYTES {
        return Err(GatewayError::InvalidEmoji);
    }
    Ok(emoji)
}
