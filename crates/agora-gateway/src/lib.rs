pub mod connection;
pub mod error;
pub mod gateway;
pub mod moderation;
pub mod notify;
pub mod pipeline;
pub mod presence;
pub mod reactions;
pub mod registry;
pub mod router;
pub mod social;

#[cfg(test)]
mod testing;

pub use error::{ConflictKind, GatewayError};
pub use gateway::{Gateway, GatewayConfig};
pub use moderation::Moderator;
pub use notify::{LogNotifier, Notifier, WebhookNotifier};
pub use registry::{ConnId, Registry, Session, SessionUpdate};
