//! Messaging-platform abstraction.
//!
//! The gateway/REST client that talks to the chat platform lives outside
//! this crate; everything here goes through the [`Platform`] trait so the
//! core stays testable against [`fake::FakePlatform`]. Message payloads are
//! plain data (embeds, button rows, select menus, modals) the host maps to
//! its client library's types.

mod types;

#[cfg(test)]
pub mod fake;

pub use types::*;

use async_trait::async_trait;

/// Platform call failures.
#[derive(Debug, thiserror::Error)]
pub enum PlatformError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Missing permission: {0}")]
    Forbidden(String),

    #[error("API error: {0}")]
    Api(String),
}

/// The chat platform's REST surface, as far as the ticket core needs it.
#[async_trait]
pub trait Platform: Send + Sync {
    /// Create a channel and return its id.
    async fn create_channel(&self, request: CreateChannelRequest)
    -> Result<String, PlatformError>;

    async fn delete_channel(&self, channel_id: &str) -> Result<(), PlatformError>;

    async fn rename_channel(&self, channel_id: &str, name: &str) -> Result<(), PlatformError>;

    /// Send a message and return its id.
    async fn send_message(
        &self,
        channel_id: &str,
        message: OutboundMessage,
    ) -> Result<String, PlatformError>;

    async fn edit_message_components(
        &self,
        channel_id: &str,
        message_id: &str,
        components: Vec<ActionRow>,
    ) -> Result<(), PlatformError>;

    async fn delete_message(&self, channel_id: &str, message_id: &str)
    -> Result<(), PlatformError>;

    /// Most recent messages, newest first.
    async fn fetch_recent_messages(
        &self,
        channel_id: &str,
        limit: u8,
    ) -> Result<Vec<MessageRef>, PlatformError>;

    /// Resolve a user; `None` when the account no longer exists.
    async fn fetch_user(&self, user_id: &str) -> Result<Option<UserRef>, PlatformError>;

    /// Open (or reuse) a DM channel and send a message, returning its id.
    async fn send_dm(
        &self,
        user_id: &str,
        message: OutboundMessage,
    ) -> Result<String, PlatformError>;

    async fn grant_channel_access(
        &self,
        channel_id: &str,
        user_id: &str,
        permissions: Vec<Permission>,
    ) -> Result<(), PlatformError>;

    async fn revoke_channel_access(
        &self,
        channel_id: &str,
        user_id: &str,
    ) -> Result<(), PlatformError>;

    /// The bot's own user id.
    fn bot_user_id(&self) -> String;
}

/// Response surface of one interaction.
///
/// The platform allows exactly one acknowledgement per interaction;
/// implementations flip [`InteractionResponder::acknowledged`] after the
/// first reply/defer/update so error handling can tell whether a generic
/// reply is still possible.
#[async_trait]
pub trait InteractionResponder: Send + Sync {
    /// Reply with a visible or ephemeral message.
    async fn reply(&self, message: OutboundMessage, ephemeral: bool) -> Result<(), PlatformError>;

    /// Acknowledge now, answer later via [`Self::edit_reply`].
    async fn defer(&self, ephemeral: bool) -> Result<(), PlatformError>;

    async fn edit_reply(&self, message: OutboundMessage) -> Result<(), PlatformError>;

    /// Additional message after the first acknowledgement.
    async fn follow_up(
        &self,
        message: OutboundMessage,
        ephemeral: bool,
    ) -> Result<(), PlatformError>;

    /// Open a modal (only valid as the first acknowledgement).
    async fn open_modal(&self, modal: Modal) -> Result<(), PlatformError>;

    /// For component interactions: edit the message the component sits on.
    async fn update_message(&self, message: OutboundMessage) -> Result<(), PlatformError>;

    /// Whether this interaction has already been acknowledged.
    fn acknowledged(&self) -> bool;
}

/// Transcript rendering and delivery, provided by the host.
#[async_trait]
pub trait TranscriptSink: Send + Sync {
    /// Render and deliver a transcript for a ticket channel.
    async fn deliver(&self, channel_id: &str, ticket_number: i64) -> Result<(), PlatformError>;
}
