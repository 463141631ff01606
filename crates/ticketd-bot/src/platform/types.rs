//! Plain-data message and interaction types exchanged with the platform.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRef {
    pub id: String,
    pub username: String,
    pub is_bot: bool,
}

impl UserRef {
    /// Synthetic user for automated actions (alert sweeps).
    pub fn system() -> Self {
        Self {
            id: "0".to_string(),
            username: "System".to_string(),
            is_bot: true,
        }
    }
}

/// Channel permissions the ticket core manages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Permission {
    ViewChannel,
    SendMessages,
    ReadMessageHistory,
    AttachFiles,
    EmbedLinks,
    ManageChannels,
    ManageMessages,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum OverwriteTarget {
    Role(String),
    Member(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PermissionOverwrite {
    pub target: OverwriteTarget,
    pub allow: Vec<Permission>,
    pub deny: Vec<Permission>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateChannelRequest {
    pub guild_id: String,
    pub name: String,
    /// Parent category channel.
    pub parent_id: String,
    pub topic: Option<String>,
    pub overwrites: Vec<PermissionOverwrite>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Embed {
    pub title: Option<String>,
    pub description: Option<String>,
    pub color: Option<u32>,
    pub fields: Vec<EmbedField>,
    pub footer: Option<String>,
    pub thumbnail: Option<String>,
    pub image: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ButtonStyle {
    Primary,
    #[default]
    Secondary,
    Success,
    Danger,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Button {
    pub custom_id: String,
    pub label: String,
    pub style: ButtonStyle,
    pub emoji: Option<String>,
    pub disabled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectOption {
    pub label: String,
    pub value: String,
    pub description: Option<String>,
    pub emoji: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectMenu {
    pub custom_id: String,
    pub placeholder: Option<String>,
    pub options: Vec<SelectOption>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Component {
    Button(Button),
    Select(SelectMenu),
}

/// One horizontal row of components (at most 5 buttons or 1 select menu).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ActionRow {
    pub components: Vec<Component>,
}

/// An outgoing message: plain content, embeds, component rows.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutboundMessage {
    pub content: Option<String>,
    pub embeds: Vec<Embed>,
    pub components: Vec<ActionRow>,
}

impl OutboundMessage {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            ..Self::default()
        }
    }

    pub fn embed(embed: Embed) -> Self {
        Self {
            embeds: vec![embed],
            ..Self::default()
        }
    }
}

/// Text input style inside a modal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TextInputStyle {
    #[default]
    Short,
    Paragraph,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextInput {
    pub custom_id: String,
    pub label: String,
    pub style: TextInputStyle,
    pub required: bool,
    pub placeholder: Option<String>,
    pub min_length: Option<u16>,
    pub max_length: Option<u16>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Modal {
    pub custom_id: String,
    pub title: String,
    pub inputs: Vec<TextInput>,
}

/// Minimal view of an existing channel message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageRef {
    pub id: String,
    pub channel_id: String,
    pub author_id: String,
    pub author_is_bot: bool,
    pub has_embeds: bool,
    pub has_components: bool,
}

/// Slash-command payloads the router dispatches.
#[derive(Debug, Clone)]
pub enum Command {
    Alert {
        duration_minutes: Option<i64>,
        reason: Option<String>,
    },
    Rename {
        new_name: String,
    },
    Add {
        user_id: String,
    },
    Remove {
        user_id: String,
    },
    Close {
        reason: Option<String>,
    },
}

/// What the user did.
#[derive(Debug, Clone)]
pub enum Payload {
    Button {
        custom_id: String,
    },
    SelectMenu {
        custom_id: String,
        values: Vec<String>,
    },
    ModalSubmit {
        custom_id: String,
        /// (input custom id, value), in the modal's input order.
        values: Vec<(String, String)>,
    },
    Command(Command),
}

/// A normalized incoming interaction.
#[derive(Debug, Clone)]
pub struct Interaction {
    pub guild_id: String,
    pub channel_id: String,
    /// The message the component sits on, for component interactions.
    pub message_id: Option<String>,
    pub user: UserRef,
    pub member_roles: Vec<String>,
    pub is_admin: bool,
    pub payload: Payload,
}
