// Discord wire types for the HTTP interactions endpoint and the
// application-command REST API (v10). Only the fields the bot reads or
// writes are modelled; unknown fields are ignored on input.

use serde::{Deserialize, Serialize};

/// `flags` bit that hides a reply from everyone but the invoker
pub const MESSAGE_FLAG_EPHEMERAL: u64 = 1 << 6;

/// Discord caps select menus at this many options
pub const MAX_SELECT_OPTIONS: usize = 25;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "u8", into = "u8")]
pub enum InteractionType {
    Ping,
    ApplicationCommand,
    MessageComponent,
    Other(u8),
}

impl From<u8> for InteractionType {
    fn from(value: u8) -> Self {
        match value {
            1 => InteractionType::Ping,
            2 => InteractionType::ApplicationCommand,
            3 => InteractionType::MessageComponent,
            other => InteractionType::Other(other),
        }
    }
}

impl From<InteractionType> for u8 {
    fn from(value: InteractionType) -> Self {
        match value {
            InteractionType::Ping => 1,
            InteractionType::ApplicationCommand => 2,
            InteractionType::MessageComponent => 3,
            InteractionType::Other(other) => other,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "u8", into = "u8")]
pub enum ComponentType {
    ActionRow,
    Button,
    StringSelect,
    Other(u8),
}

impl From<u8> for ComponentType {
    fn from(value: u8) -> Self {
        match value {
            1 => ComponentType::ActionRow,
            2 => ComponentType::Button,
            3 => ComponentType::StringSelect,
            other => ComponentType::Other(other),
        }
    }
}

impl From<ComponentType> for u8 {
    fn from(value: ComponentType) -> Self {
        match value {
            ComponentType::ActionRow => 1,
            ComponentType::Button => 2,
            ComponentType::StringSelect => 3,
            ComponentType::Other(other) => other,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "u8", into = "u8")]
pub enum CallbackType {
    Pong,
    ChannelMessageWithSource,
    Other(u8),
}

impl From<u8> for CallbackType {
    fn from(value: u8) -> Self {
        match value {
            1 => CallbackType::Pong,
            4 => CallbackType::ChannelMessageWithSource,
            other => CallbackType::Other(other),
        }
    }
}

impl From<CallbackType> for u8 {
    fn from(value: CallbackType) -> Self {
        match value {
            CallbackType::Pong => 1,
            CallbackType::ChannelMessageWithSource => 4,
            CallbackType::Other(other) => other,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "u8", into = "u8")]
pub enum CommandOptionType {
    SubCommand,
    Other(u8),
}

impl From<u8> for CommandOptionType {
    fn from(value: u8) -> Self {
        match value {
            1 => CommandOptionType::SubCommand,
            other => CommandOptionType::Other(other),
        }
    }
}

impl From<CommandOptionType> for u8 {
    fn from(value: CommandOptionType) -> Self {
        match value {
            CommandOptionType::SubCommand => 1,
            CommandOptionType::Other(other) => other,
        }
    }
}

pub const BUTTON_STYLE_PRIMARY: u8 = 1;

// Inbound interaction payloads
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Interaction {
    pub id: String,
    #[serde(default)]
    pub application_id: String,
    #[serde(rename = "type")]
    pub kind: InteractionType,
    #[serde(default)]
    pub data: Option<InteractionData>,
    #[serde(default)]
    pub guild_id: Option<String>,
    #[serde(default)]
    pub channel_id: Option<String>,
    #[serde(default)]
    pub member: Option<GuildMember>,
    #[serde(default)]
    pub user: Option<User>,
    #[serde(default)]
    pub token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct InteractionData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<CommandDataOption>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub component_type: Option<ComponentType>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub values: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CommandDataOption {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: CommandOptionType,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GuildMember {
    #[serde(default)]
    pub user: Option<User>,
    #[serde(default)]
    pub roles: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    pub id: String,
    #[serde(default)]
    pub username: String,
}

// Outbound interaction responses
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InteractionResponse {
    #[serde(rename = "type")]
    pub kind: CallbackType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<InteractionCallbackData>,
}

impl InteractionResponse {
    pub fn pong() -> Self {
        Self {
            kind: CallbackType::Pong,
            data: None,
        }
    }

    pub fn message(data: InteractionCallbackData) -> Self {
        Self {
            kind: CallbackType::ChannelMessageWithSource,
            data: Some(data),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct InteractionCallbackData {
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flags: Option<u64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub components: Vec<Component>,
}

/// Message component. Discord uses one shape discriminated by `type`, so the
/// fields of every kind the bot emits live side by side here.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Component {
    #[serde(rename = "type")]
    pub kind: ComponentType,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub components: Vec<Component>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_values: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_values: Option<u8>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<SelectOption>,
}

impl Component {
    fn empty(kind: ComponentType) -> Self {
        Self {
            kind,
            components: Vec::new(),
            custom_id: None,
            label: None,
            style: None,
            disabled: None,
            placeholder: None,
            min_values: None,
            max_values: None,
            options: Vec::new(),
        }
    }

    pub fn action_row(components: Vec<Component>) -> Self {
        Self {
            components,
            ..Self::empty(ComponentType::ActionRow)
        }
    }

    pub fn button(custom_id: String, label: String, disabled: bool) -> Self {
        Self {
            custom_id: Some(custom_id),
            label: Some(label),
            style: Some(BUTTON_STYLE_PRIMARY),
            disabled: Some(disabled),
            ..Self::empty(ComponentType::Button)
        }
    }

    pub fn select_menu(custom_id: String, placeholder: String, options: Vec<SelectOption>) -> Self {
        Self {
            custom_id: Some(custom_id),
            placeholder: Some(placeholder),
            min_values: Some(1),
            max_values: Some(1),
            disabled: Some(false),
            options,
            ..Self::empty(ComponentType::StringSelect)
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SelectOption {
    pub label: String,
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

// Application command REST payloads
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ApplicationCommand {
    pub id: String,
    #[serde(default)]
    pub application_id: String,
    #[serde(default)]
    pub guild_id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CreateApplicationCommand {
    pub name: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<ApplicationCommandOption>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ApplicationCommandOption {
    #[serde(rename = "type")]
    pub kind: CommandOptionType,
    pub name: String,
    pub description: String,
}
