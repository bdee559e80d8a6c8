use crate::protocol::{
    Component, Interaction, InteractionCallbackData, InteractionResponse, InteractionType,
    SelectOption, MESSAGE_FLAG_EPHEMERAL,
};
use fleetbot_core::{
    AuthorizationContext, ComponentId, CoreError, InteractionEvent, Reply, ReplyComponent,
    SessionId, SERVER_COMMAND_NAME,
};
use std::convert::TryFrom;
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConversionError {
    #[error("ping interactions carry no event")]
    Ping,
    #[error("unsupported interaction type: {0}")]
    UnsupportedType(u8),
    #[error("interaction is missing field: {0}")]
    MissingField(&'static str),
    #[error("unknown component: {0}")]
    UnknownComponent(String),
    #[error("unknown command: {0}")]
    UnknownCommand(String),
}

impl From<CoreError> for ConversionError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::InvalidComponentId(id) => ConversionError::UnknownComponent(id),
            other => ConversionError::UnknownComponent(other.to_string()),
        }
    }
}

fn authorization_context(interaction: &Interaction) -> AuthorizationContext {
    let invoker_id = interaction
        .member
        .as_ref()
        .and_then(|member| member.user.as_ref())
        .or(interaction.user.as_ref())
        .map(|user| user.id.clone())
        .unwrap_or_default();

    // Direct messages have no member and therefore no roles
    let roles = interaction
        .member
        .as_ref()
        .map(|member| member.roles.clone())
        .unwrap_or_default();

    AuthorizationContext::new(
        interaction.channel_id.clone().unwrap_or_default(),
        invoker_id,
        roles,
    )
}

// Interaction -> InteractionEvent
impl TryFrom<Interaction> for InteractionEvent {
    type Error = ConversionError;

    fn try_from(interaction: Interaction) -> Result<Self, Self::Error> {
        let context = authorization_context(&interaction);

        match interaction.kind {
            InteractionType::Ping => Err(ConversionError::Ping),
            InteractionType::ApplicationCommand => {
                let command = interaction
                    .data
                    .and_then(|data| data.name)
                    .ok_or(ConversionError::MissingField("data.name"))?;
                // Leftover commands from earlier deployments may still be invoked
                if command != SERVER_COMMAND_NAME {
                    return Err(ConversionError::UnknownCommand(command));
                }

                Ok(InteractionEvent::CommandInvoke {
                    session_id: SessionId::new(interaction.id),
                    context,
                    command,
                })
            }
            InteractionType::MessageComponent => {
                let data = interaction
                    .data
                    .ok_or(ConversionError::MissingField("data"))?;
                let custom_id = data
                    .custom_id
                    .ok_or(ConversionError::MissingField("data.custom_id"))?;

                match custom_id.parse::<ComponentId>()? {
                    ComponentId::SelectServer(session_id) => {
                        let instance_id = data
                            .values
                            .into_iter()
                            .next()
                            .ok_or(ConversionError::MissingField("data.values"))?;

                        Ok(InteractionEvent::Selection {
                            session_id,
                            context,
                            instance_id,
                        })
                    }
                    ComponentId::Lifecycle(action, session_id) => Ok(InteractionEvent::Action {
                        session_id,
                        context,
                        action,
                    }),
                }
            }
            InteractionType::Other(kind) => Err(ConversionError::UnsupportedType(kind)),
        }
    }
}

// Reply -> InteractionResponse
impl From<ReplyComponent> for Component {
    fn from(component: ReplyComponent) -> Self {
        match component {
            ReplyComponent::SelectMenu {
                id,
                placeholder,
                options,
            } => {
                let options = options
                    .into_iter()
                    .map(|option| SelectOption {
                        label: option.label,
                        value: option.value,
                        description: Some(option.description).filter(|d| !d.is_empty()),
                    })
                    .collect();

                Component::action_row(vec![Component::select_menu(
                    id.to_string(),
                    placeholder,
                    options,
                )])
            }
            ReplyComponent::Buttons(buttons) => Component::action_row(
                buttons
                    .into_iter()
                    .map(|button| {
                        Component::button(button.id.to_string(), button.label, button.disabled)
                    })
                    .collect(),
            ),
        }
    }
}

impl From<Reply> for InteractionResponse {
    fn from(reply: Reply) -> Self {
        InteractionResponse::message(InteractionCallbackData {
            content: reply.content,
            flags: reply.ephemeral.then_some(MESSAGE_FLAG_EPHEMERAL),
            components: reply.components.into_iter().map(Into::into).collect(),
        })
    }
}
