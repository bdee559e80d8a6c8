use crate::ComponentId;

/// One entry of a select menu
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuOption {
    pub label: String,
    pub value: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionButton {
    pub id: ComponentId,
    pub label: String,
    pub disabled: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplyComponent {
    SelectMenu {
        id: ComponentId,
        placeholder: String,
        options: Vec<MenuOption>,
    },
    Buttons(Vec<ActionButton>),
}

/// Transport-neutral response to a single interaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub content: String,
    pub components: Vec<ReplyComponent>,
    pub ephemeral: bool,
}

impl Reply {
    /// Plain ephemeral text reply
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            components: Vec::new(),
            ephemeral: true,
        }
    }

    pub fn with_component(mut self, component: ReplyComponent) -> Self {
        self.components.push(component);
        self
    }

    pub fn select_menu(&self) -> Option<(&ComponentId, &[MenuOption])> {
        self.components.iter().find_map(|component| match component {
            ReplyComponent::SelectMenu { id, options, .. } => Some((id, options.as_slice())),
            ReplyComponent::Buttons(_) => None,
        })
    }

    pub fn buttons(&self) -> &[ActionButton] {
        self.components
            .iter()
            .find_map(|component| match component {
                ReplyComponent::Buttons(buttons) => Some(buttons.as_slice()),
                ReplyComponent::SelectMenu { .. } => None,
            })
            .unwrap_or(&[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{LifecycleAction, SessionId};

    #[test]
    fn test_text_reply_is_ephemeral_without_components() {
        let reply = Reply::text("Unable to run command in this channel");
        assert!(reply.ephemeral);
        assert!(reply.components.is_empty());
        assert!(reply.select_menu().is_none());
        assert!(reply.buttons().is_empty());
    }

    #[test]
    fn test_reply_component_accessors() {
        let session = SessionId::new("s-1");
        let reply = Reply::text("pick")
            .with_component(ReplyComponent::SelectMenu {
                id: ComponentId::SelectServer(session.clone()),
                placeholder: "choose".to_string(),
                options: vec![MenuOption {
                    label: "i-1".to_string(),
                    value: "i-1".to_string(),
                    description: "stopped".to_string(),
                }],
            })
            .with_component(ReplyComponent::Buttons(vec![ActionButton {
                id: ComponentId::Lifecycle(LifecycleAction::Start, session),
                label: "Start Server".to_string(),
                disabled: false,
            }]));

        let (_, options) = reply.select_menu().unwrap();
        assert_eq!(options.len(), 1);
        assert_eq!(reply.buttons()[0].label, "Start Server");
    }
}
