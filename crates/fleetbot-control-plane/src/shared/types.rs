use std::fmt;

pub use fleetbot_core::{
    ActionButton, AuthorizationContext, ComponentId, InstanceRecord, InstanceStatus,
    InteractionEvent, LifecycleAction, MenuOption, Reply, ReplyComponent, SessionId,
    FLEET_TAG_KEY, FLEET_TAG_VALUE, NAME_TAG_KEY, SERVER_COMMAND_NAME,
};

/// Tag filter selecting fleet members and their access rules
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FleetFilter {
    pub tag_key: String,
    pub tag_value: String,
}

impl FleetFilter {
    pub fn new(tag_key: impl Into<String>, tag_value: impl Into<String>) -> Self {
        Self {
            tag_key: tag_key.into(),
            tag_value: tag_value.into(),
        }
    }
}

impl Default for FleetFilter {
    fn default() -> Self {
        Self::new(FLEET_TAG_KEY, FLEET_TAG_VALUE)
    }
}

/// Visibility of an application command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandScope {
    /// Visible in the configured guild only
    Workspace,
    /// Visible everywhere the bot is installed
    Global,
}

impl CommandScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            CommandScope::Workspace => "workspace",
            CommandScope::Global => "global",
        }
    }
}

impl fmt::Display for CommandScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubcommandDefinition {
    pub name: String,
    pub description: String,
}

/// A command to declare at startup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandDefinition {
    pub name: String,
    pub description: String,
    pub subcommands: Vec<SubcommandDefinition>,
    pub scope: CommandScope,
}

/// A command as it exists on the chat platform
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandDescriptor {
    pub id: String,
    pub name: String,
}

impl CommandDescriptor {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// The command set the bot declares: `/server state` in the guild
pub fn default_command_definitions() -> Vec<CommandDefinition> {
    vec![CommandDefinition {
        name: SERVER_COMMAND_NAME.to_string(),
        description: "Contains commands relative to managing a minecraft server".to_string(),
        subcommands: vec![SubcommandDefinition {
            name: "state".to_string(),
            description: "Set the state of the server".to_string(),
        }],
        scope: CommandScope::Workspace,
    }]
}
