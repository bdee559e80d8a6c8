pub mod discord;

use crate::shared::error::RegistrationError;
use crate::shared::types::{CommandDefinition, CommandDescriptor, CommandScope};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Chat-platform command API
#[async_trait]
pub trait CommandRepository: Send + Sync {
    async fn list_commands(
        &self,
        scope: CommandScope,
    ) -> Result<Vec<CommandDescriptor>, RegistrationError>;

    /// Create or overwrite a command; the platform upserts by name
    async fn create_command(
        &self,
        definition: &CommandDefinition,
    ) -> Result<CommandDescriptor, RegistrationError>;

    async fn delete_command(
        &self,
        scope: CommandScope,
        descriptor: &CommandDescriptor,
    ) -> Result<(), RegistrationError>;
}

#[derive(Default)]
struct CommandState {
    commands: HashMap<CommandScope, Vec<CommandDescriptor>>,
    next_id: u64,
    deleted: Vec<(CommandScope, String)>,
    failing_lists: HashSet<CommandScope>,
    failing_creates: HashSet<String>,
    failing_deletes: HashSet<String>,
}

/// In-memory command store with failure injection, used by tests
#[derive(Clone, Default)]
pub struct InMemoryCommandRepository {
    state: Arc<RwLock<CommandState>>,
}

impl InMemoryCommandRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a command that exists before the bot starts
    pub async fn insert_existing(&self, scope: CommandScope, descriptor: CommandDescriptor) {
        let mut state = self.state.write().await;
        state.commands.entry(scope).or_default().push(descriptor);
    }

    pub async fn fail_list(&self, scope: CommandScope) {
        self.state.write().await.failing_lists.insert(scope);
    }

    pub async fn fail_create(&self, name: &str) {
        self.state.write().await.failing_creates.insert(name.to_string());
    }

    pub async fn fail_delete(&self, name: &str) {
        self.state.write().await.failing_deletes.insert(name.to_string());
    }

    pub async fn commands(&self, scope: CommandScope) -> Vec<CommandDescriptor> {
        let state = self.state.read().await;
        state.commands.get(&scope).cloned().unwrap_or_default()
    }

    /// Every delete that reached the store, in order
    pub async fn deleted(&self) -> Vec<(CommandScope, String)> {
        self.state.read().await.deleted.clone()
    }
}

#[async_trait]
impl CommandRepository for InMemoryCommandRepository {
    async fn list_commands(
        &self,
        scope: CommandScope,
    ) -> Result<Vec<CommandDescriptor>, RegistrationError> {
        let state = self.state.read().await;
        if state.failing_lists.contains(&scope) {
            return Err(RegistrationError::List {
                scope: scope.to_string(),
                reason: "list rejected".to_string(),
            });
        }
        Ok(state.commands.get(&scope).cloned().unwrap_or_default())
    }

    async fn create_command(
        &self,
        definition: &CommandDefinition,
    ) -> Result<CommandDescriptor, RegistrationError> {
        let mut state = self.state.write().await;
        if state.failing_creates.contains(&definition.name) {
            return Err(RegistrationError::Declare {
                name: definition.name.clone(),
                reason: "create rejected".to_string(),
            });
        }

        let scoped = state.commands.entry(definition.scope).or_default();
        if let Some(existing) = scoped.iter().find(|c| c.name == definition.name) {
            return Ok(existing.clone());
        }

        state.next_id += 1;
        let descriptor = CommandDescriptor::new(format!("cmd-{}", state.next_id), &definition.name);
        state
            .commands
            .entry(definition.scope)
            .or_default()
            .push(descriptor.clone());
        Ok(descriptor)
    }

    async fn delete_command(
        &self,
        scope: CommandScope,
        descriptor: &CommandDescriptor,
    ) -> Result<(), RegistrationError> {
        let mut state = self.state.write().await;
        state.deleted.push((scope, descriptor.id.clone()));

        if state.failing_deletes.contains(&descriptor.name) {
            return Err(RegistrationError::Delete {
                name: descriptor.name.clone(),
                scope: scope.to_string(),
                reason: "delete rejected".to_string(),
            });
        }

        let scoped = state.commands.entry(scope).or_default();
        let before = scoped.len();
        scoped.retain(|c| c.id != descriptor.id);
        if scoped.len() == before {
            return Err(RegistrationError::Delete {
                name: descriptor.name.clone(),
                scope: scope.to_string(),
                reason: "unknown command".to_string(),
            });
        }
        Ok(())
    }
}
