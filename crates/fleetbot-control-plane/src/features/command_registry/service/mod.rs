use crate::features::command_registry::repo::CommandRepository;
use crate::shared::error::RegistrationError;
use crate::shared::types::{CommandDefinition, CommandDescriptor, CommandScope};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};

/// Commands created by this process, per scope, in creation order
#[derive(Debug, Default)]
struct RegistrationSet {
    workspace: Vec<CommandDescriptor>,
    global: Vec<CommandDescriptor>,
}

impl RegistrationSet {
    fn scope_mut(&mut self, scope: CommandScope) -> &mut Vec<CommandDescriptor> {
        match scope {
            CommandScope::Workspace => &mut self.workspace,
            CommandScope::Global => &mut self.global,
        }
    }
}

pub struct CommandRegistryService {
    repo: Arc<dyn CommandRepository>,
    registered: Mutex<RegistrationSet>,
}

impl CommandRegistryService {
    pub fn new(repo: Arc<dyn CommandRepository>) -> Self {
        Self {
            repo,
            registered: Mutex::new(RegistrationSet::default()),
        }
    }

    /// Declare every definition in its scope and remember what was created
    pub async fn register(&self, definitions: &[CommandDefinition]) -> Result<(), RegistrationError> {
        for scope in [CommandScope::Workspace, CommandScope::Global] {
            let existing = self.repo.list_commands(scope).await?;
            info!(
                scope = %scope,
                count = existing.len(),
                names = ?existing.iter().map(|c| c.name.as_str()).collect::<Vec<_>>(),
                "Existing application commands"
            );
        }

        let mut registered = self.registered.lock().await;
        for definition in definitions {
            let descriptor = self.repo.create_command(definition).await?;
            info!(
                scope = %definition.scope,
                name = %descriptor.name,
                command_id = %descriptor.id,
                "Registered application command"
            );
            registered.scope_mut(definition.scope).push(descriptor);
        }

        Ok(())
    }

    /// Delete every command this process registered. Each scope stops at its
    /// first failure; the first failure overall is returned.
    pub async fn retract(&self) -> Result<(), RegistrationError> {
        let mut registered = self.registered.lock().await;
        let mut first_error = None;

        for scope in [CommandScope::Workspace, CommandScope::Global] {
            if let Err(e) = self.retract_scope(scope, registered.scope_mut(scope)).await {
                warn!(scope = %scope, error = %e, "Failed to retract application commands");
                first_error.get_or_insert(e);
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    async fn retract_scope(
        &self,
        scope: CommandScope,
        descriptors: &mut Vec<CommandDescriptor>,
    ) -> Result<(), RegistrationError> {
        while let Some(descriptor) = descriptors.first() {
            self.repo.delete_command(scope, descriptor).await?;
            info!(
                scope = %scope,
                name = %descriptor.name,
                command_id = %descriptor.id,
                "Retracted application command"
            );
            descriptors.remove(0);
        }
        Ok(())
    }

    pub async fn registered_count(&self) -> usize {
        let registered = self.registered.lock().await;
        registered.workspace.len() + registered.global.len()
    }
}
