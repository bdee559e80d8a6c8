use crate::features::command_registry::service::CommandRegistryService;
use crate::shared::error::BotResult;
use crate::shared::types::{default_command_definitions, CommandDefinition};
use std::sync::Arc;
use tracing::{error, info, warn};

/// Startup/shutdown entry points for command registration
pub struct CommandRegistryController {
    service: Arc<CommandRegistryService>,
    definitions: Vec<CommandDefinition>,
}

impl CommandRegistryController {
    pub fn new(service: Arc<CommandRegistryService>) -> Self {
        Self::with_definitions(service, default_command_definitions())
    }

    pub fn with_definitions(
        service: Arc<CommandRegistryService>,
        definitions: Vec<CommandDefinition>,
    ) -> Self {
        Self {
            service,
            definitions,
        }
    }

    /// Register every definition. A partial registration is rolled back
    /// before the error is returned.
    pub async fn register(&self) -> BotResult<()> {
        info!(count = self.definitions.len(), "Registering application commands");
        if let Err(e) = self.service.register(&self.definitions).await {
            let created = self.service.registered_count().await;
            if created > 0 {
                warn!(created, error = %e, "Registration failed, retracting created commands");
                if let Err(rollback) = self.service.retract().await {
                    error!(error = %rollback, "Failed to roll back partial registration");
                }
            }
            return Err(e.into());
        }
        Ok(())
    }

    pub async fn retract(&self) -> BotResult<()> {
        info!("Retracting application commands");
        self.service.retract().await?;
        Ok(())
    }
}
