use super::CommandRepository;
use crate::shared::config::DiscordSettings;
use crate::shared::error::RegistrationError;
use crate::shared::types::{CommandDefinition, CommandDescriptor, CommandScope};
use async_trait::async_trait;
use fleetbot_proto::{
    ApplicationCommand, ApplicationCommandOption, CommandOptionType, CreateApplicationCommand,
};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::{Client, Response};
use std::time::Duration;
use tracing::debug;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Discord REST v10 application command endpoints
pub struct DiscordCommandRepository {
    client: Client,
    api_base: String,
    app_id: String,
    guild_id: String,
}

impl DiscordCommandRepository {
    pub fn new(settings: &DiscordSettings) -> Result<Self, RegistrationError> {
        let mut auth = HeaderValue::from_str(&format!("Bot {}", settings.token))
            .map_err(|e| RegistrationError::Client(format!("invalid bot token: {e}")))?;
        auth.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth);

        let client = Client::builder()
            .default_headers(headers)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| RegistrationError::Client(format!("failed to build http client: {e}")))?;

        Ok(Self {
            client,
            api_base: settings.api_base.clone(),
            app_id: settings.app_id.clone(),
            guild_id: settings.guild_id.clone(),
        })
    }

    fn commands_url(&self, scope: CommandScope) -> String {
        match scope {
            CommandScope::Workspace => format!(
                "{}/applications/{}/guilds/{}/commands",
                self.api_base, self.app_id, self.guild_id
            ),
            CommandScope::Global => {
                format!("{}/applications/{}/commands", self.api_base, self.app_id)
            }
        }
    }

    fn command_url(&self, scope: CommandScope, command_id: &str) -> String {
        format!("{}/{}", self.commands_url(scope), command_id)
    }
}

pub fn create_payload(definition: &CommandDefinition) -> CreateApplicationCommand {
    CreateApplicationCommand {
        name: definition.name.clone(),
        description: definition.description.clone(),
        options: definition
            .subcommands
            .iter()
            .map(|sub| ApplicationCommandOption {
                kind: CommandOptionType::SubCommand,
                name: sub.name.clone(),
                description: sub.description.clone(),
            })
            .collect(),
    }
}

/// Turn a non-2xx response into its status line and body text
async fn check_status(response: Response) -> Result<Response, String> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(format!("{status}: {body}"))
}

#[async_trait]
impl CommandRepository for DiscordCommandRepository {
    async fn list_commands(
        &self,
        scope: CommandScope,
    ) -> Result<Vec<CommandDescriptor>, RegistrationError> {
        let list_error = |reason: String| RegistrationError::List {
            scope: scope.to_string(),
            reason,
        };

        let response = self
            .client
            .get(self.commands_url(scope))
            .send()
            .await
            .map_err(|e| list_error(e.to_string()))?;
        let commands: Vec<ApplicationCommand> = check_status(response)
            .await
            .map_err(list_error)?
            .json()
            .await
            .map_err(|e| list_error(e.to_string()))?;

        debug!(scope = %scope, count = commands.len(), "Listed application commands");
        Ok(commands
            .into_iter()
            .map(|c| CommandDescriptor::new(c.id, c.name))
            .collect())
    }

    async fn create_command(
        &self,
        definition: &CommandDefinition,
    ) -> Result<CommandDescriptor, RegistrationError> {
        let declare_error = |reason: String| RegistrationError::Declare {
            name: definition.name.clone(),
            reason,
        };

        let response = self
            .client
            .post(self.commands_url(definition.scope))
            .json(&create_payload(definition))
            .send()
            .await
            .map_err(|e| declare_error(e.to_string()))?;
        let created: ApplicationCommand = check_status(response)
            .await
            .map_err(declare_error)?
            .json()
            .await
            .map_err(|e| declare_error(e.to_string()))?;

        Ok(CommandDescriptor::new(created.id, created.name))
    }

    async fn delete_command(
        &self,
        scope: CommandScope,
        descriptor: &CommandDescriptor,
    ) -> Result<(), RegistrationError> {
        let delete_error = |reason: String| RegistrationError::Delete {
            name: descriptor.name.clone(),
            scope: scope.to_string(),
            reason,
        };

        let response = self
            .client
            .delete(self.command_url(scope, &descriptor.id))
            .send()
            .await
            .map_err(|e| delete_error(e.to_string()))?;
        check_status(response).await.map_err(delete_error)?;

        Ok(())
    }
}
