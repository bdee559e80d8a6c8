use crate::shared::error::ConfigError;
use clap::Parser;
use std::fmt;
use std::net::SocketAddr;
use std::time::Duration;

pub const DEFAULT_DISCORD_API_BASE: &str = "https://discord.com/api/v10";

/// Command-line surface of the bot. Every option can also come from the
/// environment; required options are validated by [`BotConfig::try_from`]
/// so that a missing value surfaces as a [`ConfigError`].
#[derive(Parser, Debug, Clone)]
#[command(name = "fleetbot", version, about = "Start and stop game servers from Discord")]
pub struct CliArgs {
    /// The id of the aws user
    #[arg(long = "id", env = "FLEETBOT_AWS_ACCESS_KEY_ID", hide_env_values = true)]
    pub id: Option<String>,

    /// The secret of the aws user
    #[arg(long, env = "FLEETBOT_AWS_SECRET_ACCESS_KEY", hide_env_values = true)]
    pub secret: Option<String>,

    /// AWS region; falls back to the SDK's default resolution
    #[arg(long, env = "FLEETBOT_AWS_REGION")]
    pub region: Option<String>,

    /// The app id of the discord bot
    #[arg(long, env = "FLEETBOT_APP_ID")]
    pub app: Option<String>,

    /// The guild id of the discord bot
    #[arg(long, env = "FLEETBOT_GUILD_ID")]
    pub guild: Option<String>,

    /// The channel id for the bot responses
    #[arg(long, env = "FLEETBOT_CHANNEL_ID")]
    pub channel: Option<String>,

    /// The role id used for commands
    #[arg(long, env = "FLEETBOT_ROLE_ID")]
    pub role: Option<String>,

    /// The token of the bot user
    #[arg(long, env = "FLEETBOT_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Hex-encoded Ed25519 public key of the Discord application
    #[arg(long, env = "FLEETBOT_PUBLIC_KEY")]
    pub public_key: Option<String>,

    /// Address the interactions endpoint listens on
    #[arg(long, env = "FLEETBOT_LISTEN_ADDR", default_value = "0.0.0.0:8080")]
    pub listen: String,

    /// Seconds an unfinished command flow stays usable
    #[arg(long, env = "FLEETBOT_SESSION_TTL_SECS", default_value_t = 900)]
    pub session_ttl_secs: u64,

    #[arg(long, env = "FLEETBOT_DISCORD_API_BASE", default_value = DEFAULT_DISCORD_API_BASE)]
    pub discord_api_base: String,
}

#[derive(Clone)]
pub struct AwsSettings {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub region: Option<String>,
}

impl fmt::Debug for AwsSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AwsSettings")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .field("region", &self.region)
            .finish()
    }
}

#[derive(Clone)]
pub struct DiscordSettings {
    pub app_id: String,
    pub guild_id: String,
    pub token: String,
    pub public_key: [u8; 32],
    pub api_base: String,
}

impl fmt::Debug for DiscordSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DiscordSettings")
            .field("app_id", &self.app_id)
            .field("guild_id", &self.guild_id)
            .field("token", &"<redacted>")
            .field("api_base", &self.api_base)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct BotConfig {
    pub aws: AwsSettings,
    pub discord: DiscordSettings,
    pub control_channel_id: String,
    pub control_role_id: String,
    pub listen_addr: SocketAddr,
    pub session_ttl: Duration,
}

fn required(value: Option<String>, option: &'static str) -> Result<String, ConfigError> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or(ConfigError::Missing(option))
}

fn parse_public_key(raw: &str) -> Result<[u8; 32], ConfigError> {
    let bytes = hex::decode(raw).map_err(|e| ConfigError::Invalid {
        option: "--public-key",
        reason: e.to_string(),
    })?;

    <[u8; 32]>::try_from(bytes.as_slice()).map_err(|_| ConfigError::Invalid {
        option: "--public-key",
        reason: format!("expected 32 bytes, got {}", bytes.len()),
    })
}

impl TryFrom<CliArgs> for BotConfig {
    type Error = ConfigError;

    fn try_from(args: CliArgs) -> Result<Self, Self::Error> {
        let public_key = parse_public_key(&required(args.public_key, "--public-key")?)?;

        let listen_addr = args
            .listen
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::Invalid {
                option: "--listen",
                reason: e.to_string(),
            })?;

        if args.session_ttl_secs == 0 {
            return Err(ConfigError::Invalid {
                option: "--session-ttl-secs",
                reason: "must be greater than zero".to_string(),
            });
        }

        Ok(Self {
            aws: AwsSettings {
                access_key_id: required(args.id, "--id")?,
                secret_access_key: required(args.secret, "--secret")?,
                region: args.region.filter(|r| !r.trim().is_empty()),
            },
            discord: DiscordSettings {
                app_id: required(args.app, "--app")?,
                guild_id: required(args.guild, "--guild")?,
                token: required(args.token, "--token")?,
                public_key,
                api_base: args.discord_api_base.trim_end_matches('/').to_string(),
            },
            control_channel_id: required(args.channel, "--channel")?,
            control_role_id: required(args.role, "--role")?,
            listen_addr,
            session_ttl: Duration::from_secs(args.session_ttl_secs),
        })
    }
}
