use clap::Parser;
use fleetbot_control_plane::features::authorization::service::AuthorizationGate;
use fleetbot_control_plane::features::command_registry::controller::CommandRegistryController;
use fleetbot_control_plane::features::command_registry::repo::discord::DiscordCommandRepository;
use fleetbot_control_plane::features::command_registry::service::CommandRegistryService;
use fleetbot_control_plane::features::instance_directory::repo::ec2::Ec2FleetRepository;
use fleetbot_control_plane::features::instance_directory::service::InstanceDirectoryService;
use fleetbot_control_plane::features::interaction::controller::InteractionController;
use fleetbot_control_plane::features::interaction::repo::InMemorySessionRepository;
use fleetbot_control_plane::features::interaction::service::InteractionService;
use fleetbot_control_plane::features::lifecycle::service::LifecycleService;
use fleetbot_control_plane::features::observability::controller::ObservabilityController;
use fleetbot_control_plane::server::BotServer;
use fleetbot_control_plane::shared::config::{BotConfig, CliArgs};
use fleetbot_control_plane::shared::signature::SignatureVerifier;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("fleetbot_control_plane=info,info")),
        )
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = match BotConfig::try_from(args) {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "Invalid configuration");
            return Err(e.into());
        }
    };
    info!(
        listen = %config.listen_addr,
        guild = %config.discord.guild_id,
        region = ?config.aws.region,
        session_ttl_secs = config.session_ttl.as_secs(),
        "Starting fleetbot"
    );

    let fleet = Arc::new(Ec2FleetRepository::connect(&config.aws).await);
    let metrics = ObservabilityController::build()?;

    let registry = CommandRegistryController::new(Arc::new(CommandRegistryService::new(
        Arc::new(DiscordCommandRepository::new(&config.discord)?),
    )));
    registry.register().await?;

    let sessions = Arc::new(InMemorySessionRepository::new(config.session_ttl));
    let service = InteractionService::new(
        Arc::new(InstanceDirectoryService::new(fleet.clone())),
        Arc::new(LifecycleService::new(fleet)),
        AuthorizationGate::new(
            config.control_channel_id.clone(),
            config.control_role_id.clone(),
        ),
        sessions,
        metrics.clone(),
    );
    let interactions = Arc::new(InteractionController::new(Arc::new(service), metrics.clone()));
    let eviction = interactions
        .clone()
        .spawn_session_eviction((config.session_ttl / 4).max(Duration::from_secs(1)));

    let app = BotServer::new(
        SignatureVerifier::new(config.discord.public_key),
        interactions,
        metrics,
    )
    .router();

    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;
    info!(addr = %config.listen_addr, "Interactions endpoint listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    eviction.abort();
    info!("Shutting down");

    if let Err(e) = registry.retract().await {
        error!(error = %e, "Failed to retract application commands");
        return Err(e.into());
    }

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
