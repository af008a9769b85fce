use std::sync::Arc;

use tracing::{debug, info, warn};
use tracing_subscriber::{filter::EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use logview360_lib::api::{self, ShellState};
use logview360_lib::notify::QueuedNotifier;
use logview360_lib::{Console, ConfigManager, VERSION};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if it exists
    let env_file_path = dotenvy::dotenv().ok();

    // Initialize the tracing subscriber for structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            if cfg!(debug_assertions) {
                "logview360_lib=debug,logview=debug,tower_http=debug,warn".into()
            } else {
                "logview360_lib=info,logview=info,warn".into()
            }
        }))
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .init();

    info!(version = VERSION, "LogView360 console starting");

    match env_file_path {
        Some(path) => info!("Loaded environment variables from {}", path.display()),
        None => debug!("No .env file found. Using existing environment variables."),
    };
    debug!("Set RUST_LOG to control log levels, e.g. RUST_LOG=logview360_lib::session=trace");

    let config_manager = ConfigManager::new().await?;
    info!(path = %config_manager.path().display(), "Configuration loaded");
    let config = config_manager.get_config().await;
    let port = config.server.port;

    let (notifier, inbox) = QueuedNotifier::new();
    let console = Console::build(config, Arc::new(notifier))?;

    if console.controller.restore().await {
        info!("Continuing previous session");
    }

    let state = ShellState::new(&console).with_inbox(inbox);
    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for shutdown signal");
            std::future::pending::<()>().await;
        }
        info!("Shutdown signal received, stopping server...");
    };

    api::serve(state, port, shutdown).await?;

    info!("Server shutdown complete");
    Ok(())
}
