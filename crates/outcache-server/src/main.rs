//! # Outcache Server
//!
//! Main entry point for the Outcache demo server.

use outcache_config::ConfigLoader;
use outcache_core::{logging::init_logging, OutcacheResult};
use outcache_server::{app::AppBuilder, startup::print_banner};
use tokio::signal;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Application error: {}", e);
        eprintln!("outcache-server: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> OutcacheResult<()> {
    let config_loader = ConfigLoader::from_default_location()?;
    let config = config_loader.get();

    init_logging(
        Some(&config.observability.log_level),
        config.observability.log_format,
    )?;
    print_banner();

    info!("Starting Outcache Server...");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));
    info!("Environment: {}", config.app.environment);
    info!("Store backend: {}", config.cache.backend.as_str());

    let app = AppBuilder::new().with_config(config).build().await?;
    app.serve(shutdown_signal()).await?;

    info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received Ctrl+C, initiating graceful shutdown...");
        }
        () = terminate => {
            info!("Received terminate signal, initiating graceful shutdown...");
        }
    }
}
