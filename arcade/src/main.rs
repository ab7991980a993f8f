//! Arcade Main Entry Point
//!
//! Runs the import scheduler until Ctrl-C.

use arcade::telemetry::init_tracing;
use arcade::{ArcadeError, Dependencies, Settings};
use dotenv::dotenv;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<(), ArcadeError> {
    // Load environment variables from .env file
    dotenv().ok();

    init_tracing()?;

    info!("Starting arcade");

    let settings = Settings::from_env().inspect_err(|e| {
        error!(error = %e, "Invalid configuration");
    })?;

    let deps = match Dependencies::new(&settings).await {
        Ok(deps) => {
            info!("Dependencies initialized successfully");
            deps
        }
        Err(e) => {
            error!(error = %e, "Failed to initialize dependencies");
            return Err(e);
        }
    };

    let cancel = CancellationToken::new();
    let shutdown = cancel.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Received shutdown signal");
                shutdown.cancel();
            }
            Err(e) => error!(error = %e, "Failed to listen for shutdown signal"),
        }
    });

    deps.scheduler.run(cancel).await;
    deps.audit.flush().await;

    info!("Arcade stopped");
    Ok(())
}
