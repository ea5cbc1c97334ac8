pub mod aggregate;
pub mod clock;
pub mod completion;
pub mod config;
pub mod error;
pub mod http;
pub mod model;
pub mod occupancy;
pub mod report;
pub mod repo;
pub mod store;
pub mod workbook;

use std::path::Path;

use anyhow::Context;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::info;

use config::Config;
use http::AppState;
use store::SqliteRepository;

/// Opens the record store, builds the router and serves until Ctrl+C or
/// SIGTERM.
pub async fn serve(config: Config) -> anyhow::Result<()> {
    let store = SqliteRepository::open(Path::new(&config.database_path))
        .with_context(|| format!("failed to open record store at {}", config.database_path))?;
    let app = http::build_router(AppState::new(store));

    let address = format!("0.0.0.0:{}", config.port);
    let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("failed to bind {address}"))?;
    info!("Attendance portal listening on {address}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("Server shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c().await.expect("Failed to install Ctrl+C handler");
        info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
        info!("Received terminate signal, shutting down");
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
