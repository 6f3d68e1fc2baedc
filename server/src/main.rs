//! Campus Gate - Main Entry Point
//!
//! Serves permission contexts and feature checks for the campus platform.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use tracing::{error, info};

use campus_gate::{api, config, permissions::HttpPrivilegeSource};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "campus_gate=debug,tower_http=debug".into()),
        )
        .json()
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = config::Config::from_env()?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "Starting Campus Gate"
    );

    let source = HttpPrivilegeSource::new(&config.api_base_url, config.api_timeout())?;
    info!(api = %config.api_base_url, "Platform API client initialized");

    let state = api::AppState::new(config.clone(), Arc::new(source));
    let app = api::create_router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    info!(address = %config.bind_address, "Server listening");

    // Graceful shutdown handler
    let shutdown_signal = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for shutdown signal");
            std::future::pending::<()>().await;
        }
        info!("Received shutdown signal, cleaning up...");
    };

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal)
    .await?;

    info!("Server shutdown complete");

    Ok(())
}
