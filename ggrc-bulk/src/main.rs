//! ggrc-bulk - GGRC bulk operations service
//!
//! Serves the bulk complete / verify / save endpoints and the attribute
//! matrix used by the bulk edit grid.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use ggrc_common::config::{parse_bind_address, Config, ConfigOverrides};
use ggrc_common::db::init_database;
use ggrc_bulk::{build_router, AppState};
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line arguments for ggrc-bulk
#[derive(Parser, Debug)]
#[command(name = "ggrc-bulk")]
#[command(about = "GGRC bulk operations service")]
#[command(version)]
struct Args {
    /// Path to TOML config file
    #[arg(short, long, env = "GGRC_CONFIG")]
    config: Option<PathBuf>,

    /// Path to SQLite database file
    #[arg(short, long, env = "GGRC_DATABASE")]
    database: Option<PathBuf>,

    /// Socket address to listen on
    #[arg(short, long, env = "GGRC_BIND")]
    bind: Option<String>,

    /// Base URL of the GGRC web application, used in notification links
    #[arg(long, env = "GGRC_APP_URL")]
    app_url: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = Config::load(ConfigOverrides {
        config_file: args.config,
        database_path: args.database,
        bind_address: args.bind,
        app_url: args.app_url,
    })
    .context("Failed to load configuration")?;

    // RUST_LOG wins over the configured level
    let default_filter = format!(
        "ggrc_bulk={0},ggrc_common={0},tower_http=info",
        config.log_level
    );
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting GGRC bulk operations (ggrc-bulk) v{}", env!("CARGO_PKG_VERSION"));
    info!("Database path: {}", config.database_path.display());
    info!("Application URL: {}", config.app_url);

    let addr = parse_bind_address(&config.bind_address)?;

    let pool = match init_database(&config.database_path).await {
        Ok(pool) => {
            info!("Database ready");
            pool
        }
        Err(e) => {
            error!("Failed to initialize database: {}", e);
            return Err(e.into());
        }
    };

    let state = AppState::new(pool, config.app_url.clone());
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;
    info!("ggrc-bulk listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
