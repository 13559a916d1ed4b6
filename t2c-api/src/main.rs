//! Trash2Cash API service - Main entry point
//!
//! Recycling rewards platform: appointment scheduling against recycling
//! centres, a points/tier loyalty engine, vouchers, notifications, and the
//! email/reminder side-effect pipeline.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use t2c_api::api::{self, AppState};
use t2c_api::email::EmailDispatcher;
use t2c_api::{effects, tasks};
use t2c_common::events::EventBus;

/// Command-line arguments for t2c-api
#[derive(Parser, Debug)]
#[command(name = "t2c-api")]
#[command(about = "Trash2Cash recycling rewards API service")]
#[command(version)]
struct Args {
    /// Port to listen on
    #[arg(short, long, default_value = "5810", env = "T2C_PORT")]
    port: u16,

    /// Path to the SQLite database file
    #[arg(short, long, default_value = "trash2cash.db", env = "T2C_DATABASE")]
    database: PathBuf,

    /// Path to the configuration file
    #[arg(short, long, env = "T2C_CONFIG")]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "t2c_api=debug,t2c_common=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    info!("Starting Trash2Cash API on port {}", args.port);

    let config = t2c_common::config::load_config(args.config.as_deref())
        .context("Failed to load configuration")?;

    let pool = t2c_common::db::init_database(&args.database)
        .await
        .context("Failed to initialize database")?;

    let bus = EventBus::new(1000);
    let email = EmailDispatcher::from_config(&config)
        .context("Failed to initialize email dispatcher")?;
    match &email {
        EmailDispatcher::Http(_) => info!("Email dispatcher: http gateway"),
        EmailDispatcher::Null => info!("Email dispatcher: logging only (no gateway configured)"),
    }

    let state = AppState {
        pool,
        bus,
        config: Arc::new(config),
        email,
    };

    // Side-effect pipeline and periodic sweeps
    effects::spawn(state.clone());
    tasks::spawn_sweeps(state.clone());

    let app = api::create_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], args.port));
    info!("Starting HTTP server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

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
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
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
