//! Housecall webhook ingestion service.
//!
//! Main entry point for the Housecall server. Initializes all subsystems
//! and coordinates graceful startup and shutdown.

use std::time::Duration;

use anyhow::{Context, Result};
use housecall_api::{AppState, Config};
use sqlx::postgres::PgPoolOptions;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration from defaults, config.toml, and environment
    let config = Config::load()?;

    init_tracing(&config);

    info!("Starting Housecall webhook ingestion service");
    info!(
        database_url = %config.database_url_masked(),
        host = %config.host,
        port = config.port,
        pipeline_version = %config.pipeline_version,
        "Configuration loaded"
    );

    // Create database connection pool
    let db_pool = create_database_pool(&config).await?;
    info!("Database connection pool established");

    // Ensure all tables exist
    housecall_core::storage::schema::ensure_schema(&db_pool)
        .await
        .context("Failed to bootstrap database schema")?;
    info!("Database schema verified");

    let state = AppState::new(&config, db_pool.clone())?;
    let addr = config.parse_server_addr()?;
    let request_timeout = Duration::from_secs(config.request_timeout);

    // Start HTTP server
    let server_handle = tokio::spawn(async move {
        if let Err(e) = housecall_api::start_server(state, addr, request_timeout).await {
            error!(error = %e, "Server failed");
        }
    });

    info!(%addr, "Housecall is ready to receive webhooks");

    // Wait for shutdown signal
    shutdown_signal().await;
    info!("Shutdown signal received, starting graceful shutdown");

    // Give in-flight requests time to complete
    tokio::select! {
        _ = tokio::time::sleep(Duration::from_secs(30)) => {
            info!("Shutdown grace period expired");
        }
        _ = server_handle => {
            info!("Server stopped");
        }
    }

    // Close database connections
    db_pool.close().await;
    info!("Database connections closed");

    info!("Housecall shutdown complete");
    Ok(())
}

/// Initializes tracing, preferring `RUST_LOG` over the configured level.
fn init_tracing(config: &Config) {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.rust_log))
        .or_else(|_| EnvFilter::try_new("info,housecall=debug,tower_http=debug"))
        .expect("Invalid log filter configuration");

    let fmt_layer = fmt::layer()
        .with_target(true)
        .with_thread_ids(true)
        .with_thread_names(true)
        .with_file(true)
        .with_line_number(true);

    tracing_subscriber::registry().with(filter).with(fmt_layer).init();
}

/// Creates the database connection pool with retry logic.
async fn create_database_pool(config: &Config) -> Result<sqlx::PgPool> {
    let mut retries = 0;
    const MAX_RETRIES: u32 = 5;
    const RETRY_DELAY: Duration = Duration::from_secs(2);

    loop {
        match PgPoolOptions::new()
            .max_connections(config.database_max_connections)
            .min_connections(config.database_min_connections)
            .acquire_timeout(Duration::from_secs(config.database_connection_timeout))
            .idle_timeout(Duration::from_secs(config.database_idle_timeout))
            .max_lifetime(Duration::from_secs(config.database_max_lifetime))
            .connect(&config.database_url)
            .await
        {
            Ok(pool) => {
                // Verify connection works
                sqlx::query("SELECT 1")
                    .fetch_one(&pool)
                    .await
                    .context("Failed to verify database connection")?;

                return Ok(pool);
            },
            Err(_e) if retries < MAX_RETRIES => {
                retries += 1;
                info!(
                    attempt = retries,
                    max_retries = MAX_RETRIES,
                    "Database connection failed, retrying..."
                );
                tokio::time::sleep(RETRY_DELAY).await;
            },
            Err(e) => {
                return Err(e).context("Failed to create database connection pool after retries");
            },
        }
    }
}

/// Waits for shutdown signal (CTRL+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received CTRL+C signal");
        },
        _ = terminate => {
            info!("Received SIGTERM signal");
        },
    }
}
