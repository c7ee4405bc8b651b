//! Gatherly Server — session and presence API
//!
//! Main entry point that wires all crates together and starts the server.

use std::sync::Arc;

use tracing_subscriber::{EnvFilter, fmt};

use gatherly_api::AppState;
use gatherly_core::config::{AppConfig, StoreProvider};
use gatherly_core::error::AppError;
use gatherly_database::{AccountRepository, AccountStore, DatabasePool, MemoryAccountStore};

#[tokio::main]
async fn main() {
    let config = match load_configuration() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    init_logging(&config);

    if let Err(e) = run(config).await {
        tracing::error!(error = %e, "Server error");
        std::process::exit(1);
    }
}

/// Load configuration from files and environment
fn load_configuration() -> Result<AppConfig, AppError> {
    let env = std::env::var("GATHERLY_ENV").unwrap_or_else(|_| "development".to_string());
    AppConfig::load(&env)
}

/// Initialize tracing/logging
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_thread_ids(true)
                .init();
        }
        _ => {
            fmt()
                .pretty()
                .with_env_filter(filter)
                .with_target(true)
                .init();
        }
    }
}

/// Main server run function
async fn run(config: AppConfig) -> Result<(), AppError> {
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "Starting Gatherly");

    // ── Step 1: Signing secret ───────────────────────────────────
    // Every protected request would fail with 500 without it.
    gatherly_auth::CredentialCodec::new(&config.auth).ensure_configured()?;

    // ── Step 2: Account store ────────────────────────────────────
    let store = open_store(&config).await?;

    // ── Step 3: Build and start HTTP server ──────────────────────
    let addr = config.server.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| AppError::internal(format!("Failed to bind {addr}: {e}")))?;

    let state = AppState::new(config, store);
    let app = gatherly_api::build_app(state);

    gatherly_api::serve(listener, app, async {
        shutdown_signal().await;
        tracing::info!("Shutdown signal received, starting graceful shutdown...");
    })
    .await?;

    tracing::info!("Gatherly server shut down gracefully");
    Ok(())
}

async fn open_store(config: &AppConfig) -> Result<Arc<dyn AccountStore>, AppError> {
    match config.database.provider {
        StoreProvider::Postgres => {
            tracing::info!("Connecting to database...");
            let pool = DatabasePool::connect(&config.database).await?;

            tracing::info!("Running database migrations...");
            gatherly_database::migration::run_migrations(pool.pool()).await?;

            Ok(Arc::new(AccountRepository::new(pool.into_pool())))
        }
        StoreProvider::Memory => {
            tracing::warn!("Using in-memory account store; accounts are lost on restart");
            Ok(Arc::new(MemoryAccountStore::new()))
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
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
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
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
