//! Huddle server: cascading, time-scoped access control for chats and files.
//!
//! Wires the store, byte storage and services together, verifies the
//! backends are healthy, then runs until a shutdown signal arrives.

use tokio::sync::{broadcast, watch};
use tracing_subscriber::{EnvFilter, fmt};

use huddle_core::config::AppConfig;
use huddle_core::error::AppError;
use huddle_core::events::DomainEvent;
use huddle_service::ServiceContainer;

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
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}

/// Load `config/default.toml`, the `HUDDLE_ENV` overlay and `HUDDLE__*` variables.
fn load_configuration() -> Result<AppConfig, AppError> {
    let env = std::env::var("HUDDLE_ENV").unwrap_or_else(|_| "development".to_string());
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

async fn run(config: AppConfig) -> Result<(), AppError> {
    tracing::info!("Starting Huddle v{}", env!("CARGO_PKG_VERSION"));

    // ── Step 1: Store, storage and services ──────────────────────
    let services = ServiceContainer::from_config(&config).await?;
    tracing::info!(
        store = services.store.backend(),
        storage = services.storage.provider().provider_type(),
        "Services initialized"
    );

    // ── Step 2: Health check ─────────────────────────────────────
    if !services.health_check().await {
        return Err(AppError::internal("Backend health check failed"));
    }

    // ── Step 3: Event log ────────────────────────────────────────
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let event_handle = tokio::spawn(log_events(services.events.subscribe(), shutdown_rx));

    tracing::info!("Huddle ready");

    // ── Step 4: Graceful shutdown ────────────────────────────────
    shutdown_signal().await;
    tracing::info!("Shutdown signal received, starting graceful shutdown...");
    let _ = shutdown_tx.send(true);

    let _ = tokio::time::timeout(std::time::Duration::from_secs(5), event_handle).await;
    services.shutdown().await;

    tracing::info!("Huddle shut down gracefully");
    Ok(())
}

/// Emit one debug line per domain event until shutdown.
async fn log_events(
    mut events: broadcast::Receiver<DomainEvent>,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            received = events.recv() => match received {
                Ok(event) => tracing::debug!(
                    event_id = %event.id,
                    chat_id = ?event.chat_id(),
                    actor_id = ?event.actor_id,
                    payload = ?event.payload,
                    "Domain event"
                ),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Event log lagged behind");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
            _ = shutdown.changed() => break,
        }
    }
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
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
                tracing::error!("Failed to install SIGTERM handler: {}", e);
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
