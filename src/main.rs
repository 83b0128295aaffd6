//! Veripeditus Game Server
//!
//! Serves the REST API and the web client, runs the spawner and keeps the
//! game state in the database when one is configured.

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tokio::signal;
use tokio::sync::broadcast;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use veripeditus_server::api;
use veripeditus_server::config::ServerConfig;
use veripeditus_server::control;
use veripeditus_server::games::builtin_registry;
use veripeditus_server::osm::overpass;
use veripeditus_server::persistence::StorePersistence;
use veripeditus_server::spawn;
use veripeditus_server::state::AppState;
use veripeditus_server::VERSION;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    init_logging();

    info!("Veripeditus server v{} starting", VERSION);

    let config = ServerConfig::load().await?;
    info!(
        "Configuration loaded from: {}",
        config.config_path.display()
    );

    let registry = builtin_registry();

    let state = if config.database.enabled {
        let persistence = StorePersistence::connect(&config.database)
            .await
            .context("connecting to the database")?;
        persistence.ensure_schema().await?;
        let state = AppState::with_persistence(config, registry, persistence)?;
        state.load().await.context("loading stored game state")?;
        state
    } else {
        warn!("No database configured, game state lives in memory only");
        AppState::new(config, registry)?
    };

    bootstrap(&state).await?;

    let background = [
        spawn_timer(&state),
        autosave(&state),
        token_cleanup(&state),
    ];

    let addr: SocketAddr = state
        .config
        .bind_address()
        .parse()
        .context("parsing bind address")?;
    let listener = TcpListener::bind(addr).await?;
    info!("HTTP server listening on: {}", addr);

    let router = api::create_router(state.clone());
    let shutdown_tx = state.shutdown_tx.clone();
    axum::serve(listener, router)
        .with_graceful_shutdown(wait_for_shutdown(shutdown_tx))
        .await?;

    info!("Shutting down server...");
    for handle in background.into_iter().flatten() {
        let _ = handle.await;
    }

    if let Err(e) = state.save().await {
        error!("Failed to save game state on shutdown: {}", e);
    }

    info!("Server shutdown complete");
    Ok(())
}

/// Initialize the logging/tracing system
fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,veripeditus_server=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_level(true)
        .init();
}

/// Prepare the store for the first request
async fn bootstrap(state: &AppState) -> Result<()> {
    control::sync_games(&state.store, &state.registry);
    control::add_default_data(&state.store, &state.registry, &state.config.auth)?;

    if let Some(path) = &state.config.accounts_file {
        control::load_accounts_file(&state.store, path, state.config.auth.bcrypt_cost)
            .await
            .with_context(|| format!("loading accounts from {}", path.display()))?;
    }

    if let Some(path) = &state.config.osm.import_file {
        let imported = overpass::import_file(&state.osm, path)
            .await
            .with_context(|| format!("importing OSM data from {}", path.display()))?;
        info!(nodes = imported, "OSM data imported");
    }

    if state.config.spawn.enabled {
        spawn::run(state).await;
    }

    Ok(())
}

/// Run the spawner periodically when an interval is configured
fn spawn_timer(state: &AppState) -> Option<tokio::task::JoinHandle<()>> {
    let secs = state.config.spawn.interval_secs;
    if !state.config.spawn.enabled || secs == 0 {
        return None;
    }

    let state = state.clone();
    let mut shutdown_rx = state.shutdown_tx.subscribe();
    Some(tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(secs));
        interval.tick().await;
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    spawn::run(&state).await;
                }
                _ = shutdown_rx.recv() => break,
            }
        }
    }))
}

/// Save the game state periodically when a database is configured
fn autosave(state: &AppState) -> Option<tokio::task::JoinHandle<()>> {
    let secs = state.config.autosave_interval_secs;
    if !state.has_persistence() || secs == 0 {
        return None;
    }

    let state = state.clone();
    let mut shutdown_rx = state.shutdown_tx.subscribe();
    Some(tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(secs));
        interval.tick().await;
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    match state.save().await {
                        Ok(()) => info!("Game state autosaved"),
                        Err(e) => error!("Autosave failed: {}", e),
                    }
                }
                _ = shutdown_rx.recv() => break,
            }
        }
    }))
}

/// Forget revoked tokens once they would have expired anyway
fn token_cleanup(state: &AppState) -> Option<tokio::task::JoinHandle<()>> {
    let state = state.clone();
    let mut shutdown_rx = state.shutdown_tx.subscribe();
    Some(tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(3600));
        loop {
            tokio::select! {
                _ = interval.tick() => state.tokens.purge_expired(),
                _ = shutdown_rx.recv() => break,
            }
        }
    }))
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn wait_for_shutdown(shutdown_tx: broadcast::Sender<()>) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
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
            info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        }
    }

    // Signal all tasks to shut down
    let _ = shutdown_tx.send(());
}
