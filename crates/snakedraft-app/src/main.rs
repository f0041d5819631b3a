// Snake draft service entry point.
//
// Startup sequence:
// 1. Initialize tracing (log to file)
// 2. Load config
// 3. Open database
// 4. Load the catalog
// 5. Restore the draft engine from the database
// 6. Create mpsc channels
// 7. Spawn WebSocket server task
// 8. Run the app loop until Ctrl+C
// 9. Cleanup on exit

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use tokio::sync::{mpsc, oneshot};
use tracing::{error, info};

use snakedraft_app::app;
use snakedraft_app::catalog_file;
use snakedraft_app::config;
use snakedraft_app::db;
use snakedraft_app::ws_server;
use snakedraft_core::DraftEngine;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Initialize tracing
    init_tracing()?;
    info!("Snake draft service starting up");

    // 2. Load config
    let config = config::load_config().context("failed to load configuration")?;
    info!(
        "Config loaded: rounds {}..={}, board size {}, {} admins",
        config.draft.min_rounds,
        config.draft.max_rounds,
        config.draft.board_size,
        config.draft.admins.len()
    );

    // 3. Open database
    let db_path = config.resolved_db_path();
    if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let db_path_str = db_path
        .to_str()
        .with_context(|| format!("database path is not UTF-8: {}", db_path.display()))?;
    let db = Arc::new(db::Database::open(db_path_str).context("failed to open database")?);
    info!("Database opened at {}", db_path.display());

    // 4. Load the catalog
    let catalog = catalog_file::load_catalog(Path::new(&config.catalog_path))
        .context("failed to load catalog")?;

    // 5. Restore the draft engine
    let engine = DraftEngine::open(catalog, config.rules(), db)
        .context("failed to restore draft state")?;
    if engine.state().is_active() {
        info!(
            "Resuming draft {} at pick {} of {}",
            engine.state().draft_id(),
            engine.state().current_pick() + 1,
            engine.state().total_picks()
        );
    } else {
        info!("No active draft; waiting for START_DRAFT");
    }
    let app_state = app::AppState::new(engine, PathBuf::from(&config.export_dir));

    // 6. Create mpsc channels
    let (ws_tx, ws_rx) = mpsc::channel(256);
    let (out_tx, out_rx) = mpsc::channel(256);
    let (shutdown_tx, shutdown_rx) = oneshot::channel();

    // 7. Spawn WebSocket server task
    let ws_port = config.ws_port;
    let ws_handle = tokio::spawn(async move {
        match ws_server::TungsteniteListener::bind(ws_port).await {
            Ok(listener) => {
                if let Err(e) = ws_server::run(listener, ws_tx, out_rx).await {
                    error!("WebSocket server error: {}", e);
                }
            }
            Err(e) => {
                error!("Failed to bind WebSocket server on port {}: {}", ws_port, e);
            }
        }
    });

    // 8. Run the app loop until Ctrl+C
    let app_handle = tokio::spawn(async move {
        if let Err(e) = app::run(ws_rx, out_tx, app_state, shutdown_rx).await {
            error!("Application loop error: {}", e);
        }
    });
    info!("Application ready. WebSocket server listening on 127.0.0.1:{}", ws_port);

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for Ctrl+C")?;
    info!("Ctrl+C received, shutting down");
    let _ = shutdown_tx.send(());

    // 9. Cleanup: wait for app task to finish (with timeout)
    let _ = tokio::time::timeout(std::time::Duration::from_secs(5), app_handle).await;

    // The WebSocket server loops until its channels close.
    ws_handle.abort();

    info!("Snake draft service shut down cleanly");
    Ok(())
}

/// Filter used when `RUST_LOG` is unset.
const DEFAULT_LOG_FILTER: &str = "snakedraft=info,snakedraft_app=info,snakedraft_core=info,warn";

/// Initialize tracing to log to a file under `logs/`.
fn init_tracing() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let log_dir = std::env::current_dir()?.join("logs");
    std::fs::create_dir_all(&log_dir)?;

    let log_file = std::fs::File::create(log_dir.join("snakedraft.log"))?;

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .with_writer(log_file)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    Ok(())
}
