//! pageviews server
//!
//! - `/` : increments the visit counter and reports it
//! - config: optional `pageviews.yaml` + `DB_CONNECTION_URI` (required)
//! - startup order: config -> connect + ping -> bind; any failure exits before listening

use std::process::ExitCode;
use std::sync::Arc;

use tracing_subscriber::{fmt, EnvFilter};

use pageviews_core::counter::CounterStore;
use pageviews_core::error::{PageviewsError, Result};
use pageviews_server::{app_state::AppState, config, router, storage::MySqlCounterStore};

#[tokio::main]
async fn main() -> ExitCode {
    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(kind = e.kind().as_str(), error = %e, "pageviews-server exiting");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<()> {
    tracing::info!("pageviews-server starting up");

    let settings = config::load(|key| std::env::var(key).ok())?;

    let store = MySqlCounterStore::connect(&settings.database).await?;
    store.ping().await?;
    tracing::info!(target_db = %settings.database.describe(), "pinged database successfully");

    match store.current().await {
        Ok(hits) => tracing::info!(hits, "counter row found"),
        // not fatal: requests report it as a 500 until the row is repaired
        Err(e) => tracing::warn!(kind = e.kind().as_str(), error = %e, "counter row check failed"),
    }

    let state = AppState::new(Arc::new(store.clone()));
    let app = router::build_router(state);

    let listener = tokio::net::TcpListener::bind(settings.listen)
        .await
        .map_err(|e| PageviewsError::Internal(format!("bind {} failed: {e}", settings.listen)))?;
    tracing::info!(listen = %settings.listen, "pageviews-server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| PageviewsError::Internal(format!("server failed: {e}")))?;

    store.close().await;
    tracing::info!("pageviews-server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to install SIGTERM handler");
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
    tracing::info!("shutdown signal received");
}
