//! papershelf server entry point.
//!
//! Configuration comes from the environment (see `config`); logging is
//! controlled with `RUST_LOG`.

use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use papershelf::{config::Config, error::Result, router, AppState};

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("papershelf=info,tower_http=info")),
        )
        .init();

    if let Err(e) = run().await {
        tracing::error!(error = %e, "server exited with an error");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let config = Config::from_env();
    let bind_addr = config.bind_addr.clone();
    let state = Arc::new(AppState::new(config)?);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!(
        addr = %bind_addr,
        data_dir = %state.config.data_dir.display(),
        "papershelf listening"
    );

    axum::serve(listener, router(Arc::clone(&state)))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("shutting down");
    state.shutdown()
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
}
