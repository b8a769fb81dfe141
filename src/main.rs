//! heartcheck: heart-disease risk survey server
//!
//! Main entry point for the web application.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use heartcheck::adapters::sanitize::RedactingMakeWriter;
use heartcheck::web::{build_router, AppState};
use heartcheck::Config;

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received, draining connections...");
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging.
    //
    // HEARTCHECK_LOG_MODE: "file" writes to HEARTCHECK_LOG_FILE, anything else
    // ("auto", "stdout") writes to stdout so container logs work.
    let log_mode = std::env::var("HEARTCHECK_LOG_MODE").unwrap_or_else(|_| "auto".to_string());

    let (writer, _guard) = if log_mode == "file" {
        let log_file = std::env::var("HEARTCHECK_LOG_FILE")
            .unwrap_or_else(|_| "data/heartcheck.log".to_string());

        if let Some(parent) = std::path::Path::new(&log_file).parent() {
            // Best-effort: the open below reports the real failure.
            let _ = std::fs::create_dir_all(parent);
        }

        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_file)
            .with_context(|| format!("opening log file {log_file}"))?;
        tracing_appender::non_blocking(file)
    } else {
        tracing_appender::non_blocking(std::io::stdout())
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(RedactingMakeWriter::new(writer)))
        .init();

    tracing::info!("Starting heartcheck...");

    let config_path = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("HEARTCHECK_CONFIG").ok())
        .map(PathBuf::from);
    let config = Config::load(config_path.as_deref()).context("loading configuration")?;

    let state = match AppState::from_config(&config) {
        Ok(state) => state,
        Err(e) => {
            tracing::error!("Startup failed: {}", e);
            return Err(e).context("initializing application state");
        }
    };

    let app = build_router(Arc::new(state));
    let listener = tokio::net::TcpListener::bind(&config.listen_addr)
        .await
        .with_context(|| format!("binding {}", config.listen_addr))?;
    tracing::info!("Listening on http://{}", config.listen_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("heartcheck shutdown complete.");
    Ok(())
}
