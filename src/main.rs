use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use stt_relay::{create_router, AppState, Config, Credentials, GoogleRecognizer};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Real-time speech-to-text relay between browsers and Google Speech-to-Text
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Config file (extension optional, missing file is fine)
    #[arg(long, default_value = "config/stt-relay")]
    config: String,

    /// Listening port, overrides PORT and the config file
    #[arg(long)]
    port: Option<u16>,

    /// Log filter used when RUST_LOG is not set
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level)),
        )
        .init();

    let mut cfg = Config::load(&args.config)?;
    if let Some(port) = args.port {
        cfg.service.http.port = port;
    }

    info!("STT relay v{}", env!("CARGO_PKG_VERSION"));
    info!("Loaded config: {}", cfg.service.name);

    // Nothing works without credentials, so refuse to start rather than
    // accept connections that can only fail.
    let credentials = match Credentials::resolve(&cfg.speech) {
        Ok(credentials) => credentials,
        Err(e) => {
            error!("Failed to resolve Google credentials: {}", e);
            std::process::exit(1);
        }
    };

    let recognizer = GoogleRecognizer::new(&cfg.speech, credentials)
        .context("Failed to initialize speech recognizer")?;

    let state = AppState::new(
        Arc::new(recognizer),
        Duration::from_millis(cfg.session.close_grace_ms),
    );
    let app = create_router(state);

    let addr = format!("{}:{}", cfg.service.http.bind, cfg.service.http.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!("STT server running on port {}", cfg.service.http.port);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    info!("STT server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
