//! Scanlock - QR-code cross-device login server
//!
//! A browser displays a QR code carrying a one-time token; a phone scans it,
//! signs the token with its device key, and posts the signature here. The
//! server verifies it and wakes the browser's waiting long-poll.

use anyhow::{Context, Result};
use clap::Parser;
use scanlock_auth::{DeviceDirectory, TokenRegistry, Verifier};
use scanlock_core::Config;
use scanlock_server::{create_router, AppState};
use std::sync::Arc;
use tracing::{info, warn, Level};
use tracing_subscriber::EnvFilter;

/// Scanlock - sign in on one device by scanning from another
#[derive(Parser, Debug)]
#[command(name = "scanlock")]
#[command(version, about, long_about = None)]
struct Args {
    /// Address to bind the listener to
    #[arg(short, long, default_value = "127.0.0.1")]
    addr: String,

    /// Server port
    #[arg(short, long, default_value = "8080")]
    port: u16,

    /// Long-poll wait bound in seconds
    #[arg(long, default_value = "10")]
    poll_timeout: u64,

    /// Validity window in seconds for tokens no browser has polled yet
    #[arg(long, default_value = "60")]
    token_ttl: i64,

    /// Rendered QR code edge length in pixels
    #[arg(long, default_value = "200")]
    qr_size: u32,

    /// Path to the JSON file of trusted devices and their public keys
    #[arg(short, long)]
    devices: Option<String>,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = if args.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(false)
        .compact()
        .with_env_filter(EnvFilter::from_default_env().add_directive(log_level.into()))
        .finish();
    tracing::subscriber::set_global_default(subscriber).ok();

    info!("Scanlock v{}", env!("CARGO_PKG_VERSION"));

    let config = Config::new()
        .with_addr(args.addr)
        .with_port(args.port)
        .with_poll_timeout_secs(args.poll_timeout)
        .with_token_ttl_secs(args.token_ttl)
        .with_qr_size(args.qr_size);

    let directory = match &args.devices {
        Some(path) => DeviceDirectory::load(path)
            .with_context(|| format!("failed to load device directory from {}", path))?,
        None => {
            warn!("No device directory given; no device can approve a login");
            DeviceDirectory::new()
        }
    };

    let registry = Arc::new(TokenRegistry::new(config.token_ttl()));
    let verifier = Verifier::new(Arc::new(directory));
    let state = Arc::new(AppState::new(config.clone(), registry, verifier));

    let router = create_router(state);
    let listener = tokio::net::TcpListener::bind(config.listen_addr())
        .await
        .with_context(|| format!("failed to bind {}", config.listen_addr()))?;
    info!("Listening on http://{}", config.listen_addr());

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("Server stopped");
    Ok(())
}

/// Resolve when the process receives SIGINT or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.ok();
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received interrupt"),
        _ = terminate => info!("Received terminate"),
    }
}
