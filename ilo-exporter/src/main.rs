//! Prometheus exporter for HP iLO controllers.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::sync::watch;
use tracing::{error, info};

use ilo_exporter::{AppState, ExporterConfig, HttpServer, init_tracing};

/// Prometheus exporter for HP iLO controllers.
#[derive(Parser, Debug)]
#[command(name = "ilo-exporter")]
#[command(about = "Export HP iLO Redfish data as Prometheus metrics")]
#[command(version)]
struct Args {
    /// Path to configuration file (JSON5 format).
    #[arg(short, long)]
    config: Option<String>,

    /// HTTP listen address (overrides config).
    #[arg(long)]
    listen: Option<String>,

    /// Log level (trace, debug, info, warn, error). Overrides config.
    #[arg(long)]
    log_level: Option<String>,

    /// Maximum concurrent requests per controller (overrides config).
    #[arg(long)]
    max_concurrent_requests: Option<usize>,

    /// Skip TLS certificate validation towards controllers.
    #[arg(long)]
    insecure: bool,

    /// Log every controller request and response status.
    #[arg(long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|e| anyhow::anyhow!("Failed to install default CryptoProvider: {e:?}"))?;

    // Load configuration
    let mut config = if let Some(config_path) = &args.config {
        ExporterConfig::load_from_file(config_path)?
    } else {
        ExporterConfig::default()
    };

    if let Some(listen) = args.listen {
        config.web.listen = listen;
    }
    if let Some(level) = args.log_level {
        config.logging.level = level;
    }
    if let Some(max) = args.max_concurrent_requests {
        config.api.max_concurrent_requests = max;
    }
    config.api.insecure |= args.insecure;
    config.api.debug |= args.debug;
    config.validate()?;

    init_tracing(&config.logging)?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        max_concurrent_requests = config.api.max_concurrent_requests,
        insecure = config.api.insecure,
        "Starting iLO exporter"
    );

    let listen_addr: SocketAddr = config
        .web
        .listen
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid listen address: {}", e))?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let tls = config.tls.clone();
    let state = AppState::new(Arc::new(config), ilo_client::http_factory())
        .with_shutdown(shutdown_rx.clone());
    let http_server = HttpServer::new(state, listen_addr, tls);

    let mut http_task = tokio::spawn(async move {
        if let Err(e) = http_server.run(shutdown_rx).await {
            error!("HTTP server error: {}", e);
        }
    });

    // Wait for shutdown signal
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down...");
        }
        _ = sigterm() => {
            info!("Received SIGTERM, shutting down...");
        }
        _ = &mut http_task => {
            return Err(anyhow::anyhow!("HTTP server exited unexpectedly"));
        }
    }

    shutdown_tx.send(true)?;

    let _ = tokio::time::timeout(Duration::from_secs(10), http_task).await;

    info!("Exporter stopped");
    Ok(())
}

async fn sigterm() {
    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    }
    #[cfg(not(unix))]
    {
        std::future::pending::<()>().await;
    }
}
