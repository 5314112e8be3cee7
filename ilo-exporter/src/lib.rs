//! Multi-target Prometheus exporter for HP iLO controllers.
//!
//! Every scrape names one controller with the `host` query parameter and
//! carries HTTP Basic credentials that are forwarded to the controller's
//! Redfish API. Nothing is cached between scrapes: each request builds its
//! own client, registry and collectors and drops them when it completes.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐     ┌──────────────────┐     ┌─────────────────┐
//! │  Prometheus  │────>│   HTTP handler   │────>│    Registry     │
//! │ ?host=<ilo>  │     │ (auth, deadline) │     │ (per scrape)    │
//! └──────────────┘     └──────────────────┘     └────────┬────────┘
//!                                                        │ join_all
//!                                  ┌─────────────────────┼──────────────────┐
//!                                  v                     v                  v
//!                             chassis               system              manager
//!                                  └──────── Client (semaphore, N) ─────────┘
//!                                                        │
//!                                                        v
//!                                                  iLO Redfish API
//! ```
//!
//! # Usage
//!
//! ```bash
//! ilo-exporter --config ilo-exporter.json5
//! curl -u admin:secret 'http://localhost:9545/metrics_chassis?host=10.0.0.5'
//! ```
//!
//! # Configuration
//!
//! See [`config::ExporterConfig`] for configuration options.

pub mod collector;
pub mod config;
pub mod http;
pub mod registry;

pub use collector::{ChassisCollector, Collection, Collector, ManagerCollector, SystemCollector};
pub use config::{ConfigError, ExporterConfig, LogFormat, LoggingConfig};
pub use http::{AppState, HttpServer, create_router};
pub use registry::{Descriptor, Registry, Sample};

/// Initialize tracing with the given configuration.
///
/// `RUST_LOG` takes precedence over `config.level`.
pub fn init_tracing(config: &LoggingConfig) -> Result<(), ConfigError> {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    match config.format {
        LogFormat::Text => tracing_subscriber::registry()
            .with(fmt::layer())
            .with(filter)
            .try_init()
            .map_err(|e| ConfigError::Logging(e.to_string()))?,
        LogFormat::Json => tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(filter)
            .try_init()
            .map_err(|e| ConfigError::Logging(e.to_string()))?,
    }

    Ok(())
}
