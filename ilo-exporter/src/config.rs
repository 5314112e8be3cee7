//! Configuration for the iLO exporter.

use std::path::Path;
use std::time::Duration;

use ilo_client::{ClientOptions, DEFAULT_MAX_CONCURRENT_REQUESTS};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    Parse(#[from] json5::Error),
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Failed to initialize logging: {0}")]
    Logging(String),
}

/// Complete exporter configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExporterConfig {
    /// HTTP listener settings.
    #[serde(default)]
    pub web: WebConfig,

    /// Controller API settings.
    #[serde(default)]
    pub api: ApiConfig,

    /// TLS settings for the listener.
    #[serde(default)]
    pub tls: TlsConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// HTTP endpoint configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebConfig {
    /// Address to listen on (default: "0.0.0.0:9545").
    #[serde(default = "default_listen")]
    pub listen: String,

    /// Path serving system and manager metrics (default: "/metrics_system").
    #[serde(default = "default_system_path")]
    pub system_path: String,

    /// Path serving chassis metrics (default: "/metrics_chassis").
    #[serde(default = "default_chassis_path")]
    pub chassis_path: String,
}

fn default_listen() -> String {
    "0.0.0.0:9545".to_string()
}

fn default_system_path() -> String {
    "/metrics_system".to_string()
}

fn default_chassis_path() -> String {
    "/metrics_chassis".to_string()
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            system_path: default_system_path(),
            chassis_path: default_chassis_path(),
        }
    }
}

/// Controller API configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Maximum concurrent requests against one controller per scrape.
    #[serde(default = "default_max_concurrent_requests")]
    pub max_concurrent_requests: usize,

    /// Skip certificate validation when talking to controllers.
    #[serde(default)]
    pub insecure: bool,

    /// Log controller request paths and statuses.
    #[serde(default)]
    pub debug: bool,

    /// Upper bound for one scrape (seconds). A shorter
    /// `X-Prometheus-Scrape-Timeout-Seconds` header wins.
    #[serde(default = "default_scrape_timeout")]
    pub scrape_timeout_secs: u64,
}

fn default_max_concurrent_requests() -> usize {
    DEFAULT_MAX_CONCURRENT_REQUESTS
}

fn default_scrape_timeout() -> u64 {
    30
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            max_concurrent_requests: default_max_concurrent_requests(),
            insecure: false,
            debug: false,
            scrape_timeout_secs: default_scrape_timeout(),
        }
    }
}

impl ApiConfig {
    /// Client options handed to every per-scrape client.
    pub fn client_options(&self) -> ClientOptions {
        ClientOptions {
            max_concurrent_requests: self.max_concurrent_requests,
            insecure: self.insecure,
            debug: self.debug,
        }
    }

    pub fn scrape_timeout(&self) -> Duration {
        Duration::from_secs(self.scrape_timeout_secs)
    }
}

/// Listener TLS configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TlsConfig {
    /// Serve HTTPS instead of HTTP.
    #[serde(default)]
    pub enabled: bool,

    /// PEM certificate chain.
    #[serde(default)]
    pub cert_file: Option<String>,

    /// PEM private key.
    #[serde(default)]
    pub key_file: Option<String>,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log output format: "text" or "json".
    #[serde(default)]
    pub format: LogFormat,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl ExporterConfig {
    /// Load configuration from a JSON5 file.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse configuration from a JSON5 string.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: ExporterConfig = json5::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api.max_concurrent_requests == 0 {
            return Err(ConfigError::Validation(
                "max_concurrent_requests must be > 0".to_string(),
            ));
        }

        if self.api.scrape_timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "scrape_timeout_secs must be > 0".to_string(),
            ));
        }

        if self.web.listen.parse::<std::net::SocketAddr>().is_err() {
            return Err(ConfigError::Validation(format!(
                "Invalid listen address: {}",
                self.web.listen
            )));
        }

        for path in [&self.web.system_path, &self.web.chassis_path] {
            if !path.starts_with('/') {
                return Err(ConfigError::Validation(format!(
                    "Metrics path must start with /: {}",
                    path
                )));
            }
        }

        if self.web.system_path == self.web.chassis_path {
            return Err(ConfigError::Validation(
                "system_path and chassis_path must differ".to_string(),
            ));
        }

        if self.tls.enabled && (self.tls.cert_file.is_none() || self.tls.key_file.is_none()) {
            return Err(ConfigError::Validation(
                "tls.cert_file and tls.key_file are required when TLS is enabled".to_string(),
            ));
        }

        Ok(())
    }
}
