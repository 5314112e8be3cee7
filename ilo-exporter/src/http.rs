//! HTTP dispatcher: one scrape per request.

use std::net::SocketAddr;
use std::string::FromUtf8Error;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::extract::{Query, State};
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE, WWW_AUTHENTICATE};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum_server::tls_rustls::RustlsConfig;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use ilo_client::{Client, Target, TransportFactory};
use thiserror::Error;
use tokio::sync::watch;
use tokio::time::Instant;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info};

use crate::collector::{ChassisCollector, ManagerCollector, SharedClient, SystemCollector};
use crate::config::{ExporterConfig, TlsConfig};
use crate::registry::{Registry, RegistryError};

/// Content type of a successful scrape.
pub const OPENMETRICS_CONTENT_TYPE: &str =
    "application/openmetrics-text; version=1.0.0; charset=utf-8";

/// Header Prometheus uses to announce its scrape timeout.
pub const SCRAPE_TIMEOUT_HEADER: &str = "x-prometheus-scrape-timeout-seconds";

/// Subtracted from the announced timeout to leave room for rendering.
const SCRAPE_TIMEOUT_OFFSET: Duration = Duration::from_millis(500);

const BASIC_CHALLENGE: &str = "Basic realm=\"ilo\"";

/// Rejected `Authorization` headers.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("missing Authorization header")]
    Missing,

    #[error("Authorization header is not Basic")]
    NotBasic,

    #[error("invalid base64 credentials: {0}")]
    Encoding(#[from] base64::DecodeError),

    #[error("credentials are not UTF-8: {0}")]
    Utf8(#[from] FromUtf8Error),

    #[error("credentials lack a ':' separator")]
    MissingColon,
}

/// Extract `(username, password)` from an HTTP Basic `Authorization` header.
pub fn basic_credentials(headers: &HeaderMap) -> Result<(String, String), AuthError> {
    let value = headers
        .get(AUTHORIZATION)
        .ok_or(AuthError::Missing)?
        .to_str()
        .map_err(|_| AuthError::NotBasic)?;

    let (scheme, encoded) = value.trim().split_once(' ').ok_or(AuthError::NotBasic)?;
    if !scheme.eq_ignore_ascii_case("basic") {
        return Err(AuthError::NotBasic);
    }

    let decoded = String::from_utf8(STANDARD.decode(encoded.trim())?)?;
    let (username, password) = decoded.split_once(':').ok_or(AuthError::MissingColon)?;

    Ok((username.to_string(), password.to_string()))
}

/// Time budget for one scrape.
///
/// The configured timeout applies unless Prometheus announced a shorter one.
pub fn scrape_timeout(headers: &HeaderMap, configured: Duration) -> Duration {
    headers
        .get(SCRAPE_TIMEOUT_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<f64>().ok())
        .filter(|secs| secs.is_finite() && *secs > 0.0)
        .map(|secs| Duration::from_secs_f64(secs).saturating_sub(SCRAPE_TIMEOUT_OFFSET))
        .filter(|announced| !announced.is_zero())
        .map_or(configured, |announced| announced.min(configured))
}

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    config: Arc<ExporterConfig>,
    factory: TransportFactory,
    shutdown: watch::Receiver<bool>,
}

impl AppState {
    /// State whose scrapes are never interrupted by a shutdown signal.
    pub fn new(config: Arc<ExporterConfig>, factory: TransportFactory) -> Self {
        let (_, shutdown) = watch::channel(false);
        Self {
            config,
            factory,
            shutdown,
        }
    }

    /// Abort in-flight scrapes once `shutdown` turns true.
    pub fn with_shutdown(mut self, shutdown: watch::Receiver<bool>) -> Self {
        self.shutdown = shutdown;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Endpoint {
    System,
    Chassis,
}

/// First `host` query parameter, as repeated keys are allowed.
fn first_host(params: &[(String, String)]) -> Option<&str> {
    params
        .iter()
        .find(|(key, _)| key == "host")
        .map(|(_, value)| value.as_str())
}

/// Create the HTTP router.
pub fn create_router(state: AppState) -> Router {
    let system_path = state.config.web.system_path.clone();
    let chassis_path = state.config.web.chassis_path.clone();

    Router::new()
        .route(&system_path, get(system_handler))
        .route(&chassis_path, get(chassis_handler))
        .route("/health", get(health_handler))
        .route("/", get(index_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn system_handler(
    State(state): State<AppState>,
    Query(params): Query<Vec<(String, String)>>,
    headers: HeaderMap,
) -> Response {
    scrape(&state, Endpoint::System, first_host(&params), &headers).await
}

async fn chassis_handler(
    State(state): State<AppState>,
    Query(params): Query<Vec<(String, String)>>,
    headers: HeaderMap,
) -> Response {
    scrape(&state, Endpoint::Chassis, first_host(&params), &headers).await
}

async fn scrape(
    state: &AppState,
    endpoint: Endpoint,
    host: Option<&str>,
    headers: &HeaderMap,
) -> Response {
    let Some(host) = host.filter(|h| !h.is_empty()) else {
        return (StatusCode::BAD_REQUEST, "no host defined").into_response();
    };

    let (username, password) = match basic_credentials(headers) {
        Ok(credentials) => credentials,
        Err(e) => {
            debug!(host = %host, error = %e, "Rejecting scrape without valid credentials");
            return (
                StatusCode::UNAUTHORIZED,
                [(WWW_AUTHENTICATE, BASIC_CHALLENGE)],
                "unauthorized",
            )
                .into_response();
        }
    };

    let options = state.config.api.client_options();
    let transport = match (state.factory)(&options) {
        Ok(transport) => transport,
        Err(e) => {
            error!(host = %host, error = %e, "Failed to create transport");
            return internal_error(e.to_string());
        }
    };

    let deadline = Instant::now() + scrape_timeout(headers, state.config.api.scrape_timeout());
    let target = Target::new(host, username, password);
    let client: SharedClient =
        Arc::new(Client::with_transport(target, &options, transport).with_deadline(deadline));

    let registry = match build_registry(endpoint, &client) {
        Ok(registry) => registry,
        Err(e) => {
            error!(host = %client.host(), error = %e, "Failed to register collectors");
            return internal_error(e.to_string());
        }
    };

    let rendered = tokio::select! {
        rendered = registry.render() => rendered,
        _ = shutdown_signalled(state.shutdown.clone()) => {
            client.close();
            info!(host = %client.host(), "Scrape aborted by shutdown");
            return (StatusCode::SERVICE_UNAVAILABLE, "shutting down").into_response();
        }
    };

    match rendered {
        Ok(body) => (StatusCode::OK, [(CONTENT_TYPE, OPENMETRICS_CONTENT_TYPE)], body).into_response(),
        Err(e) => {
            error!(host = %client.host(), error = %e, "Failed to render metrics");
            internal_error(e.to_string())
        }
    }
}

fn build_registry(endpoint: Endpoint, client: &SharedClient) -> Result<Registry, RegistryError> {
    let mut registry = Registry::new();

    match endpoint {
        Endpoint::Chassis => {
            registry.register(Box::new(ChassisCollector::new(client.clone())))?;
        }
        Endpoint::System => {
            registry.register(Box::new(SystemCollector::new(client.clone())))?;
            registry.register(Box::new(ManagerCollector::new(client.clone())))?;
        }
    }

    Ok(registry)
}

fn internal_error(message: String) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        [(CONTENT_TYPE, "text/plain; charset=utf-8")],
        message,
    )
        .into_response()
}

/// Handler for the /health endpoint.
async fn health_handler() -> Response {
    (StatusCode::OK, "healthy\n").into_response()
}

/// Landing page with example scrape links.
async fn index_handler(State(state): State<AppState>) -> Html<String> {
    let web = &state.config.web;
    Html(format!(
        r#"<html>
<head><title>iLO Exporter</title></head>
<body>
<h1>iLO Exporter</h1>
<p>Metrics are fetched on demand from the controller named by the <code>host</code> parameter, using the Basic credentials of the scrape.</p>
<ul>
<li><a href="{system}?host=ilo.example.com">{system}?host=ilo.example.com</a></li>
<li><a href="{chassis}?host=ilo.example.com">{chassis}?host=ilo.example.com</a></li>
</ul>
</body>
</html>
"#,
        system = web.system_path,
        chassis = web.chassis_path,
    ))
}

/// HTTP server configuration.
pub struct HttpServer {
    state: AppState,
    listen_addr: SocketAddr,
    tls: TlsConfig,
}

impl HttpServer {
    /// Create a new HTTP server.
    pub fn new(state: AppState, listen_addr: SocketAddr, tls: TlsConfig) -> Self {
        Self {
            state,
            listen_addr,
            tls,
        }
    }

    /// Run the HTTP server until the shutdown signal is received.
    pub async fn run(self, shutdown: watch::Receiver<bool>) -> anyhow::Result<()> {
        let router = create_router(self.state.clone());

        info!(
            addr = %self.listen_addr,
            system_path = %self.state.config.web.system_path,
            chassis_path = %self.state.config.web.chassis_path,
            tls = self.tls.enabled,
            "Starting HTTP server"
        );

        if self.tls.enabled {
            self.serve_tls(router, shutdown).await
        } else {
            self.serve_plain(router, shutdown).await
        }
    }

    async fn serve_plain(&self, router: Router, shutdown: watch::Receiver<bool>) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(self.listen_addr)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to bind to {}: {}", self.listen_addr, e))?;

        info!(addr = %self.listen_addr, "HTTP server listening");

        axum::serve(listener, router)
            .with_graceful_shutdown(wait_for_shutdown(shutdown))
            .await
            .map_err(|e| anyhow::anyhow!("HTTP server error: {}", e))?;

        info!("HTTP server stopped");
        Ok(())
    }

    async fn serve_tls(&self, router: Router, shutdown: watch::Receiver<bool>) -> anyhow::Result<()> {
        let (Some(cert_file), Some(key_file)) = (&self.tls.cert_file, &self.tls.key_file) else {
            anyhow::bail!("TLS is enabled but cert_file or key_file is missing");
        };

        let _ = rustls::crypto::ring::default_provider().install_default();

        let tls_config = RustlsConfig::from_pem_file(cert_file, key_file)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to load TLS certificate: {}", e))?;

        let handle = axum_server::Handle::new();
        let shutdown_handle = handle.clone();
        tokio::spawn(async move {
            wait_for_shutdown(shutdown).await;
            shutdown_handle.graceful_shutdown(Some(Duration::from_secs(10)));
        });

        info!(addr = %self.listen_addr, "HTTPS server listening");

        axum_server::bind_rustls(self.listen_addr, tls_config)
            .handle(handle)
            .serve(router.into_make_service())
            .await
            .map_err(|e| anyhow::anyhow!("HTTPS server error: {}", e))?;

        info!("HTTPS server stopped");
        Ok(())
    }
}

/// Resolves once `shutdown` is true. Never resolves if the sender is gone
/// without signalling.
async fn shutdown_signalled(mut shutdown: watch::Receiver<bool>) {
    loop {
        if *shutdown.borrow_and_update() {
            return;
        }
        if shutdown.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

async fn wait_for_shutdown(mut shutdown: watch::Receiver<bool>) {
    loop {
        if shutdown.changed().await.is_err() {
            break;
        }
        if *shutdown.borrow() {
            break;
        }
    }
    info!("HTTP server shutting down");
}
