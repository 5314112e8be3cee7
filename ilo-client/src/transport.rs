//! HTTP transport used by [`Client`](crate::Client).
//!
//! The transport performs exactly one authenticated GET and reports the raw
//! status and body. Status checks, decoding, concurrency limiting and
//! deadlines all live in the client, so an in-memory transport can stand in
//! for the controller in tests.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::header::ACCEPT;

use crate::client::ClientOptions;
use crate::error::ClientError;
use crate::target::Target;

/// Boxed error returned by transports.
pub type TransportError = Box<dyn std::error::Error + Send + Sync>;

/// Raw controller response.
#[derive(Debug, Clone, Default)]
pub struct Response {
    pub status: u16,
    pub body: Vec<u8>,
}

impl Response {
    /// A 200 response with a JSON body.
    pub fn ok(body: impl Into<Vec<u8>>) -> Self {
        Self {
            status: 200,
            body: body.into(),
        }
    }

    /// A response with the given status and an empty body.
    pub fn status(status: u16) -> Self {
        Self {
            status,
            body: Vec::new(),
        }
    }
}

/// A single-request GET transport.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Fetch `url` using the credentials of `target`.
    async fn get(&self, url: &str, target: &Target) -> Result<Response, TransportError>;
}

/// Builds a transport for one scrape from the process-wide options.
pub type TransportFactory =
    Arc<dyn Fn(&ClientOptions) -> Result<Arc<dyn Transport>, ClientError> + Send + Sync>;

/// Factory producing a fresh [`HttpTransport`] per scrape.
pub fn http_factory() -> TransportFactory {
    Arc::new(|options: &ClientOptions| {
        let transport = HttpTransport::new(options.insecure)?;
        Ok(Arc::new(transport) as Arc<dyn Transport>)
    })
}

/// `reqwest`-backed transport using HTTP Basic authentication.
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Create a transport. With `insecure`, certificate validation is
    /// skipped (iLO ships self-signed certificates).
    pub fn new(insecure: bool) -> Result<Self, ClientError> {
        let client = reqwest::Client::builder()
            .danger_accept_invalid_certs(insecure)
            .build()
            .map_err(|e| ClientError::Build(e.to_string()))?;

        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(&self, url: &str, target: &Target) -> Result<Response, TransportError> {
        let response = self
            .client
            .get(url)
            .basic_auth(&target.username, Some(&target.password))
            .header(ACCEPT, "application/json")
            .send()
            .await?;

        let status = response.status().as_u16();
        let body = response.bytes().await?.to_vec();

        Ok(Response { status, body })
    }
}
