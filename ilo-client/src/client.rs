//! Bounded-concurrency Redfish client.

use std::future::Future;
use std::sync::Arc;

use futures::future::join_all;
use serde::de::DeserializeOwned;
use tokio::sync::Semaphore;
use tokio::time::Instant;
use tracing::{Instrument, debug, field, info_span};

use crate::error::{ClientError, Result};
use crate::resources::Collection;
use crate::target::Target;
use crate::transport::Transport;

/// Default cap on concurrent controller calls per scrape.
pub const DEFAULT_MAX_CONCURRENT_REQUESTS: usize = 4;

/// Process-wide client settings, read-only after startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientOptions {
    /// Maximum number of calls in flight against one controller.
    pub max_concurrent_requests: usize,
    /// Skip TLS certificate validation.
    pub insecure: bool,
    /// Log request paths and response statuses.
    pub debug: bool,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            max_concurrent_requests: DEFAULT_MAX_CONCURRENT_REQUESTS,
            insecure: false,
            debug: false,
        }
    }
}

/// Client bound to one [`Target`] for the duration of one scrape.
///
/// Every call made through the client, from any collector, draws a slot
/// from the same semaphore, so the controller never sees more than
/// `max_concurrent_requests` requests from a single scrape.
pub struct Client {
    target: Target,
    transport: Arc<dyn Transport>,
    limiter: Semaphore,
    max_concurrent_requests: usize,
    deadline: Option<Instant>,
    debug: bool,
}

impl Client {
    /// Create a client using the given transport.
    pub fn with_transport(
        target: Target,
        options: &ClientOptions,
        transport: Arc<dyn Transport>,
    ) -> Self {
        let max_concurrent_requests = options.max_concurrent_requests.max(1);

        Self {
            target,
            transport,
            limiter: Semaphore::new(max_concurrent_requests),
            max_concurrent_requests,
            deadline: None,
            debug: options.debug,
        }
    }

    /// Bound every call (slot wait and response) by `deadline`.
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// The controller host this client talks to.
    pub fn host(&self) -> &str {
        &self.target.host
    }

    pub fn max_concurrent_requests(&self) -> usize {
        self.max_concurrent_requests
    }

    /// Number of calls that could start right now without waiting.
    pub fn available_slots(&self) -> usize {
        self.limiter.available_permits()
    }

    /// Reject every call still waiting for a slot, and every later call.
    pub fn close(&self) {
        self.limiter.close();
    }

    /// Fetch and decode one resource.
    pub async fn call<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let span = info_span!(
            "redfish_call",
            host = %self.target.host,
            path = %path,
            status = field::Empty,
        );

        self.call_inner(path).instrument(span).await
    }

    async fn call_inner<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        // Held until this function returns or its future is dropped.
        let _permit = self
            .bounded(path, self.limiter.acquire())
            .await?
            .map_err(|_| ClientError::Cancelled {
                path: path.to_string(),
            })?;

        if self.debug {
            debug!(path, "Requesting resource");
        }

        let url = self.target.url_for(path);
        let response = self
            .bounded(path, self.transport.get(&url, &self.target))
            .await?
            .map_err(|source| ClientError::Transport {
                path: path.to_string(),
                source,
            })?;

        tracing::Span::current().record("status", response.status);

        if self.debug {
            debug!(path, status = response.status, "Received response");
        }

        if !(200..300).contains(&response.status) {
            return Err(ClientError::Status {
                path: path.to_string(),
                status: response.status,
            });
        }

        serde_json::from_slice(&response.body).map_err(|source| ClientError::Decode {
            path: path.to_string(),
            source,
        })
    }

    /// Fetch a collection and then every member of it.
    ///
    /// Members are fetched concurrently through the shared limiter. The outer
    /// error covers the collection itself; each member carries its own
    /// result so one bad member does not hide the others.
    pub async fn call_collection<T: DeserializeOwned>(
        &self,
        path: &str,
    ) -> Result<Vec<Result<T>>> {
        let collection: Collection = self.call(path).await?;

        let calls = collection
            .members
            .iter()
            .map(|member| self.call::<T>(&member.odata_id));

        Ok(join_all(calls).await)
    }

    async fn bounded<F: Future>(&self, path: &str, fut: F) -> Result<F::Output> {
        match self.deadline {
            Some(deadline) => tokio::time::timeout_at(deadline, fut).await.map_err(|_| {
                ClientError::DeadlineExceeded {
                    path: path.to_string(),
                }
            }),
            None => Ok(fut.await),
        }
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("target", &self.target)
            .field("max_concurrent_requests", &self.max_concurrent_requests)
            .field("deadline", &self.deadline)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockTransport;
    use crate::resources::manager::{MANAGER_PATH, Manager};
    use std::time::Duration;

    fn client_with(mock: Arc<MockTransport>, max: usize) -> Client {
        let options = ClientOptions {
            max_concurrent_requests: max,
            ..Default::default()
        };
        Client::with_transport(Target::new("ilo01", "admin", "secret"), &options, mock)
    }

    #[tokio::test]
    async fn test_call_decodes_resource() {
        let mock = Arc::new(MockTransport::new().with_json(
            MANAGER_PATH,
            r#"{"Model": "iLO 5", "FirmwareVersion": "iLO 5 v2.72"}"#,
        ));
        let client = client_with(mock.clone(), 4);

        let manager: Manager = client.call(MANAGER_PATH).await.unwrap();

        assert_eq!(manager.model, "iLO 5");
        assert_eq!(mock.calls(), 1);
        assert_eq!(client.available_slots(), 4);
    }

    #[tokio::test]
    async fn test_transport_failure() {
        let mock = Arc::new(MockTransport::new().with_failure(MANAGER_PATH, "connection refused"));
        let client = client_with(mock, 4);

        let err = client.call::<Manager>(MANAGER_PATH).await.unwrap_err();

        assert!(matches!(err, ClientError::Transport { .. }));
        assert_eq!(client.available_slots(), 4);
    }

    #[tokio::test]
    async fn test_non_success_status() {
        let mock = Arc::new(MockTransport::new().with_status(MANAGER_PATH, 401));
        let client = client_with(mock, 4);

        let err = client.call::<Manager>(MANAGER_PATH).await.unwrap_err();

        assert!(matches!(err, ClientError::Status { status: 401, .. }));
    }

    #[tokio::test]
    async fn test_unknown_path_is_not_found() {
        let client = client_with(Arc::new(MockTransport::new()), 4);

        let err = client.call::<Manager>("/Nope/").await.unwrap_err();

        assert!(matches!(err, ClientError::Status { status: 404, .. }));
    }

    #[tokio::test]
    async fn test_decode_failure() {
        let mock = Arc::new(MockTransport::new().with_json(MANAGER_PATH, "not json"));
        let client = client_with(mock, 4);

        let err = client.call::<Manager>(MANAGER_PATH).await.unwrap_err();

        assert!(matches!(err, ClientError::Decode { .. }));
    }

    #[tokio::test]
    async fn test_deadline_exceeded() {
        let mock = Arc::new(
            MockTransport::new()
                .with_json(MANAGER_PATH, "{}")
                .with_delay(Duration::from_secs(5)),
        );
        let client = client_with(mock, 4)
            .with_deadline(Instant::now() + Duration::from_millis(20));

        let err = client.call::<Manager>(MANAGER_PATH).await.unwrap_err();

        assert!(matches!(err, ClientError::DeadlineExceeded { .. }));
        assert_eq!(client.available_slots(), 4);
    }

    #[tokio::test]
    async fn test_closed_limiter_cancels() {
        let mock = Arc::new(MockTransport::new().with_json(MANAGER_PATH, "{}"));
        let client = client_with(mock.clone(), 4);
        client.close();

        let err = client.call::<Manager>(MANAGER_PATH).await.unwrap_err();

        assert!(matches!(err, ClientError::Cancelled { .. }));
        assert_eq!(mock.calls(), 0);
    }

    #[tokio::test]
    async fn test_concurrency_cap() {
        let mut mock = MockTransport::new().with_delay(Duration::from_millis(20));
        for i in 0..10 {
            mock = mock.with_json(&format!("/Item/{}/", i), "{}");
        }
        let mock = Arc::new(mock);
        let client = client_with(mock.clone(), 3);

        let calls = (0..10).map(|i| {
            let client = &client;
            async move { client.call::<serde_json::Value>(&format!("/Item/{}/", i)).await }
        });
        let results = join_all(calls).await;

        assert!(results.iter().all(|r| r.is_ok()));
        assert_eq!(mock.calls(), 10);
        assert!(mock.max_in_flight() <= 3);
        assert_eq!(client.available_slots(), 3);
    }

    #[tokio::test]
    async fn test_dropped_call_releases_slot() {
        let mock = Arc::new(
            MockTransport::new()
                .with_json(MANAGER_PATH, "{}")
                .with_delay(Duration::from_secs(5)),
        );
        let client = client_with(mock, 1);

        let pending = client.call::<Manager>(MANAGER_PATH);
        let _ = tokio::time::timeout(Duration::from_millis(20), pending).await;

        assert_eq!(client.available_slots(), 1);
    }

    #[tokio::test]
    async fn test_zero_cap_is_clamped() {
        let client = client_with(Arc::new(MockTransport::new()), 0);
        assert_eq!(client.max_concurrent_requests(), 1);
    }

    #[tokio::test]
    async fn test_call_collection_scopes_member_errors() {
        let mock = Arc::new(
            MockTransport::new()
                .with_json(
                    "/Systems/1/Memory/",
                    r#"{"Members": [
                        {"@odata.id": "/redfish/v1/Systems/1/Memory/proc1dimm1/"},
                        {"@odata.id": "/redfish/v1/Systems/1/Memory/proc1dimm2/"}
                    ]}"#,
                )
                .with_json("/Systems/1/Memory/proc1dimm1/", r#"{"Name": "proc1dimm1"}"#)
                .with_status("/Systems/1/Memory/proc1dimm2/", 500),
        );
        let client = client_with(mock.clone(), 2);

        let members = client
            .call_collection::<serde_json::Value>("/Systems/1/Memory/")
            .await
            .unwrap();

        assert_eq!(members.len(), 2);
        assert!(members[0].is_ok());
        assert!(members[1].is_err());
        assert_eq!(mock.calls(), 3);
    }

    #[test]
    fn test_debug_hides_password() {
        let client = client_with(Arc::new(MockTransport::new()), 1);
        assert!(!format!("{:?}", client).contains("secret"));
    }
}
