//! In-memory controller for tests.
//!
//! Routes are keyed by resource path relative to the service root
//! (`/Systems/1/`). Every call is counted and logged with its start and end
//! instants so tests can check concurrency and ordering.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::time::Instant;

use crate::client::ClientOptions;
use crate::error::ClientError;
use crate::target::{SERVICE_ROOT, Target};
use crate::transport::{Response, Transport, TransportError, TransportFactory};

#[derive(Debug, Clone)]
enum Route {
    Json(String),
    Status(u16),
    Fail(String),
}

/// One observed call.
#[derive(Debug, Clone)]
pub struct CallRecord {
    pub path: String,
    pub username: String,
    pub started: Instant,
    pub finished: Instant,
}

/// A scripted [`Transport`].
#[derive(Default)]
pub struct MockTransport {
    routes: HashMap<String, Route>,
    delays: HashMap<String, Duration>,
    delay: Duration,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    records: Mutex<Vec<CallRecord>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `path` with 200 and `body`.
    pub fn with_json(mut self, path: &str, body: &str) -> Self {
        self.routes
            .insert(path.to_string(), Route::Json(body.to_string()));
        self
    }

    /// Answer `path` with an empty body and `status`.
    pub fn with_status(mut self, path: &str, status: u16) -> Self {
        self.routes.insert(path.to_string(), Route::Status(status));
        self
    }

    /// Fail `path` with a connection error.
    pub fn with_failure(mut self, path: &str, message: &str) -> Self {
        self.routes
            .insert(path.to_string(), Route::Fail(message.to_string()));
        self
    }

    /// Delay every response by `delay`.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Delay responses for `path` only.
    pub fn with_path_delay(mut self, path: &str, delay: Duration) -> Self {
        self.delays.insert(path.to_string(), delay);
        self
    }

    /// Total number of calls received.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Highest number of calls observed in flight at once.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    /// Completed calls in completion order.
    pub fn records(&self) -> Vec<CallRecord> {
        self.records.lock().clone()
    }

    /// Factory handing out this transport for every scrape.
    pub fn factory(self: &Arc<Self>) -> TransportFactory {
        let mock = Arc::clone(self);
        Arc::new(move |_: &ClientOptions| Ok::<_, ClientError>(mock.clone() as Arc<dyn Transport>))
    }

    fn route_key(url: &str) -> String {
        match url.find(SERVICE_ROOT) {
            Some(pos) => url[pos + SERVICE_ROOT.len()..].to_string(),
            None => url.to_string(),
        }
    }
}

struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn get(&self, url: &str, target: &Target) -> Result<Response, TransportError> {
        let started = Instant::now();
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        let _guard = InFlight(&self.in_flight);

        let path = Self::route_key(url);
        let delay = self.delays.get(&path).copied().unwrap_or(self.delay);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        self.records.lock().push(CallRecord {
            path: path.clone(),
            username: target.username.clone(),
            started,
            finished: Instant::now(),
        });

        match self.routes.get(&path) {
            Some(Route::Json(body)) => Ok(Response::ok(body.clone())),
            Some(Route::Status(status)) => Ok(Response::status(*status)),
            Some(Route::Fail(message)) => Err(Box::new(std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                message.clone(),
            ))),
            None => Ok(Response::status(404)),
        }
    }
}
