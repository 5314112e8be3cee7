//! Redfish client for HP iLO management controllers.
//!
//! This crate provides the pieces the exporter uses to talk to one
//! controller during one scrape:
//!
//! - [`target`] - the controller address and credentials (`Target`)
//! - [`client`] - bounded-concurrency client with per-call tracing spans
//! - [`transport`] - the HTTP seam (`Transport`, `HttpTransport`)
//! - [`resources`] - typed Redfish payloads (chassis, system, manager)
//! - [`health`] - Redfish health mapping (`OK` = 0, `Warning` = 1, `Critical` = 2)
//! - [`mock`] - in-memory transport for tests
//! - [`error`] - error types

pub mod client;
pub mod error;
pub mod health;
pub mod mock;
pub mod resources;
pub mod target;
pub mod transport;

pub use client::{Client, ClientOptions, DEFAULT_MAX_CONCURRENT_REQUESTS};
pub use error::{ClientError, Result};
pub use health::{Health, HealthError, Status};
pub use target::Target;
pub use transport::{
    HttpTransport, Response, Transport, TransportError, TransportFactory, http_factory,
};
