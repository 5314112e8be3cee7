//! Resource collectors.
//!
//! Each collector owns the fixed descriptor set of one Redfish resource
//! domain and turns controller payloads into samples:
//!
//! - [`chassis::ChassisCollector`] - power supplies, consumption, temperatures, fans
//! - [`system::SystemCollector`] - power state, memory, processors, disks
//! - [`manager::ManagerCollector`] - the iLO itself
//!
//! Collectors are built per scrape around a shared [`Client`]. A failed
//! sub-resource is recorded in [`Collection::errors`] while the samples from
//! every other sub-resource are kept.

pub mod chassis;
pub mod manager;
pub mod system;

use std::sync::Arc;

use async_trait::async_trait;
use ilo_client::{Client, ClientError, HealthError, Status};
use thiserror::Error;

use crate::registry::{Descriptor, Sample};

pub use chassis::ChassisCollector;
pub use manager::ManagerCollector;
pub use system::SystemCollector;

/// Errors reported by a collector for one sub-resource or element.
#[derive(Debug, Error)]
pub enum CollectError {
    /// A controller call failed.
    #[error(transparent)]
    Client(#[from] ClientError),

    /// An element reported a health value outside the Redfish enumeration.
    #[error("Invalid health for {element}: {source}")]
    Health {
        element: String,
        #[source]
        source: HealthError,
    },

    /// A sample did not match its collector's descriptors.
    #[error("Inconsistent sample for {metric}: {reason}")]
    Inconsistent { metric: String, reason: String },
}

/// Samples and errors produced by one collection pass.
#[derive(Debug, Default)]
pub struct Collection {
    pub samples: Vec<Sample>,
    pub errors: Vec<CollectError>,
}

impl Collection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Emit a sample.
    pub fn push(&mut self, descriptor: &'static Descriptor, labels: &[&str], value: f64) {
        self.samples.push(Sample::new(descriptor, labels, value));
    }

    /// Emit a sample if the controller reported a value.
    pub fn push_opt(&mut self, descriptor: &'static Descriptor, labels: &[&str], value: Option<f64>) {
        if let Some(value) = value {
            self.push(descriptor, labels, value);
        }
    }

    /// Emit 1 or 0.
    pub fn push_bool(&mut self, descriptor: &'static Descriptor, labels: &[&str], value: bool) {
        self.push(descriptor, labels, if value { 1.0 } else { 0.0 });
    }

    /// Emit the health of `element`.
    ///
    /// Missing health emits nothing. An unknown value emits nothing and
    /// records an error for this element only.
    pub fn push_health(
        &mut self,
        descriptor: &'static Descriptor,
        labels: &[&str],
        element: &str,
        health: Result<Option<ilo_client::Health>, HealthError>,
    ) {
        match health {
            Ok(Some(health)) => self.push(descriptor, labels, health.as_value()),
            Ok(None) => {}
            Err(source) => self.errors.push(CollectError::Health {
                element: element.to_string(),
                source,
            }),
        }
    }

    /// Emit the `Health` field of a Redfish status object.
    pub fn push_status_health(
        &mut self,
        descriptor: &'static Descriptor,
        labels: &[&str],
        element: &str,
        status: &Status,
    ) {
        self.push_health(descriptor, labels, element, status.health());
    }

    /// Record a failed sub-resource.
    pub fn error(&mut self, error: impl Into<CollectError>) {
        self.errors.push(error.into());
    }

    /// Append the results of another pass.
    pub fn merge(&mut self, other: Collection) {
        self.samples.extend(other.samples);
        self.errors.extend(other.errors);
    }
}

/// A resource domain exported on scrape.
#[async_trait]
pub trait Collector: Send + Sync {
    /// Short name used in logs and exporter self-metrics.
    fn name(&self) -> &'static str;

    /// The fixed descriptor set. Must not touch the network.
    fn describe(&self) -> &'static [&'static Descriptor];

    /// Query the controller and map the results to samples.
    async fn collect(&self) -> Collection;
}

/// Shared handle to the per-scrape client.
pub type SharedClient = Arc<Client>;
