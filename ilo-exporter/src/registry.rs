//! Per-scrape registry and exposition rendering.
//!
//! A [`Registry`] lives for exactly one scrape. It runs every registered
//! collector concurrently, validates the samples against each collector's
//! descriptors, groups them by metric, and encodes the result with
//! `prometheus-client`. Collector errors never abort rendering; they are
//! logged and reported through the exporter self-metrics instead.

use std::collections::{BTreeMap, HashSet};
use std::time::{Duration, Instant};

use futures::future::join_all;
use prometheus_client::encoding::{DescriptorEncoder, EncodeMetric};
use prometheus_client::metrics::counter::ConstCounter;
use prometheus_client::metrics::MetricType;
use prometheus_client::metrics::gauge::ConstGauge;
use thiserror::Error;
use tracing::{Instrument, debug, error, info_span};

use crate::collector::{CollectError, Collector};

/// Prometheus value type of a metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    Counter,
    Gauge,
}

/// Static description of one metric.
#[derive(Debug, PartialEq, Eq)]
pub struct Descriptor {
    pub name: &'static str,
    pub help: &'static str,
    pub kind: MetricKind,
    pub labels: &'static [&'static str],
}

impl Descriptor {
    pub const fn gauge(
        name: &'static str,
        help: &'static str,
        labels: &'static [&'static str],
    ) -> Self {
        Self {
            name,
            help,
            kind: MetricKind::Gauge,
            labels,
        }
    }

    pub const fn counter(
        name: &'static str,
        help: &'static str,
        labels: &'static [&'static str],
    ) -> Self {
        Self {
            name,
            help,
            kind: MetricKind::Counter,
            labels,
        }
    }
}

/// One value of one metric.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub descriptor: &'static Descriptor,
    pub label_values: Vec<String>,
    pub value: f64,
}

impl Sample {
    pub fn new(descriptor: &'static Descriptor, label_values: &[&str], value: f64) -> Self {
        Self {
            descriptor,
            label_values: label_values.iter().map(|v| v.to_string()).collect(),
            value,
        }
    }

    /// Label name/value pairs in descriptor order.
    pub fn labels(&self) -> Vec<(String, String)> {
        self.descriptor
            .labels
            .iter()
            .zip(&self.label_values)
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    /// Value of the label `name`, if present.
    pub fn label(&self, name: &str) -> Option<&str> {
        self.descriptor
            .labels
            .iter()
            .position(|l| *l == name)
            .and_then(|i| self.label_values.get(i))
            .map(String::as_str)
    }
}

/// Registry errors.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Metric {name} is already registered")]
    Duplicate { name: &'static str },

    #[error("Failed to encode metrics: {0}")]
    Encode(#[from] std::fmt::Error),
}

/// Exporter self-metrics, one series per collector.
pub static COLLECTOR_SUCCESS: Descriptor = Descriptor::gauge(
    "ilo_exporter_collector_success",
    "Whether the collector finished without errors (1 = success, 0 = errors)",
    &["collector"],
);

pub static COLLECT_ERRORS: Descriptor = Descriptor::gauge(
    "ilo_exporter_collect_errors",
    "Number of errors the collector reported during this scrape",
    &["collector"],
);

pub static COLLECT_DURATION: Descriptor = Descriptor::gauge(
    "ilo_exporter_collect_duration_seconds",
    "Time the collector spent on this scrape",
    &["collector"],
);

static SELF_METRICS: &[&Descriptor] = &[&COLLECTOR_SUCCESS, &COLLECT_ERRORS, &COLLECT_DURATION];

/// Outcome of one collector during a scrape.
#[derive(Debug)]
pub struct CollectorReport {
    pub name: &'static str,
    pub samples: usize,
    pub errors: Vec<CollectError>,
    pub duration: Duration,
}

/// All samples of one metric.
#[derive(Debug, Clone)]
pub struct Family {
    pub descriptor: &'static Descriptor,
    pub samples: Vec<Sample>,
}

/// Result of running every collector of a registry.
#[derive(Debug, Default)]
pub struct Gathered {
    /// Metric families ordered by name.
    pub families: Vec<Family>,
    /// One report per collector, in registration order.
    pub reports: Vec<CollectorReport>,
}

impl Gathered {
    /// Total number of collector errors.
    pub fn error_count(&self) -> usize {
        self.reports.iter().map(|r| r.errors.len()).sum()
    }

    /// Find a family by metric name.
    pub fn family(&self, name: &str) -> Option<&Family> {
        self.families.iter().find(|f| f.descriptor.name == name)
    }

    /// Encode families plus self-metrics in the exposition text format.
    pub fn encode(&self) -> Result<String, RegistryError> {
        let mut families = self.families.clone();
        families.extend(self.self_metrics());

        let mut registry = prometheus_client::registry::Registry::default();
        registry.register_collector(Box::new(Snapshot { families }));

        let mut output = String::new();
        prometheus_client::encoding::text::encode(&mut output, &registry)?;
        Ok(output)
    }

    fn self_metrics(&self) -> Vec<Family> {
        let mut success = Vec::with_capacity(self.reports.len());
        let mut errors = Vec::with_capacity(self.reports.len());
        let mut durations = Vec::with_capacity(self.reports.len());

        for report in &self.reports {
            let labels = [report.name];
            let ok = if report.errors.is_empty() { 1.0 } else { 0.0 };
            success.push(Sample::new(&COLLECTOR_SUCCESS, &labels, ok));
            errors.push(Sample::new(&COLLECT_ERRORS, &labels, report.errors.len() as f64));
            durations.push(Sample::new(
                &COLLECT_DURATION,
                &labels,
                report.duration.as_secs_f64(),
            ));
        }

        vec![
            Family {
                descriptor: &COLLECTOR_SUCCESS,
                samples: success,
            },
            Family {
                descriptor: &COLLECT_ERRORS,
                samples: errors,
            },
            Family {
                descriptor: &COLLECT_DURATION,
                samples: durations,
            },
        ]
    }
}

/// Owned sample set handed to the `prometheus-client` encoder.
#[derive(Debug)]
struct Snapshot {
    families: Vec<Family>,
}

impl prometheus_client::collector::Collector for Snapshot {
    fn encode(&self, mut encoder: DescriptorEncoder) -> Result<(), std::fmt::Error> {
        for family in &self.families {
            let descriptor = family.descriptor;
            let metric_type = match descriptor.kind {
                MetricKind::Counter => MetricType::Counter,
                MetricKind::Gauge => MetricType::Gauge,
            };

            let mut metric_encoder =
                encoder.encode_descriptor(descriptor.name, descriptor.help, None, metric_type)?;

            for sample in &family.samples {
                let labels = sample.labels();
                let sample_encoder = metric_encoder.encode_family(&labels)?;
                match descriptor.kind {
                    MetricKind::Counter => ConstCounter::new(sample.value).encode(sample_encoder)?,
                    MetricKind::Gauge => ConstGauge::new(sample.value).encode(sample_encoder)?,
                }
            }
        }
        Ok(())
    }
}

/// Collectors registered for one scrape.
pub struct Registry {
    collectors: Vec<Box<dyn Collector>>,
    names: HashSet<&'static str>,
}

impl Registry {
    pub fn new() -> Self {
        let mut names = HashSet::new();
        names.extend(SELF_METRICS.iter().map(|d| d.name));

        Self {
            collectors: Vec::new(),
            names,
        }
    }

    /// Register a collector.
    ///
    /// Fails if any of its metric names is already taken, including the
    /// exporter self-metrics.
    pub fn register(&mut self, collector: Box<dyn Collector>) -> Result<(), RegistryError> {
        let descriptors = collector.describe();

        let mut seen = HashSet::new();
        for descriptor in descriptors {
            if self.names.contains(descriptor.name) || !seen.insert(descriptor.name) {
                return Err(RegistryError::Duplicate {
                    name: descriptor.name,
                });
            }
        }

        self.names.extend(seen);
        self.collectors.push(collector);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.collectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.collectors.is_empty()
    }

    /// Run every collector concurrently and group the samples by metric.
    pub async fn gather(&self) -> Gathered {
        let runs = self.collectors.iter().map(|collector| {
            let span = info_span!("collect", collector = collector.name());
            async move {
                let started = Instant::now();
                let collection = collector.collect().await;
                (collector.as_ref(), collection, started.elapsed())
            }
            .instrument(span)
        });

        let mut by_name: BTreeMap<&'static str, Family> = BTreeMap::new();
        let mut series: HashSet<(&'static str, Vec<String>)> = HashSet::new();
        let mut reports = Vec::with_capacity(self.collectors.len());

        for (collector, collection, duration) in join_all(runs).await {
            let name = collector.name();
            let allowed = collector.describe();
            let mut errors = collection.errors;
            let mut accepted = 0;

            for sample in collection.samples {
                if let Err(e) = validate(allowed, &sample) {
                    errors.push(e);
                    continue;
                }
                if !series.insert((sample.descriptor.name, sample.label_values.clone())) {
                    errors.push(CollectError::Inconsistent {
                        metric: sample.descriptor.name.to_string(),
                        reason: format!("duplicate series {:?}", sample.label_values),
                    });
                    continue;
                }
                accepted += 1;
                by_name
                    .entry(sample.descriptor.name)
                    .or_insert_with(|| Family {
                        descriptor: sample.descriptor,
                        samples: Vec::new(),
                    })
                    .samples
                    .push(sample);
            }

            for e in &errors {
                error!(collector = name, error = %e, "Collection error");
            }
            debug!(
                collector = name,
                samples = accepted,
                errors = errors.len(),
                duration_ms = duration.as_millis() as u64,
                "Collector finished"
            );

            reports.push(CollectorReport {
                name,
                samples: accepted,
                errors,
                duration,
            });
        }

        Gathered {
            families: by_name.into_values().collect(),
            reports,
        }
    }

    /// Gather and encode in one step.
    pub async fn render(&self) -> Result<String, RegistryError> {
        self.gather().await.encode()
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

fn validate(allowed: &[&'static Descriptor], sample: &Sample) -> Result<(), CollectError> {
    let descriptor = sample.descriptor;

    if !allowed.iter().any(|d| std::ptr::eq(*d, descriptor)) {
        return Err(CollectError::Inconsistent {
            metric: descriptor.name.to_string(),
            reason: "metric not described by collector".to_string(),
        });
    }

    if sample.label_values.len() != descriptor.labels.len() {
        return Err(CollectError::Inconsistent {
            metric: descriptor.name.to_string(),
            reason: format!(
                "expected {} label values, got {}",
                descriptor.labels.len(),
                sample.label_values.len()
            ),
        });
    }

    Ok(())
}
