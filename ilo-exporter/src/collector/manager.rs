//! iLO manager metrics.

use async_trait::async_trait;
use ilo_client::resources::manager::{MANAGER_PATH, Manager};

use crate::collector::{Collection, Collector, SharedClient};
use crate::registry::Descriptor;

static MANAGER_HEALTH: Descriptor = Descriptor::gauge(
    "ilo_manager_health",
    "Health of the iLO manager (0 = OK, 1 = Warning, 2 = Critical)",
    &["host"],
);
static MANAGER_INFO: Descriptor = Descriptor::gauge(
    "ilo_manager_info",
    "Model and firmware of the iLO manager",
    &["host", "model", "firmware_version"],
);
static MANAGER_ENABLED: Descriptor =
    Descriptor::gauge("ilo_manager_enabled", "Whether the iLO manager is enabled", &["host"]);

static DESCRIPTORS: &[&Descriptor] = &[&MANAGER_HEALTH, &MANAGER_INFO, &MANAGER_ENABLED];

/// Collects `/Managers/1/`.
pub struct ManagerCollector {
    client: SharedClient,
}

impl ManagerCollector {
    pub fn new(client: SharedClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Collector for ManagerCollector {
    fn name(&self) -> &'static str {
        "manager"
    }

    fn describe(&self) -> &'static [&'static Descriptor] {
        DESCRIPTORS
    }

    async fn collect(&self) -> Collection {
        let host = self.client.host();
        let mut out = Collection::new();

        match self.client.call::<Manager>(MANAGER_PATH).await {
            Ok(manager) => {
                out.push_status_health(&MANAGER_HEALTH, &[host], "manager", &manager.status);
                out.push(
                    &MANAGER_INFO,
                    &[host, manager.model.as_str(), manager.firmware_version.as_str()],
                    1.0,
                );
                out.push_bool(&MANAGER_ENABLED, &[host], manager.status.is_enabled());
            }
            Err(e) => out.error(e),
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ilo_client::mock::MockTransport;
    use ilo_client::{Client, ClientOptions, Target};
    use std::sync::Arc;

    fn collector(mock: MockTransport) -> ManagerCollector {
        let client = Client::with_transport(
            Target::new("ilo01", "admin", "secret"),
            &ClientOptions::default(),
            Arc::new(mock),
        );
        ManagerCollector::new(Arc::new(client))
    }

    #[tokio::test]
    async fn test_collect_manager() {
        let collector = collector(MockTransport::new().with_json(
            MANAGER_PATH,
            r#"{"Model": "iLO 5", "FirmwareVersion": "iLO 5 v2.72",
                "Status": {"Health": "OK", "State": "Enabled"}}"#,
        ));

        let out = collector.collect().await;

        assert!(out.errors.is_empty());
        assert_eq!(out.samples.len(), 3);

        let info = out
            .samples
            .iter()
            .find(|s| s.descriptor.name == "ilo_manager_info")
            .unwrap();
        assert_eq!(info.value, 1.0);
        assert_eq!(info.label("model"), Some("iLO 5"));
        assert_eq!(info.label("firmware_version"), Some("iLO 5 v2.72"));
    }

    #[tokio::test]
    async fn test_single_failure_yields_one_error() {
        let collector = collector(MockTransport::new().with_failure(MANAGER_PATH, "refused"));

        let out = collector.collect().await;

        assert!(out.samples.is_empty());
        assert_eq!(out.errors.len(), 1);
    }
}
