//! Computer system metrics: power state, memory, processors and disks.

use async_trait::async_trait;
use futures::future::join_all;
use ilo_client::resources::system::{
    ARRAY_CONTROLLERS_PATH, ArrayController, ComputerSystem, DiskDrive, GIB, MEMORY_PATH, MIB,
    MemoryDimm, PROCESSORS_PATH, Processor, SYSTEM_PATH,
};
use ilo_client::{Health, HealthError, Status};

use crate::collector::{Collection, Collector, SharedClient};
use crate::registry::Descriptor;

const HOST: &[&str] = &["host"];
const DIMM: &[&str] = &["host", "name"];
const CPU: &[&str] = &["host", "socket", "model"];
const DISK: &[&str] = &["host", "controller", "location", "model", "media_type"];

static POWER_UP: Descriptor =
    Descriptor::gauge("ilo_power_up", "Whether the host is powered on", HOST);
static SYSTEM_HEALTH: Descriptor = Descriptor::gauge(
    "ilo_system_health",
    "Health of the system (0 = OK, 1 = Warning, 2 = Critical)",
    HOST,
);
static MEMORY_TOTAL: Descriptor =
    Descriptor::gauge("ilo_memory_total_byte", "Total system memory in bytes", HOST);
static MEMORY_HEALTH: Descriptor = Descriptor::gauge(
    "ilo_memory_health",
    "Health of the memory subsystem (0 = OK, 1 = Warning, 2 = Critical)",
    HOST,
);
static DIMM_HEALTH: Descriptor = Descriptor::gauge(
    "ilo_memory_dimm_health",
    "Health of the DIMM (0 = OK, 1 = Warning, 2 = Critical)",
    DIMM,
);
static DIMM_SIZE: Descriptor =
    Descriptor::gauge("ilo_memory_dimm_size_byte", "Size of the DIMM in bytes", DIMM);
static PROCESSOR_HEALTH: Descriptor = Descriptor::gauge(
    "ilo_processor_health",
    "Health of the processor (0 = OK, 1 = Warning, 2 = Critical)",
    CPU,
);
static PROCESSOR_CORES: Descriptor =
    Descriptor::gauge("ilo_processor_cores", "Number of processor cores", CPU);
static PROCESSOR_THREADS: Descriptor =
    Descriptor::gauge("ilo_processor_threads", "Number of processor threads", CPU);
static DISK_HEALTH: Descriptor = Descriptor::gauge(
    "ilo_storage_disk_health",
    "Health of the disk (0 = OK, 1 = Warning, 2 = Critical)",
    DISK,
);
static DISK_CAPACITY: Descriptor = Descriptor::gauge(
    "ilo_storage_disk_capacity_byte",
    "Capacity of the disk in bytes",
    DISK,
);

static DESCRIPTORS: &[&Descriptor] = &[
    &POWER_UP,
    &SYSTEM_HEALTH,
    &MEMORY_TOTAL,
    &MEMORY_HEALTH,
    &DIMM_HEALTH,
    &DIMM_SIZE,
    &PROCESSOR_HEALTH,
    &PROCESSOR_CORES,
    &PROCESSOR_THREADS,
    &DISK_HEALTH,
    &DISK_CAPACITY,
];

/// Rolled-up health, falling back to the element's own health.
fn rollup(status: &Status) -> Result<Option<Health>, HealthError> {
    match status.health_rollup() {
        Ok(None) => status.health(),
        other => other,
    }
}

/// Collects `/Systems/1/` and the memory, processor and storage trees below it.
pub struct SystemCollector {
    client: SharedClient,
}

impl SystemCollector {
    pub fn new(client: SharedClient) -> Self {
        Self { client }
    }

    async fn summary(&self, host: &str) -> Collection {
        let mut out = Collection::new();

        match self.client.call::<ComputerSystem>(SYSTEM_PATH).await {
            Ok(system) => {
                out.push_bool(&POWER_UP, &[host], system.is_powered_on());
                out.push_health(&SYSTEM_HEALTH, &[host], "system", rollup(&system.status));

                let memory = &system.memory_summary;
                out.push_opt(
                    &MEMORY_TOTAL,
                    &[host],
                    memory.total_system_memory_gib.map(|gib| gib * GIB),
                );
                out.push_health(&MEMORY_HEALTH, &[host], "memory", rollup(&memory.status));
            }
            Err(e) => out.error(e),
        }

        out
    }

    async fn memory(&self, host: &str) -> Collection {
        let mut out = Collection::new();

        match self.client.call_collection::<MemoryDimm>(MEMORY_PATH).await {
            Ok(dimms) => {
                for dimm in dimms {
                    match dimm {
                        Ok(dimm) => {
                            let labels = [host, dimm.name.as_str()];
                            out.push_status_health(&DIMM_HEALTH, &labels, &dimm.name, &dimm.status);
                            out.push_opt(&DIMM_SIZE, &labels, dimm.capacity_mib.map(|m| m * MIB));
                        }
                        Err(e) => out.error(e),
                    }
                }
            }
            Err(e) => out.error(e),
        }

        out
    }

    async fn processors(&self, host: &str) -> Collection {
        let mut out = Collection::new();

        match self.client.call_collection::<Processor>(PROCESSORS_PATH).await {
            Ok(processors) => {
                for processor in processors {
                    match processor {
                        Ok(cpu) => {
                            let labels = [host, cpu.socket.as_str(), cpu.model.as_str()];
                            out.push_status_health(&PROCESSOR_HEALTH, &labels, &cpu.socket, &cpu.status);
                            out.push_opt(&PROCESSOR_CORES, &labels, cpu.total_cores);
                            out.push_opt(&PROCESSOR_THREADS, &labels, cpu.total_threads);
                        }
                        Err(e) => out.error(e),
                    }
                }
            }
            Err(e) => out.error(e),
        }

        out
    }

    async fn storage(&self, host: &str) -> Collection {
        let mut out = Collection::new();

        let controllers = match self
            .client
            .call_collection::<ArrayController>(ARRAY_CONTROLLERS_PATH)
            .await
        {
            Ok(controllers) => controllers,
            Err(e) => {
                out.error(e);
                return out;
            }
        };

        // (controller id, drive collection path)
        let mut drive_paths = Vec::new();
        for (index, controller) in controllers.into_iter().enumerate() {
            match controller {
                Ok(controller) => {
                    if let Some(link) = controller.links.physical_drives {
                        let id = controller.id.unwrap_or_else(|| index.to_string());
                        drive_paths.push((id, link.odata_id));
                    }
                }
                Err(e) => out.error(e),
            }
        }

        let drives = join_all(
            drive_paths
                .iter()
                .map(|(_, path)| self.client.call_collection::<DiskDrive>(path)),
        )
        .await;

        for ((controller, _), drives) in drive_paths.iter().zip(drives) {
            match drives {
                Ok(drives) => {
                    for drive in drives {
                        match drive {
                            Ok(disk) => Self::map_disk(host, controller, &disk, &mut out),
                            Err(e) => out.error(e),
                        }
                    }
                }
                Err(e) => out.error(e),
            }
        }

        out
    }

    fn map_disk(host: &str, controller: &str, disk: &DiskDrive, out: &mut Collection) {
        let labels = [
            host,
            controller,
            disk.location.as_str(),
            disk.model.as_str(),
            disk.media_type.as_str(),
        ];
        let element = format!("disk {} on controller {}", disk.location, controller);

        out.push_status_health(&DISK_HEALTH, &labels, &element, &disk.status);
        out.push_opt(&DISK_CAPACITY, &labels, disk.capacity_mib.map(|m| m * MIB));
    }
}

#[async_trait]
impl Collector for SystemCollector {
    fn name(&self) -> &'static str {
        "system"
    }

    fn describe(&self) -> &'static [&'static Descriptor] {
        DESCRIPTORS
    }

    async fn collect(&self) -> Collection {
        let host = self.client.host();

        let (summary, memory, processors, storage) = tokio::join!(
            self.summary(host),
            self.memory(host),
            self.processors(host),
            self.storage(host),
        );

        let mut out = summary;
        out.merge(memory);
        out.merge(processors);
        out.merge(storage);
        out
    }
}
