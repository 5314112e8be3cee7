//! Computer system resources: summary, memory, processors and storage.

use serde::{Deserialize, Serialize};

use crate::health::Status;
use crate::resources::Link;

/// Path of the computer system resource.
pub const SYSTEM_PATH: &str = "/Systems/1/";

/// Path of the memory (DIMM) collection.
pub const MEMORY_PATH: &str = "/Systems/1/Memory/";

/// Path of the processor collection.
pub const PROCESSORS_PATH: &str = "/Systems/1/Processors/";

/// Path of the Smart Array controller collection.
pub const ARRAY_CONTROLLERS_PATH: &str = "/Systems/1/SmartStorage/ArrayControllers/";

/// `/Systems/1/`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ComputerSystem {
    pub power_state: Option<String>,
    #[serde(default)]
    pub status: Status,
    #[serde(default)]
    pub memory_summary: MemorySummary,
}

impl ComputerSystem {
    /// Whether the host is powered on.
    pub fn is_powered_on(&self) -> bool {
        self.power_state.as_deref() == Some("On")
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MemorySummary {
    #[serde(rename = "TotalSystemMemoryGiB")]
    pub total_system_memory_gib: Option<f64>,
    #[serde(default)]
    pub status: Status,
}

/// A single DIMM slot.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MemoryDimm {
    #[serde(default)]
    pub name: String,
    #[serde(rename = "CapacityMiB")]
    pub capacity_mib: Option<f64>,
    #[serde(default)]
    pub status: Status,
}

/// A CPU socket.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Processor {
    #[serde(default)]
    pub socket: String,
    #[serde(default)]
    pub model: String,
    pub total_cores: Option<f64>,
    pub total_threads: Option<f64>,
    #[serde(default)]
    pub status: Status,
}

/// A Smart Array storage controller.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ArrayController {
    pub id: Option<String>,
    #[serde(default)]
    pub links: ArrayControllerLinks,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ArrayControllerLinks {
    pub physical_drives: Option<Link>,
}

/// A physical disk behind a Smart Array controller.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DiskDrive {
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub media_type: String,
    #[serde(rename = "CapacityMiB")]
    pub capacity_mib: Option<f64>,
    #[serde(default)]
    pub status: Status,
}

/// Bytes in one mebibyte.
pub const MIB: f64 = 1024.0 * 1024.0;

/// Bytes in one gibibyte.
pub const GIB: f64 = MIB * 1024.0;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_system() {
        let json = r#"{
            "PowerState": "On",
            "Status": {"Health": "OK", "HealthRollup": "OK", "State": "Enabled"},
            "MemorySummary": {
                "TotalSystemMemoryGiB": 256,
                "Status": {"HealthRollup": "OK"}
            }
        }"#;

        let system: ComputerSystem = serde_json::from_str(json).unwrap();

        assert!(system.is_powered_on());
        assert_eq!(system.memory_summary.total_system_memory_gib, Some(256.0));
    }

    #[test]
    fn test_parse_dimm() {
        let json = r#"{
            "Name": "proc1dimm1",
            "CapacityMiB": 32768,
            "Status": {"Health": "OK", "State": "Enabled"}
        }"#;

        let dimm: MemoryDimm = serde_json::from_str(json).unwrap();

        assert_eq!(dimm.name, "proc1dimm1");
        assert_eq!(dimm.capacity_mib.map(|m| m * MIB), Some(32.0 * GIB));
    }

    #[test]
    fn test_parse_array_controller() {
        let json = r#"{
            "Id": "0",
            "Links": {
                "PhysicalDrives": {"@odata.id": "/redfish/v1/Systems/1/SmartStorage/ArrayControllers/0/DiskDrives/"}
            }
        }"#;

        let controller: ArrayController = serde_json::from_str(json).unwrap();

        assert_eq!(controller.id.as_deref(), Some("0"));
        assert_eq!(
            controller.links.physical_drives.unwrap().odata_id,
            "/redfish/v1/Systems/1/SmartStorage/ArrayControllers/0/DiskDrives/"
        );
    }

    #[test]
    fn test_parse_disk_drive() {
        let json = r#"{
            "Location": "1I:1:1",
            "Model": "MO000800JWFWR",
            "MediaType": "SSD",
            "CapacityMiB": 763097,
            "Status": {"Health": "OK", "State": "Enabled"}
        }"#;

        let drive: DiskDrive = serde_json::from_str(json).unwrap();

        assert_eq!(drive.location, "1I:1:1");
        assert_eq!(drive.media_type, "SSD");
        assert_eq!(drive.capacity_mib, Some(763097.0));
    }
}
