//! The iLO manager itself.

use serde::{Deserialize, Serialize};

use crate::health::Status;

/// Path of the manager resource.
pub const MANAGER_PATH: &str = "/Managers/1/";

/// `/Managers/1/`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Manager {
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub firmware_version: String,
    #[serde(default)]
    pub status: Status,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::health::Health;

    #[test]
    fn test_parse_manager() {
        let json = r#"{
            "Model": "iLO 5",
            "FirmwareVersion": "iLO 5 v2.72",
            "Status": {"Health": "OK", "State": "Enabled"}
        }"#;

        let manager: Manager = serde_json::from_str(json).unwrap();

        assert_eq!(manager.model, "iLO 5");
        assert_eq!(manager.firmware_version, "iLO 5 v2.72");
        assert_eq!(manager.status.health(), Ok(Some(Health::Ok)));
        assert!(manager.status.is_enabled());
    }
}
