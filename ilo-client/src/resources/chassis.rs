//! Chassis power and thermal resources.

use serde::{Deserialize, Serialize};

use crate::health::Status;

/// Path of the chassis power resource.
pub const POWER_PATH: &str = "/Chassis/1/Power/";

/// Path of the chassis thermal resource.
pub const THERMAL_PATH: &str = "/Chassis/1/Thermal/";

/// `/Chassis/1/Power/`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Power {
    #[serde(default)]
    pub power_control: Vec<PowerControl>,

    #[serde(default)]
    pub power_supplies: Vec<PowerSupply>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PowerControl {
    pub power_consumed_watts: Option<f64>,
    pub power_capacity_watts: Option<f64>,
    #[serde(default)]
    pub power_metrics: PowerMetrics,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PowerMetrics {
    pub average_consumed_watts: Option<f64>,
    pub min_consumed_watts: Option<f64>,
    pub max_consumed_watts: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PowerSupply {
    pub member_id: Option<String>,
    pub serial_number: Option<String>,
    pub power_capacity_watts: Option<f64>,
    pub last_power_output_watts: Option<f64>,
    #[serde(default)]
    pub status: Status,
    #[serde(default)]
    pub oem: PowerSupplyOem,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PowerSupplyOem {
    pub hpe: Option<HpePowerSupply>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct HpePowerSupply {
    pub bay_number: Option<u32>,
}

impl PowerSupply {
    /// Bay identifier, falling back to the member id and then the position.
    pub fn bay(&self, index: usize) -> String {
        if let Some(bay) = self.oem.hpe.as_ref().and_then(|h| h.bay_number) {
            return bay.to_string();
        }
        self.member_id.clone().unwrap_or_else(|| index.to_string())
    }
}

/// `/Chassis/1/Thermal/`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Thermal {
    #[serde(default)]
    pub temperatures: Vec<Temperature>,

    #[serde(default)]
    pub fans: Vec<Fan>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Temperature {
    #[serde(default)]
    pub name: String,
    pub reading_celsius: Option<f64>,
    pub upper_threshold_critical: Option<f64>,
    pub upper_threshold_fatal: Option<f64>,
    #[serde(default)]
    pub status: Status,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Fan {
    #[serde(default)]
    pub name: String,
    pub reading: Option<f64>,
    #[serde(default)]
    pub status: Status,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::health::Health;

    #[test]
    fn test_parse_power() {
        let json = r#"{
            "PowerControl": [{
                "PowerConsumedWatts": 212,
                "PowerCapacityWatts": 1600,
                "PowerMetrics": {
                    "AverageConsumedWatts": 208,
                    "MinConsumedWatts": 201,
                    "MaxConsumedWatts": 240,
                    "IntervalInMin": 20
                }
            }],
            "PowerSupplies": [{
                "MemberId": "0",
                "SerialNumber": "5WBXK0FLL7Q0QF",
                "PowerCapacityWatts": 800,
                "LastPowerOutputWatts": 104,
                "Status": {"Health": "OK", "State": "Enabled"},
                "Oem": {"Hpe": {"BayNumber": 1}}
            }]
        }"#;

        let power: Power = serde_json::from_str(json).unwrap();

        assert_eq!(power.power_control[0].power_consumed_watts, Some(212.0));
        assert_eq!(
            power.power_control[0].power_metrics.max_consumed_watts,
            Some(240.0)
        );
        let psu = &power.power_supplies[0];
        assert_eq!(psu.bay(0), "1");
        assert_eq!(psu.status.health(), Ok(Some(Health::Ok)));
    }

    #[test]
    fn test_power_supply_bay_fallback() {
        let psu = PowerSupply {
            member_id: Some("3".to_string()),
            ..Default::default()
        };
        assert_eq!(psu.bay(7), "3");
        assert_eq!(PowerSupply::default().bay(7), "7");
    }

    #[test]
    fn test_parse_thermal() {
        let json = r#"{
            "Temperatures": [{
                "Name": "01-Inlet Ambient",
                "ReadingCelsius": 21,
                "UpperThresholdCritical": 42,
                "UpperThresholdFatal": 47,
                "Status": {"Health": "OK", "State": "Enabled"}
            }, {
                "Name": "12-P1 DIMM 7-12",
                "Status": {"State": "Absent"}
            }],
            "Fans": [{
                "Name": "Fan 1",
                "Reading": 23,
                "ReadingUnits": "Percent",
                "Status": {"Health": "OK", "State": "Enabled"}
            }]
        }"#;

        let thermal: Thermal = serde_json::from_str(json).unwrap();

        assert_eq!(thermal.temperatures.len(), 2);
        assert_eq!(thermal.temperatures[0].reading_celsius, Some(21.0));
        assert_eq!(thermal.temperatures[1].reading_celsius, None);
        assert_eq!(thermal.fans[0].reading, Some(23.0));
    }
}
