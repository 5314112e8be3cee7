//! Chassis power and thermal metrics.

use async_trait::async_trait;
use ilo_client::resources::chassis::{POWER_PATH, Power, THERMAL_PATH, Thermal};

use crate::collector::{Collection, Collector, SharedClient};
use crate::registry::Descriptor;

const HOST: &[&str] = &["host"];
const PSU: &[&str] = &["host", "serial", "bay"];
const SENSOR: &[&str] = &["host", "name"];

static POWER_CURRENT: Descriptor =
    Descriptor::gauge("ilo_power_current_watt", "Current power consumption in watts", HOST);
static POWER_AVERAGE: Descriptor = Descriptor::gauge(
    "ilo_power_average_watt",
    "Average power consumption over the last interval in watts",
    HOST,
);
static POWER_MIN: Descriptor = Descriptor::gauge(
    "ilo_power_min_watt",
    "Minimum power consumption over the last interval in watts",
    HOST,
);
static POWER_MAX: Descriptor = Descriptor::gauge(
    "ilo_power_max_watt",
    "Maximum power consumption over the last interval in watts",
    HOST,
);
static POWER_CAPACITY: Descriptor =
    Descriptor::gauge("ilo_power_capacity_watt", "Power capacity of the chassis in watts", HOST);
static PSU_HEALTH: Descriptor = Descriptor::gauge(
    "ilo_power_supply_health",
    "Health of the power supply (0 = OK, 1 = Warning, 2 = Critical)",
    PSU,
);
static PSU_ENABLED: Descriptor = Descriptor::gauge(
    "ilo_power_supply_enabled",
    "Whether the power supply is enabled",
    PSU,
);
static PSU_CAPACITY: Descriptor = Descriptor::gauge(
    "ilo_power_supply_capacity_watt",
    "Capacity of the power supply in watts",
    PSU,
);
static PSU_LAST_OUTPUT: Descriptor = Descriptor::gauge(
    "ilo_power_supply_last_output_watt",
    "Last output of the power supply in watts",
    PSU,
);
static TEMPERATURE_CURRENT: Descriptor = Descriptor::gauge(
    "ilo_temperature_current",
    "Current temperature reading in degree celsius",
    SENSOR,
);
static TEMPERATURE_CRITICAL: Descriptor = Descriptor::gauge(
    "ilo_temperature_critical",
    "Critical temperature threshold in degree celsius",
    SENSOR,
);
static TEMPERATURE_FATAL: Descriptor = Descriptor::gauge(
    "ilo_temperature_fatal",
    "Fatal temperature threshold in degree celsius",
    SENSOR,
);
static TEMPERATURE_HEALTH: Descriptor = Descriptor::gauge(
    "ilo_temperature_health",
    "Health of the temperature sensor (0 = OK, 1 = Warning, 2 = Critical)",
    SENSOR,
);
static FAN_CURRENT: Descriptor =
    Descriptor::gauge("ilo_fan_current", "Current fan speed in percent", SENSOR);
static FAN_HEALTH: Descriptor = Descriptor::gauge(
    "ilo_fan_health",
    "Health of the fan (0 = OK, 1 = Warning, 2 = Critical)",
    SENSOR,
);
static FAN_ENABLED: Descriptor =
    Descriptor::gauge("ilo_fan_enabled", "Whether the fan is enabled", SENSOR);

static DESCRIPTORS: &[&Descriptor] = &[
    &POWER_CURRENT,
    &POWER_AVERAGE,
    &POWER_MIN,
    &POWER_MAX,
    &POWER_CAPACITY,
    &PSU_HEALTH,
    &PSU_ENABLED,
    &PSU_CAPACITY,
    &PSU_LAST_OUTPUT,
    &TEMPERATURE_CURRENT,
    &TEMPERATURE_CRITICAL,
    &TEMPERATURE_FATAL,
    &TEMPERATURE_HEALTH,
    &FAN_CURRENT,
    &FAN_HEALTH,
    &FAN_ENABLED,
];

/// Collects `/Chassis/1/Power/` and `/Chassis/1/Thermal/`.
pub struct ChassisCollector {
    client: SharedClient,
}

impl ChassisCollector {
    pub fn new(client: SharedClient) -> Self {
        Self { client }
    }

    fn map_power(host: &str, power: &Power, out: &mut Collection) {
        if let Some(control) = power.power_control.first() {
            out.push_opt(&POWER_CURRENT, &[host], control.power_consumed_watts);
            out.push_opt(&POWER_CAPACITY, &[host], control.power_capacity_watts);

            let metrics = &control.power_metrics;
            out.push_opt(&POWER_AVERAGE, &[host], metrics.average_consumed_watts);
            out.push_opt(&POWER_MIN, &[host], metrics.min_consumed_watts);
            out.push_opt(&POWER_MAX, &[host], metrics.max_consumed_watts);
        }

        for (index, psu) in power.power_supplies.iter().enumerate() {
            let bay = psu.bay(index);
            let serial = psu.serial_number.as_deref().unwrap_or_default();
            let labels = [host, serial, bay.as_str()];

            out.push_status_health(&PSU_HEALTH, &labels, &format!("power supply {}", bay), &psu.status);
            out.push_bool(&PSU_ENABLED, &labels, psu.status.is_enabled());
            out.push_opt(&PSU_CAPACITY, &labels, psu.power_capacity_watts);
            out.push_opt(&PSU_LAST_OUTPUT, &labels, psu.last_power_output_watts);
        }
    }

    fn map_thermal(host: &str, thermal: &Thermal, out: &mut Collection) {
        for sensor in &thermal.temperatures {
            let labels = [host, sensor.name.as_str()];

            out.push_opt(&TEMPERATURE_CURRENT, &labels, sensor.reading_celsius);
            out.push_opt(&TEMPERATURE_CRITICAL, &labels, sensor.upper_threshold_critical);
            out.push_opt(&TEMPERATURE_FATAL, &labels, sensor.upper_threshold_fatal);
            out.push_status_health(&TEMPERATURE_HEALTH, &labels, &sensor.name, &sensor.status);
        }

        for fan in &thermal.fans {
            let labels = [host, fan.name.as_str()];

            out.push_opt(&FAN_CURRENT, &labels, fan.reading);
            out.push_status_health(&FAN_HEALTH, &labels, &fan.name, &fan.status);
            out.push_bool(&FAN_ENABLED, &labels, fan.status.is_enabled());
        }
    }
}

#[async_trait]
impl Collector for ChassisCollector {
    fn name(&self) -> &'static str {
        "chassis"
    }

    fn describe(&self) -> &'static [&'static Descriptor] {
        DESCRIPTORS
    }

    async fn collect(&self) -> Collection {
        let host = self.client.host();
        let mut out = Collection::new();

        let (power, thermal) = tokio::join!(
            self.client.call::<Power>(POWER_PATH),
            self.client.call::<Thermal>(THERMAL_PATH),
        );

        match power {
            Ok(power) => Self::map_power(host, &power, &mut out),
            Err(e) => out.error(e),
        }

        match thermal {
            Ok(thermal) => Self::map_thermal(host, &thermal, &mut out),
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

    const POWER: &str = r#"{
        "PowerControl": [{
            "PowerConsumedWatts": 212,
            "PowerCapacityWatts": 1600,
            "PowerMetrics": {"AverageConsumedWatts": 208, "MinConsumedWatts": 201, "MaxConsumedWatts": 240}
        }],
        "PowerSupplies": [{
            "SerialNumber": "5WBXK0FLL7Q0QF",
            "PowerCapacityWatts": 800,
            "LastPowerOutputWatts": 104,
            "Status": {"Health": "OK", "State": "Enabled"},
            "Oem": {"Hpe": {"BayNumber": 1}}
        }, {
            "SerialNumber": "5WBXK0FLL7Q0QG",
            "Status": {"Health": "Critical", "State": "Disabled"},
            "Oem": {"Hpe": {"BayNumber": 2}}
        }]
    }"#;

    const THERMAL: &str = r#"{
        "Temperatures": [
            {"Name": "01-Inlet Ambient", "ReadingCelsius": 21, "UpperThresholdCritical": 42,
             "UpperThresholdFatal": 47, "Status": {"Health": "OK", "State": "Enabled"}},
            {"Name": "02-CPU 1", "ReadingCelsius": 40, "Status": {"Health": "Sideways", "State": "Enabled"}}
        ],
        "Fans": [
            {"Name": "Fan 1", "Reading": 23, "Status": {"Health": "Warning", "State": "Enabled"}}
        ]
    }"#;

    fn collector(mock: MockTransport) -> (ChassisCollector, Arc<MockTransport>) {
        let mock = Arc::new(mock);
        let client = Client::with_transport(
            Target::new("ilo01", "admin", "secret"),
            &ClientOptions::default(),
            mock.clone(),
        );
        (ChassisCollector::new(Arc::new(client)), mock)
    }

    fn value(out: &Collection, metric: &str, label: (&str, &str)) -> Option<f64> {
        out.samples
            .iter()
            .find(|s| s.descriptor.name == metric && s.label(label.0) == Some(label.1))
            .map(|s| s.value)
    }

    #[tokio::test]
    async fn test_collect_power_and_thermal() {
        let (collector, mock) = collector(
            MockTransport::new()
                .with_json(POWER_PATH, POWER)
                .with_json(THERMAL_PATH, THERMAL),
        );

        let out = collector.collect().await;

        assert_eq!(mock.calls(), 2);
        assert_eq!(value(&out, "ilo_power_current_watt", ("host", "ilo01")), Some(212.0));
        assert_eq!(value(&out, "ilo_power_max_watt", ("host", "ilo01")), Some(240.0));
        assert_eq!(value(&out, "ilo_power_supply_health", ("bay", "1")), Some(0.0));
        assert_eq!(value(&out, "ilo_power_supply_health", ("bay", "2")), Some(2.0));
        assert_eq!(value(&out, "ilo_power_supply_enabled", ("bay", "2")), Some(0.0));
        assert_eq!(value(&out, "ilo_power_supply_capacity_watt", ("bay", "2")), None);
        assert_eq!(
            value(&out, "ilo_temperature_current", ("name", "01-Inlet Ambient")),
            Some(21.0)
        );
        assert_eq!(value(&out, "ilo_fan_health", ("name", "Fan 1")), Some(1.0));
        assert_eq!(value(&out, "ilo_fan_current", ("name", "Fan 1")), Some(23.0));

        // Unknown health drops only that sample.
        assert_eq!(value(&out, "ilo_temperature_current", ("name", "02-CPU 1")), Some(40.0));
        assert_eq!(value(&out, "ilo_temperature_health", ("name", "02-CPU 1")), None);
        assert_eq!(out.errors.len(), 1);
    }

    #[tokio::test]
    async fn test_failed_sub_resource_keeps_other() {
        let (collector, _) = collector(
            MockTransport::new()
                .with_failure(POWER_PATH, "connection reset")
                .with_json(THERMAL_PATH, THERMAL),
        );

        let out = collector.collect().await;

        assert!(out.samples.iter().all(|s| !s.descriptor.name.starts_with("ilo_power")));
        assert_eq!(value(&out, "ilo_fan_current", ("name", "Fan 1")), Some(23.0));
        assert!(
            out.errors
                .iter()
                .any(|e| e.to_string().contains(POWER_PATH))
        );
    }

    #[tokio::test]
    async fn test_every_sample_is_described() {
        let (collector, _) = collector(
            MockTransport::new()
                .with_json(POWER_PATH, POWER)
                .with_json(THERMAL_PATH, THERMAL),
        );

        let out = collector.collect().await;

        for sample in &out.samples {
            assert!(collector.describe().iter().any(|d| d.name == sample.descriptor.name));
            assert_eq!(sample.label_values.len(), sample.descriptor.labels.len());
        }
    }
}
