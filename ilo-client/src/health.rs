//! Redfish health and state enumerations.
//!
//! Redfish reports component health as one of three strings. They are
//! exported as a small integer domain:
//!
//! | Redfish    | Value |
//! |------------|-------|
//! | `OK`       | 0     |
//! | `Warning`  | 1     |
//! | `Critical` | 2     |
//!
//! Any other string is rejected with [`HealthError::Unknown`].

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error raised for a health string outside the Redfish enumeration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HealthError {
    #[error("Unknown health status: {0:?}")]
    Unknown(String),
}

/// Component health as reported by the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Health {
    Ok,
    Warning,
    Critical,
}

impl Health {
    /// Numeric value used in exported samples.
    pub fn as_value(self) -> f64 {
        match self {
            Health::Ok => 0.0,
            Health::Warning => 1.0,
            Health::Critical => 2.0,
        }
    }

    /// The Redfish string for this health value.
    pub fn as_str(self) -> &'static str {
        match self {
            Health::Ok => "OK",
            Health::Warning => "Warning",
            Health::Critical => "Critical",
        }
    }
}

impl FromStr for Health {
    type Err = HealthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "OK" => Ok(Health::Ok),
            "Warning" => Ok(Health::Warning),
            "Critical" => Ok(Health::Critical),
            other => Err(HealthError::Unknown(other.to_string())),
        }
    }
}

impl fmt::Display for Health {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Redfish `Status` object shared by most resources.
///
/// Health is kept as the raw string so that an unknown value surfaces at
/// mapping time instead of failing the whole payload decode.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Status {
    #[serde(default)]
    pub health: Option<String>,

    #[serde(default)]
    pub health_rollup: Option<String>,

    #[serde(default)]
    pub state: Option<String>,
}

impl Status {
    /// Parse the health field.
    ///
    /// `Ok(None)` means the controller reported no health (absent parts).
    pub fn health(&self) -> Result<Option<Health>, HealthError> {
        self.health.as_deref().map(Health::from_str).transpose()
    }

    /// Parse the aggregated health of the component and its children.
    pub fn health_rollup(&self) -> Result<Option<Health>, HealthError> {
        self.health_rollup.as_deref().map(Health::from_str).transpose()
    }

    /// Whether the component state is `Enabled`.
    pub fn is_enabled(&self) -> bool {
        self.state.as_deref() == Some("Enabled")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_health_from_str() {
        assert_eq!("OK".parse::<Health>(), Ok(Health::Ok));
        assert_eq!("Warning".parse::<Health>(), Ok(Health::Warning));
        assert_eq!("Critical".parse::<Health>(), Ok(Health::Critical));
    }

    #[test]
    fn test_health_values() {
        assert_eq!(Health::Ok.as_value(), 0.0);
        assert_eq!(Health::Warning.as_value(), 1.0);
        assert_eq!(Health::Critical.as_value(), 2.0);
    }

    #[test]
    fn test_ok_is_stable() {
        for _ in 0..10 {
            assert_eq!("OK".parse::<Health>().map(Health::as_value), Ok(0.0));
        }
    }

    #[test]
    fn test_unknown_health_is_error() {
        for raw in ["ok", "Degraded", "", "Unknown"] {
            assert_eq!(
                raw.parse::<Health>(),
                Err(HealthError::Unknown(raw.to_string()))
            );
        }
    }

    #[test]
    fn test_status_missing_health() {
        let status: Status = serde_json::from_str(r#"{"State": "Absent"}"#).unwrap();

        assert_eq!(status.health(), Ok(None));
        assert!(!status.is_enabled());
    }

    #[test]
    fn test_status_enabled() {
        let status: Status =
            serde_json::from_str(r#"{"Health": "Warning", "State": "Enabled"}"#).unwrap();

        assert_eq!(status.health(), Ok(Some(Health::Warning)));
        assert!(status.is_enabled());
    }

    #[test]
    fn test_status_rollup() {
        let status: Status = serde_json::from_str(r#"{"HealthRollup": "Critical"}"#).unwrap();

        assert_eq!(status.health(), Ok(None));
        assert_eq!(status.health_rollup(), Ok(Some(Health::Critical)));
    }

    #[test]
    fn test_status_unknown_health() {
        let status: Status = serde_json::from_str(r#"{"Health": "Broken"}"#).unwrap();

        assert!(status.health().is_err());
    }
}
