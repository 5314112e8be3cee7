//! Typed Redfish resources served by iLO controllers.
//!
//! Only the fields the exporter maps to metrics are modelled. Unknown fields
//! are ignored and every numeric reading is optional, since iLO firmware
//! revisions differ in what they populate.

pub mod chassis;
pub mod manager;
pub mod system;

use serde::{Deserialize, Serialize};

/// Reference to another resource (`{"@odata.id": "..."}`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    #[serde(rename = "@odata.id")]
    pub odata_id: String,
}

/// A Redfish resource collection.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Collection {
    #[serde(rename = "Members", default)]
    pub members: Vec<Link>,
}
