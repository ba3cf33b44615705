// ── Unit domain types ──

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Canonical snapshot of one HVAC unit, converted from the cloud's wire
/// payload in `convert`. Temperatures are Fahrenheit throughout -- the
/// cloud reports this product line in °F only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[allow(clippy::struct_excessive_bools)]
pub struct Unit {
    /// Cloud identifier -- used for setter calls and event routing.
    pub id: String,
    /// Hardware address -- the stable unique id exposed to the host.
    pub mac: String,
    pub name: Option<String>,
    /// Manufacturer label as the cloud reports it (e.g. "Daikin Industries").
    pub manufacturer: Option<String>,
    pub firmware_version: Option<String>,

    // Connectivity. A unit is only controllable when both are true.
    pub connected: bool,
    pub machine_ready: bool,

    // Raw vendor state. Translation to host vocabulary happens at the
    // entity layer, because mode depends on the power flag.
    pub power: bool,
    pub mode_code: u8,
    pub active_mode_code: u8,
    pub fan_speed_code: u8,

    pub current_temp_f: Option<f64>,
    pub setpoint_cool_f: Option<f64>,
    pub setpoint_heat_f: Option<f64>,
    pub setpoint_auto_f: Option<f64>,

    // Wifi status, surfaced as sensor entities.
    pub rssi_dbm: Option<i32>,
    pub ssid: Option<String>,

    pub updated_at: DateTime<Utc>,
}

impl Unit {
    /// Whether the unit can be read and controlled right now.
    pub fn is_available(&self) -> bool {
        self.connected && self.machine_ready
    }

    /// Name for display, falling back to the hardware address.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.mac)
    }
}

/// Host-facing device registry metadata for one unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    /// (domain, id) pairs identifying the physical device.
    pub identifiers: Vec<(String, String)>,
    pub name: String,
    pub manufacturer: String,
    pub model: Option<String>,
    pub sw_version: Option<String>,
}

impl DeviceInfo {
    /// Identifier domain used in [`DeviceInfo::identifiers`].
    pub const DOMAIN: &'static str = "dknbridge";

    pub(crate) fn for_unit(unit: &Unit) -> Self {
        Self {
            identifiers: vec![(Self::DOMAIN.to_owned(), unit.mac.clone())],
            name: unit.display_name().to_owned(),
            manufacturer: "Daikin".to_owned(),
            model: unit.manufacturer.clone(),
            sw_version: unit.firmware_version.clone(),
        }
    }
}
