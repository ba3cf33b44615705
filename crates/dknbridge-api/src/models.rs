// DKN Cloud API response types
//
// Models for the cloud's JSON surfaces. Fields use `#[serde(default)]`
// liberally because the API is inconsistent about field presence across
// unit firmware generations.

use serde::{Deserialize, Serialize};

// ── Sign-in ──────────────────────────────────────────────────────────

/// Response body from `POST /users/sign_in`.
#[derive(Debug, Deserialize)]
pub struct SignInResponse {
    pub user: SignInUser,
}

/// The authenticated user record inside a sign-in response.
#[derive(Debug, Deserialize)]
pub struct SignInUser {
    pub email: String,
    pub authentication_token: String,
}

// ── Installations ────────────────────────────────────────────────────

/// Response body from `GET /installation_relations`.
#[derive(Debug, Deserialize)]
pub struct InstallationRelationsResponse {
    #[serde(default)]
    pub installation_relations: Vec<InstallationRelation>,
}

/// One account-to-installation link. The installation payload carries
/// the device list inline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstallationRelation {
    #[serde(default)]
    pub id: Option<String>,
    pub installation: Installation,
    /// Catch-all for undocumented fields.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// An installation (a site) with its HVAC units.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Installation {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub devices: Vec<ApiDevice>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

// ── Device ───────────────────────────────────────────────────────────

/// Full device object as the cloud reports it.
///
/// The cloud can return dozens of fields per unit. We model the ones the
/// bridge consumes explicitly; everything else lands in `extra`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiDevice {
    pub id: String,
    pub mac: String,
    #[serde(default)]
    pub name: Option<String>,

    /// Whether the unit is powered on. Mode codes are only meaningful
    /// while this is `true`.
    #[serde(default)]
    pub power: bool,
    /// Configured operating mode code (1=auto, 2=cool, 3=heat, 4=fan, 5=dry).
    #[serde(default)]
    pub mode: u8,
    /// Mode the machine is actually running right now. Can differ from
    /// `mode` while an auto unit decides between heating and cooling.
    #[serde(default)]
    pub real_mode: u8,
    /// Fan speed code (0=auto, 2=low, 4=medium, 6=high).
    #[serde(default)]
    pub speed_state: u8,

    /// Ambient temperature measured at the unit, in Fahrenheit.
    #[serde(default)]
    pub work_temp: Option<f64>,
    #[serde(default)]
    pub setpoint_air_cool: Option<f64>,
    #[serde(default)]
    pub setpoint_air_heat: Option<f64>,
    #[serde(default)]
    pub setpoint_air_auto: Option<f64>,

    #[serde(default, rename = "isConnected")]
    pub connected: bool,
    #[serde(default, rename = "machineready")]
    pub machine_ready: bool,

    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub manufacturer: Option<ManufacturerInfo>,

    // Wifi status, surfaced as sensors by the bridge.
    #[serde(default)]
    pub rssi: Option<i32>,
    #[serde(default)]
    pub ssid: Option<String>,

    /// Catch-all for undocumented fields.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Manufacturer metadata nested inside a device payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManufacturerInfo {
    #[serde(default)]
    pub text: Option<String>,
}

// ── Event stream ─────────────────────────────────────────────────────

/// Partial state change pushed by the cloud for a single unit.
///
/// Every field is optional: the cloud only sends what changed. Wire
/// names match the device payload so the same rename rules apply.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeviceUpdate {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub power: Option<bool>,
    #[serde(default)]
    pub mode: Option<u8>,
    #[serde(default)]
    pub real_mode: Option<u8>,
    #[serde(default)]
    pub speed_state: Option<u8>,
    #[serde(default)]
    pub work_temp: Option<f64>,
    #[serde(default)]
    pub setpoint_air_cool: Option<f64>,
    #[serde(default)]
    pub setpoint_air_heat: Option<f64>,
    #[serde(default)]
    pub setpoint_air_auto: Option<f64>,
    #[serde(default, rename = "isConnected")]
    pub connected: Option<bool>,
    #[serde(default, rename = "machineready")]
    pub machine_ready: Option<bool>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub rssi: Option<i32>,
    #[serde(default)]
    pub ssid: Option<String>,
}

impl DeviceUpdate {
    /// Returns `true` if the update carries no recognized field at all.
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.power.is_none()
            && self.mode.is_none()
            && self.real_mode.is_none()
            && self.speed_state.is_none()
            && self.work_temp.is_none()
            && self.setpoint_air_cool.is_none()
            && self.setpoint_air_heat.is_none()
            && self.setpoint_air_auto.is_none()
            && self.connected.is_none()
            && self.machine_ready.is_none()
            && self.version.is_none()
            && self.rssi.is_none()
            && self.ssid.is_none()
    }
}

/// A parsed message from the cloud event stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceEvent {
    /// Cloud identifier of the unit this event concerns.
    pub device_id: String,
    /// The changed fields.
    #[serde(default)]
    pub update: DeviceUpdate,
}
