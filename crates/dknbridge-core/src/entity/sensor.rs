// ── Status sensor adapters ──
//
// Read-only entities over the wifi status fields of a unit. A sensor is
// only created for units that actually report the underlying field.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::model::{DeviceInfo, Unit};
use crate::stream::UnitStream;

/// Which status field a sensor exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SensorKind {
    /// Wifi signal strength, dBm.
    WifiSignal,
    /// Wifi network name.
    WifiNetwork,
}

/// Host-side statistics class of a sensor reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SensorStateClass {
    Measurement,
}

/// A single sensor reading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SensorValue {
    Decibels(i32),
    Text(String),
}

impl fmt::Display for SensorValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Decibels(v) => write!(f, "{v}"),
            Self::Text(v) => f.write_str(v),
        }
    }
}

impl SensorKind {
    pub const ALL: [Self; 2] = [Self::WifiSignal, Self::WifiNetwork];

    /// Stable key used in unique ids.
    pub fn key(self) -> &'static str {
        match self {
            Self::WifiSignal => "wifi_signal",
            Self::WifiNetwork => "wifi_network",
        }
    }

    /// Display label.
    pub fn label(self) -> &'static str {
        match self {
            Self::WifiSignal => "Wifi signal",
            Self::WifiNetwork => "Wifi network",
        }
    }

    pub fn icon(self) -> &'static str {
        match self {
            Self::WifiSignal => "mdi:access-point",
            Self::WifiNetwork => "mdi:access-point-network",
        }
    }

    pub fn unit_of_measurement(self) -> Option<&'static str> {
        match self {
            Self::WifiSignal => Some("dBm"),
            Self::WifiNetwork => None,
        }
    }

    pub fn state_class(self) -> Option<SensorStateClass> {
        match self {
            Self::WifiSignal => Some(SensorStateClass::Measurement),
            Self::WifiNetwork => None,
        }
    }

    /// Extract this sensor's reading from a unit snapshot.
    pub fn reading(self, unit: &Unit) -> Option<SensorValue> {
        match self {
            Self::WifiSignal => unit.rssi_dbm.map(SensorValue::Decibels),
            Self::WifiNetwork => unit.ssid.clone().map(SensorValue::Text),
        }
    }
}

/// Host-facing read-only sensor entity for one unit field.
#[derive(Clone)]
pub struct SensorEntity {
    kind: SensorKind,
    state: watch::Receiver<Arc<Unit>>,
}

impl SensorEntity {
    pub(crate) fn new(kind: SensorKind, state: watch::Receiver<Arc<Unit>>) -> Self {
        Self { kind, state }
    }

    fn unit(&self) -> Arc<Unit> {
        self.state.borrow().clone()
    }

    pub fn kind(&self) -> SensorKind {
        self.kind
    }

    /// Stable unique id: `{mac}-{sensor key}`.
    pub fn unique_id(&self) -> String {
        format!("{}-{}", self.unit().mac, self.kind.key())
    }

    pub fn name(&self) -> String {
        format!("{} {}", self.unit().display_name(), self.kind.label())
    }

    pub fn icon(&self) -> &'static str {
        self.kind.icon()
    }

    pub fn unit_of_measurement(&self) -> Option<&'static str> {
        self.kind.unit_of_measurement()
    }

    pub fn state_class(&self) -> Option<SensorStateClass> {
        self.kind.state_class()
    }

    pub fn device_info(&self) -> DeviceInfo {
        DeviceInfo::for_unit(&self.unit())
    }

    pub fn available(&self) -> bool {
        self.unit().is_available()
    }

    /// Current reading, `None` when the unit stopped reporting the field.
    pub fn value(&self) -> Option<SensorValue> {
        self.kind.reading(&self.unit())
    }

    /// Subscribe to state changes of the underlying unit.
    pub fn updates(&self) -> UnitStream {
        UnitStream::new(self.state.clone())
    }
}
