// ── Climate vocabulary and vendor code translation ──
//
// The cloud speaks small integer codes; the host speaks named climate
// modes. Both tables are bijective on their defined key sets, and `Off`
// is deliberately absent from the mode table: the unit has no "off"
// mode code, only a separate power flag.

use serde::{Deserialize, Serialize};

/// Host-facing HVAC mode of a unit.
///
/// Five of these correspond to vendor mode codes; `Off` is derived from
/// the power flag and never maps to a code of its own.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ClimateMode {
    Off,
    HeatCool,
    Cool,
    Heat,
    FanOnly,
    Dry,
}

impl ClimateMode {
    /// All modes a consumer may request, in presentation order.
    pub const SELECTABLE: [Self; 6] = [
        Self::HeatCool,
        Self::Cool,
        Self::Heat,
        Self::FanOnly,
        Self::Dry,
        Self::Off,
    ];

    /// Translate a vendor mode code, honoring the power flag.
    ///
    /// A powered-off unit reads as `Off` regardless of its stored mode
    /// code. A code outside the table yields `None`: the state is
    /// unknown rather than misreported.
    pub fn from_vendor(code: u8, power_on: bool) -> Option<Self> {
        if !power_on {
            return Some(Self::Off);
        }
        match code {
            1 => Some(Self::HeatCool),
            2 => Some(Self::Cool),
            3 => Some(Self::Heat),
            4 => Some(Self::FanOnly),
            5 => Some(Self::Dry),
            _ => None,
        }
    }

    /// Reverse lookup into the vendor mode table.
    ///
    /// `Off` has no code -- turning a unit off is a power-flag write,
    /// never a mode write.
    pub fn to_vendor_code(self) -> Option<u8> {
        match self {
            Self::Off => None,
            Self::HeatCool => Some(1),
            Self::Cool => Some(2),
            Self::Heat => Some(3),
            Self::FanOnly => Some(4),
            Self::Dry => Some(5),
        }
    }
}

/// What the machine is actually doing right now.
///
/// Derived from the power flag plus the unit's *active* mode code,
/// which can differ from the configured mode while an auto unit is
/// arbitrating between heating and cooling.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ClimateAction {
    Off,
    Idle,
    Cooling,
    Heating,
    Fan,
    Drying,
}

impl ClimateAction {
    /// Derive the running action from power + active mode code.
    pub fn from_vendor(active_code: u8, power_on: bool) -> Option<Self> {
        if !power_on {
            return Some(Self::Off);
        }
        match active_code {
            // Auto units report code 1 while deciding which way to run.
            1 => Some(Self::Idle),
            2 => Some(Self::Cooling),
            3 => Some(Self::Heating),
            4 => Some(Self::Fan),
            5 => Some(Self::Drying),
            _ => None,
        }
    }
}

/// Host-facing fan speed of a unit.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum FanSpeed {
    Auto,
    Low,
    Medium,
    High,
}

impl FanSpeed {
    /// All speeds a consumer may request, in presentation order.
    pub const SELECTABLE: [Self; 4] = [Self::Auto, Self::Low, Self::Medium, Self::High];

    /// Translate a vendor speed code. Codes outside the table yield `None`.
    pub fn from_vendor(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::Auto),
            2 => Some(Self::Low),
            4 => Some(Self::Medium),
            6 => Some(Self::High),
            _ => None,
        }
    }

    /// Reverse lookup into the vendor speed table.
    pub fn to_vendor_code(self) -> u8 {
        match self {
            Self::Auto => 0,
            Self::Low => 2,
            Self::Medium => 4,
            Self::High => 6,
        }
    }
}
