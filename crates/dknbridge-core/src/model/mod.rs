// ── Domain model ──

mod climate;
mod unit;

pub use climate::{ClimateAction, ClimateMode, FanSpeed};
pub use unit::{DeviceInfo, Unit};
