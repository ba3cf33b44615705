// ── Host-facing entity adapters ──

mod climate;
mod sensor;

pub use climate::ClimateEntity;
pub use sensor::{SensorEntity, SensorKind, SensorStateClass, SensorValue};
