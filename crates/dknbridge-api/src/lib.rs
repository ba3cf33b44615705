// dknbridge-api: Async Rust client for the DKN Cloud NA HVAC API

pub mod client;
pub mod error;
pub mod events;
pub mod models;

pub use client::DknClient;
pub use error::Error;
pub use events::{EventsHandle, ReconnectConfig};
pub use models::{ApiDevice, DeviceEvent, DeviceUpdate, Installation};
