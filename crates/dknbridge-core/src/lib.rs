//! Domain layer between `dknbridge-api` and home-automation hosts.
//!
//! This crate owns the business logic, domain model, and reactive data
//! infrastructure for the dknbridge workspace:
//!
//! - **[`Bridge`]** — One per cloud account (per host config entry).
//!   [`connect()`](Bridge::connect) authenticates, fetches an initial
//!   device snapshot, then spawns the event-apply task that keeps cached
//!   state current from the cloud's pushed updates.
//!   [`disconnect()`](Bridge::disconnect) is the unload path.
//!
//! - **[`UnitStore`]** — Reactive cached state built on `DashMap` +
//!   per-unit `tokio::sync::watch` channels. Merges pushed partial
//!   updates into canonical [`Unit`] snapshots.
//!
//! - **[`ClimateEntity`] / [`SensorEntity`]** — Host-facing adapters.
//!   Getters proxy cached vendor fields; setters forward to the cloud's
//!   machine-event endpoint. [`UnitStream`] is the update-callback
//!   surface: hosts await changes instead of registering callbacks.
//!
//! - **Mode translation** ([`ClimateMode`], [`FanSpeed`]) — The
//!   bijective tables between vendor integer codes and host climate
//!   vocabulary, including the power-flag special case for `Off`.

pub mod bridge;
pub mod config;
pub mod convert;
pub mod entity;
pub mod error;
pub mod model;
pub mod store;
pub mod stream;

// ── Primary re-exports ──────────────────────────────────────────────
pub use bridge::{Bridge, BridgeState};
pub use config::{BridgeConfig, DEFAULT_BASE_URL};
pub use entity::{ClimateEntity, SensorEntity, SensorKind, SensorStateClass, SensorValue};
pub use error::CoreError;
pub use store::UnitStore;
pub use stream::{UnitStream, UnitWatchStream};

// Re-export model types at the crate root for ergonomics.
pub use model::{ClimateAction, ClimateMode, DeviceInfo, FanSpeed, Unit};
