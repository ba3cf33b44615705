// ── Climate entity adapter ──
//
// One per HVAC unit. Getters proxy the cached vendor state; setters
// forward to the cloud's machine-event endpoint. The cloud applies
// mutations asynchronously: a setter returning Ok() means the command
// was accepted, and the state change is confirmed by the next pushed
// update. No ordering is guaranteed between a setter and that update.

use std::sync::Arc;

use serde_json::json;
use tokio::sync::watch;
use tracing::{debug, warn};

use dknbridge_api::DknClient;

use crate::error::CoreError;
use crate::model::{ClimateAction, ClimateMode, DeviceInfo, FanSpeed, Unit};
use crate::stream::UnitStream;

/// Host-facing climate entity for one unit.
#[derive(Clone)]
pub struct ClimateEntity {
    client: Arc<DknClient>,
    state: watch::Receiver<Arc<Unit>>,
}

impl ClimateEntity {
    pub(crate) fn new(client: Arc<DknClient>, state: watch::Receiver<Arc<Unit>>) -> Self {
        Self { client, state }
    }

    /// Current cached snapshot of the unit.
    pub fn unit(&self) -> Arc<Unit> {
        self.state.borrow().clone()
    }

    /// Subscribe to state changes of this unit.
    pub fn updates(&self) -> UnitStream {
        UnitStream::new(self.state.clone())
    }

    // ── Identity & metadata ──────────────────────────────────────────

    /// Stable unique id: the unit's hardware address.
    pub fn unique_id(&self) -> String {
        self.unit().mac.clone()
    }

    pub fn name(&self) -> String {
        self.unit().display_name().to_owned()
    }

    pub fn device_info(&self) -> DeviceInfo {
        DeviceInfo::for_unit(&self.unit())
    }

    pub fn sw_version(&self) -> Option<String> {
        self.unit().firmware_version.clone()
    }

    /// Whether the unit can be read and controlled right now.
    pub fn available(&self) -> bool {
        self.unit().is_available()
    }

    // ── Climate state ────────────────────────────────────────────────

    /// Current mode, derived from the power flag and the mode code.
    ///
    /// `None` means the cloud reported a mode code outside the table
    /// while powered on -- unknown, not misreported.
    pub fn hvac_mode(&self) -> Option<ClimateMode> {
        let unit = self.unit();
        ClimateMode::from_vendor(unit.mode_code, unit.power)
    }

    /// Modes a consumer may request.
    pub fn hvac_modes(&self) -> &'static [ClimateMode] {
        &ClimateMode::SELECTABLE
    }

    /// What the machine is actually doing right now.
    pub fn hvac_action(&self) -> Option<ClimateAction> {
        let unit = self.unit();
        ClimateAction::from_vendor(unit.active_mode_code, unit.power)
    }

    /// Ambient temperature measured at the unit, °F.
    pub fn current_temperature(&self) -> Option<f64> {
        self.unit().current_temp_f
    }

    /// The setpoint for the current mode, °F.
    ///
    /// FanOnly, Dry, and Off have no setpoint: `None`.
    pub fn target_temperature(&self) -> Option<f64> {
        let unit = self.unit();
        match ClimateMode::from_vendor(unit.mode_code, unit.power)? {
            ClimateMode::Cool => unit.setpoint_cool_f,
            ClimateMode::Heat => unit.setpoint_heat_f,
            ClimateMode::HeatCool => unit.setpoint_auto_f,
            ClimateMode::FanOnly | ClimateMode::Dry | ClimateMode::Off => None,
        }
    }

    pub fn fan_mode(&self) -> Option<FanSpeed> {
        FanSpeed::from_vendor(self.unit().fan_speed_code)
    }

    /// Fan speeds a consumer may request.
    pub fn fan_modes(&self) -> &'static [FanSpeed] {
        &FanSpeed::SELECTABLE
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Change the operating mode.
    ///
    /// Turning on sends the mode code BEFORE the power-on flag so the
    /// unit never activates in an undefined mode. Turning off sends the
    /// power-off flag only. A mode change while already on sends only
    /// the mode code.
    pub async fn set_hvac_mode(&self, mode: ClimateMode) -> Result<(), CoreError> {
        let unit = self.unit();
        let currently_on = unit.power;
        let turn_on = mode != ClimateMode::Off;

        debug!(unit = %unit.mac, %mode, "setting hvac mode");

        if let Some(code) = mode.to_vendor_code() {
            self.client
                .set_device_value(&unit.id, "mode", &json!(code))
                .await?;
        }
        if turn_on != currently_on {
            self.client
                .set_device_value(&unit.id, "power", &json!(turn_on))
                .await?;
        }
        Ok(())
    }

    /// Change the fan speed.
    pub async fn set_fan_mode(&self, speed: FanSpeed) -> Result<(), CoreError> {
        let unit = self.unit();
        debug!(unit = %unit.mac, %speed, "setting fan speed");

        self.client
            .set_device_value(&unit.id, "speed_state", &json!(speed.to_vendor_code()))
            .await?;
        Ok(())
    }

    /// Change the setpoint for the current mode.
    ///
    /// The target is optional because the host passes it through from a
    /// loosely-typed service call; a missing target is an update
    /// failure, as is a setpoint request while in a mode without one.
    /// A rejected cloud call is re-signaled as the same generic failure
    /// (the cause is logged, not propagated).
    pub async fn set_temperature(&self, target_f: Option<f64>) -> Result<(), CoreError> {
        let Some(target) = target_f else {
            return Err(CoreError::UpdateFailed {
                message: "no target temperature specified".into(),
            });
        };

        let unit = self.unit();
        let field = match ClimateMode::from_vendor(unit.mode_code, unit.power) {
            Some(ClimateMode::Cool) => "setpoint_air_cool",
            Some(ClimateMode::Heat) => "setpoint_air_heat",
            Some(ClimateMode::HeatCool) => "setpoint_air_auto",
            other => {
                return Err(CoreError::UpdateFailed {
                    message: format!(
                        "no setpoint in mode {}",
                        other.map_or_else(|| "unknown".into(), |m| m.to_string())
                    ),
                });
            }
        };

        debug!(unit = %unit.mac, field, target, "setting target temperature");

        if let Err(e) = self
            .client
            .set_device_value(&unit.id, field, &json!(target))
            .await
        {
            warn!(unit = %unit.mac, error = %e, "temperature update rejected by cloud");
            return Err(CoreError::UpdateFailed {
                message: "temperature update failed".into(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;
    use url::Url;

    fn entity(unit: Unit) -> (watch::Sender<Arc<Unit>>, ClimateEntity) {
        let client = Arc::new(DknClient::with_client(
            reqwest::Client::new(),
            Url::parse("http://cloud.invalid").unwrap(),
        ));
        let (tx, rx) = watch::channel(Arc::new(unit));
        (tx, ClimateEntity::new(client, rx))
    }

    fn unit_in(mode_code: u8, power: bool) -> Unit {
        Unit {
            id: "dev-1".into(),
            mac: "aa:bb:cc:dd:ee:ff".into(),
            name: Some("Living room".into()),
            manufacturer: Some("Daikin Industries".into()),
            firmware_version: Some("1.0.4".into()),
            connected: true,
            machine_ready: true,
            power,
            mode_code,
            active_mode_code: mode_code,
            fan_speed_code: 4,
            current_temp_f: Some(74.5),
            setpoint_cool_f: Some(72.0),
            setpoint_heat_f: Some(68.0),
            setpoint_auto_f: Some(70.0),
            rssi_dbm: Some(-61),
            ssid: Some("HomeWifi".into()),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn mode_reads_off_when_powered_down() {
        let (_tx, entity) = entity(unit_in(2, false));
        assert_eq!(entity.hvac_mode(), Some(ClimateMode::Off));
        assert_eq!(entity.hvac_action(), Some(ClimateAction::Off));
    }

    #[test]
    fn target_temperature_tracks_mode() {
        let (_tx, cool) = entity(unit_in(2, true));
        assert_eq!(cool.target_temperature(), Some(72.0));

        let (_tx, heat) = entity(unit_in(3, true));
        assert_eq!(heat.target_temperature(), Some(68.0));

        let (_tx, auto) = entity(unit_in(1, true));
        assert_eq!(auto.target_temperature(), Some(70.0));
    }

    #[test]
    fn target_temperature_unavailable_in_fan_and_dry() {
        let (_tx, fan) = entity(unit_in(4, true));
        assert_eq!(fan.target_temperature(), None);

        let (_tx, dry) = entity(unit_in(5, true));
        assert_eq!(dry.target_temperature(), None);

        let (_tx, off) = entity(unit_in(2, false));
        assert_eq!(off.target_temperature(), None);
    }

    #[test]
    fn metadata_comes_from_the_unit() {
        let (_tx, entity) = entity(unit_in(2, true));

        assert_eq!(entity.unique_id(), "aa:bb:cc:dd:ee:ff");
        assert_eq!(entity.name(), "Living room");
        assert!(entity.available());

        let info = entity.device_info();
        assert_eq!(info.manufacturer, "Daikin");
        assert_eq!(info.model.as_deref(), Some("Daikin Industries"));
        assert_eq!(info.sw_version.as_deref(), Some("1.0.4"));
        assert_eq!(
            info.identifiers,
            vec![("dknbridge".to_owned(), "aa:bb:cc:dd:ee:ff".to_owned())]
        );
    }

    #[test]
    fn unavailable_when_machine_not_ready() {
        let mut unit = unit_in(2, true);
        unit.machine_ready = false;
        let (_tx, entity) = entity(unit);
        assert!(!entity.available());
    }

    #[test]
    fn fan_mode_translates_speed_code() {
        let (_tx, entity) = entity(unit_in(2, true));
        assert_eq!(entity.fan_mode(), Some(FanSpeed::Medium));
    }

    #[tokio::test]
    async fn missing_target_temperature_is_an_update_failure() {
        let (_tx, entity) = entity(unit_in(2, true));

        let result = entity.set_temperature(None).await;
        assert!(
            matches!(result, Err(CoreError::UpdateFailed { .. })),
            "expected UpdateFailed, got: {result:?}"
        );
    }

    #[tokio::test]
    async fn setpoint_in_fan_only_is_an_update_failure() {
        let (_tx, entity) = entity(unit_in(4, true));

        let result = entity.set_temperature(Some(72.0)).await;
        match result {
            Err(CoreError::UpdateFailed { ref message }) => {
                assert!(message.contains("fan_only"), "got: {message}");
            }
            other => panic!("expected UpdateFailed, got: {other:?}"),
        }
    }

    #[tokio::test]
    async fn entity_sees_pushed_updates() {
        let (tx, entity) = entity(unit_in(2, true));
        let mut updates = entity.updates();

        let mut next = unit_in(3, true);
        next.setpoint_heat_f = Some(69.0);
        tx.send(Arc::new(next)).unwrap();

        let snap = updates.changed().await.unwrap();
        assert_eq!(snap.mode_code, 3);
        assert_eq!(entity.hvac_mode(), Some(ClimateMode::Heat));
        assert_eq!(entity.target_temperature(), Some(69.0));
    }
}
