// ── Wire-to-domain conversion ──
//
// `dknbridge-api` hands us wire payloads; everything downstream works on
// the canonical `Unit`. Pushed events are partial, so merging is
// field-by-field: an absent field means "unchanged", never "cleared".

use chrono::Utc;
use dknbridge_api::models::{ApiDevice, DeviceUpdate};

use crate::model::Unit;

/// Build a canonical unit from a full cloud device payload.
pub fn unit_from_api(device: ApiDevice) -> Unit {
    Unit {
        id: device.id,
        mac: device.mac,
        name: device.name,
        manufacturer: device.manufacturer.and_then(|m| m.text),
        firmware_version: device.version,
        connected: device.connected,
        machine_ready: device.machine_ready,
        power: device.power,
        mode_code: device.mode,
        active_mode_code: device.real_mode,
        fan_speed_code: device.speed_state,
        current_temp_f: device.work_temp,
        setpoint_cool_f: device.setpoint_air_cool,
        setpoint_heat_f: device.setpoint_air_heat,
        setpoint_auto_f: device.setpoint_air_auto,
        rssi_dbm: device.rssi,
        ssid: device.ssid,
        updated_at: Utc::now(),
    }
}

/// Merge a pushed partial update into an existing unit snapshot.
pub fn merge_update(unit: &Unit, update: &DeviceUpdate) -> Unit {
    let mut next = unit.clone();

    if let Some(ref name) = update.name {
        next.name = Some(name.clone());
    }
    if let Some(power) = update.power {
        next.power = power;
    }
    if let Some(mode) = update.mode {
        next.mode_code = mode;
    }
    if let Some(real_mode) = update.real_mode {
        next.active_mode_code = real_mode;
    }
    if let Some(speed) = update.speed_state {
        next.fan_speed_code = speed;
    }
    if let Some(temp) = update.work_temp {
        next.current_temp_f = Some(temp);
    }
    if let Some(setpoint) = update.setpoint_air_cool {
        next.setpoint_cool_f = Some(setpoint);
    }
    if let Some(setpoint) = update.setpoint_air_heat {
        next.setpoint_heat_f = Some(setpoint);
    }
    if let Some(setpoint) = update.setpoint_air_auto {
        next.setpoint_auto_f = Some(setpoint);
    }
    if let Some(connected) = update.connected {
        next.connected = connected;
    }
    if let Some(ready) = update.machine_ready {
        next.machine_ready = ready;
    }
    if let Some(ref version) = update.version {
        next.firmware_version = Some(version.clone());
    }
    if let Some(rssi) = update.rssi {
        next.rssi_dbm = Some(rssi);
    }
    if let Some(ref ssid) = update.ssid {
        next.ssid = Some(ssid.clone());
    }

    next.updated_at = Utc::now();
    next
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use dknbridge_api::models::ManufacturerInfo;

    fn wire_device() -> ApiDevice {
        serde_json::from_value(serde_json::json!({
            "id": "dev-1",
            "mac": "aa:bb:cc:dd:ee:ff",
            "name": "Living room",
            "power": true,
            "mode": 2,
            "real_mode": 2,
            "speed_state": 4,
            "work_temp": 74.5,
            "setpoint_air_cool": 72.0,
            "isConnected": true,
            "machineready": true,
            "version": "1.0.4",
            "manufacturer": { "text": "Daikin Industries" },
            "rssi": -61,
            "ssid": "HomeWifi"
        }))
        .unwrap()
    }

    #[test]
    fn converts_full_payload() {
        let unit = unit_from_api(wire_device());

        assert_eq!(unit.mac, "aa:bb:cc:dd:ee:ff");
        assert_eq!(unit.manufacturer.as_deref(), Some("Daikin Industries"));
        assert!(unit.power);
        assert_eq!(unit.mode_code, 2);
        assert_eq!(unit.fan_speed_code, 4);
        assert_eq!(unit.setpoint_cool_f, Some(72.0));
        assert_eq!(unit.setpoint_heat_f, None);
        assert_eq!(unit.rssi_dbm, Some(-61));
        assert!(unit.is_available());
    }

    #[test]
    fn manufacturer_text_becomes_model_source() {
        let mut device = wire_device();
        device.manufacturer = Some(ManufacturerInfo { text: None });
        assert_eq!(unit_from_api(device).manufacturer, None);
    }

    #[test]
    fn merge_keeps_absent_fields() {
        let unit = unit_from_api(wire_device());
        let update = DeviceUpdate {
            mode: Some(3),
            setpoint_air_heat: Some(68.0),
            ..DeviceUpdate::default()
        };

        let merged = merge_update(&unit, &update);

        assert_eq!(merged.mode_code, 3);
        assert_eq!(merged.setpoint_heat_f, Some(68.0));
        // Untouched fields survive the merge.
        assert!(merged.power);
        assert_eq!(merged.setpoint_cool_f, Some(72.0));
        assert_eq!(merged.ssid.as_deref(), Some("HomeWifi"));
    }

    #[test]
    fn merge_applies_power_and_connectivity() {
        let unit = unit_from_api(wire_device());
        let update = DeviceUpdate {
            power: Some(false),
            connected: Some(false),
            ..DeviceUpdate::default()
        };

        let merged = merge_update(&unit, &update);

        assert!(!merged.power);
        assert!(!merged.is_available());
    }
}
