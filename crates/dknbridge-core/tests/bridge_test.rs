#![allow(clippy::unwrap_used)]
// Integration tests for the Bridge lifecycle and climate command
// sequencing, using wiremock as the cloud.

use std::time::Duration;

use serde_json::{Value, json};
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use dknbridge_core::{Bridge, BridgeConfig, BridgeState, ClimateMode, CoreError, FanSpeed};

// ── Helpers ─────────────────────────────────────────────────────────

const MAC: &str = "aa:bb:cc:dd:ee:ff";

fn device_json(power: bool, mode: u8) -> Value {
    json!({
        "id": "dev-1",
        "mac": MAC,
        "name": "Living room",
        "power": power,
        "mode": mode,
        "real_mode": mode,
        "speed_state": 4,
        "work_temp": 74.5,
        "setpoint_air_cool": 72.0,
        "setpoint_air_heat": 68.0,
        "setpoint_air_auto": 70.0,
        "isConnected": true,
        "machineready": true,
        "version": "1.0.4",
        "manufacturer": { "text": "Daikin Industries" },
        "rssi": -61,
        "ssid": "HomeWifi"
    })
}

async fn mock_cloud(device: Value) -> MockServer {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/users/sign_in"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "user": { "email": "home@example.com", "authentication_token": "tok-123" }
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/installation_relations"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "installation_relations": [{
                "installation": { "id": "inst-1", "devices": [device] }
            }]
        })))
        .mount(&server)
        .await;

    Mock::given(method("PUT"))
        .and(path("/events"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&server)
        .await;

    Mock::given(method("DELETE"))
        .and(path("/users/sign_out"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&server)
        .await;

    server
}

async fn connected_bridge(server: &MockServer) -> Bridge {
    let config = BridgeConfig {
        base_url: Url::parse(&server.uri()).unwrap(),
        email: "home@example.com".into(),
        password: "hunter2".to_string().into(),
        timeout: Duration::from_secs(5),
        // Tests drive state directly; no pushed stream, no surprise polls.
        events_enabled: false,
        poll_interval: Duration::from_secs(3600),
    };
    let bridge = Bridge::new("entry-1", config).unwrap();
    bridge.connect().await.unwrap();
    bridge
}

/// The `(option, value)` pairs of every machine event the cloud saw,
/// in the order they arrived.
async fn machine_events(server: &MockServer) -> Vec<(String, Value)> {
    server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .filter(|req| req.url.path() == "/events")
        .map(|req| {
            let body: Value = serde_json::from_slice(&req.body).unwrap();
            (
                body["event"]["option"].as_str().unwrap().to_owned(),
                body["event"]["value"].clone(),
            )
        })
        .collect()
}

// ── Lifecycle tests ─────────────────────────────────────────────────

#[tokio::test]
async fn connect_seeds_units_and_entities() {
    let server = mock_cloud(device_json(true, 2)).await;
    let bridge = connected_bridge(&server).await;

    assert_eq!(*bridge.state().borrow(), BridgeState::Connected);
    assert_eq!(bridge.store().len(), 1);

    let climates = bridge.climate_entities();
    assert_eq!(climates.len(), 1);
    assert_eq!(climates[0].unique_id(), MAC);
    assert_eq!(climates[0].hvac_mode(), Some(ClimateMode::Cool));
    assert_eq!(climates[0].target_temperature(), Some(72.0));

    // Both wifi fields are reported, so both sensors exist.
    let sensors = bridge.sensor_entities();
    assert_eq!(sensors.len(), 2);
}

#[tokio::test]
async fn connect_failure_reports_failed_state() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/users/sign_in"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let config = BridgeConfig {
        base_url: Url::parse(&server.uri()).unwrap(),
        email: "home@example.com".into(),
        password: "wrong".to_string().into(),
        timeout: Duration::from_secs(5),
        events_enabled: false,
        poll_interval: Duration::from_secs(3600),
    };
    let bridge = Bridge::new("entry-1", config).unwrap();

    let result = bridge.connect().await;
    assert!(
        matches!(result, Err(CoreError::AuthenticationFailed { .. })),
        "expected AuthenticationFailed, got: {result:?}"
    );
    assert_eq!(*bridge.state().borrow(), BridgeState::Failed);
}

#[tokio::test]
async fn disconnect_signs_out_and_resets_state() {
    let server = mock_cloud(device_json(true, 2)).await;
    let bridge = connected_bridge(&server).await;

    bridge.disconnect().await;

    assert_eq!(*bridge.state().borrow(), BridgeState::Disconnected);
    let requests = server.received_requests().await.unwrap();
    assert!(
        requests.iter().any(|r| r.url.path() == "/users/sign_out"),
        "expected a sign-out call"
    );
}

// ── Command sequencing tests ────────────────────────────────────────

#[tokio::test]
async fn turning_off_sends_power_only() {
    let server = mock_cloud(device_json(true, 2)).await;
    let bridge = connected_bridge(&server).await;
    let climate = bridge.climate_entity(MAC).unwrap();

    climate.set_hvac_mode(ClimateMode::Off).await.unwrap();

    let events = machine_events(&server).await;
    assert_eq!(events, vec![("power".to_owned(), json!(false))]);
}

#[tokio::test]
async fn turning_on_sends_mode_before_power() {
    let server = mock_cloud(device_json(false, 2)).await;
    let bridge = connected_bridge(&server).await;
    let climate = bridge.climate_entity(MAC).unwrap();

    climate.set_hvac_mode(ClimateMode::Heat).await.unwrap();

    let events = machine_events(&server).await;
    assert_eq!(
        events,
        vec![
            ("mode".to_owned(), json!(3)),
            ("power".to_owned(), json!(true)),
        ]
    );
}

#[tokio::test]
async fn mode_change_while_on_skips_power() {
    let server = mock_cloud(device_json(true, 2)).await;
    let bridge = connected_bridge(&server).await;
    let climate = bridge.climate_entity(MAC).unwrap();

    climate.set_hvac_mode(ClimateMode::Dry).await.unwrap();

    let events = machine_events(&server).await;
    assert_eq!(events, vec![("mode".to_owned(), json!(5))]);
}

#[tokio::test]
async fn turning_off_while_off_sends_nothing() {
    let server = mock_cloud(device_json(false, 2)).await;
    let bridge = connected_bridge(&server).await;
    let climate = bridge.climate_entity(MAC).unwrap();

    climate.set_hvac_mode(ClimateMode::Off).await.unwrap();

    assert!(machine_events(&server).await.is_empty());
}

#[tokio::test]
async fn fan_speed_forwards_vendor_code() {
    let server = mock_cloud(device_json(true, 2)).await;
    let bridge = connected_bridge(&server).await;
    let climate = bridge.climate_entity(MAC).unwrap();

    climate.set_fan_mode(FanSpeed::High).await.unwrap();

    let events = machine_events(&server).await;
    assert_eq!(events, vec![("speed_state".to_owned(), json!(6))]);
}

#[tokio::test]
async fn temperature_targets_the_mode_setpoint() {
    let server = mock_cloud(device_json(true, 3)).await;
    let bridge = connected_bridge(&server).await;
    let climate = bridge.climate_entity(MAC).unwrap();

    climate.set_temperature(Some(69.0)).await.unwrap();

    let events = machine_events(&server).await;
    assert_eq!(events, vec![("setpoint_air_heat".to_owned(), json!(69.0))]);
}

#[tokio::test]
async fn cloud_rejection_becomes_generic_update_failure() {
    let server = mock_cloud(device_json(true, 2)).await;
    let bridge = connected_bridge(&server).await;
    let climate = bridge.climate_entity(MAC).unwrap();

    // Replace the accepting event mock with a rejecting one.
    server.reset().await;
    Mock::given(method("PUT"))
        .and(path("/events"))
        .respond_with(ResponseTemplate::new(500).set_body_string("machine offline"))
        .mount(&server)
        .await;

    let result = climate.set_temperature(Some(71.0)).await;
    match result {
        Err(CoreError::UpdateFailed { ref message }) => {
            // The original cause is logged, not propagated.
            assert!(!message.contains("500"), "cause leaked into: {message}");
        }
        other => panic!("expected UpdateFailed, got: {other:?}"),
    }
}
