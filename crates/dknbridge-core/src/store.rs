// ── Reactive unit store ──
//
// Cached vendor state with push-based change notification. Each unit
// gets its own `watch` channel so entity adapters see updates for their
// unit only; a roster channel covers enumeration.

use std::sync::Arc;

use dashmap::DashMap;
use dknbridge_api::models::DeviceUpdate;
use tokio::sync::watch;

use crate::convert;
use crate::model::Unit;

/// Reactive storage for all units of one account.
///
/// Keys are hardware addresses. Cloud device ids are kept as a secondary
/// index because pushed events carry ids, not MACs.
pub struct UnitStore {
    by_mac: DashMap<String, watch::Sender<Arc<Unit>>>,
    id_to_mac: DashMap<String, String>,
    roster: watch::Sender<Arc<Vec<Arc<Unit>>>>,
}

impl UnitStore {
    pub fn new() -> Self {
        let (roster, _) = watch::channel(Arc::new(Vec::new()));
        Self {
            by_mac: DashMap::new(),
            id_to_mac: DashMap::new(),
            roster,
        }
    }

    /// Insert or replace a unit snapshot. Returns `true` if the unit was new.
    pub fn upsert(&self, unit: Unit) -> bool {
        self.id_to_mac.insert(unit.id.clone(), unit.mac.clone());

        let mac = unit.mac.clone();
        let snapshot = Arc::new(unit);
        let is_new = match self.by_mac.get(&mac) {
            Some(sender) => {
                sender.send_modify(|current| *current = snapshot);
                false
            }
            None => {
                let (sender, _) = watch::channel(snapshot);
                self.by_mac.insert(mac, sender);
                true
            }
        };

        self.rebuild_roster();
        is_new
    }

    /// Merge a pushed partial update into the unit it addresses.
    ///
    /// Returns `false` when the id is unknown -- an event for a unit we
    /// have never enumerated is dropped, not synthesized.
    pub fn apply_update(&self, device_id: &str, update: &DeviceUpdate) -> bool {
        let Some(mac) = self.id_to_mac.get(device_id).map(|r| r.value().clone()) else {
            return false;
        };
        let Some(sender) = self.by_mac.get(&mac) else {
            return false;
        };

        sender.send_modify(|current| {
            *current = Arc::new(convert::merge_update(current, update));
        });
        drop(sender);

        self.rebuild_roster();
        true
    }

    /// Current snapshot of one unit.
    pub fn get(&self, mac: &str) -> Option<Arc<Unit>> {
        self.by_mac.get(mac).map(|sender| sender.borrow().clone())
    }

    /// Current snapshot of one unit, addressed by cloud id.
    pub fn get_by_id(&self, device_id: &str) -> Option<Arc<Unit>> {
        let mac = self.id_to_mac.get(device_id)?;
        self.get(mac.value())
    }

    /// Subscribe to state changes of one unit.
    pub fn subscribe(&self, mac: &str) -> Option<watch::Receiver<Arc<Unit>>> {
        self.by_mac.get(mac).map(|sender| sender.subscribe())
    }

    /// Current roster snapshot (cheap `Arc` clone), ordered by MAC.
    pub fn snapshot(&self) -> Arc<Vec<Arc<Unit>>> {
        self.roster.borrow().clone()
    }

    /// Subscribe to roster changes.
    pub fn subscribe_roster(&self) -> watch::Receiver<Arc<Vec<Arc<Unit>>>> {
        self.roster.subscribe()
    }

    pub fn len(&self) -> usize {
        self.by_mac.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_mac.is_empty()
    }

    // ── Private helpers ──────────────────────────────────────────────

    /// Collect all units into an ordered roster and broadcast it.
    fn rebuild_roster(&self) {
        let mut units: Vec<Arc<Unit>> = self
            .by_mac
            .iter()
            .map(|entry| entry.value().borrow().clone())
            .collect();
        units.sort_by(|a, b| a.mac.cmp(&b.mac));
        // `send_modify` updates unconditionally, even with zero receivers.
        self.roster.send_modify(|snap| *snap = Arc::new(units));
    }
}

impl Default for UnitStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn unit(id: &str, mac: &str) -> Unit {
        Unit {
            id: id.into(),
            mac: mac.into(),
            name: None,
            manufacturer: None,
            firmware_version: None,
            connected: true,
            machine_ready: true,
            power: true,
            mode_code: 2,
            active_mode_code: 2,
            fan_speed_code: 0,
            current_temp_f: Some(73.0),
            setpoint_cool_f: Some(71.0),
            setpoint_heat_f: None,
            setpoint_auto_f: None,
            rssi_dbm: None,
            ssid: None,
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn upsert_returns_true_for_new_unit() {
        let store = UnitStore::new();
        assert!(store.upsert(unit("dev-1", "aa:aa")));
        assert!(!store.upsert(unit("dev-1", "aa:aa")));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn get_by_mac_and_id() {
        let store = UnitStore::new();
        store.upsert(unit("dev-1", "aa:aa"));

        assert_eq!(store.get("aa:aa").unwrap().id, "dev-1");
        assert_eq!(store.get_by_id("dev-1").unwrap().mac, "aa:aa");
        assert!(store.get("bb:bb").is_none());
        assert!(store.get_by_id("dev-2").is_none());
    }

    #[test]
    fn apply_update_merges_and_notifies() {
        let store = UnitStore::new();
        store.upsert(unit("dev-1", "aa:aa"));
        let mut rx = store.subscribe("aa:aa").unwrap();
        rx.borrow_and_update();

        let update = DeviceUpdate {
            power: Some(false),
            ..DeviceUpdate::default()
        };
        assert!(store.apply_update("dev-1", &update));

        assert!(rx.has_changed().unwrap());
        assert!(!rx.borrow_and_update().power);
        assert!(!store.get("aa:aa").unwrap().power);
    }

    #[test]
    fn update_for_unknown_unit_is_dropped() {
        let store = UnitStore::new();
        store.upsert(unit("dev-1", "aa:aa"));

        let update = DeviceUpdate {
            power: Some(false),
            ..DeviceUpdate::default()
        };
        assert!(!store.apply_update("dev-404", &update));
        assert!(store.get("aa:aa").unwrap().power);
    }

    #[test]
    fn roster_is_ordered_by_mac() {
        let store = UnitStore::new();
        store.upsert(unit("dev-2", "cc:cc"));
        store.upsert(unit("dev-1", "aa:aa"));
        store.upsert(unit("dev-3", "bb:bb"));

        let roster = store.snapshot();
        let macs: Vec<&str> = roster.iter().map(|u| u.mac.as_str()).collect();
        assert_eq!(macs, ["aa:aa", "bb:bb", "cc:cc"]);
    }
}
