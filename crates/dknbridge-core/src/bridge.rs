// ── Bridge lifecycle ──
//
// One Bridge per configured cloud account (one "config entry" on the
// host side). Handles authentication, the initial device fetch, and the
// background event-apply loop that keeps cached unit state current.
// Entity adapters are vended from here and share the account's single
// cloud client read-only.

use std::sync::Arc;

use tokio::sync::{Mutex, broadcast, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use dknbridge_api::{DknClient, EventsHandle, ReconnectConfig};

use crate::config::BridgeConfig;
use crate::convert;
use crate::entity::{ClimateEntity, SensorEntity, SensorKind};
use crate::error::CoreError;
use crate::store::UnitStore;

// ── BridgeState ──────────────────────────────────────────────────────

/// Connection state observable by consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgeState {
    Disconnected,
    Connecting,
    Connected,
    Failed,
}

// ── Bridge ───────────────────────────────────────────────────────────

/// The main entry point for consumers.
///
/// Cheaply cloneable via `Arc<BridgeInner>`. Created at config-entry
/// setup, torn down at unload: [`connect()`](Self::connect)
/// authenticates and seeds the unit store, [`disconnect()`](Self::disconnect)
/// cancels background work and drops the session.
#[derive(Clone)]
pub struct Bridge {
    inner: Arc<BridgeInner>,
}

struct BridgeInner {
    entry_id: String,
    config: BridgeConfig,
    client: Arc<DknClient>,
    store: Arc<UnitStore>,
    state: watch::Sender<BridgeState>,
    cancel: CancellationToken,
    /// Child token for the current connection — cancelled on disconnect,
    /// replaced on reconnect (avoids permanent cancellation).
    cancel_child: Mutex<CancellationToken>,
    events: Mutex<Option<EventsHandle>>,
    task_handles: Mutex<Vec<JoinHandle<()>>>,
}

impl Bridge {
    /// Create a new Bridge for one account. Does NOT connect --
    /// call [`connect()`](Self::connect) to authenticate and start the
    /// background tasks.
    pub fn new(entry_id: impl Into<String>, config: BridgeConfig) -> Result<Self, CoreError> {
        let client = DknClient::new(config.base_url.clone(), Some(config.timeout))?;
        let (state, _) = watch::channel(BridgeState::Disconnected);
        let cancel = CancellationToken::new();
        let cancel_child = cancel.child_token();

        Ok(Self {
            inner: Arc::new(BridgeInner {
                entry_id: entry_id.into(),
                config,
                client: Arc::new(client),
                store: Arc::new(UnitStore::new()),
                state,
                cancel,
                cancel_child: Mutex::new(cancel_child),
                events: Mutex::new(None),
                task_handles: Mutex::new(Vec::new()),
            }),
        })
    }

    /// The configuration-entry identifier this bridge was created for.
    pub fn entry_id(&self) -> &str {
        &self.inner.entry_id
    }

    /// Access the bridge configuration.
    pub fn config(&self) -> &BridgeConfig {
        &self.inner.config
    }

    /// Access the underlying unit store.
    pub fn store(&self) -> &Arc<UnitStore> {
        &self.inner.store
    }

    /// Subscribe to connection state changes.
    pub fn state(&self) -> watch::Receiver<BridgeState> {
        self.inner.state.subscribe()
    }

    // ── Connection lifecycle ─────────────────────────────────────────

    /// Connect to the cloud.
    ///
    /// Authenticates, fetches the initial device list, and spawns the
    /// event-apply task (or a poll task when the event stream is
    /// disabled).
    pub async fn connect(&self) -> Result<(), CoreError> {
        let _ = self.inner.state.send(BridgeState::Connecting);

        // Fresh child token for this connection (supports reconnect).
        let child = self.inner.cancel.child_token();
        *self.inner.cancel_child.lock().await = child.clone();

        let config = &self.inner.config;
        if let Err(e) = self
            .inner
            .client
            .login(&config.email, &config.password)
            .await
        {
            let _ = self.inner.state.send(BridgeState::Failed);
            return Err(e.into());
        }
        debug!(email = %config.email, "signed in to DKN cloud");

        // Initial device load
        refresh_units(&self.inner.client, &self.inner.store).await?;
        info!(units = self.inner.store.len(), "initial device fetch complete");

        // Background tasks
        let mut handles = self.inner.task_handles.lock().await;

        if config.events_enabled {
            match self.inner.client.events_url() {
                Ok(ws_url) => {
                    let handle =
                        EventsHandle::connect(ws_url, ReconnectConfig::default(), child.child_token());
                    handles.push(spawn_event_apply_task(
                        handle.subscribe(),
                        Arc::clone(&self.inner.client),
                        Arc::clone(&self.inner.store),
                        child.clone(),
                    ));
                    *self.inner.events.lock().await = Some(handle);
                }
                Err(e) => {
                    // Non-fatal — the poll task keeps state moving.
                    warn!(error = %e, "event stream unavailable, falling back to polling");
                    handles.push(spawn_poll_task(
                        Arc::clone(&self.inner.client),
                        Arc::clone(&self.inner.store),
                        config.poll_interval,
                        child.clone(),
                    ));
                }
            }
        } else {
            handles.push(spawn_poll_task(
                Arc::clone(&self.inner.client),
                Arc::clone(&self.inner.store),
                config.poll_interval,
                child.clone(),
            ));
        }
        drop(handles);

        let _ = self.inner.state.send(BridgeState::Connected);
        info!("bridge connected");
        Ok(())
    }

    /// Disconnect from the cloud.
    ///
    /// Cancels background tasks, signs out best-effort, and resets the
    /// state to [`Disconnected`](BridgeState::Disconnected).
    pub async fn disconnect(&self) {
        // Cancel the child token (not the parent — allows reconnect).
        self.inner.cancel_child.lock().await.cancel();

        let mut handles = self.inner.task_handles.lock().await;
        for handle in handles.drain(..) {
            let _ = handle.await;
        }
        drop(handles);

        if let Some(events) = self.inner.events.lock().await.take() {
            events.shutdown();
        }

        if self.inner.client.is_signed_in() {
            if let Err(e) = self.inner.client.logout().await {
                warn!(error = %e, "sign-out failed (non-fatal)");
            }
        }

        let _ = self.inner.state.send(BridgeState::Disconnected);
        debug!("bridge disconnected");
    }

    /// Fetch the full device list and update cached state.
    ///
    /// Normally the pushed event stream keeps state current; this is the
    /// recovery path (event-receiver lag, poll fallback, consumer-forced
    /// resync).
    pub async fn refresh(&self) -> Result<(), CoreError> {
        refresh_units(&self.inner.client, &self.inner.store).await
    }

    // ── Entity accessors ─────────────────────────────────────────────

    /// Climate entity adapters for every known unit.
    pub fn climate_entities(&self) -> Vec<ClimateEntity> {
        self.inner
            .store
            .snapshot()
            .iter()
            .filter_map(|unit| self.climate_entity(&unit.mac))
            .collect()
    }

    /// Climate entity adapter for one unit.
    pub fn climate_entity(&self, mac: &str) -> Option<ClimateEntity> {
        let state = self.inner.store.subscribe(mac)?;
        Some(ClimateEntity::new(Arc::clone(&self.inner.client), state))
    }

    /// Sensor entity adapters for every unit field that is reported.
    pub fn sensor_entities(&self) -> Vec<SensorEntity> {
        let mut sensors = Vec::new();
        for unit in self.inner.store.snapshot().iter() {
            for kind in SensorKind::ALL {
                if kind.reading(unit).is_none() {
                    continue;
                }
                if let Some(state) = self.inner.store.subscribe(&unit.mac) {
                    sensors.push(SensorEntity::new(kind, state));
                }
            }
        }
        sensors
    }
}

// ── Background tasks ─────────────────────────────────────────────────

/// Fetch all devices and upsert them into the store.
async fn refresh_units(client: &DknClient, store: &UnitStore) -> Result<(), CoreError> {
    let devices = client.list_devices().await?;
    for device in devices {
        store.upsert(convert::unit_from_api(device));
    }
    Ok(())
}

/// Apply pushed events to the store until cancelled.
fn spawn_event_apply_task(
    mut rx: broadcast::Receiver<Arc<dknbridge_api::DeviceEvent>>,
    client: Arc<DknClient>,
    store: Arc<UnitStore>,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                result = rx.recv() => {
                    match result {
                        Ok(event) => {
                            if event.update.is_empty() {
                                debug!(device_id = %event.device_id, "empty event frame");
                            } else if !store.apply_update(&event.device_id, &event.update) {
                                debug!(
                                    device_id = %event.device_id,
                                    "event for unknown unit dropped"
                                );
                            }
                        }
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            warn!(skipped, "event receiver lagged, forcing a refresh");
                            if let Err(e) = refresh_units(&client, &store).await {
                                warn!(error = %e, "refresh after lag failed");
                            }
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                    }
                }
            }
        }
    })
}

/// Periodic full refresh, used when the event stream is unavailable.
fn spawn_poll_task(
    client: Arc<DknClient>,
    store: Arc<UnitStore>,
    interval: std::time::Duration,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        // The first tick fires immediately; connect() just refreshed.
        ticker.tick().await;

        loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    if let Err(e) = refresh_units(&client, &store).await {
                        warn!(error = %e, "poll refresh failed");
                    }
                }
            }
        }
    })
}
