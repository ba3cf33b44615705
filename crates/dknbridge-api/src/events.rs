//! Device event stream with auto-reconnect.
//!
//! Connects to the cloud's websocket endpoint and streams parsed
//! [`DeviceEvent`]s through a [`tokio::sync::broadcast`] channel. The
//! cloud pushes a partial field update whenever a unit's state changes,
//! including changes caused by this client's own setter calls -- that
//! push is the only confirmation a setter ever gets.
//!
//! Reconnection with exponential backoff is handled here; consumers just
//! keep reading from their receiver.

use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use tokio::sync::broadcast;
use tokio_tungstenite::tungstenite::{self, ClientRequestBuilder};
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::error::Error;
use crate::models::DeviceEvent;

const EVENT_CHANNEL_CAPACITY: usize = 256;

// ── ReconnectConfig ──────────────────────────────────────────────────

/// Exponential backoff configuration for stream reconnection.
#[derive(Debug, Clone)]
pub struct ReconnectConfig {
    /// Delay before the first reconnection attempt. Default: 1s.
    pub initial_delay: Duration,

    /// Upper bound on backoff delay. Default: 30s.
    pub max_delay: Duration,

    /// Maximum reconnection attempts before giving up.
    /// `None` means retry forever.
    pub max_retries: Option<u32>,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            max_retries: None,
        }
    }
}

// ── EventsHandle ─────────────────────────────────────────────────────

/// Handle to a running event stream.
///
/// Subscribe for events, call [`shutdown`](Self::shutdown) to tear down
/// the background task.
pub struct EventsHandle {
    event_rx: broadcast::Receiver<Arc<DeviceEvent>>,
    cancel: CancellationToken,
}

impl EventsHandle {
    /// Spawn the reconnection loop against an authenticated stream URL
    /// (see `DknClient::events_url`).
    ///
    /// Returns immediately; the first connection attempt happens
    /// asynchronously. Subscribe to the receiver to start consuming.
    pub fn connect(ws_url: Url, reconnect: ReconnectConfig, cancel: CancellationToken) -> Self {
        let (event_tx, event_rx) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        let task_cancel = cancel.clone();
        tokio::spawn(async move {
            stream_loop(ws_url, event_tx, reconnect, task_cancel).await;
        });

        Self { event_rx, cancel }
    }

    /// Get a new broadcast receiver for the event stream.
    ///
    /// Multiple consumers can subscribe concurrently. A consumer that
    /// falls behind receives [`broadcast::error::RecvError::Lagged`].
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<DeviceEvent>> {
        self.event_rx.resubscribe()
    }

    /// Signal the background task to shut down gracefully.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }
}

// ── Background reconnection loop ─────────────────────────────────────

/// Main loop: connect → read → on error, backoff → reconnect.
async fn stream_loop(
    ws_url: Url,
    event_tx: broadcast::Sender<Arc<DeviceEvent>>,
    reconnect: ReconnectConfig,
    cancel: CancellationToken,
) {
    let mut attempt: u32 = 0;

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            result = connect_and_read(&ws_url, &event_tx, &cancel) => {
                match result {
                    // Clean disconnect (server close frame or stream ended).
                    // Reset the attempt counter and reconnect immediately.
                    Ok(()) => {
                        tracing::info!("event stream disconnected cleanly, reconnecting");
                        attempt = 0;
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, attempt, "event stream error");

                        if let Some(max) = reconnect.max_retries {
                            if attempt >= max {
                                tracing::error!(
                                    max_retries = max,
                                    "event stream reconnection limit reached, giving up"
                                );
                                break;
                            }
                        }

                        let delay = backoff_delay(attempt, &reconnect);
                        tokio::select! {
                            biased;
                            () = cancel.cancelled() => break,
                            () = tokio::time::sleep(delay) => {}
                        }
                        attempt = attempt.saturating_add(1);
                    }
                }
            }
        }
    }

    tracing::debug!("event stream loop exited");
}

/// One connection lifetime: dial, then read messages until close/error.
async fn connect_and_read(
    ws_url: &Url,
    event_tx: &broadcast::Sender<Arc<DeviceEvent>>,
    cancel: &CancellationToken,
) -> Result<(), Error> {
    let uri: tungstenite::http::Uri = ws_url
        .as_str()
        .parse()
        .map_err(|e| Error::EventStreamConnect(format!("invalid stream URL: {e}")))?;
    let request = ClientRequestBuilder::new(uri);

    let (stream, _response) = tokio_tungstenite::connect_async(request)
        .await
        .map_err(|e| Error::EventStreamConnect(e.to_string()))?;
    tracing::debug!("event stream connected");

    let (_write, mut read) = stream.split();

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => return Ok(()),
            message = read.next() => {
                match message {
                    Some(Ok(tungstenite::Message::Text(text))) => {
                        match serde_json::from_str::<DeviceEvent>(text.as_str()) {
                            Ok(event) => {
                                // Only errors when there are zero receivers.
                                let _ = event_tx.send(Arc::new(event));
                            }
                            Err(e) => {
                                tracing::debug!(error = %e, "ignoring unparseable event frame");
                            }
                        }
                    }
                    // Control frames are handled by tungstenite; binary
                    // frames are not part of this protocol.
                    Some(Ok(tungstenite::Message::Close(_))) => return Ok(()),
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        return Err(Error::EventStreamClosed {
                            reason: e.to_string(),
                        });
                    }
                    None => return Ok(()),
                }
            }
        }
    }
}

/// Exponential backoff capped at `max_delay`.
fn backoff_delay(attempt: u32, config: &ReconnectConfig) -> Duration {
    let factor = 2u32.saturating_pow(attempt.min(16));
    config
        .initial_delay
        .saturating_mul(factor)
        .min(config.max_delay)
}
