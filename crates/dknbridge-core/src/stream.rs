// ── Reactive unit state streams ──
//
// Subscription types for consuming per-unit state changes. This is the
// host-facing analogue of the cloud client's update-callback
// registration: entities vend a `UnitStream` instead of taking a
// callback.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures_core::Stream;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

use crate::model::Unit;

/// A subscription to one unit's state.
///
/// Provides both point-in-time snapshot access and reactive change
/// notification via `changed()` or by converting to a `Stream`.
pub struct UnitStream {
    current: Arc<Unit>,
    receiver: watch::Receiver<Arc<Unit>>,
}

impl UnitStream {
    pub(crate) fn new(receiver: watch::Receiver<Arc<Unit>>) -> Self {
        let current = receiver.borrow().clone();
        Self { current, receiver }
    }

    /// Get the snapshot captured at creation time.
    pub fn current(&self) -> &Arc<Unit> {
        &self.current
    }

    /// Get the latest snapshot (may have changed since creation).
    pub fn latest(&self) -> Arc<Unit> {
        self.receiver.borrow().clone()
    }

    /// Wait for the next change, returning the new snapshot.
    /// Returns `None` if the bridge owning the unit has been dropped.
    pub async fn changed(&mut self) -> Option<Arc<Unit>> {
        self.receiver.changed().await.ok()?;
        let snap = self.receiver.borrow_and_update().clone();
        self.current = snap.clone();
        Some(snap)
    }

    /// Convert into a `Stream` for use with `StreamExt` combinators.
    pub fn into_stream(self) -> UnitWatchStream {
        UnitWatchStream {
            inner: WatchStream::new(self.receiver),
        }
    }
}

/// `Stream` adapter backed by a `watch::Receiver`.
///
/// Yields a new `Arc<Unit>` snapshot each time the unit's cached state
/// is mutated by a pushed event or a refresh.
pub struct UnitWatchStream {
    inner: WatchStream<Arc<Unit>>,
}

impl Stream for UnitWatchStream {
    type Item = Arc<Unit>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}
