//! Metrics publish/subscribe
//!
//! The capture thread publishes a snapshot per processed chunk. Subscribers
//! are invoked synchronously on the publishing thread, so callbacks must be
//! quick and must not block; consumers that need another thread (a UI loop,
//! a tokio task) should hand the value off or read [`MetricsPublisher::latest`]
//! on their own schedule.

use crate::audio::MetricsSnapshot;
use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Handle returned by [`MetricsPublisher::subscribe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Callback = Arc<dyn Fn(&MetricsSnapshot) + Send + Sync>;

/// Immutable subscriber list, replaced wholesale on (un)subscribe
type Subscribers = Arc<[(SubscriptionId, Callback)]>;

struct Inner {
    subscribers: RwLock<Subscribers>,
    latest: Mutex<Option<MetricsSnapshot>>,
    next_id: AtomicU64,
    published: AtomicU64,
}

/// Thread-safe snapshot publisher (cheap to clone)
#[derive(Clone)]
pub struct MetricsPublisher {
    inner: Arc<Inner>,
}

impl Default for MetricsPublisher {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsPublisher {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                subscribers: RwLock::new(Arc::from(Vec::new())),
                latest: Mutex::new(None),
                next_id: AtomicU64::new(0),
                published: AtomicU64::new(0),
            }),
        }
    }

    /// Register a callback fired once per published snapshot
    pub fn subscribe<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&MetricsSnapshot) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.inner.next_id.fetch_add(1, Ordering::Relaxed));
        let callback: Callback = Arc::new(callback);
        let mut subscribers = self.inner.subscribers.write();
        let mut updated = subscribers.to_vec();
        updated.push((id, callback));
        *subscribers = Arc::from(updated);
        drop(subscribers);
        log::debug!("Metrics subscriber {:?} registered", id);
        id
    }

    /// Remove a subscriber. Returns false if it was not registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscribers = self.inner.subscribers.write();
        if !subscribers.iter().any(|(sub_id, _)| *sub_id == id) {
            return false;
        }
        let updated: Vec<_> = subscribers
            .iter()
            .filter(|(sub_id, _)| *sub_id != id)
            .cloned()
            .collect();
        *subscribers = Arc::from(updated);
        true
    }

    /// Store the snapshot as latest and notify every subscriber
    pub fn publish(&self, snapshot: MetricsSnapshot) {
        *self.inner.latest.lock() = Some(snapshot);
        self.inner.published.fetch_add(1, Ordering::Relaxed);

        // Hold only an Arc so a callback may (un)subscribe without deadlocking
        let subscribers = self.inner.subscribers.read().clone();

        for (_, callback) in subscribers.iter() {
            callback(&snapshot);
        }
    }

    /// Most recently published snapshot
    pub fn latest(&self) -> Option<MetricsSnapshot> {
        *self.inner.latest.lock()
    }

    /// Forget the latest snapshot (new capture session)
    pub fn clear_latest(&self) {
        *self.inner.latest.lock() = None;
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers.read().len()
    }

    /// Total snapshots published over the publisher's lifetime
    pub fn published_count(&self) -> u64 {
        self.inner.published.load(Ordering::Relaxed)
    }
}
