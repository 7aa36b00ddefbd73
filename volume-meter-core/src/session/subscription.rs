use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use super::broadcaster::Registry;
use crate::models::snapshot::VolumeSnapshot;
use crate::traits::volume_observer::VolumeObserver;

/// Identifier assigned to each subscription, increasing in subscribe order.
pub type SubscriberId = u64;

/// A registered observer plus its liveness flag.
///
/// Delivery jobs check the flag right before calling the observer, so once
/// `dispose` returns no later-dispatched event reaches it. Retiring the
/// entry also lets go of the observer, so whatever it captures is freed
/// even while the `Subscription` handle is still held.
pub(crate) struct ObserverEntry {
    observer: Mutex<Option<Arc<dyn VolumeObserver>>>,
    active: AtomicBool,
}

impl ObserverEntry {
    pub(crate) fn new(observer: Arc<dyn VolumeObserver>) -> Arc<Self> {
        Arc::new(Self {
            observer: Mutex::new(Some(observer)),
            active: AtomicBool::new(true),
        })
    }

    pub(crate) fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Hand `snapshot` to the observer if it is still registered.
    pub(crate) fn deliver(&self, id: SubscriberId, snapshot: &VolumeSnapshot) {
        if !self.is_active() {
            return;
        }
        // Called outside the lock so the observer may dispose itself.
        let observer = self.observer.lock().clone();
        if let Some(observer) = observer {
            guard_observer(id, || observer.on_volume(snapshot));
        }
    }

    /// Deliver the terminal signal at most once and retire the entry.
    pub(crate) fn complete(&self, id: SubscriberId) {
        if !self.active.swap(false, Ordering::AcqRel) {
            return;
        }
        let observer = self.observer.lock().take();
        if let Some(observer) = observer {
            guard_observer(id, || observer.on_completed());
        }
    }

    /// Retire the entry and drop the observer. Returns false if it was
    /// already retired.
    fn deactivate(&self) -> bool {
        if !self.active.swap(false, Ordering::AcqRel) {
            return false;
        }
        let observer = self.observer.lock().take();
        drop(observer);
        true
    }
}

/// Run one observer callback, containing a panic to that observer.
///
/// The remaining observers in the same fan-out still get the event and the
/// panic never unwinds into the capture thread, whatever delivery context
/// runs the job.
fn guard_observer(id: SubscriberId, callback: impl FnOnce()) {
    if panic::catch_unwind(AssertUnwindSafe(callback)).is_err() {
        log::error!("volume observer {} panicked during delivery", id);
    }
}

/// Handle returned by `VolumeBroadcaster::subscribe`.
///
/// Disposing it (explicitly or by dropping it) unregisters the observer.
/// Disposing twice is a no-op.
#[must_use = "dropping a Subscription unsubscribes the observer"]
pub struct Subscription {
    id: SubscriberId,
    entry: Arc<ObserverEntry>,
    registry: Weak<Mutex<Registry>>,
}

impl Subscription {
    pub(crate) fn new(
        id: SubscriberId,
        entry: Arc<ObserverEntry>,
        registry: Weak<Mutex<Registry>>,
    ) -> Self {
        Self { id, entry, registry }
    }

    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// False once disposed or once the stream has completed.
    pub fn is_active(&self) -> bool {
        self.entry.is_active()
    }

    pub fn dispose(&self) {
        if !self.entry.deactivate() {
            return;
        }
        if let Some(registry) = self.registry.upgrade() {
            registry.lock().remove(self.id);
        }
        log::debug!("subscriber {} disposed", self.id);
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("active", &self.is_active())
            .finish()
    }
}
