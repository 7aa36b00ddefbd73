use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use super::delivery::ImmediateDelivery;
use super::subscription::{ObserverEntry, SubscriberId, Subscription};
use crate::models::config::SharedDetectorConfig;
use crate::models::error::MeterError;
use crate::models::sample_buffer::SampleBuffer;
use crate::models::snapshot::VolumeSnapshot;
use crate::models::state::{BroadcastDiagnostics, BroadcastState};
use crate::processing::level_detector::LevelDetector;
use crate::traits::delivery_context::DeliveryContext;
use crate::traits::sample_sink::SampleSink;
use crate::traits::volume_observer::VolumeObserver;

/// Subscriber registry and lifecycle, protected by `parking_lot::Mutex`.
pub(crate) struct Registry {
    state: BroadcastState,
    observers: BTreeMap<SubscriberId, Arc<ObserverEntry>>,
    next_id: SubscriberId,
    latest: Option<VolumeSnapshot>,
    diagnostics: BroadcastDiagnostics,
}

impl Registry {
    fn new() -> Self {
        Self {
            state: BroadcastState::Active,
            observers: BTreeMap::new(),
            next_id: 0,
            latest: None,
            diagnostics: BroadcastDiagnostics::default(),
        }
    }

    pub(crate) fn remove(&mut self, id: SubscriberId) {
        self.observers.remove(&id);
        self.diagnostics.active_subscribers = self.observers.len();
    }

    fn targets(&self) -> Vec<(SubscriberId, Arc<ObserverEntry>)> {
        self.observers
            .iter()
            .map(|(id, entry)| (*id, Arc::clone(entry)))
            .collect()
    }
}

/// Fans volume snapshots out to any number of observers.
///
/// A capture source pushes buffers in through `SampleSink`; each buffer is
/// metered by the `LevelDetector` and the snapshot handed to every observer
/// subscribed at that moment, via the configured `DeliveryContext`.
///
/// ```text
/// [CaptureSource] → on_buffer_arrived → [LevelDetector] → [DeliveryContext] → observers
///                 → on_source_completed / on_source_failed ───────────→ on_completed
/// ```
///
/// Once the source ends (cleanly or not) the broadcaster is inert for good.
/// Source failures are never forwarded to observers.
pub struct VolumeBroadcaster {
    detector: LevelDetector,
    delivery: Arc<dyn DeliveryContext>,
    registry: Arc<Mutex<Registry>>,
}

impl VolumeBroadcaster {
    /// Broadcaster that notifies observers on the capture thread.
    pub fn new(config: Arc<SharedDetectorConfig>) -> Self {
        Self::with_delivery(config, Arc::new(ImmediateDelivery))
    }

    /// Broadcaster that notifies observers through `delivery`.
    pub fn with_delivery(
        config: Arc<SharedDetectorConfig>,
        delivery: Arc<dyn DeliveryContext>,
    ) -> Self {
        Self {
            detector: LevelDetector::new(config),
            delivery,
            registry: Arc::new(Mutex::new(Registry::new())),
        }
    }

    /// Handle to the live detector configuration.
    pub fn config(&self) -> &Arc<SharedDetectorConfig> {
        self.detector.config()
    }

    pub fn state(&self) -> BroadcastState {
        self.registry.lock().state.clone()
    }

    /// Most recent snapshot, for consumers that poll instead of subscribing.
    pub fn latest_snapshot(&self) -> Option<VolumeSnapshot> {
        self.registry.lock().latest
    }

    pub fn diagnostics(&self) -> BroadcastDiagnostics {
        self.registry.lock().diagnostics.clone()
    }

    pub fn subscriber_count(&self) -> usize {
        self.registry.lock().observers.len()
    }

    /// Register an observer for every snapshot emitted from now on.
    ///
    /// Nothing is replayed. If the stream has already ended, the observer
    /// gets `on_completed` right away and nothing else.
    pub fn subscribe(&self, observer: Arc<dyn VolumeObserver>) -> Subscription {
        let entry = ObserverEntry::new(observer);

        let (id, already_terminated) = {
            let mut registry = self.registry.lock();
            let id = registry.next_id;
            registry.next_id += 1;

            if registry.state.is_active() {
                registry.observers.insert(id, Arc::clone(&entry));
                registry.diagnostics.active_subscribers = registry.observers.len();
                (id, false)
            } else {
                (id, true)
            }
        };

        let subscription =
            Subscription::new(id, Arc::clone(&entry), Arc::downgrade(&self.registry));

        if already_terminated {
            log::debug!("subscriber {} joined after termination", id);
            self.delivery.dispatch_terminal(Box::new(move || entry.complete(id)));
        } else {
            log::debug!("subscriber {} registered", id);
        }

        subscription
    }

    /// Meter one buffer and emit the snapshot.
    ///
    /// Empty buffers are dropped without notifying anyone. After the stream
    /// has ended this does nothing.
    pub fn on_buffer_arrived(&self, buffer: &SampleBuffer<'_>, captured_at: DateTime<Utc>) {
        {
            let mut registry = self.registry.lock();
            if !registry.state.is_active() {
                registry.diagnostics.buffers_after_termination += 1;
                return;
            }
            registry.diagnostics.buffers_received += 1;
        }

        let snapshot = match self.detector.compute_level_at(buffer, captured_at) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                log::debug!("dropping buffer: {}", e);
                self.registry.lock().diagnostics.empty_buffers_dropped += 1;
                return;
            }
        };

        let targets = {
            let mut registry = self.registry.lock();
            // The source may have ended while we were metering.
            if !registry.state.is_active() {
                return;
            }
            registry.latest = Some(snapshot);
            registry.diagnostics.snapshots_emitted += 1;
            registry.targets()
        };

        if targets.is_empty() {
            return;
        }

        self.delivery.dispatch(Box::new(move || {
            for (id, entry) in &targets {
                entry.deliver(*id, &snapshot);
            }
        }));
    }

    /// The source finished; complete every observer.
    pub fn on_source_completed(&self) {
        log::info!("capture source completed, ending volume stream");
        self.terminate(BroadcastState::Completed);
    }

    /// The source failed. Observers see a plain completion.
    pub fn on_source_failed(&self, reason: &MeterError) {
        log::warn!("capture source failed, ending volume stream: {}", reason);
        self.terminate(BroadcastState::Failed(reason.to_string()));
    }

    fn terminate(&self, terminal: BroadcastState) {
        let targets = {
            let mut registry = self.registry.lock();
            if registry.state.is_terminal() {
                log::debug!("ignoring repeated end-of-stream signal");
                return;
            }
            registry.state = terminal;
            let targets = registry.targets();
            registry.observers.clear();
            registry.diagnostics.active_subscribers = 0;
            targets
        };

        self.delivery.dispatch_terminal(Box::new(move || {
            for (id, entry) in &targets {
                entry.complete(*id);
            }
        }));
    }
}

impl SampleSink for VolumeBroadcaster {
    fn on_buffer_arrived(&self, buffer: &SampleBuffer<'_>, captured_at: DateTime<Utc>) {
        VolumeBroadcaster::on_buffer_arrived(self, buffer, captured_at);
    }

    fn on_source_completed(&self) {
        VolumeBroadcaster::on_source_completed(self);
    }

    fn on_source_failed(&self, reason: &MeterError) {
        VolumeBroadcaster::on_source_failed(self, reason);
    }
}

impl Default for VolumeBroadcaster {
    fn default() -> Self {
        Self::new(Arc::new(SharedDetectorConfig::default()))
    }
}

impl Drop for VolumeBroadcaster {
    /// A broadcaster going away ends the stream for anyone still listening.
    fn drop(&mut self) {
        if self.registry.lock().state.is_active() {
            self.terminate(BroadcastState::Completed);
        }
    }
}
