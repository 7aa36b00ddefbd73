use crate::models::snapshot::VolumeSnapshot;

/// Receiver of volume events from a `VolumeBroadcaster`.
///
/// Called on whatever thread the broadcaster's delivery context runs jobs
/// on. Keep work short: the core does not buffer for slow observers.
///
/// There is deliberately no error callback. A failing capture source ends
/// the stream with `on_completed` just like a clean shutdown.
pub trait VolumeObserver: Send + Sync {
    /// Called once per metered buffer, in arrival order.
    fn on_volume(&self, snapshot: &VolumeSnapshot);

    /// Called once when the stream ends. Nothing follows it.
    fn on_completed(&self) {}
}

impl<F> VolumeObserver for F
where
    F: Fn(&VolumeSnapshot) + Send + Sync,
{
    fn on_volume(&self, snapshot: &VolumeSnapshot) {
        self(snapshot)
    }
}
