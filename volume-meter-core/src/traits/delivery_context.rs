/// A unit of observer notification work.
pub type DeliveryJob = Box<dyn FnOnce() + Send + 'static>;

/// Where observer notifications run.
///
/// The capture thread hands jobs to the context and returns immediately;
/// implementations decide whether to run them inline, on a worker thread,
/// or on a consumer-owned loop. Jobs handed to one context must run in the
/// order they were dispatched.
///
/// Jobs from `VolumeBroadcaster` already contain observer panics, one
/// observer at a time, so the panic policy is the same whichever context
/// runs them: the other observers still get the event and nothing unwinds
/// into the capture thread.
pub trait DeliveryContext: Send + Sync {
    /// Schedule a volume notification. May drop the job under backpressure.
    fn dispatch(&self, job: DeliveryJob);

    /// Schedule a terminal notification. Must not be dropped.
    fn dispatch_terminal(&self, job: DeliveryJob) {
        self.dispatch(job);
    }
}
