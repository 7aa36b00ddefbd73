//! Delivery contexts: where observer notifications actually run.
//!
//! - `ImmediateDelivery` runs jobs on the capture thread.
//! - `QueuedDelivery` hands jobs to a dedicated worker thread.
//! - `PumpedDelivery` parks jobs until the consumer calls `pump()` from its
//!   own thread (e.g. a UI event loop).
//!
//! The queued variants have a soft capacity. When a consumer falls behind,
//! volume jobs are shed (and counted) rather than stalling the capture
//! thread. Terminal jobs bypass the capacity check.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};

use crate::models::error::MeterError;
use crate::traits::delivery_context::{DeliveryContext, DeliveryJob};

/// Default number of pending volume jobs before shedding.
pub const DEFAULT_QUEUE_CAPACITY: usize = 64;

/// Runs every job synchronously on the dispatching thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImmediateDelivery;

impl DeliveryContext for ImmediateDelivery {
    fn dispatch(&self, job: DeliveryJob) {
        job();
    }
}

/// Bounded-by-policy FIFO shared by the queued contexts.
struct JobQueue {
    sender: Sender<DeliveryJob>,
    capacity: usize,
    dropped: AtomicU64,
}

impl JobQueue {
    fn new(capacity: usize) -> (Self, Receiver<DeliveryJob>) {
        let (sender, receiver) = crossbeam_channel::unbounded();
        let queue = Self {
            sender,
            capacity: capacity.max(1),
            dropped: AtomicU64::new(0),
        };
        (queue, receiver)
    }

    fn push(&self, job: DeliveryJob) {
        if self.sender.len() >= self.capacity {
            let dropped = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
            log::warn!(
                "delivery queue full ({} pending), dropped volume event (total dropped: {})",
                self.capacity,
                dropped
            );
            return;
        }
        self.push_terminal(job);
    }

    fn push_terminal(&self, job: DeliveryJob) {
        if self.sender.send(job).is_err() {
            log::warn!("delivery queue closed, event discarded");
        }
    }
}

/// Runs jobs in order on a dedicated `volume-delivery` thread.
pub struct QueuedDelivery {
    queue: Option<JobQueue>,
    worker: Option<thread::JoinHandle<()>>,
}

impl QueuedDelivery {
    pub fn new() -> Result<Self, MeterError> {
        Self::with_capacity(DEFAULT_QUEUE_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Result<Self, MeterError> {
        let (queue, receiver) = JobQueue::new(capacity);

        let handle = thread::Builder::new()
            .name("volume-delivery".into())
            .spawn(move || {
                // Broadcaster jobs guard their observers; this keeps the
                // worker alive for any other job that panics.
                for job in receiver.iter() {
                    if panic::catch_unwind(AssertUnwindSafe(job)).is_err() {
                        log::error!("delivery job panicked");
                    }
                }
            })
            .map_err(|e| {
                log::error!("failed to spawn delivery thread: {}", e);
                MeterError::Unknown(format!("failed to spawn delivery thread: {}", e))
            })?;

        Ok(Self {
            queue: Some(queue),
            worker: Some(handle),
        })
    }

    /// Volume jobs shed because the worker fell behind.
    pub fn dropped_jobs(&self) -> u64 {
        self.queue
            .as_ref()
            .map(|q| q.dropped.load(Ordering::Relaxed))
            .unwrap_or(0)
    }
}

impl DeliveryContext for QueuedDelivery {
    fn dispatch(&self, job: DeliveryJob) {
        if let Some(ref queue) = self.queue {
            queue.push(job);
        }
    }

    fn dispatch_terminal(&self, job: DeliveryJob) {
        if let Some(ref queue) = self.queue {
            queue.push_terminal(job);
        }
    }
}

impl Drop for QueuedDelivery {
    /// Drains pending jobs, then joins the worker.
    fn drop(&mut self) {
        // Closing the channel ends the worker's loop once it is empty.
        self.queue.take();
        if let Some(handle) = self.worker.take() {
            if handle.thread().id() != thread::current().id() {
                let _ = handle.join();
            }
        }
    }
}

/// Parks jobs until the consumer runs them with `pump()`.
///
/// Use this to marshal notifications onto a thread the consumer owns, such
/// as a UI loop that polls once per frame.
pub struct PumpedDelivery {
    queue: JobQueue,
    receiver: Receiver<DeliveryJob>,
}

impl PumpedDelivery {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_QUEUE_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (queue, receiver) = JobQueue::new(capacity);
        Self { queue, receiver }
    }

    /// Run every job pending at the time of the call on the current thread.
    ///
    /// Jobs dispatched while pumping wait for the next call.
    pub fn pump(&self) -> usize {
        let pending = self.receiver.len();
        let mut ran = 0;
        for _ in 0..pending {
            match self.receiver.try_recv() {
                Ok(job) => {
                    job();
                    ran += 1;
                }
                Err(_) => break,
            }
        }
        ran
    }

    /// Block up to `timeout` for the first job, then pump.
    pub fn pump_timeout(&self, timeout: Duration) -> usize {
        match self.receiver.recv_timeout(timeout) {
            Ok(job) => {
                job();
                1 + self.pump()
            }
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => 0,
        }
    }

    pub fn pending(&self) -> usize {
        self.receiver.len()
    }

    /// Volume jobs shed because nobody pumped in time.
    pub fn dropped_jobs(&self) -> u64 {
        self.queue.dropped.load(Ordering::Relaxed)
    }
}

impl Default for PumpedDelivery {
    fn default() -> Self {
        Self::new()
    }
}

impl DeliveryContext for PumpedDelivery {
    fn dispatch(&self, job: DeliveryJob) {
        self.queue.push(job);
    }

    fn dispatch_terminal(&self, job: DeliveryJob) {
        self.queue.push_terminal(job);
    }
}
