//! Replays prerecorded audio into a `SampleSink` at a fixed cadence.
//!
//! Stands in for a device-backed capture source in demos and tests: same
//! threading shape (a dedicated named thread, a run flag, join on stop) and
//! same end-of-stream contract.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use chrono::Utc;
use parking_lot::Mutex;

use crate::models::error::MeterError;
use crate::models::sample_buffer::SampleBuffer;
use crate::traits::capture_source::CaptureSource;
use crate::traits::sample_sink::SampleSink;

/// A capture source backed by in-memory mono buffers.
pub struct ReplaySource {
    buffers: Arc<Vec<Vec<f32>>>,
    interval: Duration,
    failure: Option<MeterError>,
    running: Arc<AtomicBool>,
    replay_handle: Mutex<Option<thread::JoinHandle<()>>>,
}

impl ReplaySource {
    /// Deliver `buffers` one at a time, `interval` apart.
    pub fn new(buffers: Vec<Vec<f32>>, interval: Duration) -> Self {
        Self {
            buffers: Arc::new(buffers),
            interval,
            failure: None,
            running: Arc::new(AtomicBool::new(false)),
            replay_handle: Mutex::new(None),
        }
    }

    /// Split one long mono signal into `frame_length`-sample buffers.
    ///
    /// A trailing partial buffer is kept.
    pub fn from_signal(
        signal: &[f32],
        frame_length: usize,
        interval: Duration,
    ) -> Result<Self, MeterError> {
        if frame_length == 0 {
            return Err(MeterError::ConfigurationFailed("frame length must be positive".into()));
        }
        let buffers = signal.chunks(frame_length).map(<[f32]>::to_vec).collect();
        Ok(Self::new(buffers, interval))
    }

    /// End the replay with `on_source_failed(error)` instead of completing.
    ///
    /// Only a replay that reaches its last buffer fails; one cut short by
    /// `stop()` still completes.
    pub fn failing_with(mut self, error: MeterError) -> Self {
        self.failure = Some(error);
        self
    }

    pub fn buffer_count(&self) -> usize {
        self.buffers.len()
    }
}

impl CaptureSource for ReplaySource {
    fn start(&mut self, sink: Arc<dyn SampleSink>) -> Result<(), MeterError> {
        if self.running.load(Ordering::SeqCst) {
            return Err(MeterError::ConfigurationFailed("replay already running".into()));
        }
        // Reap a previous run that ended on its own.
        if let Some(handle) = self.replay_handle.lock().take() {
            let _ = handle.join();
        }

        self.running.store(true, Ordering::SeqCst);
        let running = Arc::clone(&self.running);
        let buffers = Arc::clone(&self.buffers);
        let interval = self.interval;
        let failure = self.failure.clone();

        let handle = thread::Builder::new()
            .name("replay-capture".into())
            .spawn(move || {
                let finished = replay_loop(&running, &buffers, interval, sink.as_ref());
                match failure {
                    Some(ref error) if finished => sink.on_source_failed(error),
                    _ => sink.on_source_completed(),
                }
                running.store(false, Ordering::SeqCst);
            })
            .map_err(|e| {
                self.running.store(false, Ordering::SeqCst);
                MeterError::Unknown(format!("failed to spawn replay thread: {}", e))
            })?;

        *self.replay_handle.lock() = Some(handle);
        Ok(())
    }

    fn stop(&mut self) -> Result<(), MeterError> {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.replay_handle.lock().take() {
            handle
                .join()
                .map_err(|_| MeterError::Unknown("replay thread panicked".into()))?;
        }
        Ok(())
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

impl Drop for ReplaySource {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}

/// Returns false if `stop()` cut the replay short.
fn replay_loop(
    running: &AtomicBool,
    buffers: &[Vec<f32>],
    interval: Duration,
    sink: &dyn SampleSink,
) -> bool {
    for (index, samples) in buffers.iter().enumerate() {
        if !running.load(Ordering::SeqCst) {
            log::debug!("replay stopped after {} of {} buffers", index, buffers.len());
            return false;
        }
        sink.on_buffer_arrived(&SampleBuffer::contiguous(samples), Utc::now());
        if !interval.is_zero() {
            thread::sleep(interval);
        }
    }
    true
}
