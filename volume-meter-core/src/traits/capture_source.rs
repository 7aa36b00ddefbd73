use std::sync::Arc;

use super::sample_sink::SampleSink;
use crate::models::error::MeterError;

/// A producer of captured audio buffers.
///
/// Device-backed implementations live outside this crate; they own device
/// setup, buffer allocation and cadence. The source must end every run by
/// calling exactly one of `on_source_completed` / `on_source_failed`.
pub trait CaptureSource: Send + Sync {
    /// Begin delivering buffers to `sink` on the source's own thread.
    fn start(&mut self, sink: Arc<dyn SampleSink>) -> Result<(), MeterError>;

    /// Stop delivering and release resources.
    fn stop(&mut self) -> Result<(), MeterError>;

    fn is_running(&self) -> bool;
}
