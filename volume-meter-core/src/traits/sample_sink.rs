use chrono::{DateTime, Utc};

use crate::models::error::MeterError;
use crate::models::sample_buffer::SampleBuffer;

/// Inbound side of a metering pipeline: what a capture source talks to.
///
/// All methods are called from the source's own thread. Buffers are only
/// valid for the duration of `on_buffer_arrived`.
pub trait SampleSink: Send + Sync {
    /// A new buffer is available.
    fn on_buffer_arrived(&self, buffer: &SampleBuffer<'_>, captured_at: DateTime<Utc>);

    /// The source finished normally. Called at most once.
    fn on_source_completed(&self);

    /// The source stopped because of an error. Called at most once.
    fn on_source_failed(&self, reason: &MeterError);
}
