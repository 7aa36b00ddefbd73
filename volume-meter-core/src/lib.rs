//! # volume-meter-core
//!
//! Platform-agnostic audio level metering core.
//!
//! Takes raw PCM buffers from an external capture source, computes an RMS
//! decibel reading per buffer, normalizes it to a 0–1 level and publishes
//! the result to any number of observers. Capture backends implement
//! `CaptureSource` and push into a `SampleSink` (normally a
//! `VolumeBroadcaster`).
//!
//! ## Architecture
//!
//! ```text
//! volume-meter-core (this crate)
//! ├── traits/       ← VolumeObserver, DeliveryContext, SampleSink, CaptureSource
//! ├── models/       ← MeterError, SampleBuffer, VolumeSnapshot, DetectorConfig, BroadcastState
//! ├── processing/   ← LevelDetector (rms, decibels, scale)
//! ├── session/      ← VolumeBroadcaster, Subscription, delivery contexts
//! └── source/       ← ReplaySource
//! ```
//!
//! ## Usage
//! ```
//! use std::sync::Arc;
//! use chrono::Utc;
//! use volume_meter_core::{SampleBuffer, VolumeBroadcaster, VolumeSnapshot};
//!
//! let broadcaster = VolumeBroadcaster::default();
//! let _subscription = broadcaster.subscribe(Arc::new(|s: &VolumeSnapshot| {
//!     println!("{:.1} dB -> {:.2}", s.decibels, s.level);
//! }));
//!
//! let samples = [0.5f32, -0.5, 0.5, -0.5];
//! broadcaster.on_buffer_arrived(&SampleBuffer::contiguous(&samples), Utc::now());
//! broadcaster.on_source_completed();
//! ```

pub mod models;
pub mod processing;
pub mod session;
pub mod source;
pub mod traits;

// Re-export key types at crate root for convenience.
pub use models::config::{DetectorConfig, SharedDetectorConfig, DEFAULT_MINIMUM_DECIBELS};
pub use models::error::MeterError;
pub use models::sample_buffer::SampleBuffer;
pub use models::snapshot::VolumeSnapshot;
pub use models::state::{BroadcastDiagnostics, BroadcastState};
pub use processing::level_detector::LevelDetector;
pub use session::broadcaster::VolumeBroadcaster;
pub use session::delivery::{ImmediateDelivery, PumpedDelivery, QueuedDelivery};
pub use session::subscription::{SubscriberId, Subscription};
pub use source::replay::ReplaySource;
pub use traits::capture_source::CaptureSource;
pub use traits::delivery_context::{DeliveryContext, DeliveryJob};
pub use traits::sample_sink::SampleSink;
pub use traits::volume_observer::VolumeObserver;
