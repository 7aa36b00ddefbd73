use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::models::config::{DetectorConfig, SharedDetectorConfig};
use crate::models::error::MeterError;
use crate::models::sample_buffer::SampleBuffer;
use crate::models::snapshot::VolumeSnapshot;

/// Turns captured buffers into volume snapshots.
///
/// Holds no state besides a handle to the (hot-swappable) floor. The floor
/// is read once per buffer, so a concurrent update never splits a reading.
#[derive(Debug, Clone)]
pub struct LevelDetector {
    config: Arc<SharedDetectorConfig>,
}

impl LevelDetector {
    pub fn new(config: Arc<SharedDetectorConfig>) -> Self {
        Self { config }
    }

    /// The shared configuration this detector reads from.
    pub fn config(&self) -> &Arc<SharedDetectorConfig> {
        &self.config
    }

    /// Meter `buffer`, stamping the snapshot with the current time.
    pub fn compute_level(&self, buffer: &SampleBuffer<'_>) -> Result<VolumeSnapshot, MeterError> {
        self.compute_level_at(buffer, Utc::now())
    }

    /// Meter `buffer`, stamping the snapshot with `timestamp`.
    pub fn compute_level_at(
        &self,
        buffer: &SampleBuffer<'_>,
        timestamp: DateTime<Utc>,
    ) -> Result<VolumeSnapshot, MeterError> {
        compute_level_with(buffer, &self.config.load(), timestamp)
    }
}

impl Default for LevelDetector {
    fn default() -> Self {
        Self::new(Arc::new(SharedDetectorConfig::default()))
    }
}

/// Meter one buffer against a fixed configuration.
pub fn compute_level_with(
    buffer: &SampleBuffer<'_>,
    config: &DetectorConfig,
    timestamp: DateTime<Utc>,
) -> Result<VolumeSnapshot, MeterError> {
    let decibels = decibels(rms(buffer)?);
    Ok(VolumeSnapshot {
        decibels,
        level: scale(decibels, config),
        timestamp,
    })
}

/// Root-mean-square amplitude of the buffer's frames.
///
/// Fails with `EmptyBuffer` instead of dividing by a zero frame length.
pub fn rms(buffer: &SampleBuffer<'_>) -> Result<f64, MeterError> {
    if buffer.is_empty() {
        return Err(MeterError::EmptyBuffer);
    }
    let sum_sq: f64 = buffer
        .frames()
        .map(|s| {
            let s = s as f64;
            s * s
        })
        .sum();
    Ok((sum_sq / buffer.frame_length() as f64).sqrt())
}

/// Amplitude to dB relative to full scale. Silence (rms 0) gives `-inf`.
pub fn decibels(rms: f64) -> f64 {
    20.0 * rms.log10()
}

/// Normalize a dB reading to `[0.0, 1.0]`.
///
/// Readings at or above +1.0 dB saturate to 1.0; everything between the
/// floor and that gate is interpolated linearly between the floor and 0 dB.
/// So 0 dB maps to exactly 1.0 and readings in `(0, 1)` dB land just under
/// it.
pub fn scale(decibels: f64, config: &DetectorConfig) -> f32 {
    let minimum = config.minimum_decibels as f64;
    if !decibels.is_finite() || decibels < minimum {
        return 0.0;
    }
    if decibels >= 1.0 {
        return 1.0;
    }
    let floor = minimum.abs();
    // Only a floor above -1 dB can push this outside the unit range.
    (((floor - decibels.abs()) / floor) as f32).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use approx::{assert_abs_diff_eq, assert_relative_eq};

    use super::*;

    fn floor(minimum_decibels: f32) -> DetectorConfig {
        DetectorConfig { minimum_decibels }
    }

    fn constant(amplitude: f32, frames: usize) -> Vec<f32> {
        (0..frames)
            .map(|i| if i % 2 == 0 { amplitude } else { -amplitude })
            .collect()
    }

    #[test]
    fn rms_of_alternating_full_scale() {
        let data = constant(1.0, 1024);
        assert_relative_eq!(rms(&SampleBuffer::contiguous(&data)).unwrap(), 1.0);
    }

    #[test]
    fn rms_honors_stride() {
        // Only the 0.5s are frames; the 1.0s belong to another channel.
        let data = [0.5, 1.0, -0.5, 1.0, 0.5, 1.0];
        let left = SampleBuffer::interleaved_channel(&data, 2, 0).unwrap();
        assert_relative_eq!(rms(&left).unwrap(), 0.5);
    }

    #[test]
    fn empty_buffer_is_an_error_not_nan() {
        let buf = SampleBuffer::contiguous(&[]);
        assert_eq!(rms(&buf), Err(MeterError::EmptyBuffer));

        let detector = LevelDetector::default();
        assert_eq!(detector.compute_level(&buf), Err(MeterError::EmptyBuffer));
    }

    #[test]
    fn detector_usable_after_empty_buffer() {
        let detector = LevelDetector::default();
        assert!(detector.compute_level(&SampleBuffer::contiguous(&[])).is_err());

        let data = constant(1.0, 64);
        let snapshot = detector.compute_level(&SampleBuffer::contiguous(&data)).unwrap();
        assert_eq!(snapshot.level, 1.0);
    }

    #[test]
    fn silence_is_negative_infinity_and_level_zero() {
        let data = vec![0.0f32; 1024];
        let snapshot = LevelDetector::default()
            .compute_level(&SampleBuffer::contiguous(&data))
            .unwrap();

        assert_eq!(snapshot.decibels, f64::NEG_INFINITY);
        assert_eq!(snapshot.level, 0.0);
        assert!(snapshot.is_silent());
    }

    #[test]
    fn half_amplitude_is_minus_six_db() {
        let data = constant(0.5, 1024);
        let snapshot = LevelDetector::default()
            .compute_level(&SampleBuffer::contiguous(&data))
            .unwrap();

        assert_abs_diff_eq!(snapshot.decibels, -6.0206, epsilon = 1e-3);
        assert_abs_diff_eq!(snapshot.level, (80.0 - 6.0206) / 80.0, epsilon = 1e-4);
    }

    #[test]
    fn one_percent_amplitude_is_half_level() {
        let data = constant(0.01, 1024);
        let snapshot = LevelDetector::default()
            .compute_level(&SampleBuffer::contiguous(&data))
            .unwrap();

        assert_abs_diff_eq!(snapshot.decibels, -40.0, epsilon = 1e-4);
        assert_abs_diff_eq!(snapshot.level, 0.5, epsilon = 1e-5);
    }

    #[test]
    fn timestamp_is_passed_through() {
        let at = DateTime::parse_from_rfc3339("2026-01-02T03:04:05Z")
            .unwrap()
            .with_timezone(&Utc);
        let data = constant(0.25, 16);
        let snapshot = LevelDetector::default()
            .compute_level_at(&SampleBuffer::contiguous(&data), at)
            .unwrap();

        assert_eq!(snapshot.timestamp, at);
    }

    #[test]
    fn scale_at_floor_is_zero() {
        assert_eq!(scale(-80.0, &floor(-80.0)), 0.0);
    }

    #[test]
    fn scale_below_floor_is_zero() {
        assert_eq!(scale(-80.5, &floor(-80.0)), 0.0);
        assert_eq!(scale(-200.0, &floor(-80.0)), 0.0);
    }

    #[test]
    fn scale_at_zero_db_is_one() {
        assert_eq!(scale(0.0, &floor(-80.0)), 1.0);
    }

    #[test]
    fn scale_midpoint() {
        assert_eq!(scale(-40.0, &floor(-80.0)), 0.5);
        assert_eq!(scale(-30.0, &floor(-60.0)), 0.5);
    }

    #[test]
    fn scale_saturates_at_one_db_regardless_of_floor() {
        for minimum in [-80.0, -60.0, -20.0, -0.5] {
            assert_eq!(scale(1.0, &floor(minimum)), 1.0);
            assert_eq!(scale(12.0, &floor(minimum)), 1.0);
        }
    }

    #[test]
    fn scale_just_above_zero_db_stays_below_one() {
        // Interpolation is against 0 dB while the gate is at +1 dB.
        let level = scale(0.5, &floor(-80.0));
        assert_abs_diff_eq!(level, 79.5 / 80.0, epsilon = 1e-6);
        assert!(level < 1.0);
    }

    #[test]
    fn scale_non_finite_is_zero() {
        let config = floor(-80.0);
        assert_eq!(scale(f64::NEG_INFINITY, &config), 0.0);
        assert_eq!(scale(f64::INFINITY, &config), 0.0);
        assert_eq!(scale(f64::NAN, &config), 0.0);
    }

    #[test]
    fn level_always_in_unit_range() {
        let config = DetectorConfig::default();
        for amplitude in [0.0, 1e-6, 1e-4, 0.001, 0.01, 0.1, 0.5, 0.99, 1.0, 1.5, 4.0] {
            let data = constant(amplitude, 256);
            let snapshot =
                compute_level_with(&SampleBuffer::contiguous(&data), &config, Utc::now()).unwrap();
            assert!(
                (0.0..=1.0).contains(&snapshot.level),
                "amplitude {} gave level {}",
                amplitude,
                snapshot.level
            );
        }
    }

    #[test]
    fn floor_change_applies_to_next_buffer() {
        let detector = LevelDetector::default();
        let data = constant(0.01, 64);
        let buf = SampleBuffer::contiguous(&data);

        let before = detector.compute_level(&buf).unwrap();
        detector.config().set_minimum_decibels(-40.0).unwrap();
        let after = detector.compute_level(&buf).unwrap();

        assert_abs_diff_eq!(before.level, 0.5, epsilon = 1e-5);
        assert!(after.level < 1e-4);
    }
}
