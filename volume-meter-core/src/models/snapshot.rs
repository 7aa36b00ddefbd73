use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One volume reading derived from a single captured buffer.
///
/// `decibels` is relative to full scale (0.0 = maximum input magnitude) and
/// may be `-inf` for digital silence. `level` is always within `[0.0, 1.0]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VolumeSnapshot {
    pub decibels: f64,
    pub level: f32,
    pub timestamp: DateTime<Utc>,
}

impl VolumeSnapshot {
    /// Whether this reading sits at or below the detector floor.
    pub fn is_silent(&self) -> bool {
        self.level == 0.0
    }
}
