use std::sync::atomic::{AtomicU32, Ordering};

use serde::{Deserialize, Serialize};

use super::error::MeterError;

/// Default floor below which a reading normalizes to zero.
pub const DEFAULT_MINIMUM_DECIBELS: f32 = -80.0;

/// Level detector configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DetectorConfig {
    /// Decibel floor mapped to level 0.0 (default: -80.0). Must be finite and negative.
    pub minimum_decibels: f32,
}

impl DetectorConfig {
    pub fn new(minimum_decibels: f32) -> Result<Self, MeterError> {
        let config = Self { minimum_decibels };
        config.validate().map_err(MeterError::ConfigurationFailed)?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), String> {
        if !self.minimum_decibels.is_finite() {
            return Err(format!("minimum decibels must be finite, got {}", self.minimum_decibels));
        }
        if self.minimum_decibels >= 0.0 {
            return Err(format!(
                "minimum decibels must be negative, got {}",
                self.minimum_decibels
            ));
        }
        Ok(())
    }

    /// Parse and validate a JSON document such as `{"minimumDecibels": -60.0}`.
    pub fn from_json(json: &str) -> Result<Self, MeterError> {
        let config: Self = serde_json::from_str(json).map_err(|e| {
            MeterError::ConfigurationFailed(format!("failed to parse config: {}", e))
        })?;
        config.validate().map_err(MeterError::ConfigurationFailed)?;
        Ok(config)
    }
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            minimum_decibels: DEFAULT_MINIMUM_DECIBELS,
        }
    }
}

/// Hot-swappable detector configuration.
///
/// Single writer, many readers, no locks: the floor is stored as raw `f32`
/// bits in an atomic. A buffer being metered while the floor changes sees
/// either the old or the new value, never a mix.
#[derive(Debug)]
pub struct SharedDetectorConfig {
    minimum_decibels_bits: AtomicU32,
}

impl SharedDetectorConfig {
    pub fn new(config: DetectorConfig) -> Result<Self, MeterError> {
        config.validate().map_err(MeterError::ConfigurationFailed)?;
        Ok(Self {
            minimum_decibels_bits: AtomicU32::new(config.minimum_decibels.to_bits()),
        })
    }

    /// Value snapshot of the current configuration.
    pub fn load(&self) -> DetectorConfig {
        DetectorConfig {
            minimum_decibels: f32::from_bits(self.minimum_decibels_bits.load(Ordering::Relaxed)),
        }
    }

    /// Replace the floor. Applies to buffers metered after this call.
    pub fn set_minimum_decibels(&self, minimum_decibels: f32) -> Result<(), MeterError> {
        let config = DetectorConfig::new(minimum_decibels)?;
        self.store(config);
        Ok(())
    }

    fn store(&self, config: DetectorConfig) {
        self.minimum_decibels_bits
            .store(config.minimum_decibels.to_bits(), Ordering::Relaxed);
        log::debug!("detector floor set to {} dB", config.minimum_decibels);
    }
}

impl Default for SharedDetectorConfig {
    fn default() -> Self {
        Self {
            minimum_decibels_bits: AtomicU32::new(DEFAULT_MINIMUM_DECIBELS.to_bits()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_floor() {
        assert_eq!(DetectorConfig::default().minimum_decibels, -80.0);
        assert_eq!(SharedDetectorConfig::default().load(), DetectorConfig::default());
    }

    #[test]
    fn validate_rejects_non_negative_and_non_finite() {
        assert!(DetectorConfig::new(0.0).is_err());
        assert!(DetectorConfig::new(6.0).is_err());
        assert!(DetectorConfig::new(f32::NAN).is_err());
        assert!(DetectorConfig::new(f32::NEG_INFINITY).is_err());
        assert!(DetectorConfig::new(-60.0).is_ok());
    }

    #[test]
    fn from_json_camel_case() {
        let config = DetectorConfig::from_json(r#"{"minimumDecibels": -60.0}"#).unwrap();
        assert_eq!(config.minimum_decibels, -60.0);
    }

    #[test]
    fn from_json_missing_field_uses_default() {
        let config = DetectorConfig::from_json("{}").unwrap();
        assert_eq!(config, DetectorConfig::default());
    }

    #[test]
    fn from_json_rejects_invalid_floor() {
        let err = DetectorConfig::from_json(r#"{"minimumDecibels": 3.0}"#).unwrap_err();
        assert!(matches!(err, MeterError::ConfigurationFailed(_)));

        let err = DetectorConfig::from_json("not json").unwrap_err();
        assert!(matches!(err, MeterError::ConfigurationFailed(_)));
    }

    #[test]
    fn shared_config_hot_swap() {
        let shared = SharedDetectorConfig::default();
        shared.set_minimum_decibels(-40.0).unwrap();
        assert_eq!(shared.load().minimum_decibels, -40.0);
    }

    #[test]
    fn shared_config_keeps_old_value_on_rejected_update() {
        let shared = SharedDetectorConfig::default();
        assert!(shared.set_minimum_decibels(1.0).is_err());
        assert_eq!(shared.load().minimum_decibels, -80.0);
    }
}
