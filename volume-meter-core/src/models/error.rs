use thiserror::Error;

/// Errors that can occur while metering audio.
///
/// Only `EmptyBuffer` can come out of level detection. Capture-layer
/// failures are carried as `SourceFailed` for the owner of a broadcaster;
/// observers never see any of these.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MeterError {
    #[error("empty buffer: frame length is zero")]
    EmptyBuffer,

    #[error("invalid buffer layout: {0}")]
    InvalidLayout(String),

    #[error("configuration failed: {0}")]
    ConfigurationFailed(String),

    #[error("capture source failed: {0}")]
    SourceFailed(String),

    #[error("unknown error: {0}")]
    Unknown(String),
}
