use thiserror::Error;

/// Errors that can occur during voice capture operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CaptureError {
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("no audio input device found")]
    NoDeviceFound,

    #[error("failed to open input device: {0}")]
    DeviceOpenError(String),

    #[error("a capture session is already active")]
    SessionActive,

    #[error("no captured audio to save")]
    NoData,

    #[error("encoding failed: {0}")]
    EncodeError(String),
}
