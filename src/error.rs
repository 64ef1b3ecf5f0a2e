//! Custom error types for the application

use thiserror::Error;

/// Errors raised by the metering core
#[derive(Debug, Error, Clone, PartialEq)]
pub enum MeterError {
    /// Averaging was asked for over an empty history log
    #[error("Not enough readings to compute an average")]
    InsufficientData,

    /// Threshold update named a key the registry does not have
    #[error("Unknown threshold key: {0}")]
    UnknownThresholdKey(String),

    /// Threshold update value could not be used for its key
    #[error("Invalid value {value:?} for threshold '{key}': {reason}")]
    InvalidThresholdValue {
        key: String,
        value: String,
        reason: String,
    },

    /// Zero-amplitude block, the logarithm has no value
    #[error("Decibel level undefined for a zero-amplitude block")]
    CalibrationUndefined,
}

/// Result type alias for metering operations
pub type MeterResult<T> = Result<T, MeterError>;

/// Application-specific error type
#[derive(Debug, Error)]
pub enum AppError {
    /// Audio device related errors
    #[error("Audio device error: {0}")]
    AudioDevice(String),

    /// Audio stream related errors
    #[error("Audio stream error: {0}")]
    AudioStream(String),

    /// Invalid command line or config file settings
    #[error("Configuration error: {0}")]
    Config(String),

    /// Errors surfaced by the metering core
    #[error(transparent)]
    Meter(#[from] MeterError),

    /// General I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<cpal::DevicesError> for AppError {
    fn from(err: cpal::DevicesError) -> Self {
        AppError::AudioDevice(format!("Failed to enumerate devices: {}", err))
    }
}

impl From<cpal::DeviceNameError> for AppError {
    fn from(err: cpal::DeviceNameError) -> Self {
        AppError::AudioDevice(format!("Failed to get device name: {}", err))
    }
}

impl From<cpal::DefaultStreamConfigError> for AppError {
    fn from(err: cpal::DefaultStreamConfigError) -> Self {
        AppError::AudioDevice(format!("Failed to get default stream config: {}", err))
    }
}

impl From<cpal::SupportedStreamConfigsError> for AppError {
    fn from(err: cpal::SupportedStreamConfigsError) -> Self {
        AppError::AudioDevice(format!("Failed to get supported stream configs: {}", err))
    }
}

impl From<cpal::BuildStreamError> for AppError {
    fn from(err: cpal::BuildStreamError) -> Self {
        AppError::AudioStream(format!("Failed to build audio stream: {}", err))
    }
}

impl From<cpal::PlayStreamError> for AppError {
    fn from(err: cpal::PlayStreamError) -> Self {
        AppError::AudioStream(format!("Failed to play audio stream: {}", err))
    }
}

/// Result type alias for application operations
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_meter_error_display() {
        let err = MeterError::UnknownThresholdKey("volume".into());
        assert_eq!(err.to_string(), "Unknown threshold key: volume");

        let err = MeterError::InvalidThresholdValue {
            key: "lives".into(),
            value: "-1".into(),
            reason: "must not be negative".into(),
        };
        assert!(err.to_string().contains("lives"));
        assert!(err.to_string().contains("must not be negative"));
    }

    #[test]
    fn test_meter_error_converts_into_app_error() {
        let err: AppError = MeterError::InsufficientData.into();
        assert!(matches!(err, AppError::Meter(MeterError::InsufficientData)));
        assert_eq!(err.to_string(), MeterError::InsufficientData.to_string());
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: AppError = io_err.into();
        assert!(err.to_string().starts_with("I/O error"));
    }
}
