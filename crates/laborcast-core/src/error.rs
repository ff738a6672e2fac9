//! Core error types for laborcast-core.
//!
//! Numeric "no answer" conditions (too few points, singular systems) are
//! modelled as [`FitError`] and never escape the predictor: it turns them
//! into an absent prediction. Only malformed input and configuration
//! problems surface to callers.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for laborcast-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Curve fitting errors
    #[error("Fit error: {0}")]
    Fit(#[from] FitError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Curve fitting errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FitError {
    /// Not enough usable points for the requested model
    #[error("Insufficient data: got {got} points, need at least {min}")]
    InsufficientData { got: usize, min: usize },

    /// A pivot (or regression denominator) was effectively zero
    #[error("Singular matrix: linear system has no unique solution")]
    SingularMatrix,
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Unknown configuration key
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),

    /// Failed to parse configuration
    #[error("Failed to parse configuration: {0}")]
    ParseFailed(String),

    /// Config directory could not be determined or created
    #[error("Configuration directory unavailable: {0}")]
    DirectoryUnavailable(String),
}

/// Validation errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// An observation violates the finite, non-negative duration precondition
    #[error("Invalid observation at index {index}: {reason}")]
    InvalidObservation { index: usize, reason: String },

    /// Invalid time range on a contraction record
    #[error("Invalid time range: end_time ({end}) must not precede start_time ({start})")]
    InvalidTimeRange {
        start: chrono::DateTime<chrono::Utc>,
        end: chrono::DateTime<chrono::Utc>,
    },
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        ConfigError::ParseFailed(err.to_string())
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fit_error_converts_into_core_error() {
        let err: CoreError = FitError::SingularMatrix.into();
        assert!(matches!(err, CoreError::Fit(FitError::SingularMatrix)));
        assert!(err.to_string().contains("Singular matrix"));
    }

    #[test]
    fn insufficient_data_message_names_counts() {
        let err = FitError::InsufficientData { got: 1, min: 3 };
        assert_eq!(
            err.to_string(),
            "Insufficient data: got 1 points, need at least 3"
        );
    }

    #[test]
    fn toml_parse_error_becomes_config_error() {
        let parsed: std::result::Result<toml::Value, _> = toml::from_str("= broken");
        let err: ConfigError = parsed.unwrap_err().into();
        assert!(matches!(err, ConfigError::ParseFailed(_)));
    }
}
