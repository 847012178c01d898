//! Error types for traffic anomaly detection

use std::time::Duration;
use thiserror::Error;

/// Result type alias for detection operations
pub type Result<T> = std::result::Result<T, AnomalyError>;

/// Main error type for the crate
#[derive(Error, Debug)]
pub enum AnomalyError {
    /// Input file missing, unreadable, or malformed
    #[error("Data load error: {0}")]
    DataLoad(String),

    #[error("Invalid configuration: {name} = {value}, {reason}")]
    InvalidConfiguration {
        name: String,
        value: String,
        reason: String,
    },

    /// No usable record after loading
    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("Invalid shape: expected {expected}, got {actual}")]
    ShapeMismatch { expected: usize, actual: usize },

    #[error("Report error: {0}")]
    Report(String),

    #[error("Run aborted after exceeding timeout of {0:?}")]
    Timeout(Duration),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl AnomalyError {
    pub(crate) fn invalid_config(
        name: &str,
        value: impl ToString,
        reason: impl Into<String>,
    ) -> Self {
        AnomalyError::InvalidConfiguration {
            name: name.to_string(),
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<polars::error::PolarsError> for AnomalyError {
    fn from(err: polars::error::PolarsError) -> Self {
        AnomalyError::DataLoad(err.to_string())
    }
}

impl From<serde_json::Error> for AnomalyError {
    fn from(err: serde_json::Error) -> Self {
        AnomalyError::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = AnomalyError::DataLoad("missing column".to_string());
        assert_eq!(err.to_string(), "Data load error: missing column");

        let err = AnomalyError::invalid_config("contamination", 0.6, "must lie in (0, 0.5]");
        assert_eq!(
            err.to_string(),
            "Invalid configuration: contamination = 0.6, must lie in (0, 0.5]"
        );
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: AnomalyError = io_err.into();
        assert!(matches!(err, AnomalyError::Io(_)));
    }
}
