//! Error types for the lifestyle risk pipeline

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, RiskError>;

/// Main error type for loading, training and inference
#[derive(Error, Debug)]
pub enum RiskError {
    /// Input data does not match the feature schema
    #[error("Schema error: {0}")]
    SchemaError(String),

    #[error("Training error: {0}")]
    TrainingError(String),

    /// Stratification or fitting is impossible with the available rows
    #[error("Insufficient data: {0}")]
    InsufficientDataError(String),

    #[error("Model artifact not found: {}", .0.display())]
    ModelNotFoundError(PathBuf),

    /// A single inference record is malformed
    #[error("Invalid input: {0}")]
    InputValidationError(String),

    #[error("Data error: {0}")]
    DataError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Invalid shape: expected {expected}, got {actual}")]
    ShapeError { expected: String, actual: String },

    #[error("Model not fitted")]
    ModelNotFitted,

    #[error("Invalid parameter: {name} = {value}, {reason}")]
    InvalidParameter {
        name: String,
        value: String,
        reason: String,
    },
}

impl RiskError {
    /// Whether the error was caused by the caller's input rather than the system
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            RiskError::InputValidationError(_) | RiskError::SchemaError(_)
        )
    }
}

impl From<polars::error::PolarsError> for RiskError {
    fn from(err: polars::error::PolarsError) -> Self {
        RiskError::DataError(err.to_string())
    }
}

impl From<serde_json::Error> for RiskError {
    fn from(err: serde_json::Error) -> Self {
        RiskError::SerializationError(err.to_string())
    }
}

impl From<bincode::Error> for RiskError {
    fn from(err: bincode::Error) -> Self {
        RiskError::SerializationError(err.to_string())
    }
}

impl From<ndarray::ShapeError> for RiskError {
    fn from(err: ndarray::ShapeError) -> Self {
        RiskError::ShapeError {
            expected: "valid shape".to_string(),
            actual: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = RiskError::SchemaError("missing column 'BMI'".to_string());
        assert_eq!(err.to_string(), "Schema error: missing column 'BMI'");
    }

    #[test]
    fn test_model_not_found_display() {
        let err = RiskError::ModelNotFoundError(PathBuf::from("models/risk_model.bin"));
        assert_eq!(err.to_string(), "Model artifact not found: models/risk_model.bin");
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: RiskError = io_err.into();
        assert!(matches!(err, RiskError::IoError(_)));
    }

    #[test]
    fn test_client_error_classification() {
        assert!(RiskError::InputValidationError("x".into()).is_client_error());
        assert!(!RiskError::TrainingError("x".into()).is_client_error());
    }
}
