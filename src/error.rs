//! Error types for the diagnosis pipeline

use thiserror::Error;

/// Result type alias for diagnosis operations
pub type Result<T> = std::result::Result<T, DiagnosisError>;

/// Main error type for the diagnosis pipeline
#[derive(Error, Debug)]
pub enum DiagnosisError {
    /// Invalid target column or configuration; fatal before any training
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    #[error("Data error: {0}")]
    DataError(String),

    #[error("Training error: {0}")]
    TrainingError(String),

    #[error("Computation error: {0}")]
    ComputationError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    /// A non-fatal analysis stage failed; callers degrade to an empty result
    #[error("Stage '{stage}' failed: {reason}")]
    StageFailure { stage: String, reason: String },

    /// Every candidate model failed cross-validation
    #[error("No model could be trained ({attempted} candidates attempted)")]
    NoModelTrained { attempted: usize },

    #[error("No numeric features available for training")]
    NoNumericFeatures,

    #[error("Invalid shape: expected {expected}, got {actual}")]
    ShapeError { expected: String, actual: String },

    #[error("Feature not found: {0}")]
    FeatureNotFound(String),

    #[error("Model not fitted")]
    ModelNotFitted,

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl DiagnosisError {
    pub fn stage(stage: &str, reason: impl ToString) -> Self {
        DiagnosisError::StageFailure {
            stage: stage.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Whether this error must abort the whole run
    pub fn is_fatal(&self) -> bool {
        matches!(self, DiagnosisError::ConfigurationError(_))
    }
}

impl From<polars::error::PolarsError> for DiagnosisError {
    fn from(err: polars::error::PolarsError) -> Self {
        DiagnosisError::DataError(err.to_string())
    }
}

impl From<serde_json::Error> for DiagnosisError {
    fn from(err: serde_json::Error) -> Self {
        DiagnosisError::SerializationError(err.to_string())
    }
}

impl From<ndarray::ShapeError> for DiagnosisError {
    fn from(err: ndarray::ShapeError) -> Self {
        DiagnosisError::ShapeError {
            expected: "valid shape".to_string(),
            actual: err.to_string(),
        }
    }
}
