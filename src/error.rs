//! Error types for the fraud-detection modelling crate

use thiserror::Error;

/// Result type alias for crate operations
pub type Result<T> = std::result::Result<T, FraudError>;

/// Main error type
#[derive(Error, Debug)]
pub enum FraudError {
    /// A column set omits required model features. `missing` is sorted.
    #[error("Inconsistent feature set, missing features: {missing:?}")]
    MissingFeatures { missing: Vec<String> },

    #[error("Preprocessor or model not fitted")]
    NotFitted,

    /// The estimator cannot produce class probabilities
    #[error("Capability error: {0}")]
    Capability(String),

    #[error("Type mismatch: {0}")]
    TypeMismatch(String),

    #[error("Invalid shape: expected {expected}, got {actual}")]
    Shape { expected: String, actual: String },

    #[error("Unsupported input type: {0}")]
    TypeUnsupported(String),

    #[error("Feature not found: {0}")]
    FeatureNotFound(String),

    #[error("Data error: {0}")]
    DataError(String),

    #[error("Training error: {0}")]
    TrainingError(String),

    #[error("Invalid parameter: {name} = {value}, {reason}")]
    InvalidParameter {
        name: String,
        value: String,
        reason: String,
    },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl FraudError {
    /// Shape error for two sequences that must be aligned by row
    pub(crate) fn length_mismatch(what: &str, expected: usize, actual: usize) -> Self {
        FraudError::Shape {
            expected: format!("{} length = {}", what, expected),
            actual: format!("{} length = {}", what, actual),
        }
    }
}

impl From<polars::error::PolarsError> for FraudError {
    fn from(err: polars::error::PolarsError) -> Self {
        FraudError::DataError(err.to_string())
    }
}

impl From<serde_json::Error> for FraudError {
    fn from(err: serde_json::Error) -> Self {
        FraudError::Serialization(err.to_string())
    }
}

impl From<ndarray::ShapeError> for FraudError {
    fn from(err: ndarray::ShapeError) -> Self {
        FraudError::Shape {
            expected: "valid shape".to_string(),
            actual: err.to_string(),
        }
    }
}
