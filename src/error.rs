//! Error types for the shot-outcome pipeline

use thiserror::Error;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Main error type for the pipeline
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Missing, unreadable or corrupt file
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Expected column absent or not numeric
    #[error("Schema error: {0}")]
    Schema(String),

    /// Degenerate input (single-class label, zero variance, empty vectors)
    #[error("Value error: {0}")]
    Value(String),

    /// Fit, load or predict failure on a model
    #[error("Model error: {0}")]
    Model(String),

    #[error("Data error: {0}")]
    Data(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl PipelineError {
    pub fn schema(msg: impl Into<String>) -> Self {
        PipelineError::Schema(msg.into())
    }

    pub fn value(msg: impl Into<String>) -> Self {
        PipelineError::Value(msg.into())
    }

    pub fn model(msg: impl Into<String>) -> Self {
        PipelineError::Model(msg.into())
    }
}

impl From<polars::error::PolarsError> for PipelineError {
    fn from(err: polars::error::PolarsError) -> Self {
        match err {
            polars::error::PolarsError::ColumnNotFound(msg) => PipelineError::Schema(msg.to_string()),
            other => PipelineError::Data(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for PipelineError {
    fn from(err: serde_json::Error) -> Self {
        PipelineError::Serialization(err.to_string())
    }
}

impl From<ndarray::ShapeError> for PipelineError {
    fn from(err: ndarray::ShapeError) -> Self {
        PipelineError::Value(format!("invalid shape: {}", err))
    }
}
