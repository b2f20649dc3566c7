//! Item validation errors
//!
//! Raised by the normalizer for a single item. The normalizer collects them
//! into the batch statistics instead of propagating them.

use thiserror::Error;

/// A single item failed validation
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// Required text field is absent or blank after trimming
    #[error("Missing required field '{0}'")]
    MissingField(&'static str),

    /// Level is not one of the recognised values
    #[error("Invalid level '{0}'")]
    InvalidLevel(String),

    /// Origin is not one of the recognised values
    #[error("Invalid origin '{0}'")]
    InvalidOrigin(String),

    /// Confidence is not a number
    #[error("Invalid confidence: {0}")]
    InvalidConfidence(String),
}

impl ValidationError {
    /// Get error code for API responses and batch statistics
    pub fn error_code(&self) -> &'static str {
        match self {
            ValidationError::MissingField(_) => "MISSING_FIELD",
            ValidationError::InvalidLevel(_) => "INVALID_LEVEL",
            ValidationError::InvalidOrigin(_) => "INVALID_ORIGIN",
            ValidationError::InvalidConfidence(_) => "INVALID_CONFIDENCE",
        }
    }
}
