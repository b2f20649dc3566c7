//! Configuration errors
//!
//! Raised before any processing starts when a filter, export or unifier
//! configuration holds values the pipeline cannot honour.

use thiserror::Error;

/// Invalid filter, export or unifier configuration
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigurationError {
    /// A single value is out of its domain
    #[error("Invalid value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },

    /// A pair of bounds is inconsistent
    #[error("Invalid range for '{field}': {reason}")]
    InvalidRange { field: String, reason: String },

    /// Export field name is not known
    #[error("Unknown export field: {0}")]
    UnknownField(String),

    /// Export field list is present but empty
    #[error("Export field list must not be empty")]
    EmptyFieldList,
}

impl ConfigurationError {
    pub fn invalid_value(field: impl Into<String>, reason: impl Into<String>) -> Self {
        ConfigurationError::InvalidValue {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub fn invalid_range(field: impl Into<String>, reason: impl Into<String>) -> Self {
        ConfigurationError::InvalidRange {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Configuration errors always originate from caller input
    pub fn is_client_error(&self) -> bool {
        true
    }

    /// Get error code for API responses
    pub fn error_code(&self) -> &'static str {
        match self {
            ConfigurationError::InvalidValue { .. } => "INVALID_VALUE",
            ConfigurationError::InvalidRange { .. } => "INVALID_RANGE",
            ConfigurationError::UnknownField(_) => "UNKNOWN_FIELD",
            ConfigurationError::EmptyFieldList => "EMPTY_FIELD_LIST",
        }
    }
}
