//! Domain-specific error types for qaunify
//!
//! Each stage of the unification pipeline owns its error type, so callers can
//! tell an item-level rejection apart from a failed export or a bad
//! configuration.
//!
//! # Error Categories
//!
//! - **ValidationError**: a single malformed item; counted, never batch-fatal
//! - **ConfigurationError**: invalid filter, export or unifier settings
//! - **ExportError**: unsupported format, serialization or I/O failure
//! - **LoadError**: a batch file could not be read or parsed
//!
//! # Examples
//!
//! ```rust
//! use qaunify::errors::{ConfigurationError, ValidationError};
//!
//! let err = ValidationError::MissingField("question");
//! assert_eq!(err.error_code(), "MISSING_FIELD");
//!
//! let err = ConfigurationError::InvalidRange {
//!     field: "confidence".to_string(),
//!     reason: "min_confidence 0.9 is greater than max_confidence 0.1".to_string(),
//! };
//! assert!(err.is_client_error());
//! ```

pub mod configuration;
pub mod export;
pub mod load;
pub mod validation;

pub use configuration::ConfigurationError;
pub use export::ExportError;
pub use load::LoadError;
pub use validation::ValidationError;

/// Result type alias for item validation
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Result type alias for configuration checks
pub type ConfigurationResult<T> = Result<T, ConfigurationError>;

/// Result type alias for export operations
pub type ExportResult<T> = Result<T, ExportError>;

/// Result type alias for batch loading
pub type LoadResult<T> = Result<T, LoadError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_result_alias() {
        let result: ValidationResult<()> = Err(ValidationError::MissingField("answer"));
        assert!(result.is_err());
    }

    #[test]
    fn test_configuration_result_alias() {
        let result: ConfigurationResult<()> =
            Err(ConfigurationError::InvalidValue {
                field: "format".to_string(),
                reason: "unknown".to_string(),
            });
        assert!(result.is_err());
    }

    #[test]
    fn test_export_result_alias() {
        let result: ExportResult<()> = Err(ExportError::UnsupportedFormat("xml".to_string()));
        assert!(result.is_err());
    }

    #[test]
    fn test_load_result_alias() {
        let result: LoadResult<()> = Err(LoadError::UnsupportedFileType("pdf".to_string()));
        assert!(result.is_err());
    }
}
