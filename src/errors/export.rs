//! Export error types
//!
//! An export either produces a complete artifact or fails with one of these;
//! the target path is never left holding partial output.

use thiserror::Error;

use super::ConfigurationError;

/// Export operation errors
#[derive(Error, Debug)]
pub enum ExportError {
    /// Unsupported format
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// Export configuration rejected before serialization
    #[error("Invalid export configuration: {0}")]
    InvalidConfiguration(#[from] ConfigurationError),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV writing error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Spreadsheet writing error
    #[error("Spreadsheet error: {0}")]
    Spreadsheet(#[from] rust_xlsxwriter::XlsxError),

    /// YAML serialization error
    #[error("YAML error: {0}")]
    Yaml(String),

    /// IO error while writing the artifact
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ExportError {
    /// Check if this is a client error (400-series)
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            ExportError::UnsupportedFormat(_) | ExportError::InvalidConfiguration(_)
        )
    }

    /// Check if this is a server error (500-series)
    pub fn is_server_error(&self) -> bool {
        !self.is_client_error()
    }

    /// Get error code for API responses
    pub fn error_code(&self) -> &'static str {
        match self {
            ExportError::UnsupportedFormat(_) => "UNSUPPORTED_FORMAT",
            ExportError::InvalidConfiguration(_) => "INVALID_CONFIGURATION",
            ExportError::Json(_) => "JSON_ERROR",
            ExportError::Csv(_) => "CSV_ERROR",
            ExportError::Spreadsheet(_) => "SPREADSHEET_ERROR",
            ExportError::Yaml(_) => "YAML_ERROR",
            ExportError::Io(_) => "IO_ERROR",
        }
    }
}

impl From<serde_yaml::Error> for ExportError {
    fn from(err: serde_yaml::Error) -> Self {
        ExportError::Yaml(err.to_string())
    }
}

impl From<csv::IntoInnerError<csv::Writer<Vec<u8>>>> for ExportError {
    fn from(err: csv::IntoInnerError<csv::Writer<Vec<u8>>>) -> Self {
        ExportError::Io(err.into_error())
    }
}
