//! Batch file loading errors

use thiserror::Error;

/// Errors raised while reading producer batches from disk
#[derive(Error, Debug)]
pub enum LoadError {
    /// File extension or declared type is not handled
    #[error("Unsupported file type: {0}")]
    UnsupportedFileType(String),

    /// File not found
    #[error("File not found: {0}")]
    FileNotFound(String),

    /// Required CSV column is missing
    #[error("Missing required column '{0}'")]
    MissingColumn(String),

    /// Document holds neither a batch, a batch list nor an item
    #[error("Invalid batch: {0}")]
    InvalidBatch(String),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV parsing error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// YAML parsing error
    #[error("YAML error: {0}")]
    Yaml(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl LoadError {
    /// Get error code for API responses
    pub fn error_code(&self) -> &'static str {
        match self {
            LoadError::UnsupportedFileType(_) => "UNSUPPORTED_FILE_TYPE",
            LoadError::FileNotFound(_) => "FILE_NOT_FOUND",
            LoadError::MissingColumn(_) => "MISSING_COLUMN",
            LoadError::InvalidBatch(_) => "INVALID_BATCH",
            LoadError::Json(_) => "JSON_ERROR",
            LoadError::Csv(_) => "CSV_ERROR",
            LoadError::Yaml(_) => "YAML_ERROR",
            LoadError::Io(_) => "IO_ERROR",
        }
    }

    /// Check if this is a not found error (404)
    pub fn is_not_found(&self) -> bool {
        matches!(self, LoadError::FileNotFound(_))
    }
}

impl From<serde_yaml::Error> for LoadError {
    fn from(err: serde_yaml::Error) -> Self {
        LoadError::Yaml(err.to_string())
    }
}
