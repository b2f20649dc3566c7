mod csv_common;
pub mod record;
pub mod to_csv;
pub mod to_json;
pub mod to_xlsx;
pub mod to_yaml;

use chrono::Local;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::info;

use crate::errors::{ConfigurationError, ConfigurationResult, ExportError, ExportResult};
use crate::model::QAItem;
use crate::view::View;

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Csv,
    Json,
    #[serde(alias = "xlsx")]
    Excel,
    #[serde(alias = "yml")]
    Yaml,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Json => "json",
            ExportFormat::Excel => "xlsx",
            ExportFormat::Yaml => "yaml",
        }
    }
}

impl Display for ExportFormat {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Json => "json",
            ExportFormat::Excel => "excel",
            ExportFormat::Yaml => "yaml",
        };
        f.write_str(name)
    }
}

impl FromStr for ExportFormat {
    type Err = ExportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "csv" => Ok(ExportFormat::Csv),
            "json" => Ok(ExportFormat::Json),
            "excel" | "xlsx" => Ok(ExportFormat::Excel),
            "yaml" | "yml" => Ok(ExportFormat::Yaml),
            other => Err(ExportError::UnsupportedFormat(other.to_string())),
        }
    }
}

/// Item fields that can be exported, in their default order
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ExportField {
    Question,
    Answer,
    Category,
    Level,
    Topic,
    Language,
    Confidence,
    Sources,
    Keywords,
    CreatedAt,
}

pub const DEFAULT_FIELDS: [ExportField; 8] = [
    ExportField::Question,
    ExportField::Answer,
    ExportField::Category,
    ExportField::Level,
    ExportField::Topic,
    ExportField::Language,
    ExportField::Confidence,
    ExportField::Sources,
];

impl ExportField {
    pub fn name(&self) -> &'static str {
        match self {
            ExportField::Question => "question",
            ExportField::Answer => "answer",
            ExportField::Category => "category",
            ExportField::Level => "level",
            ExportField::Topic => "topic",
            ExportField::Language => "language",
            ExportField::Confidence => "confidence",
            ExportField::Sources => "sources",
            ExportField::Keywords => "keywords",
            ExportField::CreatedAt => "created_at",
        }
    }
}

impl FromStr for ExportField {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "question" => Ok(ExportField::Question),
            "answer" => Ok(ExportField::Answer),
            "category" => Ok(ExportField::Category),
            "level" => Ok(ExportField::Level),
            "topic" => Ok(ExportField::Topic),
            "language" => Ok(ExportField::Language),
            "confidence" => Ok(ExportField::Confidence),
            "sources" => Ok(ExportField::Sources),
            "keywords" => Ok(ExportField::Keywords),
            "created_at" => Ok(ExportField::CreatedAt),
            other => Err(ConfigurationError::UnknownField(other.to_string())),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ExportConfig {
    pub format: ExportFormat,
    #[serde(default)]
    pub include_metadata: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fields: Option<Vec<ExportField>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
}

impl ExportConfig {
    pub fn new(format: ExportFormat) -> Self {
        Self {
            format,
            include_metadata: false,
            fields: None,
            output_dir: None,
            filename: None,
        }
    }

    pub fn with_metadata(mut self, include_metadata: bool) -> Self {
        self.include_metadata = include_metadata;
        self
    }

    pub fn with_fields(mut self, fields: Vec<ExportField>) -> Self {
        self.fields = Some(fields);
        self
    }

    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(dir.into());
        self
    }

    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into());
        self
    }

    pub fn validate(&self) -> ConfigurationResult<()> {
        if let Some(fields) = &self.fields {
            if fields.is_empty() {
                return Err(ConfigurationError::EmptyFieldList);
            }
            let mut seen = std::collections::HashSet::new();
            for field in fields {
                if !seen.insert(field) {
                    return Err(ConfigurationError::invalid_value(
                        "fields",
                        format!("'{}' is listed more than once", field.name()),
                    ));
                }
            }
        }
        if let Some(filename) = &self.filename {
            let name = Path::new(filename);
            if filename.trim().is_empty() || name.file_name().is_none() {
                return Err(ConfigurationError::invalid_value(
                    "filename",
                    format!("'{}' is not a file name", filename),
                ));
            }
        }
        Ok(())
    }

    /// Explicit field order, or the default one
    pub fn resolved_fields(&self) -> Vec<ExportField> {
        self.fields
            .clone()
            .unwrap_or_else(|| DEFAULT_FIELDS.to_vec())
    }

    /// Target path: `<output_dir>/<filename>`, with the format extension
    /// appended when missing and a timestamped name when none is given
    pub fn resolve_path(&self) -> PathBuf {
        let extension = self.format.extension();
        let filename = match &self.filename {
            Some(name) if name.ends_with(&format!(".{}", extension)) => name.clone(),
            Some(name) => format!("{}.{}", name, extension),
            None => format!(
                "qa_export_{}.{}",
                Local::now().format("%Y%m%d_%H%M%S"),
                extension
            ),
        };
        match &self.output_dir {
            Some(dir) => dir.join(filename),
            None => PathBuf::from(filename),
        }
    }
}

/// Serializes a sequence of items into one artifact format
pub trait Exporter {
    fn format(&self) -> ExportFormat;

    fn render(&self, items: &[&QAItem], config: &ExportConfig) -> ExportResult<Vec<u8>>;
}

pub fn exporter_for(format: ExportFormat) -> Box<dyn Exporter> {
    match format {
        ExportFormat::Csv => Box::new(to_csv::CsvExporter),
        ExportFormat::Json => Box::new(to_json::JsonExporter),
        ExportFormat::Excel => Box::new(to_xlsx::XlsxExporter),
        ExportFormat::Yaml => Box::new(to_yaml::YamlExporter),
    }
}

/// Renders the view into an in-memory buffer
pub fn render(view: &View<'_>, config: &ExportConfig) -> ExportResult<Vec<u8>> {
    config.validate()?;
    let exporter = exporter_for(config.format);
    exporter.render(view.items(), config)
}

/// Renders the view and writes it atomically to the configured location
pub fn write(view: &View<'_>, config: &ExportConfig) -> ExportResult<PathBuf> {
    let bytes = render(view, config)?;
    let path = config.resolve_path();
    crate::common::write_bytes_atomically(&path, &bytes)?;
    info!(
        "Exported {} items as {} to {}",
        view.len(),
        config.format,
        path.display()
    );
    Ok(path)
}
