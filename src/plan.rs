use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::config::UnifierConfig;
use crate::data_loader::BatchFileType;
use crate::export::{ExportConfig, ExportField, ExportFormat};
use crate::filter::FilterConfig;
use crate::model::Origin;

/// ## Structure
/// This module contains the data structures for the plan file.
///
/// ```text
/// Plan
///   ├── meta: Option<Meta>
///   │   └── name: Option<String>
///   ├── unify: UnifierConfig
///   ├── import: ImportConfig
///   │   └── profiles: Vec<ImportProfile>
///   │       ├── filename: String
///   │       ├── filetype: Option<BatchFileType>
///   │       │   ├── json
///   │       │   ├── yaml
///   │       │   └── csv
///   │       └── origin: Option<Origin>
///   └── export: ExportProfile
///       └── profiles: Vec<ExportProfileItem>
///           ├── filename: Option<String>
///           ├── output_dir: Option<PathBuf>
///           ├── format: ExportFormat
///           ├── include_metadata: bool
///           ├── fields: Option<Vec<ExportField>>
///           └── filter: Option<FilterConfig>
/// ```

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct Meta {
    pub name: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct Plan {
    pub meta: Option<Meta>,
    #[serde(default)]
    pub unify: UnifierConfig,
    #[serde(default)]
    pub import: ImportConfig,
    #[serde(default)]
    pub export: ExportProfile,
}

impl Plan {
    pub fn name(&self) -> String {
        self.meta
            .as_ref()
            .and_then(|meta| meta.name.clone())
            .unwrap_or_else(|| "Unnamed Plan".to_string())
    }
}

//
// Import configuration
//

#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct ImportConfig {
    pub profiles: Vec<ImportProfile>,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ImportProfile {
    pub filename: String,
    /// Detected from the file extension when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filetype: Option<BatchFileType>,
    /// Overrides the origin recorded in the file
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<Origin>,
}

//
// Export configuration
//

#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct ExportProfile {
    pub profiles: Vec<ExportProfileItem>,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ExportProfileItem {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<PathBuf>,
    pub format: ExportFormat,
    #[serde(default)]
    pub include_metadata: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fields: Option<Vec<ExportField>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<FilterConfig>,
}

impl ExportProfileItem {
    /// Export settings with `output_dir` resolved against `base_dir`
    pub fn to_export_config(&self, base_dir: &std::path::Path) -> ExportConfig {
        let output_dir = match &self.output_dir {
            Some(dir) => base_dir.join(dir),
            None => base_dir.to_path_buf(),
        };
        ExportConfig {
            format: self.format,
            include_metadata: self.include_metadata,
            fields: self.fields.clone(),
            output_dir: Some(output_dir),
            filename: self.filename.clone(),
        }
    }

    pub fn describe(&self) -> String {
        match &self.filename {
            Some(filename) => format!("{} ({})", filename, self.format),
            None => format!("<generated> ({})", self.format),
        }
    }
}
