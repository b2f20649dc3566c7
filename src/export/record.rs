use indexmap::IndexMap;
use serde_json::{json, Value};
use std::collections::BTreeSet;

use super::{ExportConfig, ExportField};
use crate::model::{MetaValue, QAItem};

/// Separator for list fields in flat formats
pub const LIST_SEPARATOR: &str = "|";
pub const META_PREFIX: &str = "meta_";

/// A single spreadsheet or CSV cell
#[derive(Clone, Debug, PartialEq)]
pub enum Cell {
    Text(String),
    Number(f64),
}

impl Cell {
    pub fn to_text(&self) -> String {
        match self {
            Cell::Text(text) => text.clone(),
            Cell::Number(value) => format!("{:.4}", value),
        }
    }
}

/// Joins list values with [`LIST_SEPARATOR`], escaping `\` and `|` inside values
pub fn join_list(values: &[String]) -> String {
    values
        .iter()
        .map(|value| value.replace('\\', "\\\\").replace('|', "\\|"))
        .collect::<Vec<_>>()
        .join(LIST_SEPARATOR)
}

/// Inverse of [`join_list`]
pub fn split_list(cell: &str) -> Vec<String> {
    let mut values = Vec::new();
    let mut current = String::new();
    let mut chars = cell.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some(escaped) => current.push(escaped),
                None => current.push('\\'),
            },
            '|' => values.push(std::mem::take(&mut current)),
            other => current.push(other),
        }
    }
    values.push(current);
    values
}

pub fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

/// Column layout shared by the flat formats
pub struct FlatLayout {
    pub fields: Vec<ExportField>,
    pub meta_keys: Vec<String>,
}

impl FlatLayout {
    pub fn new(items: &[&QAItem], config: &ExportConfig) -> Self {
        let meta_keys = if config.include_metadata {
            let keys: BTreeSet<&String> = items
                .iter()
                .flat_map(|item| item.metadata.keys())
                .collect();
            keys.into_iter().cloned().collect()
        } else {
            Vec::new()
        };
        Self {
            fields: config.resolved_fields(),
            meta_keys,
        }
    }

    pub fn headers(&self) -> Vec<String> {
        self.fields
            .iter()
            .map(|field| field.name().to_string())
            .chain(
                self.meta_keys
                    .iter()
                    .map(|key| format!("{}{}", META_PREFIX, key)),
            )
            .collect()
    }

    pub fn row(&self, item: &QAItem) -> Vec<Cell> {
        let mut cells: Vec<Cell> = self
            .fields
            .iter()
            .map(|field| flat_cell(item, *field))
            .collect();
        for key in &self.meta_keys {
            let text = item
                .metadata
                .get(key)
                .map(MetaValue::to_flat_string)
                .unwrap_or_default();
            cells.push(Cell::Text(text));
        }
        cells
    }
}

fn flat_cell(item: &QAItem, field: ExportField) -> Cell {
    match field {
        ExportField::Question => Cell::Text(item.question.clone()),
        ExportField::Answer => Cell::Text(item.answer.clone()),
        ExportField::Category => Cell::Text(item.category.clone()),
        ExportField::Level => Cell::Text(item.level.as_str().to_string()),
        ExportField::Topic => Cell::Text(item.topic.clone()),
        ExportField::Language => Cell::Text(item.language.clone()),
        ExportField::Confidence => Cell::Number(round4(item.confidence)),
        ExportField::Sources => Cell::Text(join_list(&item.sources)),
        ExportField::Keywords => Cell::Text(join_list(&item.keywords)),
        ExportField::CreatedAt => Cell::Text(
            item.created_at
                .map(|ts| ts.to_rfc3339())
                .unwrap_or_default(),
        ),
    }
}

/// Ordered record for the structured formats (json, yaml)
pub fn structured_record(item: &QAItem, config: &ExportConfig) -> IndexMap<String, Value> {
    let mut record = IndexMap::new();
    for field in config.resolved_fields() {
        let value = match field {
            ExportField::Question => json!(item.question),
            ExportField::Answer => json!(item.answer),
            ExportField::Category => json!(item.category),
            ExportField::Level => json!(item.level.as_str()),
            ExportField::Topic => json!(item.topic),
            ExportField::Language => json!(item.language),
            ExportField::Confidence => json!(round4(item.confidence)),
            ExportField::Sources => json!(item.sources),
            ExportField::Keywords => json!(item.keywords),
            ExportField::CreatedAt => json!(item.created_at.map(|ts| ts.to_rfc3339())),
        };
        record.insert(field.name().to_string(), value);
    }
    if config.include_metadata {
        record.insert("metadata".to_string(), json!(item.metadata));
    }
    record
}
