use csv::StringRecord;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt::{Display, Formatter};
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};

use crate::errors::{LoadError, LoadResult};
use crate::export::record::{self, META_PREFIX};
use crate::model::{MetaValue, Metadata, Origin, RawBatch, RawItem};

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BatchFileType {
    Json,
    #[serde(alias = "yml")]
    Yaml,
    Csv,
}

impl BatchFileType {
    pub fn from_path(path: &Path) -> LoadResult<Self> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_lowercase())
            .unwrap_or_default();
        match extension.as_str() {
            "json" => Ok(BatchFileType::Json),
            "yaml" | "yml" => Ok(BatchFileType::Yaml),
            "csv" => Ok(BatchFileType::Csv),
            _ => Err(LoadError::UnsupportedFileType(path.display().to_string())),
        }
    }
}

/// Column offsets of a CSV item file. Optional columns are `None` when absent.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ItemLoadProfile {
    pub question_column: Option<usize>,
    pub answer_column: Option<usize>,
    pub category_column: Option<usize>,
    pub level_column: Option<usize>,
    pub topic_column: Option<usize>,
    pub language_column: Option<usize>,
    pub confidence_column: Option<usize>,
    pub sources_column: Option<usize>,
    pub keywords_column: Option<usize>,
    pub created_at_column: Option<usize>,
    pub metadata_columns: Vec<(usize, String)>,
}

impl Display for ItemLoadProfile {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let show = |column: Option<usize>| column.map_or("-".to_string(), |c| c.to_string());
        write!(
            f,
            "Item column offsets: question:{}, answer:{}, category:{}, level:{}, topic:{}, language:{}, confidence:{}, sources:{}, keywords:{}, created_at:{}, metadata:{}",
            show(self.question_column),
            show(self.answer_column),
            show(self.category_column),
            show(self.level_column),
            show(self.topic_column),
            show(self.language_column),
            show(self.confidence_column),
            show(self.sources_column),
            show(self.keywords_column),
            show(self.created_at_column),
            self.metadata_columns.len(),
        )
    }
}

/// Maps headers to columns. Spanish header names are accepted as well.
pub fn create_item_load_profile(headers: &[String]) -> ItemLoadProfile {
    let mut profile = ItemLoadProfile::default();
    for (i, field) in headers.iter().enumerate() {
        let field = field.trim();
        match field.to_lowercase().as_str() {
            "question" | "pregunta" => profile.question_column = Some(i),
            "answer" | "respuesta" => profile.answer_column = Some(i),
            "category" | "categoria" => profile.category_column = Some(i),
            "level" | "nivel" => profile.level_column = Some(i),
            "topic" | "tema" => profile.topic_column = Some(i),
            "language" | "idioma" => profile.language_column = Some(i),
            "confidence" | "confianza" => profile.confidence_column = Some(i),
            "sources" | "fuentes" => profile.sources_column = Some(i),
            "keywords" | "palabras_clave" => profile.keywords_column = Some(i),
            "created_at" | "fecha_creacion" => profile.created_at_column = Some(i),
            _ => {
                if let Some(key) = field.strip_prefix(META_PREFIX) {
                    profile.metadata_columns.push((i, key.to_string()));
                }
            }
        }
    }
    profile
}

pub fn verify_item_headers(profile: &ItemLoadProfile) -> LoadResult<()> {
    if profile.question_column.is_none() {
        return Err(LoadError::MissingColumn("question".to_string()));
    }
    if profile.answer_column.is_none() {
        return Err(LoadError::MissingColumn("answer".to_string()));
    }
    Ok(())
}

fn cell(record: &StringRecord, column: Option<usize>) -> Option<String> {
    column
        .and_then(|c| record.get(c))
        .map(|value| value.to_string())
        .filter(|value| !value.trim().is_empty())
}

fn split_list(value: Option<String>) -> Vec<String> {
    value
        .map(|v| record::split_list(&v))
        .unwrap_or_default()
}

impl RawItem {
    pub fn from_row(record: &StringRecord, profile: &ItemLoadProfile) -> Self {
        let mut metadata = Metadata::new();
        for (column, key) in &profile.metadata_columns {
            if let Some(value) = cell(record, Some(*column)) {
                metadata.insert(key.clone(), MetaValue::String(value));
            }
        }
        Self {
            question: cell(record, profile.question_column),
            answer: cell(record, profile.answer_column),
            category: cell(record, profile.category_column),
            level: cell(record, profile.level_column),
            topic: cell(record, profile.topic_column),
            language: cell(record, profile.language_column),
            // unparseable text becomes NaN so the normalizer rejects the item
            confidence: cell(record, profile.confidence_column)
                .map(|v| v.trim().parse::<f64>().unwrap_or(f64::NAN)),
            sources: split_list(cell(record, profile.sources_column)),
            keywords: split_list(cell(record, profile.keywords_column)),
            metadata,
            created_at: cell(record, profile.created_at_column),
        }
    }
}

pub fn load_csv_items(path: &Path) -> LoadResult<Vec<RawItem>> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b',')
        .has_headers(true)
        .flexible(true)
        .from_path(path)?;

    let headers: Vec<String> = reader.headers()?.iter().map(|h| h.to_string()).collect();
    let profile = create_item_load_profile(&headers);
    debug!("{}", profile);
    verify_item_headers(&profile)?;

    let records: Vec<StringRecord> = reader.records().collect::<Result<_, _>>()?;
    Ok(records
        .iter()
        .map(|record| RawItem::from_row(record, &profile))
        .collect())
}

const ITEM_LIST_KEYS: [&str; 2] = ["items", "qa_items"];
const ITEM_FIELD_KEYS: [&str; 4] = ["question", "pregunta", "answer", "respuesta"];

fn has_any_key(value: &Value, keys: &[&str]) -> bool {
    value
        .as_object()
        .map_or(false, |object| keys.iter().any(|key| object.contains_key(*key)))
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}

/// Reads every entry on its own. Entries that are not valid items are
/// counted on the batch and left out.
fn fill_items(mut batch: RawBatch, entries: Vec<Value>) -> RawBatch {
    for (index, entry) in entries.into_iter().enumerate() {
        match serde_json::from_value::<RawItem>(entry) {
            Ok(item) => batch.items.push(item),
            Err(e) => {
                warn!("Skipping unreadable item {}: {}", index, e);
                batch.unreadable_items += 1;
            }
        }
    }
    batch
}

fn batch_from_object(mut object: Map<String, Value>) -> LoadResult<RawBatch> {
    let entries = match ITEM_LIST_KEYS.iter().find_map(|key| object.remove(*key)) {
        Some(Value::Array(entries)) => entries,
        Some(other) => {
            return Err(LoadError::InvalidBatch(format!(
                "item list must be a list, found {}",
                kind(&other)
            )))
        }
        None => Vec::new(),
    };
    let batch: RawBatch = serde_json::from_value(Value::Object(object))?;
    Ok(fill_items(batch, entries))
}

fn batch_from_value(value: Value) -> LoadResult<RawBatch> {
    if has_any_key(&value, &ITEM_LIST_KEYS) {
        if let Value::Object(object) = value {
            return batch_from_object(object);
        }
    }
    if has_any_key(&value, &ITEM_FIELD_KEYS) {
        debug!("Reading a lone item as a manual batch");
        return Ok(fill_items(RawBatch::default(), vec![value]));
    }
    Err(LoadError::InvalidBatch(format!(
        "expected a batch with 'items' or 'qa_items', or a question/answer item; found {}",
        kind(&value)
    )))
}

/// Accepts a single batch object, a list of batches, a bare list of items or
/// a single item. Batches may list their items under `items` or `qa_items`.
fn batches_from_value(value: Value) -> LoadResult<Vec<RawBatch>> {
    match value {
        Value::Array(entries)
            if !entries.is_empty()
                && entries.iter().all(|entry| has_any_key(entry, &ITEM_LIST_KEYS)) =>
        {
            entries.into_iter().map(batch_from_value).collect()
        }
        Value::Array(entries) => Ok(vec![fill_items(RawBatch::default(), entries)]),
        value => Ok(vec![batch_from_value(value)?]),
    }
}

/// Reads producer batches from `path`. `origin` overrides the origin recorded
/// in the file.
pub fn load_batches(
    path: &Path,
    filetype: BatchFileType,
    origin: Option<Origin>,
) -> LoadResult<Vec<RawBatch>> {
    if !path.exists() {
        return Err(LoadError::FileNotFound(path.display().to_string()));
    }

    let mut batches = match filetype {
        BatchFileType::Json => {
            let content = fs::read_to_string(path)?;
            batches_from_value(serde_json::from_str(&content)?)?
        }
        BatchFileType::Yaml => {
            let content = fs::read_to_string(path)?;
            batches_from_value(serde_yaml::from_str(&content)?)?
        }
        BatchFileType::Csv => vec![RawBatch::new(Origin::default(), load_csv_items(path)?)],
    };

    if let Some(origin) = origin {
        for batch in &mut batches {
            batch.origin = origin;
        }
    }

    info!(
        "Loaded {} batches with {} items from {}",
        batches.len(),
        batches.iter().map(|b| b.items.len()).sum::<usize>(),
        path.display()
    );
    Ok(batches)
}
