use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

use crate::errors::ValidationError;

/// Default confidence assigned to items whose producer did not score them
pub const DEFAULT_CONFIDENCE: f64 = 0.8;

/// Free-form, serializable value stored in metadata and generation parameters
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(untagged)]
pub enum MetaValue {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
    List(Vec<MetaValue>),
    Map(IndexMap<String, MetaValue>),
}

/// Open map used for `metadata`, `generation_params` and `batch_stats`
pub type Metadata = IndexMap<String, MetaValue>;

impl From<&str> for MetaValue {
    fn from(value: &str) -> Self {
        MetaValue::String(value.to_string())
    }
}

impl From<String> for MetaValue {
    fn from(value: String) -> Self {
        MetaValue::String(value)
    }
}

impl From<bool> for MetaValue {
    fn from(value: bool) -> Self {
        MetaValue::Bool(value)
    }
}

impl From<i64> for MetaValue {
    fn from(value: i64) -> Self {
        MetaValue::Integer(value)
    }
}

impl From<usize> for MetaValue {
    fn from(value: usize) -> Self {
        MetaValue::Integer(value as i64)
    }
}

impl From<f64> for MetaValue {
    fn from(value: f64) -> Self {
        MetaValue::Float(value)
    }
}

impl MetaValue {
    /// Renders the value for a flat cell: strings verbatim, everything else as JSON
    pub fn to_flat_string(&self) -> String {
        match self {
            MetaValue::String(s) => s.clone(),
            MetaValue::Null => String::new(),
            other => serde_json::to_string(other).unwrap_or_default(),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    #[serde(alias = "básico", alias = "basico")]
    Basic,
    #[default]
    #[serde(alias = "intermedio")]
    Intermediate,
    #[serde(alias = "avanzado")]
    Advanced,
}

impl Level {
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Basic => "basic",
            Level::Intermediate => "intermediate",
            Level::Advanced => "advanced",
        }
    }
}

impl Display for Level {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Level {
    type Err = ValidationError;

    /// Accepts the canonical English labels and the Spanish labels producers emit
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "basic" | "básico" | "basico" => Ok(Level::Basic),
            "intermediate" | "intermedio" => Ok(Level::Intermediate),
            "advanced" | "avanzado" => Ok(Level::Advanced),
            _ => Err(ValidationError::InvalidLevel(s.to_string())),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[serde(rename_all = "lowercase")]
pub enum Origin {
    Prompt,
    #[serde(alias = "documento")]
    Document,
    #[default]
    Manual,
    Api,
}

impl Origin {
    pub fn as_str(&self) -> &'static str {
        match self {
            Origin::Prompt => "prompt",
            Origin::Document => "document",
            Origin::Manual => "manual",
            Origin::Api => "api",
        }
    }
}

impl Display for Origin {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Origin {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "prompt" => Ok(Origin::Prompt),
            "document" | "documento" => Ok(Origin::Document),
            "manual" => Ok(Origin::Manual),
            "api" => Ok(Origin::Api),
            _ => Err(ValidationError::InvalidOrigin(s.to_string())),
        }
    }
}

/// One validated question-answer fact
///
/// Equality treats `sources` and `keywords` as sets: their order only matters
/// for provenance display.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct QAItem {
    pub question: String,
    pub answer: String,
    pub category: String,
    pub level: Level,
    #[serde(default)]
    pub topic: String,
    pub language: String,
    pub confidence: f64,
    #[serde(default)]
    pub sources: Vec<String>,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub metadata: Metadata,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl QAItem {
    pub fn new(question: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            answer: answer.into(),
            category: "general".to_string(),
            level: Level::default(),
            topic: String::new(),
            language: "es".to_string(),
            confidence: DEFAULT_CONFIDENCE,
            sources: Vec::new(),
            keywords: Vec::new(),
            metadata: Metadata::new(),
            created_at: None,
        }
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = confidence;
        self
    }

    pub fn with_level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    pub fn with_topic(mut self, topic: impl Into<String>) -> Self {
        self.topic = topic.into();
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    pub fn with_sources<I, S>(mut self, sources: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.sources = sources.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.keywords = keywords.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<MetaValue>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = Some(created_at);
        self
    }
}

impl PartialEq for QAItem {
    fn eq(&self, other: &Self) -> bool {
        fn as_set(values: &[String]) -> BTreeSet<&str> {
            values.iter().map(String::as_str).collect()
        }

        self.question == other.question
            && self.answer == other.answer
            && self.category == other.category
            && self.level == other.level
            && self.topic == other.topic
            && self.language == other.language
            && self.confidence == other.confidence
            && as_set(&self.sources) == as_set(&other.sources)
            && as_set(&self.keywords) == as_set(&other.keywords)
            && self.metadata == other.metadata
            && self.created_at == other.created_at
    }
}

/// One production unit after normalization
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct QABatch {
    pub items: Vec<QAItem>,
    pub origin: Origin,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_prompt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_document: Option<String>,
    #[serde(default)]
    pub generation_params: Metadata,
    #[serde(default)]
    pub batch_stats: Metadata,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl QABatch {
    pub fn new(origin: Origin) -> Self {
        Self {
            origin,
            ..Default::default()
        }
    }

    pub fn add_item(&mut self, item: QAItem) {
        self.items.push(item);
    }

    /// Fills `batch_stats` with the distributions of the batch's items.
    /// Counters recorded during normalization are kept.
    pub fn compute_stats(&mut self) {
        let stats = crate::stats::compute(self.items.iter());
        for (key, value) in stats.to_mapping() {
            let value = serde_json::from_value(value).unwrap_or(MetaValue::Null);
            self.batch_stats.insert(key, value);
        }
    }
}

/// A producer item before normalization. Every field is optional so that
/// incomplete input reaches the normalizer instead of failing deserialization.
/// Entries with wrongly typed fields are skipped by the loader.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct RawItem {
    #[serde(default, alias = "pregunta")]
    pub question: Option<String>,
    #[serde(default, alias = "respuesta")]
    pub answer: Option<String>,
    #[serde(default, alias = "categoria")]
    pub category: Option<String>,
    #[serde(default, alias = "nivel")]
    pub level: Option<String>,
    #[serde(default, alias = "tema")]
    pub topic: Option<String>,
    #[serde(default, alias = "idioma")]
    pub language: Option<String>,
    #[serde(default, alias = "confianza")]
    pub confidence: Option<f64>,
    #[serde(default, alias = "fuentes")]
    pub sources: Vec<String>,
    #[serde(default, alias = "palabras_clave")]
    pub keywords: Vec<String>,
    #[serde(default, alias = "metadatos")]
    pub metadata: Metadata,
    #[serde(default, alias = "fecha_creacion")]
    pub created_at: Option<String>,
}

impl RawItem {
    pub fn new(question: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            question: Some(question.into()),
            answer: Some(answer.into()),
            ..Default::default()
        }
    }
}

impl From<QAItem> for RawItem {
    fn from(item: QAItem) -> Self {
        Self {
            question: Some(item.question),
            answer: Some(item.answer),
            category: Some(item.category),
            level: Some(item.level.as_str().to_string()),
            topic: Some(item.topic),
            language: Some(item.language),
            confidence: Some(item.confidence),
            sources: item.sources,
            keywords: item.keywords,
            metadata: item.metadata,
            created_at: item.created_at.map(|ts| ts.to_rfc3339()),
        }
    }
}

/// A producer batch before normalization
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct RawBatch {
    #[serde(default)]
    pub items: Vec<RawItem>,
    #[serde(default, alias = "origen")]
    pub origin: Origin,
    #[serde(default, alias = "prompt_original")]
    pub source_prompt: Option<String>,
    #[serde(default, alias = "documento_fuente")]
    pub source_document: Option<String>,
    #[serde(default, alias = "parametros_generacion")]
    pub generation_params: Metadata,
    #[serde(default, alias = "fecha_creacion")]
    pub created_at: Option<String>,
    /// Entries the loader could not read as items; counted as skipped
    #[serde(skip)]
    pub unreadable_items: usize,
}

impl RawBatch {
    pub fn new(origin: Origin, items: Vec<RawItem>) -> Self {
        Self {
            items,
            origin,
            ..Default::default()
        }
    }
}

impl From<QABatch> for RawBatch {
    fn from(batch: QABatch) -> Self {
        Self {
            items: batch.items.into_iter().map(RawItem::from).collect(),
            origin: batch.origin,
            source_prompt: batch.source_prompt,
            source_document: batch.source_document,
            generation_params: batch.generation_params,
            created_at: batch.created_at.map(|ts| ts.to_rfc3339()),
            unreadable_items: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_parses_english_and_spanish_labels() {
        assert_eq!("basic".parse::<Level>().unwrap(), Level::Basic);
        assert_eq!("Básico".parse::<Level>().unwrap(), Level::Basic);
        assert_eq!(" intermedio ".parse::<Level>().unwrap(), Level::Intermediate);
        assert_eq!("AVANZADO".parse::<Level>().unwrap(), Level::Advanced);
        assert!("expert".parse::<Level>().is_err());
    }

    #[test]
    fn level_serializes_lowercase_and_accepts_aliases() {
        assert_eq!(serde_json::to_string(&Level::Advanced).unwrap(), "\"advanced\"");
        let level: Level = serde_json::from_str("\"avanzado\"").unwrap();
        assert_eq!(level, Level::Advanced);
    }

    #[test]
    fn origin_accepts_documento() {
        assert_eq!("documento".parse::<Origin>().unwrap(), Origin::Document);
        let origin: Origin = serde_yaml::from_str("documento").unwrap();
        assert_eq!(origin, Origin::Document);
    }

    #[test]
    fn equality_ignores_source_order() {
        let a = QAItem::new("q", "a").with_sources(["x", "y"]);
        let b = QAItem::new("q", "a").with_sources(["y", "x"]);
        assert_eq!(a, b);
        let c = QAItem::new("q", "a").with_sources(["x"]);
        assert_ne!(a, c);
    }

    #[test]
    fn meta_value_untagged_roundtrip() {
        let json = r#"{"author":"test","reviewed":true,"pages":12,"score":0.5,"tags":["a"],"nested":{"k":"v"},"none":null}"#;
        let metadata: Metadata = serde_json::from_str(json).unwrap();
        assert_eq!(metadata["author"], MetaValue::String("test".to_string()));
        assert_eq!(metadata["reviewed"], MetaValue::Bool(true));
        assert_eq!(metadata["pages"], MetaValue::Integer(12));
        assert_eq!(metadata["score"], MetaValue::Float(0.5));
        assert!(matches!(metadata["tags"], MetaValue::List(_)));
        assert!(matches!(metadata["nested"], MetaValue::Map(_)));
        assert_eq!(metadata["none"], MetaValue::Null);
        assert_eq!(serde_json::to_string(&metadata).unwrap(), json);
    }

    #[test]
    fn raw_item_accepts_spanish_keys() {
        let raw: RawItem = serde_json::from_str(
            r#"{"pregunta":"¿Qué es IA?","respuesta":"Inteligencia Artificial","nivel":"básico","confianza":0.9,"fuentes":["wiki"]}"#,
        )
        .unwrap();
        assert_eq!(raw.question.as_deref(), Some("¿Qué es IA?"));
        assert_eq!(raw.level.as_deref(), Some("básico"));
        assert_eq!(raw.confidence, Some(0.9));
        assert_eq!(raw.sources, vec!["wiki".to_string()]);
    }

    #[test]
    fn batch_compute_stats_keeps_existing_counters() {
        let mut batch = QABatch::new(Origin::Prompt);
        batch.batch_stats.insert("skipped".to_string(), MetaValue::Integer(2));
        batch.add_item(QAItem::new("q1", "a1").with_category("ciencia"));
        batch.add_item(QAItem::new("q2", "a2").with_category("ciencia"));
        batch.compute_stats();

        assert_eq!(batch.batch_stats["skipped"], MetaValue::Integer(2));
        assert_eq!(batch.batch_stats["total_items"], MetaValue::Integer(2));
        match &batch.batch_stats["category_distribution"] {
            MetaValue::Map(map) => assert_eq!(map["ciencia"], MetaValue::Integer(2)),
            other => panic!("unexpected distribution {:?}", other),
        }
    }
}
