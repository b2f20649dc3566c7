use chrono::{DateTime, NaiveDateTime, Utc};
use tracing::{debug, warn};

use crate::config::UnifierConfig;
use crate::errors::{ValidationError, ValidationResult};
use crate::model::{Level, MetaValue, QABatch, QAItem, RawBatch, RawItem, DEFAULT_CONFIDENCE};

/// Converts a producer batch into a batch whose items all satisfy the record
/// invariants. Implementations never fail: rejected items are counted in
/// `batch_stats` under `accepted`, `skipped` and `clamped`.
pub trait Normalizer {
    fn normalize(&self, batch: RawBatch) -> QABatch;
}

#[derive(Clone, Debug)]
pub struct DefaultNormalizer {
    default_language: String,
    default_category: String,
}

impl Default for DefaultNormalizer {
    fn default() -> Self {
        Self::from_config(&UnifierConfig::default())
    }
}

/// Outcome of normalizing one item
#[derive(Clone, Debug, PartialEq)]
pub struct NormalizedItem {
    pub item: QAItem,
    pub clamped: bool,
}

impl DefaultNormalizer {
    pub fn from_config(config: &UnifierConfig) -> Self {
        Self {
            default_language: config.default_language.trim().to_lowercase(),
            default_category: config.default_category.trim().to_lowercase(),
        }
    }

    pub fn normalize_item(
        &self,
        raw: RawItem,
        batch_created_at: Option<DateTime<Utc>>,
    ) -> ValidationResult<NormalizedItem> {
        let question = required_text(raw.question, "question")?;
        let answer = required_text(raw.answer, "answer")?;

        let level = match non_blank(raw.level) {
            Some(level) => level.parse::<Level>()?,
            None => Level::default(),
        };

        let confidence = raw.confidence.unwrap_or(DEFAULT_CONFIDENCE);
        if confidence.is_nan() {
            return Err(ValidationError::InvalidConfidence("NaN".to_string()));
        }
        let clamped_confidence = confidence.clamp(0.0, 1.0);
        let clamped = clamped_confidence != confidence;

        let created_at = match non_blank(raw.created_at) {
            Some(ts) => parse_timestamp(&ts).or_else(|| {
                warn!("Ignoring unparseable timestamp '{}'", ts);
                batch_created_at
            }),
            None => batch_created_at,
        };

        let item = QAItem {
            question,
            answer,
            category: non_blank(raw.category)
                .map(|c| c.to_lowercase())
                .unwrap_or_else(|| self.default_category.clone()),
            level,
            topic: non_blank(raw.topic)
                .map(|t| t.to_lowercase())
                .unwrap_or_default(),
            language: non_blank(raw.language)
                .map(|l| l.to_lowercase())
                .unwrap_or_else(|| self.default_language.clone()),
            confidence: clamped_confidence,
            sources: clean_list(raw.sources),
            keywords: clean_list(raw.keywords),
            metadata: raw.metadata,
            created_at,
        };

        Ok(NormalizedItem { item, clamped })
    }
}

impl Normalizer for DefaultNormalizer {
    fn normalize(&self, batch: RawBatch) -> QABatch {
        let batch_created_at = batch
            .created_at
            .as_deref()
            .and_then(|ts| parse_timestamp(ts.trim()));

        let mut items = Vec::with_capacity(batch.items.len());
        let mut skipped = batch.unreadable_items;
        let mut clamped = 0usize;

        for (index, raw) in batch.items.into_iter().enumerate() {
            match self.normalize_item(raw, batch_created_at) {
                Ok(normalized) => {
                    if normalized.clamped {
                        clamped += 1;
                    }
                    items.push(normalized.item);
                }
                Err(e) => {
                    warn!("Skipping item {} of {} batch: {}", index, batch.origin, e);
                    skipped += 1;
                }
            }
        }

        debug!(
            "Normalized {} batch: {} accepted, {} skipped, {} clamped",
            batch.origin,
            items.len(),
            skipped,
            clamped
        );

        let mut batch_stats = crate::model::Metadata::new();
        batch_stats.insert("accepted".to_string(), MetaValue::from(items.len()));
        batch_stats.insert("skipped".to_string(), MetaValue::from(skipped));
        batch_stats.insert("clamped".to_string(), MetaValue::from(clamped));

        QABatch {
            items,
            origin: batch.origin,
            source_prompt: non_blank(batch.source_prompt),
            source_document: non_blank(batch.source_document),
            generation_params: batch.generation_params,
            batch_stats,
            created_at: batch_created_at,
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn required_text(value: Option<String>, field: &'static str) -> ValidationResult<String> {
    non_blank(value).ok_or(ValidationError::MissingField(field))
}

fn clean_list(values: Vec<String>) -> Vec<String> {
    values
        .into_iter()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .collect()
}

/// RFC 3339, or a naive ISO timestamp interpreted as UTC
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S%.f"))
        .ok()
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Origin;
    use chrono::TimeZone;

    fn raw(question: &str, answer: &str) -> RawItem {
        RawItem::new(question, answer)
    }

    #[test]
    fn fills_defaults_and_trims() {
        let normalizer = DefaultNormalizer::default();
        let mut item = raw("  ¿Qué es Rust?  ", " Un lenguaje de sistemas. ");
        item.category = Some(" Programacion ".to_string());
        item.sources = vec![" rust-lang.org ".to_string(), "   ".to_string()];

        let normalized = normalizer.normalize_item(item, None).unwrap();
        assert_eq!(normalized.item.question, "¿Qué es Rust?");
        assert_eq!(normalized.item.answer, "Un lenguaje de sistemas.");
        assert_eq!(normalized.item.category, "programacion");
        assert_eq!(normalized.item.level, Level::Intermediate);
        assert_eq!(normalized.item.language, "es");
        assert_eq!(normalized.item.confidence, DEFAULT_CONFIDENCE);
        assert_eq!(normalized.item.sources, vec!["rust-lang.org".to_string()]);
        assert!(!normalized.clamped);
    }

    #[test]
    fn clamps_confidence_to_boundaries() {
        let normalizer = DefaultNormalizer::default();
        for (input, expected) in [(1.7, 1.0), (-0.3, 0.0), (0.42, 0.42)] {
            let mut item = raw("question", "answer");
            item.confidence = Some(input);
            let normalized = normalizer.normalize_item(item, None).unwrap();
            assert_eq!(normalized.item.confidence, expected);
            assert_eq!(normalized.clamped, input != expected);
        }
    }

    #[test]
    fn rejects_missing_text_invalid_level_and_nan() {
        let normalizer = DefaultNormalizer::default();

        let err = normalizer.normalize_item(raw("   ", "answer"), None).unwrap_err();
        assert_eq!(err, ValidationError::MissingField("question"));

        let mut item = raw("question", "answer");
        item.level = Some("expert".to_string());
        assert!(matches!(
            normalizer.normalize_item(item, None),
            Err(ValidationError::InvalidLevel(_))
        ));

        let mut item = raw("question", "answer");
        item.confidence = Some(f64::NAN);
        assert!(matches!(
            normalizer.normalize_item(item, None),
            Err(ValidationError::InvalidConfidence(_))
        ));
    }

    #[test]
    fn batch_counts_skipped_items_and_never_fails() {
        let normalizer = DefaultNormalizer::default();
        let batch = RawBatch::new(
            Origin::Prompt,
            vec![RawItem::default(), raw("question", ""), raw("q", "a")],
        );
        let normalized = normalizer.normalize(batch);

        assert_eq!(normalized.items.len(), 1);
        assert_eq!(normalized.batch_stats["accepted"], MetaValue::Integer(1));
        assert_eq!(normalized.batch_stats["skipped"], MetaValue::Integer(2));

        let empty = normalizer.normalize(RawBatch::new(Origin::Api, vec![RawItem::default()]));
        assert!(empty.items.is_empty());
        assert_eq!(empty.origin, Origin::Api);
    }

    #[test]
    fn preserves_item_order() {
        let normalizer = DefaultNormalizer::default();
        let batch = RawBatch::new(
            Origin::Manual,
            vec![raw("first", "a"), raw("second", "b"), raw("third", "c")],
        );
        let questions: Vec<_> = normalizer
            .normalize(batch)
            .items
            .into_iter()
            .map(|i| i.question)
            .collect();
        assert_eq!(questions, vec!["first", "second", "third"]);
    }

    #[test]
    fn items_inherit_batch_timestamp() {
        let normalizer = DefaultNormalizer::default();
        let mut batch = RawBatch::new(Origin::Document, vec![raw("q", "a")]);
        batch.created_at = Some("2024-03-01T10:00:00".to_string());
        let mut own = raw("q2", "a2");
        own.created_at = Some("2024-03-05T08:30:00Z".to_string());
        batch.items.push(own);

        let normalized = normalizer.normalize(batch);
        assert_eq!(
            normalized.items[0].created_at,
            Some(Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap())
        );
        assert_eq!(
            normalized.items[1].created_at,
            Some(Utc.with_ymd_and_hms(2024, 3, 5, 8, 30, 0).unwrap())
        );
    }
}
