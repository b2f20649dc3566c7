use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use tracing::debug;

use crate::errors::{ConfigurationError, ConfigurationResult};
use crate::model::{Level, QAItem};
use crate::view::View;

/// Inclusive generation-time window
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
pub struct DateRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// Predicates over the unified store. Absent predicates pass everything;
/// present ones are ANDed.
///
/// `level` holds labels rather than [`Level`] values so that plan files may
/// use any accepted alias (`avanzado`, `básico`, ...).
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(default)]
pub struct FilterConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<BTreeSet<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<BTreeSet<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_confidence: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_confidence: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_range: Option<DateRange>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_contains: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<BTreeSet<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub topic_contains: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keywords_any: Option<BTreeSet<String>>,
}

impl FilterConfig {
    pub fn with_categories<I, S>(mut self, categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.category = Some(categories.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_levels<I, S>(mut self, levels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.level = Some(levels.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_min_confidence(mut self, min: f64) -> Self {
        self.min_confidence = Some(min);
        self
    }

    pub fn with_max_confidence(mut self, max: f64) -> Self {
        self.max_confidence = Some(max);
        self
    }

    pub fn with_date_range(mut self, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        self.date_range = Some(DateRange { start, end });
        self
    }

    pub fn with_source_contains(mut self, needle: impl Into<String>) -> Self {
        self.source_contains = Some(needle.into());
        self
    }

    pub fn with_languages<I, S>(mut self, languages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.language = Some(languages.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_topic_contains(mut self, needle: impl Into<String>) -> Self {
        self.topic_contains = Some(needle.into());
        self
    }

    pub fn with_keywords_any<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.keywords_any = Some(keywords.into_iter().map(Into::into).collect());
        self
    }

    /// True when no predicate is set
    pub fn is_empty(&self) -> bool {
        self == &FilterConfig::default()
    }

    pub fn validate(&self) -> ConfigurationResult<()> {
        self.compile().map(|_| ())
    }

    /// Checks every value and prepares the predicates for matching
    pub fn compile(&self) -> ConfigurationResult<CompiledFilter> {
        for (field, bound) in [
            ("min_confidence", self.min_confidence),
            ("max_confidence", self.max_confidence),
        ] {
            if let Some(value) = bound {
                if !(0.0..=1.0).contains(&value) {
                    return Err(ConfigurationError::invalid_value(
                        field,
                        format!("{} is outside [0, 1]", value),
                    ));
                }
            }
        }
        if let (Some(min), Some(max)) = (self.min_confidence, self.max_confidence) {
            if min > max {
                return Err(ConfigurationError::invalid_range(
                    "confidence",
                    format!("min_confidence {} is greater than max_confidence {}", min, max),
                ));
            }
        }
        if let Some(range) = &self.date_range {
            if range.start > range.end {
                return Err(ConfigurationError::invalid_range(
                    "date_range",
                    format!("start {} is after end {}", range.start, range.end),
                ));
            }
        }

        let levels = match &self.level {
            Some(labels) => Some(
                labels
                    .iter()
                    .map(|label| {
                        label
                            .parse::<Level>()
                            .map_err(|e| ConfigurationError::invalid_value("level", e.to_string()))
                    })
                    .collect::<ConfigurationResult<HashSet<Level>>>()?,
            ),
            None => None,
        };

        Ok(CompiledFilter {
            categories: lowercase_set(&self.category),
            levels,
            min_confidence: self.min_confidence,
            max_confidence: self.max_confidence,
            date_range: self.date_range,
            source_contains: self.source_contains.clone(),
            languages: lowercase_set(&self.language),
            topic_contains: self.topic_contains.as_ref().map(|t| t.to_lowercase()),
            keywords_any: lowercase_set(&self.keywords_any),
        })
    }
}

fn lowercase_set(values: &Option<BTreeSet<String>>) -> Option<HashSet<String>> {
    values
        .as_ref()
        .map(|set| set.iter().map(|v| v.trim().to_lowercase()).collect())
}

/// Validated predicates, ready to test items
#[derive(Clone, Debug)]
pub struct CompiledFilter {
    categories: Option<HashSet<String>>,
    levels: Option<HashSet<Level>>,
    min_confidence: Option<f64>,
    max_confidence: Option<f64>,
    date_range: Option<DateRange>,
    source_contains: Option<String>,
    languages: Option<HashSet<String>>,
    topic_contains: Option<String>,
    keywords_any: Option<HashSet<String>>,
}

impl CompiledFilter {
    pub fn matches(&self, item: &QAItem) -> bool {
        if let Some(categories) = &self.categories {
            if !categories.contains(&item.category.to_lowercase()) {
                return false;
            }
        }
        if let Some(levels) = &self.levels {
            if !levels.contains(&item.level) {
                return false;
            }
        }
        if let Some(min) = self.min_confidence {
            if item.confidence < min {
                return false;
            }
        }
        if let Some(max) = self.max_confidence {
            if item.confidence > max {
                return false;
            }
        }
        if let Some(range) = &self.date_range {
            match item.created_at {
                Some(ts) if ts >= range.start && ts <= range.end => {}
                _ => return false,
            }
        }
        if let Some(needle) = &self.source_contains {
            if !item.sources.iter().any(|s| s.contains(needle.as_str())) {
                return false;
            }
        }
        if let Some(languages) = &self.languages {
            if !languages.contains(&item.language.to_lowercase()) {
                return false;
            }
        }
        if let Some(needle) = &self.topic_contains {
            if !item.topic.to_lowercase().contains(needle.as_str()) {
                return false;
            }
        }
        if let Some(keywords) = &self.keywords_any {
            if !item
                .keywords
                .iter()
                .any(|k| keywords.contains(&k.to_lowercase()))
            {
                return false;
            }
        }
        true
    }
}

/// Applies `config` to `items`, preserving their order
pub fn apply<'a, I>(items: I, config: &FilterConfig) -> ConfigurationResult<View<'a>>
where
    I: IntoIterator<Item = &'a QAItem>,
{
    let compiled = config.compile()?;
    let view: View<'a> = items
        .into_iter()
        .filter(|item| compiled.matches(item))
        .collect();
    debug!("Filter kept {} items", view.len());
    Ok(view)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn store() -> Vec<QAItem> {
        vec![
            QAItem::new("q1", "a1")
                .with_level(Level::Advanced)
                .with_confidence(0.9)
                .with_category("ciencia")
                .with_sources(["https://wiki.example/ia"]),
            QAItem::new("q2", "a2")
                .with_level(Level::Advanced)
                .with_confidence(0.7)
                .with_category("ciencia"),
            QAItem::new("q3", "a3")
                .with_level(Level::Basic)
                .with_confidence(0.95)
                .with_language("en")
                .with_topic("redes neuronales")
                .with_keywords(["Neural", "IA"]),
            QAItem::new("q4", "a4")
                .with_level(Level::Advanced)
                .with_confidence(0.8)
                .with_category("Historia"),
            QAItem::new("q5", "a5")
                .with_level(Level::Intermediate)
                .with_confidence(1.0),
        ]
    }

    fn questions(view: &View<'_>) -> Vec<String> {
        view.iter().map(|i| i.question.clone()).collect()
    }

    #[test]
    fn level_alias_and_min_confidence_are_anded() {
        let items = store();
        let config = FilterConfig::default()
            .with_levels(["avanzado"])
            .with_min_confidence(0.8);
        let view = apply(&items, &config).unwrap();
        assert_eq!(questions(&view), vec!["q1", "q4"]);
    }

    #[test]
    fn empty_config_passes_everything() {
        let items = store();
        let config = FilterConfig::default();
        assert!(config.is_empty());
        assert_eq!(apply(&items, &config).unwrap().len(), items.len());
    }

    #[test]
    fn category_and_language_are_case_insensitive_sets() {
        let items = store();
        let view = apply(&items, &FilterConfig::default().with_categories(["historia"])).unwrap();
        assert_eq!(questions(&view), vec!["q4"]);

        let view = apply(&items, &FilterConfig::default().with_languages(["EN"])).unwrap();
        assert_eq!(questions(&view), vec!["q3"]);
    }

    #[test]
    fn confidence_bounds_are_inclusive() {
        let items = store();
        let config = FilterConfig::default()
            .with_min_confidence(0.8)
            .with_max_confidence(0.95);
        let view = apply(&items, &config).unwrap();
        assert_eq!(questions(&view), vec!["q1", "q3", "q4"]);
    }

    #[test]
    fn source_topic_and_keyword_predicates() {
        let items = store();
        let view = apply(&items, &FilterConfig::default().with_source_contains("wiki")).unwrap();
        assert_eq!(questions(&view), vec!["q1"]);

        let view = apply(&items, &FilterConfig::default().with_topic_contains("Neuronales")).unwrap();
        assert_eq!(questions(&view), vec!["q3"]);

        let view = apply(&items, &FilterConfig::default().with_keywords_any(["neural"])).unwrap();
        assert_eq!(questions(&view), vec!["q3"]);
    }

    #[test]
    fn date_range_excludes_items_without_timestamp() {
        let inside = Utc.with_ymd_and_hms(2024, 5, 10, 12, 0, 0).unwrap();
        let items = vec![
            QAItem::new("dated", "a").with_created_at(inside),
            QAItem::new("undated", "a"),
        ];
        let config = FilterConfig::default().with_date_range(
            Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap(),
            inside,
        );
        let view = apply(&items, &config).unwrap();
        assert_eq!(questions(&view), vec!["dated"]);
    }

    #[test]
    fn empty_result_is_not_an_error() {
        let items = store();
        let view = apply(&items, &FilterConfig::default().with_categories(["nada"])).unwrap();
        assert!(view.is_empty());
    }

    #[test]
    fn invalid_configurations_fail_fast() {
        let err = FilterConfig::default().with_min_confidence(1.2).validate().unwrap_err();
        assert_eq!(err.error_code(), "INVALID_VALUE");

        let err = FilterConfig::default()
            .with_min_confidence(0.9)
            .with_max_confidence(0.1)
            .validate()
            .unwrap_err();
        assert_eq!(err.error_code(), "INVALID_RANGE");

        let err = FilterConfig::default().with_levels(["expert"]).validate().unwrap_err();
        assert!(err.to_string().contains("expert"));

        let start = Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        assert!(FilterConfig::default().with_date_range(start, end).validate().is_err());
    }

    #[test]
    fn filter_is_pure() {
        let items = store();
        let config = FilterConfig::default().with_min_confidence(0.8);
        let first = apply(&items, &config).unwrap();
        let second = apply(&items, &config).unwrap();
        assert_eq!(first, second);
        assert_eq!(items.len(), 5);
    }

    #[test]
    fn yaml_config_parses() {
        let config: FilterConfig = serde_yaml::from_str(
            "level: [avanzado]\nmin_confidence: 0.8\ndate_range:\n  start: 2024-01-01T00:00:00Z\n  end: 2024-12-31T23:59:59Z\n",
        )
        .unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.min_confidence, Some(0.8));
        assert!(config.date_range.is_some());
    }
}
