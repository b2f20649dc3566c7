use indexmap::IndexMap;
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::{BTreeMap, BTreeSet};

use crate::model::QAItem;

pub const HISTOGRAM_BUCKETS: usize = 5;
pub const TOP_TOPICS: usize = 10;

#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct HistogramBucket {
    pub lower: f64,
    pub upper: f64,
    pub count: usize,
}

#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct ConfidenceSummary {
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub mean: Option<f64>,
    pub histogram: Vec<HistogramBucket>,
}

/// Distributions over a view. Maps are ordered by key, topics by count.
#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct Statistics {
    pub total_items: usize,
    pub by_category: BTreeMap<String, usize>,
    pub by_level: BTreeMap<String, usize>,
    pub by_language: BTreeMap<String, usize>,
    pub top_topics: IndexMap<String, usize>,
    pub by_source: BTreeMap<String, usize>,
    pub confidence: ConfidenceSummary,
}

impl Statistics {
    /// One flat mapping suitable for direct serialization
    pub fn to_mapping(&self) -> IndexMap<String, Value> {
        let mut mapping = IndexMap::new();
        mapping.insert("total_items".to_string(), json!(self.total_items));
        mapping.insert("category_distribution".to_string(), json!(self.by_category));
        mapping.insert("level_distribution".to_string(), json!(self.by_level));
        mapping.insert("language_distribution".to_string(), json!(self.by_language));
        mapping.insert("topic_distribution".to_string(), json!(self.top_topics));
        mapping.insert("source_distribution".to_string(), json!(self.by_source));
        mapping.insert("confidence_min".to_string(), json!(self.confidence.min));
        mapping.insert("confidence_max".to_string(), json!(self.confidence.max));
        mapping.insert("confidence_mean".to_string(), json!(self.confidence.mean));
        mapping.insert(
            "confidence_histogram".to_string(),
            json!(self.confidence.histogram),
        );
        mapping
    }
}

fn bucket_index(confidence: f64) -> usize {
    // the small epsilon keeps exact boundaries such as 0.6 in the upper bucket
    let index = (confidence * HISTOGRAM_BUCKETS as f64 + 1e-9).floor();
    (index.max(0.0) as usize).min(HISTOGRAM_BUCKETS - 1)
}

pub fn compute<'a, I>(items: I) -> Statistics
where
    I: IntoIterator<Item = &'a QAItem>,
{
    let mut by_category = BTreeMap::new();
    let mut by_level = BTreeMap::new();
    let mut by_language = BTreeMap::new();
    let mut by_topic: BTreeMap<String, usize> = BTreeMap::new();
    let mut by_source = BTreeMap::new();
    let mut counts = [0usize; HISTOGRAM_BUCKETS];
    let mut min: Option<f64> = None;
    let mut max: Option<f64> = None;
    let mut sum = 0.0;
    let mut total = 0usize;

    for item in items {
        total += 1;
        *by_category.entry(item.category.clone()).or_insert(0) += 1;
        *by_level.entry(item.level.as_str().to_string()).or_insert(0) += 1;
        *by_language.entry(item.language.clone()).or_insert(0) += 1;
        if !item.topic.is_empty() {
            *by_topic.entry(item.topic.clone()).or_insert(0) += 1;
        }
        let distinct: BTreeSet<&String> = item.sources.iter().collect();
        for source in distinct {
            *by_source.entry(source.clone()).or_insert(0) += 1;
        }

        let confidence = item.confidence;
        min = Some(min.map_or(confidence, |m| m.min(confidence)));
        max = Some(max.map_or(confidence, |m| m.max(confidence)));
        sum += confidence;
        counts[bucket_index(confidence)] += 1;
    }

    let mut topics: Vec<(String, usize)> = by_topic.into_iter().collect();
    topics.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    let top_topics = topics.into_iter().take(TOP_TOPICS).collect();

    let width = 1.0 / HISTOGRAM_BUCKETS as f64;
    let histogram = counts
        .iter()
        .enumerate()
        .map(|(i, &count)| HistogramBucket {
            lower: round2(i as f64 * width),
            upper: round2((i + 1) as f64 * width),
            count,
        })
        .collect();

    Statistics {
        total_items: total,
        by_category,
        by_level,
        by_language,
        top_topics,
        by_source,
        confidence: ConfidenceSummary {
            min,
            max,
            mean: (total > 0).then(|| sum / total as f64),
            histogram,
        },
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
