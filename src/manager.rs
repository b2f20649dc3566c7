use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::{debug, info};

use crate::config::UnifierConfig;
use crate::dedup::Deduplicator;
use crate::errors::{ConfigurationResult, ExportResult};
use crate::export::{self, ExportConfig};
use crate::filter::{self, FilterConfig};
use crate::model::{MetaValue, Origin, QABatch, QAItem, RawBatch, RawItem};
use crate::normalizer::{DefaultNormalizer, Normalizer};
use crate::stats::{self, Statistics};
use crate::view::View;

/// Counters returned by one `add_data` call
#[derive(Serialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct IngestionSummary {
    pub accepted_count: usize,
    pub rejected_count: usize,
    pub duplicate_clusters_merged: usize,
}

/// Store-level summary: view statistics plus batch provenance
#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct StoreSummary {
    pub total_batches: usize,
    pub origin_distribution: BTreeMap<String, usize>,
    #[serde(flatten)]
    pub statistics: Statistics,
}

/// The unified store. Owns every ingested batch and the deduplicated item
/// sequence.
///
/// Ingestion takes `&mut self` and must be serialized by the caller; filter,
/// statistics and export only borrow the store and never mutate it.
pub struct QADataManager {
    config: UnifierConfig,
    normalizer: Box<dyn Normalizer>,
    deduplicator: Deduplicator,
    batches: Vec<QABatch>,
    items: Vec<QAItem>,
}

impl QADataManager {
    pub fn new(config: UnifierConfig) -> ConfigurationResult<Self> {
        config.validate()?;
        Ok(Self::from_valid_config(config))
    }

    fn from_valid_config(config: UnifierConfig) -> Self {
        Self {
            normalizer: Box::new(DefaultNormalizer::from_config(&config)),
            deduplicator: Deduplicator::from_config(&config),
            config,
            batches: Vec::new(),
            items: Vec::new(),
        }
    }

    pub fn with_normalizer(mut self, normalizer: Box<dyn Normalizer>) -> Self {
        self.normalizer = normalizer;
        self
    }

    pub fn config(&self) -> &UnifierConfig {
        &self.config
    }

    /// Normalizes and appends the batches, then deduplicates the whole store
    /// when deduplication is enabled
    pub fn add_data<I>(&mut self, batches: I) -> IngestionSummary
    where
        I: IntoIterator<Item = RawBatch>,
    {
        let mut summary = IngestionSummary::default();

        for raw in batches {
            let batch = self.normalizer.normalize(raw);
            summary.accepted_count += batch.items.len();
            summary.rejected_count += stat_count(&batch, "skipped");
            self.items.extend(batch.items.iter().cloned());
            self.batches.push(batch);
        }

        if self.config.deduplicate {
            summary.duplicate_clusters_merged = self.deduplicate();
        }

        info!(
            "Ingested {} items ({} rejected, {} clusters merged); store holds {}",
            summary.accepted_count,
            summary.rejected_count,
            summary.duplicate_clusters_merged,
            self.items.len()
        );
        summary
    }

    /// Ingests loose items as one manual batch tagged `added_manually`
    pub fn add_items(&mut self, items: Vec<RawItem>) -> IngestionSummary {
        let mut batch = RawBatch::new(Origin::Manual, items);
        batch
            .generation_params
            .insert("added_manually".to_string(), MetaValue::Bool(true));
        self.add_data([batch])
    }

    /// Deduplicates the store in place and returns the number of merged clusters
    pub fn deduplicate(&mut self) -> usize {
        let items = std::mem::take(&mut self.items);
        let (unified, report) = self.deduplicator.deduplicate(items);
        self.items = unified;
        report.clusters_merged
    }

    pub fn items(&self) -> &[QAItem] {
        &self.items
    }

    pub fn batches(&self) -> &[QABatch] {
        &self.batches
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// A view over every item in the store
    pub fn view(&self) -> View<'_> {
        View::from(self.items.as_slice())
    }

    /// Filters `view`, or the whole store when no view is given
    pub fn filter<'a>(
        &'a self,
        view: Option<&View<'a>>,
        config: &FilterConfig,
    ) -> ConfigurationResult<View<'a>> {
        let result = match view {
            Some(view) => filter::apply(view.iter(), config)?,
            None => filter::apply(self.items.iter(), config)?,
        };
        debug!("Filter selected {} of {} items", result.len(), self.len());
        Ok(result)
    }

    pub fn compute_statistics(&self, view: Option<&View<'_>>) -> Statistics {
        match view {
            Some(view) => stats::compute(view.iter()),
            None => stats::compute(self.items.iter()),
        }
    }

    /// Statistics over the whole store plus batch and origin counts
    pub fn summary(&self) -> StoreSummary {
        let mut origin_distribution = BTreeMap::new();
        for batch in &self.batches {
            *origin_distribution
                .entry(batch.origin.as_str().to_string())
                .or_insert(0) += batch.items.len();
        }
        StoreSummary {
            total_batches: self.batches.len(),
            origin_distribution,
            statistics: self.compute_statistics(None),
        }
    }

    pub fn export(&self, view: Option<&View<'_>>, config: &ExportConfig) -> ExportResult<Vec<u8>> {
        match view {
            Some(view) => export::render(view, config),
            None => export::render(&self.view(), config),
        }
    }

    pub fn export_to_file(
        &self,
        view: Option<&View<'_>>,
        config: &ExportConfig,
    ) -> ExportResult<PathBuf> {
        match view {
            Some(view) => export::write(view, config),
            None => export::write(&self.view(), config),
        }
    }
}

impl Default for QADataManager {
    fn default() -> Self {
        Self::from_valid_config(UnifierConfig::default())
    }
}

fn stat_count(batch: &QABatch, key: &str) -> usize {
    match batch.batch_stats.get(key) {
        Some(MetaValue::Integer(count)) => (*count).max(0) as usize,
        _ => 0,
    }
}
