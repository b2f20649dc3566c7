//! # Near-duplicate clustering and merge
//!
//! Items are compared pairwise in stable input order. Every pair whose
//! weighted similarity reaches the threshold is unioned in a disjoint set, so
//! the final partition depends only on input order and threshold. Clusters
//! may chain items that are only linked through an intermediate.
//!
//! Merge policy for a cluster:
//! - base item is the highest-confidence member, earliest on ties
//! - question, answer, category, level, topic and language come from the base
//! - confidence is the cluster maximum, never an average
//! - sources and keywords are unioned in first-seen order
//! - metadata keys are unioned; on conflict the first value in input order wins
//! - created_at is the earliest timestamp present
//!
//! Singleton clusters are passed through untouched, which makes the
//! operation idempotent.

use indexmap::{IndexMap, IndexSet};
use tracing::{debug, info};

use crate::config::UnifierConfig;
use crate::model::{Metadata, QAItem};
use crate::similarity::{CanonicalText, PairScorer};

/// Union-find over item indices with path compression and union by rank
#[derive(Debug, Clone)]
pub struct DisjointSet {
    parent: Vec<usize>,
    rank: Vec<u8>,
}

impl DisjointSet {
    pub fn new(size: usize) -> Self {
        Self {
            parent: (0..size).collect(),
            rank: vec![0; size],
        }
    }

    pub fn find(&mut self, index: usize) -> usize {
        let mut root = index;
        while self.parent[root] != root {
            root = self.parent[root];
        }
        let mut current = index;
        while self.parent[current] != root {
            let next = self.parent[current];
            self.parent[current] = root;
            current = next;
        }
        root
    }

    /// Returns false when both indices already share a root
    pub fn union(&mut self, a: usize, b: usize) -> bool {
        let root_a = self.find(a);
        let root_b = self.find(b);
        if root_a == root_b {
            return false;
        }
        match self.rank[root_a].cmp(&self.rank[root_b]) {
            std::cmp::Ordering::Less => self.parent[root_a] = root_b,
            std::cmp::Ordering::Greater => self.parent[root_b] = root_a,
            std::cmp::Ordering::Equal => {
                self.parent[root_b] = root_a;
                self.rank[root_a] += 1;
            }
        }
        true
    }

    /// Member indices grouped by cluster, clusters ordered by first member
    pub fn clusters(&mut self) -> Vec<Vec<usize>> {
        let mut groups: IndexMap<usize, Vec<usize>> = IndexMap::new();
        for index in 0..self.parent.len() {
            let root = self.find(index);
            groups.entry(root).or_default().push(index);
        }
        groups.into_values().collect()
    }
}

/// Counters describing one deduplication pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DedupReport {
    /// Clusters with more than one member
    pub clusters_merged: usize,
    /// Items folded into another item
    pub items_absorbed: usize,
}

#[derive(Debug)]
pub struct Deduplicator {
    scorer: PairScorer,
    threshold: f64,
}

impl Deduplicator {
    pub fn new(scorer: PairScorer, threshold: f64) -> Self {
        Self { scorer, threshold }
    }

    pub fn from_config(config: &UnifierConfig) -> Self {
        Self::new(config.scorer(), config.similarity_threshold)
    }

    pub fn is_duplicate(&self, a: &CanonicalText, b: &CanonicalText) -> bool {
        self.scorer.score(a, b) >= self.threshold
    }

    /// Partition of item indices into near-duplicate clusters
    pub fn cluster(&self, items: &[QAItem]) -> Vec<Vec<usize>> {
        let canonical: Vec<CanonicalText> = items.iter().map(CanonicalText::of).collect();
        let mut sets = DisjointSet::new(items.len());

        for i in 0..canonical.len() {
            for j in (i + 1)..canonical.len() {
                if sets.find(i) == sets.find(j) {
                    continue;
                }
                if self.is_duplicate(&canonical[i], &canonical[j]) {
                    debug!("Linking item {} with item {}", i, j);
                    sets.union(i, j);
                }
            }
        }

        sets.clusters()
    }

    pub fn deduplicate(&self, items: Vec<QAItem>) -> (Vec<QAItem>, DedupReport) {
        let total = items.len();
        let clusters = self.cluster(&items);
        let mut report = DedupReport::default();

        let mut slots: Vec<Option<QAItem>> = items.into_iter().map(Some).collect();
        let mut unified = Vec::with_capacity(clusters.len());

        for cluster in clusters {
            let members: Vec<QAItem> = cluster
                .iter()
                .filter_map(|&index| slots[index].take())
                .collect();
            if members.len() > 1 {
                report.clusters_merged += 1;
                report.items_absorbed += members.len() - 1;
            }
            if let Some(merged) = merge_cluster(members) {
                unified.push(merged);
            }
        }

        info!(
            "Deduplicated {} items into {} ({} clusters merged, strategy {}, threshold {})",
            total,
            unified.len(),
            report.clusters_merged,
            self.scorer.strategy_name(),
            self.threshold
        );

        (unified, report)
    }
}

/// Merges cluster members given in input order. Returns `None` for an empty cluster.
pub fn merge_cluster(mut members: Vec<QAItem>) -> Option<QAItem> {
    if members.len() <= 1 {
        return members.pop();
    }

    let mut base_index = 0;
    for (index, member) in members.iter().enumerate() {
        if member.confidence > members[base_index].confidence {
            base_index = index;
        }
    }

    let mut sources: IndexSet<String> = IndexSet::new();
    let mut keywords: IndexSet<String> = IndexSet::new();
    let mut metadata = Metadata::new();
    let mut created_at = None;

    for member in &members {
        sources.extend(member.sources.iter().cloned());
        keywords.extend(member.keywords.iter().cloned());
        for (key, value) in &member.metadata {
            metadata.entry(key.clone()).or_insert_with(|| value.clone());
        }
        created_at = match (created_at, member.created_at) {
            (Some(current), Some(candidate)) => Some(std::cmp::min(current, candidate)),
            (current, candidate) => current.or(candidate),
        };
    }

    let mut merged = members.swap_remove(base_index);
    merged.sources = sources.into_iter().collect();
    merged.keywords = keywords.into_iter().collect();
    merged.metadata = metadata;
    merged.created_at = created_at;
    Some(merged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Level, MetaValue};
    use crate::similarity::StrategyKind;
    use chrono::{TimeZone, Utc};

    fn deduplicator(threshold: f64) -> Deduplicator {
        Deduplicator::new(PairScorer::new(StrategyKind::Hybrid.build(), 0.6, 0.4), threshold)
    }

    #[test]
    fn disjoint_set_groups_in_first_member_order() {
        let mut sets = DisjointSet::new(5);
        assert!(sets.union(3, 1));
        assert!(sets.union(4, 0));
        assert!(!sets.union(1, 3));
        assert_eq!(sets.clusters(), vec![vec![0, 4], vec![1, 3], vec![2]]);
    }

    #[test]
    fn merges_accent_and_case_variants() {
        let items = vec![
            QAItem::new("¿Qué es IA?", "Inteligencia Artificial")
                .with_confidence(0.9)
                .with_sources(["wiki"]),
            QAItem::new("que es ia", "Inteligencia artificial.")
                .with_confidence(0.6)
                .with_sources(["manual", "wiki"]),
        ];

        let (unified, report) = deduplicator(0.85).deduplicate(items);

        assert_eq!(unified.len(), 1);
        assert_eq!(report.clusters_merged, 1);
        assert_eq!(report.items_absorbed, 1);
        assert_eq!(unified[0].confidence, 0.9);
        assert_eq!(unified[0].question, "¿Qué es IA?");
        assert_eq!(unified[0].sources, vec!["wiki".to_string(), "manual".to_string()]);
    }

    #[test]
    fn base_is_highest_confidence_but_confidence_is_never_averaged() {
        let items = vec![
            QAItem::new("What is Rust?", "A systems programming language")
                .with_confidence(0.4)
                .with_level(Level::Basic)
                .with_category("first"),
            QAItem::new("What is Rust", "A systems programming language!")
                .with_confidence(0.95)
                .with_level(Level::Advanced)
                .with_category("second"),
            QAItem::new("what is rust?", "a systems programming language")
                .with_confidence(0.95)
                .with_category("third"),
        ];

        let (unified, _) = deduplicator(0.85).deduplicate(items);
        assert_eq!(unified.len(), 1);
        assert_eq!(unified[0].confidence, 0.95);
        assert_eq!(unified[0].category, "second");
        assert_eq!(unified[0].level, Level::Advanced);
    }

    #[test]
    fn metadata_first_value_wins() {
        let items = vec![
            QAItem::new("q one", "a one")
                .with_confidence(0.2)
                .with_metadata("model", "gpt-4")
                .with_metadata("page", 3i64),
            QAItem::new("q one", "a one")
                .with_confidence(0.9)
                .with_metadata("model", "claude")
                .with_metadata("reviewed", true),
        ];

        let (unified, _) = deduplicator(0.85).deduplicate(items);
        let metadata = &unified[0].metadata;
        assert_eq!(metadata["model"], MetaValue::from("gpt-4"));
        assert_eq!(metadata["page"], MetaValue::Integer(3));
        assert_eq!(metadata["reviewed"], MetaValue::Bool(true));
    }

    #[test]
    fn keeps_earliest_timestamp() {
        let early = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let late = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        let items = vec![
            QAItem::new("q", "a").with_created_at(late),
            QAItem::new("q", "a"),
            QAItem::new("q", "a").with_created_at(early),
        ];
        let (unified, _) = deduplicator(0.85).deduplicate(items);
        assert_eq!(unified[0].created_at, Some(early));
    }

    #[test]
    fn output_follows_cluster_first_appearance() {
        let items = vec![
            QAItem::new("alpha question", "alpha answer"),
            QAItem::new("beta question here", "beta answer text"),
            QAItem::new("Alpha question", "Alpha answer."),
            QAItem::new("gamma unrelated", "gamma unrelated response"),
        ];
        let (unified, report) = deduplicator(0.85).deduplicate(items);
        let questions: Vec<_> = unified.iter().map(|i| i.question.as_str()).collect();
        assert_eq!(
            questions,
            vec!["alpha question", "beta question here", "gamma unrelated"]
        );
        assert_eq!(report.clusters_merged, 1);
    }

    #[test]
    fn chains_weakly_linked_items_deterministically() {
        let scorer = PairScorer::new(StrategyKind::TokenOverlap.build(), 1.0, 0.0);
        let deduplicator = Deduplicator::new(scorer, 0.5);
        // a~b and b~c score 0.5, a~c only 0.2
        let items = vec![
            QAItem::new("w1 w2 w3", "x"),
            QAItem::new("w2 w3 w4", "x"),
            QAItem::new("w3 w4 w5", "x"),
        ];
        let clusters = deduplicator.cluster(&items);
        assert_eq!(clusters, vec![vec![0, 1, 2]]);
    }

    #[test]
    fn deduplication_is_idempotent() {
        let items = vec![
            QAItem::new("¿Qué es IA?", "Inteligencia Artificial").with_sources(["a", "a"]),
            QAItem::new("que es ia", "inteligencia artificial").with_sources(["b"]),
            QAItem::new("¿Qué es ML?", "Aprendizaje automático").with_sources(["c", "c"]),
            QAItem::new("Define photosynthesis", "Plants converting light to energy"),
        ];
        let dedup = deduplicator(0.85);
        let (once, _) = dedup.deduplicate(items);
        let (twice, report) = dedup.deduplicate(once.clone());
        assert_eq!(once, twice);
        assert_eq!(report, DedupReport::default());
        // singletons are passed through untouched
        assert_eq!(twice[1].sources, vec!["c".to_string(), "c".to_string()]);
    }

    #[test]
    fn merge_never_loses_sources() {
        let items = vec![
            QAItem::new("q", "a").with_sources(["s1", "s2"]),
            QAItem::new("Q", "A").with_sources(["s3"]),
            QAItem::new("q.", "a!").with_sources(["s2", "s4"]),
        ];
        let all: Vec<String> = items.iter().flat_map(|i| i.sources.clone()).collect();
        let (unified, _) = deduplicator(0.85).deduplicate(items);
        assert_eq!(unified.len(), 1);
        for source in all {
            assert!(unified[0].sources.contains(&source));
        }
        assert_eq!(unified[0].sources, vec!["s1", "s2", "s3", "s4"]);
    }

    #[test]
    fn symbol_only_items_stay_apart() {
        let items = vec![
            QAItem::new("🙂", "👍"),
            QAItem::new("🚀", "🔥"),
            QAItem::new("¿?", "!!"),
            QAItem::new("🙂", "👍").with_sources(["copia"]),
        ];

        let (unified, report) = deduplicator(0.85).deduplicate(items);
        assert_eq!(unified.len(), 3);
        assert_eq!(report.clusters_merged, 1);
        assert_eq!(unified[0].sources, vec!["copia"]);
        assert_eq!(unified[2].question, "¿?");
    }

    #[test]
    fn empty_input_is_a_no_op() {
        let (unified, report) = deduplicator(0.85).deduplicate(Vec::new());
        assert!(unified.is_empty());
        assert_eq!(report, DedupReport::default());
    }
}
