//! Text canonicalisation and similarity scoring for duplicate detection
//!
//! Scores are always computed over canonical text: lower-cased, stripped of
//! diacritics and punctuation, with whitespace collapsed. The scoring function
//! itself is a [`SimilarityStrategy`], selected through [`StrategyKind`].

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::model::QAItem;

/// Lower-cases, folds accented Latin letters, replaces punctuation with
/// spaces and collapses runs of whitespace.
pub fn canonicalize(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut last_space = true;

    for c in text.chars().flat_map(char::to_lowercase) {
        let c = fold_diacritic(c);
        if c.is_alphanumeric() {
            out.push(c);
            last_space = false;
        } else if !last_space {
            out.push(' ');
            last_space = true;
        }
    }

    if out.ends_with(' ') {
        out.pop();
    }
    out
}

fn fold_diacritic(c: char) -> char {
    match c {
        'á' | 'à' | 'â' | 'ä' | 'ã' | 'å' => 'a',
        'é' | 'è' | 'ê' | 'ë' => 'e',
        'í' | 'ì' | 'î' | 'ï' => 'i',
        'ó' | 'ò' | 'ô' | 'ö' | 'õ' => 'o',
        'ú' | 'ù' | 'û' | 'ü' => 'u',
        'ñ' => 'n',
        'ç' => 'c',
        'ý' | 'ÿ' => 'y',
        other => other,
    }
}

/// Text made only of symbols has no canonical form; the trimmed, lower-cased
/// raw text stands in so such items keep distinct keys.
fn canonical_or_raw(text: &str) -> String {
    let canonical = canonicalize(text);
    if canonical.is_empty() {
        text.trim().to_lowercase()
    } else {
        canonical
    }
}

/// Canonical question and answer text of one item
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CanonicalText {
    pub question: String,
    pub answer: String,
}

impl CanonicalText {
    pub fn of(item: &QAItem) -> Self {
        Self {
            question: canonical_or_raw(&item.question),
            answer: canonical_or_raw(&item.answer),
        }
    }

    /// Transient grouping key; never stored on the item
    pub fn fingerprint(&self) -> String {
        format!("{}\u{1f}{}", self.question, self.answer)
    }
}

/// Scores two canonical strings in `[0, 1]`
pub trait SimilarityStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    fn score(&self, a: &str, b: &str) -> f64;
}

/// Jaccard overlap of word tokens
#[derive(Clone, Copy, Debug, Default)]
pub struct TokenOverlap;

impl SimilarityStrategy for TokenOverlap {
    fn name(&self) -> &'static str {
        "token_overlap"
    }

    fn score(&self, a: &str, b: &str) -> f64 {
        let left: HashSet<&str> = a.split_whitespace().collect();
        let right: HashSet<&str> = b.split_whitespace().collect();
        if left.is_empty() && right.is_empty() {
            return 1.0;
        }
        let shared = left.intersection(&right).count();
        let union = left.union(&right).count();
        shared as f64 / union as f64
    }
}

/// Normalized Levenshtein similarity over characters
#[derive(Clone, Copy, Debug, Default)]
pub struct EditDistance;

impl SimilarityStrategy for EditDistance {
    fn name(&self) -> &'static str {
        "edit_distance"
    }

    fn score(&self, a: &str, b: &str) -> f64 {
        strsim::normalized_levenshtein(a, b)
    }
}

/// Highest of token overlap and edit distance, so that both reordered words
/// and small typos are recognised
#[derive(Clone, Copy, Debug, Default)]
pub struct Hybrid;

impl SimilarityStrategy for Hybrid {
    fn name(&self) -> &'static str {
        "hybrid"
    }

    fn score(&self, a: &str, b: &str) -> f64 {
        TokenOverlap.score(a, b).max(EditDistance.score(a, b))
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    TokenOverlap,
    EditDistance,
    #[default]
    Hybrid,
}

impl StrategyKind {
    pub fn build(&self) -> Box<dyn SimilarityStrategy> {
        match self {
            StrategyKind::TokenOverlap => Box::new(TokenOverlap),
            StrategyKind::EditDistance => Box::new(EditDistance),
            StrategyKind::Hybrid => Box::new(Hybrid),
        }
    }
}

/// Weighted combination of question and answer similarity
pub struct PairScorer {
    strategy: Box<dyn SimilarityStrategy>,
    question_weight: f64,
    answer_weight: f64,
}

impl PairScorer {
    /// Weights are rescaled to sum to one; both must be non-negative and not
    /// both zero (checked by `UnifierConfig::validate`).
    pub fn new(strategy: Box<dyn SimilarityStrategy>, question_weight: f64, answer_weight: f64) -> Self {
        let total = question_weight + answer_weight;
        Self {
            strategy,
            question_weight: question_weight / total,
            answer_weight: answer_weight / total,
        }
    }

    pub fn strategy_name(&self) -> &'static str {
        self.strategy.name()
    }

    pub fn score(&self, a: &CanonicalText, b: &CanonicalText) -> f64 {
        if a == b {
            return 1.0;
        }
        let question = self.strategy.score(&a.question, &b.question);
        let answer = self.strategy.score(&a.answer, &b.answer);
        (self.question_weight * question + self.answer_weight * answer).clamp(0.0, 1.0)
    }
}

impl std::fmt::Debug for PairScorer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PairScorer")
            .field("strategy", &self.strategy.name())
            .field("question_weight", &self.question_weight)
            .field("answer_weight", &self.answer_weight)
            .finish()
    }
}
