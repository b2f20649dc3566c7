//! Unification of question-answer records produced by heterogeneous
//! generators: normalization, near-duplicate merging, filtered views,
//! statistics and export.

pub mod common;
pub mod config;
pub mod data_loader;
pub mod dedup;
pub mod errors;
pub mod export;
pub mod filter;
pub mod manager;
pub mod model;
pub mod normalizer;
pub mod plan;
pub mod plan_execution;
pub mod similarity;
pub mod stats;
pub mod view;

pub use config::UnifierConfig;
pub use manager::{IngestionSummary, QADataManager};
pub use model::{Level, Origin, QABatch, QAItem, RawBatch, RawItem};
pub use view::View;
