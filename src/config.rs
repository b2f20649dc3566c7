use serde::{Deserialize, Serialize};

use crate::errors::{ConfigurationError, ConfigurationResult};
use crate::similarity::{PairScorer, StrategyKind};

/// Settings of the unification pipeline, read from the `unify` section of a
/// plan file. Every field has a default so an empty section is valid.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct UnifierConfig {
    pub default_language: String,
    pub default_category: String,
    pub deduplicate: bool,
    pub similarity_threshold: f64,
    pub question_weight: f64,
    pub answer_weight: f64,
    pub strategy: StrategyKind,
}

impl Default for UnifierConfig {
    fn default() -> Self {
        Self {
            default_language: "es".to_string(),
            default_category: "general".to_string(),
            deduplicate: true,
            similarity_threshold: 0.85,
            question_weight: 0.6,
            answer_weight: 0.4,
            strategy: StrategyKind::Hybrid,
        }
    }
}

impl UnifierConfig {
    pub fn validate(&self) -> ConfigurationResult<()> {
        if self.default_language.trim().is_empty() {
            return Err(ConfigurationError::invalid_value(
                "default_language",
                "must not be empty",
            ));
        }
        if !(0.0..=1.0).contains(&self.similarity_threshold) {
            return Err(ConfigurationError::invalid_value(
                "similarity_threshold",
                format!("{} is outside [0, 1]", self.similarity_threshold),
            ));
        }
        for (field, weight) in [
            ("question_weight", self.question_weight),
            ("answer_weight", self.answer_weight),
        ] {
            if !weight.is_finite() || weight < 0.0 {
                return Err(ConfigurationError::invalid_value(
                    field,
                    format!("{} must be a non-negative number", weight),
                ));
            }
        }
        if self.question_weight + self.answer_weight <= 0.0 {
            return Err(ConfigurationError::invalid_range(
                "weights",
                "question_weight and answer_weight must not both be zero",
            ));
        }
        Ok(())
    }

    pub fn scorer(&self) -> PairScorer {
        PairScorer::new(
            self.strategy.build(),
            self.question_weight,
            self.answer_weight,
        )
    }
}
