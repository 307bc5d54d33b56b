use serde::{Deserialize, Serialize};
use validator::Validate;

pub const MIN_SCORE: u8 = 1;
pub const MAX_SCORE: u8 = 5;

/// Judge verdict for one turn, all three dimensions from a single call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct QualityScores {
    #[validate(range(min = 1, max = 5))]
    pub relevance_score: u8,
    #[validate(range(min = 1, max = 5))]
    pub completeness_score: u8,
    #[validate(range(min = 1, max = 5))]
    pub factual_accuracy_score: u8,
    pub reasoning: String,
}

impl QualityScores {
    pub fn new(
        relevance_score: u8,
        completeness_score: u8,
        factual_accuracy_score: u8,
        reasoning: impl Into<String>,
    ) -> Self {
        Self {
            relevance_score,
            completeness_score,
            factual_accuracy_score,
            reasoning: reasoning.into(),
        }
    }

    pub fn mean(&self) -> f64 {
        (self.relevance_score as f64
            + self.completeness_score as f64
            + self.factual_accuracy_score as f64)
            / 3.0
    }
}
