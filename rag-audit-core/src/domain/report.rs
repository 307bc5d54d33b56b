use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{ConversationTurn, PerformanceMetrics, QualityScores, RecoveryMode};
use crate::error::{RecoveryFailure, Result};

/// Final disposition of one input record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvaluationStatus {
    /// Metrics computed and the judge returned scores.
    Scored,
    /// Recovered, but a query or response is missing so the judge was not called.
    Incomplete,
    /// Metrics computed; the judge failed after its retry policy ran out.
    JudgeFailed,
    /// The record could not be recovered.
    Skipped,
    /// Interrupted by cancellation before scores were obtained.
    Cancelled,
}

impl EvaluationStatus {
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            EvaluationStatus::JudgeFailed | EvaluationStatus::Skipped | EvaluationStatus::Cancelled
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EvaluationStatus::Scored => "scored",
            EvaluationStatus::Incomplete => "incomplete",
            EvaluationStatus::JudgeFailed => "judge_failed",
            EvaluationStatus::Skipped => "skipped",
            EvaluationStatus::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for EvaluationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationResult {
    /// Position of the record in the input sequence.
    pub index: usize,
    pub turn_id: String,
    pub status: EvaluationStatus,
    pub recovery: Option<RecoveryMode>,
    pub quality_scores: Option<QualityScores>,
    pub performance_metrics: Option<PerformanceMetrics>,
    /// Judge calls spent on this record, successful or not.
    pub judge_attempts: u32,
    /// Model that produced the final judge outcome.
    pub judge_model: Option<String>,
    pub note: Option<String>,
    #[serde(skip)]
    pub turn: Option<ConversationTurn>,
}

impl EvaluationResult {
    /// Result for a turn whose metrics are known; judging fields start empty.
    pub fn for_turn(index: usize, turn: ConversationTurn, metrics: PerformanceMetrics) -> Self {
        Self {
            index,
            turn_id: turn.turn_id().to_string(),
            status: EvaluationStatus::Incomplete,
            recovery: Some(turn.recovery()),
            quality_scores: None,
            performance_metrics: Some(metrics),
            judge_attempts: 0,
            judge_model: None,
            note: None,
            turn: Some(turn),
        }
    }

    pub fn skipped(index: usize, turn_id: impl Into<String>, failure: &RecoveryFailure) -> Self {
        let mut note = failure.to_string();
        if let Some(parse_error) = &failure.parse_error {
            note.push_str(&format!(" (strict parse: {})", parse_error));
        }

        Self {
            index,
            turn_id: turn_id.into(),
            status: EvaluationStatus::Skipped,
            recovery: None,
            quality_scores: None,
            performance_metrics: None,
            judge_attempts: 0,
            judge_model: None,
            note: Some(note),
            turn: None,
        }
    }

    /// Marks a recovered turn as interrupted by cancellation. Metrics stay;
    /// any scores are dropped.
    pub fn mark_cancelled(&mut self, reason: impl AsRef<str>) {
        self.status = EvaluationStatus::Cancelled;
        self.quality_scores = None;
        self.push_note(reason);
    }

    /// Appends to the note, separating entries with "; ".
    pub fn push_note(&mut self, text: impl AsRef<str>) {
        match &mut self.note {
            Some(note) => {
                note.push_str("; ");
                note.push_str(text.as_ref());
            }
            None => self.note = Some(text.as_ref().to_string()),
        }
    }
}

/// Run-level aggregates over the results.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReportSummary {
    pub mean_latency_ms: Option<f64>,
    pub p50_latency_ms: Option<f64>,
    pub p95_latency_ms: Option<f64>,
    pub total_cost_usd: f64,
    /// Results whose cost is a placeholder because the token count was missing.
    pub estimated_cost_count: usize,
    pub mean_relevance: Option<f64>,
    pub mean_completeness: Option<f64>,
    pub mean_factual_accuracy: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub evaluation_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub total_count: usize,
    pub scored_count: usize,
    pub incomplete_count: usize,
    pub judge_failed_count: usize,
    pub skipped_count: usize,
    pub cancelled_count: usize,
    pub failure_count: usize,
    pub summary: ReportSummary,
    pub results: Vec<EvaluationResult>,
}

impl EvaluationReport {
    /// Assembles the report; `results` must already be in input order.
    pub fn new(results: Vec<EvaluationResult>, summary: ReportSummary) -> Self {
        let count = |status: EvaluationStatus| results.iter().filter(|r| r.status == status).count();

        let scored_count = count(EvaluationStatus::Scored);
        let incomplete_count = count(EvaluationStatus::Incomplete);
        let judge_failed_count = count(EvaluationStatus::JudgeFailed);
        let skipped_count = count(EvaluationStatus::Skipped);
        let cancelled_count = count(EvaluationStatus::Cancelled);

        Self {
            evaluation_id: Uuid::new_v4(),
            timestamp: Utc::now(),
            total_count: results.len(),
            scored_count,
            incomplete_count,
            judge_failed_count,
            skipped_count,
            cancelled_count,
            failure_count: judge_failed_count + skipped_count + cancelled_count,
            summary,
            results,
        }
    }

    pub fn to_json_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec_pretty(self)?)
    }
}
