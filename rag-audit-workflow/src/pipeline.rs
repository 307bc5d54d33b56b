//! Evaluation pipeline
//!
//! One pass per record: recover, compute metrics, judge, merge. Records are
//! independent, so with `max_concurrency > 1` several are in flight at once;
//! the report still lists them in input order.

use futures::stream::{self, StreamExt};
use rag_audit_core::{
    AuditConfig, EvaluationReport, EvaluationResult, EvaluationStatus, RawRecord, RecordSource,
    RecoveryMode, ReportSink,
};
use rag_audit_judge::{JudgeClient, JudgeFailureKind, JudgeOutcome};
use rag_audit_metrics::{MetricAggregator, PerformanceCalculator};
use rag_audit_recovery::{synthesize_turn_id, RecoveryEngine};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::PipelineError;

const CANCELLED_NOTE: &str = "run cancelled before scores were obtained";

pub struct EvaluationPipeline {
    recovery: RecoveryEngine,
    calculator: Arc<PerformanceCalculator>,
    judge: JudgeClient,
    max_concurrency: usize,
    cancel: CancellationToken,
}

impl EvaluationPipeline {
    pub fn new(config: &AuditConfig, judge: JudgeClient) -> Self {
        Self {
            recovery: RecoveryEngine::new(),
            calculator: Arc::new(PerformanceCalculator::new(&config.pricing)),
            judge,
            max_concurrency: config.pipeline.max_concurrency.max(1),
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_recovery(mut self, recovery: RecoveryEngine) -> Self {
        self.recovery = recovery;
        self
    }

    /// Cancelling `token` stops judging: backoff waits end early and records
    /// not yet judged are reported as cancelled.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Evaluates every record. Never fails; each record's disposition is in
    /// the report.
    pub async fn run(&self, records: &[RawRecord]) -> EvaluationReport {
        info!(
            records = records.len(),
            max_concurrency = self.max_concurrency,
            "Starting evaluation run"
        );

        let results: Vec<EvaluationResult> = stream::iter(records.iter().enumerate())
            .map(|(index, raw)| self.evaluate(index, raw))
            .buffered(self.max_concurrency)
            .collect()
            .await;

        let summary = MetricAggregator::summarize(&results);
        let report = EvaluationReport::new(results, summary);

        info!(
            evaluation_id = %report.evaluation_id,
            total = report.total_count,
            scored = report.scored_count,
            incomplete = report.incomplete_count,
            judge_failed = report.judge_failed_count,
            skipped = report.skipped_count,
            cancelled = report.cancelled_count,
            total_cost_usd = report.summary.total_cost_usd,
            "Evaluation run finished"
        );

        report
    }

    /// Loads, evaluates and stores. Only the two I/O steps can fail.
    pub async fn run_and_store(
        &self,
        source: &dyn RecordSource,
        sink: &dyn ReportSink,
    ) -> Result<EvaluationReport, PipelineError> {
        let records = source.load().await.map_err(PipelineError::Load)?;
        let report = self.run(&records).await;

        let bytes = report.to_json_bytes().map_err(PipelineError::Serialize)?;
        sink.store(&bytes).await.map_err(PipelineError::Store)?;

        Ok(report)
    }

    /// Full pass over one record.
    pub async fn evaluate(&self, index: usize, raw: &RawRecord) -> EvaluationResult {
        let turn = match self.recovery.recover(raw) {
            Ok(turn) => turn,
            Err(failure) => {
                let turn_id = failure
                    .turn_id
                    .clone()
                    .unwrap_or_else(|| synthesize_turn_id(raw));
                let result = EvaluationResult::skipped(index, turn_id, &failure);
                return Self::finish(result);
            }
        };

        let metrics = self.calculator.compute(&turn);
        let mut result = EvaluationResult::for_turn(index, turn, metrics);

        if result.recovery == Some(RecoveryMode::Salvaged) {
            result.push_note("salvaged from malformed record");
        }

        let Some(turn) = result.turn.as_ref() else {
            return Self::finish(result);
        };

        let missing = turn.missing_essentials();
        if !missing.is_empty() {
            result.push_note(format!("not judged: missing {}", missing.join(", ")));
            return Self::finish(result);
        }

        if self.cancel.is_cancelled() {
            result.mark_cancelled(CANCELLED_NOTE);
            return Self::finish(result);
        }

        let outcome = self
            .judge
            .judge_until(turn, turn.context_snippets(), &self.cancel)
            .await;
        Self::merge_judgement(&mut result, outcome);

        Self::finish(result)
    }

    fn merge_judgement(result: &mut EvaluationResult, outcome: JudgeOutcome) {
        result.judge_attempts = outcome.attempt_count();
        result.judge_model = outcome.model().map(str::to_string);

        match outcome.result {
            Ok(scores) => {
                result.status = EvaluationStatus::Scored;
                result.quality_scores = Some(scores);
            }
            Err(failure) if failure.kind == JudgeFailureKind::Cancelled => {
                result.mark_cancelled(CANCELLED_NOTE);
            }
            Err(failure) => {
                result.status = EvaluationStatus::JudgeFailed;
                result.push_note(failure.to_string());
            }
        }
    }

    fn finish(result: EvaluationResult) -> EvaluationResult {
        match result.status {
            EvaluationStatus::Skipped => {
                warn!(index = result.index, turn_id = %result.turn_id, note = ?result.note, "Record skipped")
            }
            EvaluationStatus::JudgeFailed => {
                warn!(index = result.index, turn_id = %result.turn_id, note = ?result.note, "Record not scored")
            }
            status => debug!(
                index = result.index,
                turn_id = %result.turn_id,
                status = status.as_str(),
                attempts = result.judge_attempts,
                "Record evaluated"
            ),
        }
        metrics::counter!("records_evaluated_total", "status" => result.status.as_str()).increment(1);
        result
    }
}
