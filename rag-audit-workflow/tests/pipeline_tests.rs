use async_trait::async_trait;
use pretty_assertions::assert_eq;
use rag_audit_core::{
    AuditConfig, CoreError, EvaluationStatus, RawRecord, RecordSource, RecoveryMode, ReportSink,
};
use rag_audit_judge::{JudgeClient, JudgeService, Sleeper, TransportError};
use rag_audit_workflow::*;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

const GOOD_REPLY: &str = r#"{"relevance_score": 5, "completeness_score": 4, "factual_accuracy_score": 3, "reasoning": "Mostly supported."}"#;

/// Answers by looking for markers in the prompt, so replies do not depend on
/// the order in which concurrent records reach the service.
#[derive(Default)]
struct MarkerService {
    prompts: Mutex<Vec<String>>,
}

#[async_trait]
impl JudgeService for MarkerService {
    async fn submit(&self, prompt: &str, _model: &str) -> Result<String, TransportError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        if prompt.contains("[slow]") {
            tokio::time::sleep(Duration::from_millis(500)).await;
        }
        if prompt.contains("[timeout]") {
            return Err(TransportError::timeout("request timed out"));
        }
        if prompt.contains("[busy]") {
            return Err(TransportError::rate_limited());
        }
        Ok(GOOD_REPLY.to_string())
    }
}

impl MarkerService {
    fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }
}

struct NoopSleeper;

#[async_trait]
impl Sleeper for NoopSleeper {
    async fn sleep(&self, _delay: Duration) {}
}

/// Fires the token as soon as the client starts waiting, then waits forever.
struct CancellingSleeper(CancellationToken);

#[async_trait]
impl Sleeper for CancellingSleeper {
    async fn sleep(&self, _delay: Duration) {
        self.0.cancel();
        std::future::pending::<()>().await;
    }
}

fn pipeline_with(config: &AuditConfig, service: Arc<MarkerService>) -> EvaluationPipeline {
    let judge = JudgeClient::new(&config.judge, service).with_sleeper(Arc::new(NoopSleeper));
    EvaluationPipeline::new(config, judge)
}

fn record(id: &str, query: &str) -> RawRecord {
    RawRecord::from(format!(
        r#"{{"turn_id": "{id}", "user_query": "{query}", "ai_response": "An answer.", "context": ["Some context."], "request_timestamp": "2024-05-01T12:00:00Z", "response_timestamp": "2024-05-01T12:00:01.500Z", "token_count": 1000, "model_name": "gpt-4o"}}"#
    ))
}

fn five_records() -> Vec<RawRecord> {
    vec![
        record("r1", "What is the refund window?"),
        record("r2", "Do you ship abroad?"),
        RawRecord::from(
            r#"{"turn_id": "r3", "user_query": "How do I reset my password?", "context": ["Open settings", "Choose sec"#,
        ),
        record("r4", "Can I change my order?"),
        record("r5", "Is this covered? [timeout]"),
    ]
}

#[tokio::test]
async fn test_run_reports_every_record_in_order() {
    let config = AuditConfig::default();
    let service = Arc::new(MarkerService::default());
    let pipeline = pipeline_with(&config, service.clone());

    let report = pipeline.run(&five_records()).await;

    let ids: Vec<_> = report.results.iter().map(|r| r.turn_id.as_str()).collect();
    assert_eq!(ids, vec!["r1", "r2", "r3", "r4", "r5"]);
    let statuses: Vec<_> = report.results.iter().map(|r| r.status).collect();
    assert_eq!(
        statuses,
        vec![
            EvaluationStatus::Scored,
            EvaluationStatus::Scored,
            EvaluationStatus::Incomplete,
            EvaluationStatus::Scored,
            EvaluationStatus::JudgeFailed,
        ]
    );

    assert_eq!(report.total_count, 5);
    assert_eq!(report.scored_count, 3);
    assert_eq!(report.incomplete_count, 1);
    assert_eq!(report.judge_failed_count, 1);
    assert_eq!(report.failure_count, 1);
    assert_eq!(service.calls(), 4);

    let scored = &report.results[0];
    assert_eq!(scored.quality_scores.as_ref().unwrap().relevance_score, 5);
    assert_eq!(scored.performance_metrics.unwrap().latency_ms, Some(1500));
    assert_eq!(scored.judge_attempts, 1);
    assert_eq!(scored.judge_model.as_deref(), Some("gpt-4o"));
    assert_eq!(scored.recovery, Some(RecoveryMode::Strict));
}

#[tokio::test]
async fn test_truncated_record_is_incomplete_with_metrics() {
    let config = AuditConfig::default();
    let pipeline = pipeline_with(&config, Arc::new(MarkerService::default()));

    let report = pipeline.run(&five_records()).await;
    let incomplete = &report.results[2];

    assert_eq!(incomplete.recovery, Some(RecoveryMode::Salvaged));
    assert!(incomplete.quality_scores.is_none());
    assert!(incomplete.performance_metrics.is_some());
    assert_eq!(incomplete.judge_attempts, 0);
    let note = incomplete.note.as_deref().unwrap();
    assert!(note.contains("salvaged"));
    assert!(note.contains("missing ai_response"));
}

#[tokio::test]
async fn test_judge_failure_keeps_metrics() {
    let config = AuditConfig::default();
    let pipeline = pipeline_with(&config, Arc::new(MarkerService::default()));

    let report = pipeline.run(&five_records()).await;
    let failed = &report.results[4];

    assert_eq!(failed.status, EvaluationStatus::JudgeFailed);
    assert!(failed.quality_scores.is_none());
    let metrics = failed.performance_metrics.unwrap();
    assert_eq!(metrics.latency_ms, Some(1500));
    assert!((metrics.cost_usd - 0.01).abs() < 1e-9);
    assert_eq!(failed.judge_attempts, 1);
    assert!(failed.note.as_deref().unwrap().contains("unknown"));
}

#[tokio::test]
async fn test_unrecoverable_record_is_skipped_not_dropped() {
    let config = AuditConfig::default();
    let pipeline = pipeline_with(&config, Arc::new(MarkerService::default()));
    let records = vec![
        RawRecord::from("<<binary garbage>>"),
        record("r2", "Still evaluated?"),
    ];

    let report = pipeline.run(&records).await;

    assert_eq!(report.total_count, 2);
    assert_eq!(report.skipped_count, 1);
    let skipped = &report.results[0];
    assert_eq!(skipped.status, EvaluationStatus::Skipped);
    assert!(skipped.turn_id.starts_with("turn-"));
    assert!(skipped.performance_metrics.is_none());
    assert!(skipped.note.is_some());
    assert_eq!(report.results[1].status, EvaluationStatus::Scored);
}

#[tokio::test]
async fn test_skipped_record_keeps_its_logged_id() {
    let config = AuditConfig::default();
    let pipeline = pipeline_with(&config, Arc::new(MarkerService::default()));
    let records = vec![RawRecord::from(r#"{"turn_id": "x-17", "token_count": 10, "#)];

    let report = pipeline.run(&records).await;

    assert_eq!(report.results[0].status, EvaluationStatus::Skipped);
    assert_eq!(report.results[0].turn_id, "x-17");
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_run_preserves_input_order() {
    let mut config = AuditConfig::default();
    config.pipeline.max_concurrency = 4;
    let pipeline = pipeline_with(&config, Arc::new(MarkerService::default()));
    let records = vec![
        record("slow-1", "First [slow]"),
        record("fast-2", "Second"),
        record("slow-3", "Third [slow]"),
        record("fast-4", "Fourth"),
        record("fast-5", "Fifth"),
    ];

    let report = pipeline.run(&records).await;

    let ids: Vec<_> = report.results.iter().map(|r| r.turn_id.as_str()).collect();
    assert_eq!(ids, vec!["slow-1", "fast-2", "slow-3", "fast-4", "fast-5"]);
    let indexes: Vec<_> = report.results.iter().map(|r| r.index).collect();
    assert_eq!(indexes, vec![0, 1, 2, 3, 4]);
    assert_eq!(report.scored_count, 5);
}

#[tokio::test]
async fn test_cancelled_before_start_keeps_metrics_and_skips_judge() {
    let config = AuditConfig::default();
    let service = Arc::new(MarkerService::default());
    let token = CancellationToken::new();
    token.cancel();
    let pipeline = pipeline_with(&config, service.clone()).with_cancellation(token);

    let report = pipeline.run(&five_records()).await;

    assert_eq!(service.calls(), 0);
    assert_eq!(report.cancelled_count, 4);
    assert_eq!(report.incomplete_count, 1);
    assert_eq!(report.failure_count, 4);
    for result in report.results.iter().filter(|r| r.status == EvaluationStatus::Cancelled) {
        assert!(result.performance_metrics.is_some());
        assert!(result.quality_scores.is_none());
        assert_eq!(result.judge_attempts, 0);
    }
}

#[tokio::test]
async fn test_cancellation_interrupts_rate_limit_backoff() {
    let config = AuditConfig::default();
    let service = Arc::new(MarkerService::default());
    let token = CancellationToken::new();
    let judge = JudgeClient::new(&config.judge, service.clone())
        .with_sleeper(Arc::new(CancellingSleeper(token.clone())));
    let pipeline = EvaluationPipeline::new(&config, judge).with_cancellation(token.clone());
    let records = vec![record("r1", "Quota exhausted [busy]"), record("r2", "Next one")];

    let report = pipeline.run(&records).await;

    assert!(token.is_cancelled());
    assert_eq!(report.results[0].status, EvaluationStatus::Cancelled);
    assert_eq!(report.results[0].judge_attempts, 1);
    assert_eq!(report.results[1].status, EvaluationStatus::Cancelled);
    assert_eq!(report.results[1].judge_attempts, 0);
    assert_eq!(service.calls(), 1);
}

#[tokio::test]
async fn test_summary_covers_scored_results() {
    let config = AuditConfig::default();
    let pipeline = pipeline_with(&config, Arc::new(MarkerService::default()));

    let report = pipeline.run(&five_records()).await;

    assert_eq!(report.summary.mean_relevance, Some(5.0));
    assert_eq!(report.summary.mean_factual_accuracy, Some(3.0));
    assert_eq!(report.summary.p50_latency_ms, Some(1500.0));
}

// ===== Storage =====

struct FixedSource(Vec<RawRecord>);

#[async_trait]
impl RecordSource for FixedSource {
    async fn load(&self) -> rag_audit_core::Result<Vec<RawRecord>> {
        Ok(self.0.clone())
    }
}

struct BrokenSink;

#[async_trait]
impl ReportSink for BrokenSink {
    async fn store(&self, _report: &[u8]) -> rag_audit_core::Result<()> {
        Err(CoreError::Storage("disk full".to_string()))
    }
}

#[tokio::test]
async fn test_store_failure_is_fatal() {
    let config = AuditConfig::default();
    let pipeline = pipeline_with(&config, Arc::new(MarkerService::default()));

    let err = pipeline
        .run_and_store(&FixedSource(five_records()), &BrokenSink)
        .await
        .unwrap_err();

    assert!(matches!(err, PipelineError::Store(_)));
    assert!(err.to_string().contains("disk full"));
}

#[tokio::test]
async fn test_missing_input_is_fatal() {
    let config = AuditConfig::default();
    let pipeline = pipeline_with(&config, Arc::new(MarkerService::default()));
    let dir = tempfile::tempdir().unwrap();
    let source = LineRecordSource::new(dir.path().join("absent.jsonl"));
    let sink = JsonFileReportSink::new(dir.path().join("report.json"));

    let err = pipeline.run_and_store(&source, &sink).await.unwrap_err();

    assert!(matches!(err, PipelineError::Load(_)));
    assert!(!sink.path().exists());
}

#[tokio::test]
async fn test_file_round_trip() {
    let config = AuditConfig::default();
    let pipeline = pipeline_with(&config, Arc::new(MarkerService::default()));
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("turns.jsonl");
    let output = dir.path().join("out/report.json");

    let lines: Vec<String> = five_records()
        .iter()
        .map(|r| r.as_text().into_owned())
        .collect();
    std::fs::write(&input, lines.join("\n\n")).unwrap();

    let report = pipeline
        .run_and_store(&LineRecordSource::new(&input), &JsonFileReportSink::new(&output))
        .await
        .unwrap();

    let stored: serde_json::Value =
        serde_json::from_slice(&std::fs::read(&output).unwrap()).unwrap();
    assert_eq!(stored["total_count"], 5);
    assert_eq!(stored["evaluation_id"], report.evaluation_id.to_string());
    assert_eq!(stored["results"][2]["status"], "incomplete");
    assert_eq!(stored["results"][2]["quality_scores"], serde_json::Value::Null);
    assert_eq!(stored["results"][4]["status"], "judge_failed");
}

#[test]
fn test_recover_and_compute_are_idempotent() {
    let engine = rag_audit_recovery::RecoveryEngine::new();
    let calculator = rag_audit_metrics::PerformanceCalculator::default();

    for raw in five_records() {
        let first = engine.recover(&raw);
        assert_eq!(first, engine.recover(&raw));
        if let Ok(turn) = first {
            assert_eq!(calculator.compute(&turn), calculator.compute(&turn));
        }
    }
}
