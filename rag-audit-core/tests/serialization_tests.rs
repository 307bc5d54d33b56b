use pretty_assertions::assert_eq;
use proptest::prelude::*;
use rag_audit_core::*;
use serde_json::json;

#[test]
fn test_status_serializes_snake_case() {
    assert_eq!(serde_json::to_value(EvaluationStatus::JudgeFailed).unwrap(), json!("judge_failed"));
    assert_eq!(serde_json::to_value(EvaluationStatus::Scored).unwrap(), json!("scored"));
    assert_eq!(EvaluationStatus::Incomplete.to_string(), "incomplete");
}

#[test]
fn test_result_schema() {
    let turn = ConversationTurn::builder("turn-9")
        .user_query(Some("q".to_string()))
        .ai_response(Some("a".to_string()))
        .build()
        .unwrap();
    let mut result = EvaluationResult::for_turn(0, turn, PerformanceMetrics::new(Some(15), 0.5, false));
    result.status = EvaluationStatus::Scored;
    result.quality_scores = Some(QualityScores::new(5, 4, 3, "grounded"));
    result.judge_attempts = 1;

    let value = serde_json::to_value(&result).unwrap();

    assert_eq!(value["turn_id"], json!("turn-9"));
    assert_eq!(value["status"], json!("scored"));
    assert_eq!(value["recovery"], json!("strict"));
    assert_eq!(value["quality_scores"]["relevance_score"], json!(5));
    assert_eq!(value["quality_scores"]["reasoning"], json!("grounded"));
    assert_eq!(value["performance_metrics"]["latency_ms"], json!(15));
    assert_eq!(value["performance_metrics"]["cost_usd"], json!(0.5));
    assert!(value.get("turn").is_none());
}

#[test]
fn test_null_scores_serialize_as_null() {
    let result = EvaluationResult::skipped(2, "turn-c", &RecoveryFailure::new(vec![], None));
    let value = serde_json::to_value(&result).unwrap();

    assert_eq!(value["quality_scores"], serde_json::Value::Null);
    assert_eq!(value["performance_metrics"], serde_json::Value::Null);
}

#[test]
fn test_report_round_trip_preserves_order() {
    let failure = RecoveryFailure::new(vec!["user_query".to_string()], None);
    let results: Vec<_> = (0..3)
        .map(|i| EvaluationResult::skipped(i, format!("t{i}"), &failure))
        .collect();
    let report = EvaluationReport::new(results, ReportSummary::default());

    let bytes = report.to_json_bytes().unwrap();
    let parsed: EvaluationReport = serde_json::from_slice(&bytes).unwrap();

    let ids: Vec<_> = parsed.results.iter().map(|r| r.turn_id.as_str()).collect();
    assert_eq!(ids, vec!["t0", "t1", "t2"]);
    assert_eq!(parsed.evaluation_id, report.evaluation_id);
    assert_eq!(parsed.failure_count, 3);
}

#[test]
fn test_core_error_from_serde() {
    let err = serde_json::from_str::<serde_json::Value>("invalid json{").unwrap_err();
    let core_err: CoreError = err.into();
    assert!(matches!(core_err, CoreError::Serialization(_)));
}

proptest! {
    #[test]
    fn test_builder_accepts_any_single_essential(query in "\\PC{1,64}") {
        let turn = ConversationTurn::builder("p")
            .user_query(Some(query.clone()))
            .build()
            .unwrap();
        prop_assert_eq!(turn.user_query(), Some(query.as_str()));
        prop_assert_eq!(turn.missing_essentials(), vec!["ai_response"]);
    }
}
