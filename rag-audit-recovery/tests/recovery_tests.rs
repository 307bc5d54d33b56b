use chrono::{TimeZone, Utc};
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use rag_audit_core::{RawRecord, RecoveryMode};
use rag_audit_recovery::*;
use test_case::test_case;

fn engine() -> RecoveryEngine {
    RecoveryEngine::new()
}

// ===== Strict Path =====

#[test]
fn test_well_formed_record_uses_strict_path() {
    let raw = RawRecord::from(
        r#"{
            "turn_id": "conv-1",
            "user_query": "What is our refund window?",
            "ai_response": "Thirty days from delivery.",
            "context_snippets": ["Refunds are accepted within 30 days of delivery."],
            "request_timestamp": "2024-05-01T12:00:00Z",
            "response_timestamp": "2024-05-01T12:00:01.500Z",
            "token_count": 512,
            "model_name": "gpt-4o"
        }"#,
    );

    let turn = engine().recover(&raw).unwrap();

    assert_eq!(turn.recovery(), RecoveryMode::Strict);
    assert_eq!(turn.turn_id(), "conv-1");
    assert_eq!(turn.context_snippets().len(), 1);
    assert_eq!(
        turn.request_timestamp(),
        Some(Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap())
    );
    assert_eq!(turn.token_count(), Some(512));
    assert_eq!(turn, parse_strict(&raw).unwrap());
}

#[test]
fn test_missing_optional_field_is_null() {
    let raw = RawRecord::from(r#"{"user_query": "Q", "ai_response": "A", "model_name": "gpt-4o"}"#);

    let turn = engine().recover(&raw).unwrap();

    assert_eq!(turn.token_count(), None);
    assert_eq!(turn.request_timestamp(), None);
    assert_eq!(turn.response_timestamp(), None);
    assert!(turn.context_snippets().is_empty());
    assert_eq!(turn.turn_id(), synthesize_turn_id(&raw));
}

// ===== Salvage Path =====

#[test]
fn test_truncated_blob_recovers_query_only() {
    let raw = RawRecord::from(
        r#"{"turn_id": "r3", "user_query": "How do I reset my password?", "context": ["Open settings", "Choose sec"#,
    );

    let turn = engine().recover(&raw).unwrap();

    assert_eq!(turn.recovery(), RecoveryMode::Salvaged);
    assert_eq!(turn.turn_id(), "r3");
    assert_eq!(turn.user_query(), Some("How do I reset my password?"));
    assert_eq!(turn.ai_response(), None);
    assert_eq!(turn.context_snippets(), &["Open settings".to_string(), "Choose sec".to_string()]);
    assert!(!turn.is_judgeable());
}

#[test]
fn test_trailing_comma_is_salvaged() {
    let raw = RawRecord::from(r#"{"user_query": "Q?", "ai_response": "A.", "token_count": 40,}"#);

    let turn = engine().recover(&raw).unwrap();

    assert_eq!(turn.recovery(), RecoveryMode::Salvaged);
    assert_eq!(turn.user_query(), Some("Q?"));
    assert_eq!(turn.ai_response(), Some("A."));
    assert_eq!(turn.token_count(), Some(40));
}

#[test]
fn test_broken_quoting_does_not_block_other_fields() {
    let raw = RawRecord::from(
        r#"{"user_query": "He said "hi" to me", "ai_response": "Noted.", "tokens": 9}"#,
    );

    let turn = engine().recover(&raw).unwrap();

    assert_eq!(turn.user_query(), Some("He said"));
    assert_eq!(turn.ai_response(), Some("Noted."));
    assert_eq!(turn.token_count(), Some(9));
}

#[test]
fn test_python_style_record() {
    let raw = RawRecord::from(
        "{'query': 'Is shipping free?', 'answer': 'Over $50, yes.', 'tokens': 33, 'model': 'gpt-4o-mini', 'id': 77}",
    );

    let turn = engine().recover(&raw).unwrap();

    assert_eq!(turn.recovery(), RecoveryMode::Salvaged);
    assert_eq!(turn.turn_id(), "77");
    assert_eq!(turn.user_query(), Some("Is shipping free?"));
    assert_eq!(turn.ai_response(), Some("Over $50, yes."));
    assert_eq!(turn.token_count(), Some(33));
    assert_eq!(turn.model_name(), Some("gpt-4o-mini"));
}

#[test]
fn test_corrupted_chat_messages() {
    let raw = RawRecord::from(
        r#"{"messages": [{"role": "user", "content": "Where is my order?"}, {"role": "assistant", "content": "It ships tomorrow."} ]] garbage"#,
    );

    let turn = engine().recover(&raw).unwrap();

    assert_eq!(turn.recovery(), RecoveryMode::Salvaged);
    assert_eq!(turn.user_query(), Some("Where is my order?"));
    assert_eq!(turn.ai_response(), Some("It ships tomorrow."));
}

#[test]
fn test_escaped_content_is_decoded() {
    let raw = RawRecord::from(r#"user_query: "line one\nline \"two\"" ai_response: "ok""#);

    let turn = engine().recover(&raw).unwrap();

    assert_eq!(turn.user_query(), Some("line one\nline \"two\""));
}

#[test]
fn test_escaped_astral_characters_match_strict_parse() {
    let complete = r#"{"turn_id": "e-1", "user_query": "smile \ud83d\ude00 please", "ai_response": "Done \ud83d\udc4d"}"#;
    let truncated = r#"{"turn_id": "e-1", "user_query": "smile \ud83d\ude00 please", "context": ["Open sett"#;

    let strict = parse_strict(&RawRecord::from(complete)).unwrap();
    let salvaged = engine().recover(&RawRecord::from(truncated)).unwrap();

    assert_eq!(salvaged.recovery(), RecoveryMode::Salvaged);
    assert_eq!(salvaged.user_query(), strict.user_query());
    assert_eq!(salvaged.user_query(), Some("smile \u{1F600} please"));
    assert_eq!(strict.ai_response(), Some("Done \u{1F44D}"));
}

#[test]
fn test_unparseable_timestamp_is_null() {
    let raw = RawRecord::from(
        r#"{"user_query": "Q", "ai_response": "A", "request_timestamp": "not a time", "response_timestamp": 1714564801,"#,
    );

    let turn = engine().recover(&raw).unwrap();

    assert_eq!(turn.request_timestamp(), None);
    assert_eq!(
        turn.response_timestamp(),
        Some(Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 1).unwrap())
    );
}

#[test]
fn test_null_model_is_absent() {
    let raw = RawRecord::from(r#"{"user_query": "Q", "model": null, "id": null,"#);

    let turn = engine().recover(&raw).unwrap();

    assert_eq!(turn.model_name(), None);
    assert_eq!(turn.turn_id(), synthesize_turn_id(&raw));
}

// ===== Failures =====

#[test_case(r#"{"turn_id": "x", "token_count": 10, "#; "truncated without essentials")]
#[test_case("\u{0}\u{1}binary noise"; "binary noise")]
#[test_case(""; "empty record")]
fn test_record_without_essentials_fails(input: &str) {
    let raw = RawRecord::from(input);

    let failure = engine().recover(&raw).unwrap_err();

    assert_eq!(failure.missing_fields, vec!["user_query", "ai_response"]);
    assert!(failure.parse_error.is_some());
}

#[test]
fn test_well_formed_record_without_essentials_has_no_parse_error() {
    let raw = RawRecord::from(r#"{"turn_id": "x", "token_count": 10}"#);

    let failure = engine().recover(&raw).unwrap_err();

    assert!(failure.parse_error.is_none());
    assert!(failure.to_string().contains("user_query"));
}

#[test]
fn test_failure_keeps_salvaged_id() {
    let failure = engine()
        .recover(&RawRecord::from(r#"{"turn_id": "x-17", "token_count": 10, "#))
        .unwrap_err();
    assert_eq!(failure.turn_id.as_deref(), Some("x-17"));

    let failure = engine().recover(&RawRecord::from("no id here")).unwrap_err();
    assert_eq!(failure.turn_id, None);
}

// ===== Extension =====

#[test]
fn test_custom_extractor_set() {
    let mut extractors = SalvageExtractors::default();
    extractors.user_query = extractors
        .user_query
        .clone()
        .with_pattern(label_pattern("utterance", QUOTED).unwrap());
    let engine = RecoveryEngine::with_extractors(extractors);

    let turn = engine.recover(&RawRecord::from(r#"utterance="hello there""#)).unwrap();

    assert_eq!(turn.user_query(), Some("hello there"));
}

// ===== Properties =====

proptest! {
    #[test]
    fn test_well_formed_records_match_strict_parse(
        query in "[a-zA-Z0-9 ?]{0,40}[a-zA-Z0-9?]",
        response in "[a-zA-Z0-9 .]{0,40}[a-zA-Z0-9.]",
        tokens in proptest::option::of(0u64..1_000_000),
        snippets in proptest::collection::vec("[a-z ]{1,20}[a-z]", 0..4),
    ) {
        let value = serde_json::json!({
            "user_query": query,
            "ai_response": response,
            "token_count": tokens,
            "context_snippets": snippets,
        });
        let raw = RawRecord::from(value.to_string());

        let recovered = RecoveryEngine::new().recover(&raw).unwrap();
        prop_assert_eq!(recovered, parse_strict(&raw).unwrap());
    }

    #[test]
    fn test_recovery_is_deterministic(bytes in proptest::collection::vec(any::<u8>(), 0..256)) {
        let raw = RawRecord::new(bytes);
        let engine = RecoveryEngine::new();
        prop_assert_eq!(engine.recover(&raw), engine.recover(&raw));
    }

    #[test]
    fn test_truncation_never_panics(cut in 0usize..120) {
        let full = r#"{"turn_id": "t", "user_query": "What's new?", "ai_response": "Version 2.", "token_count": 18, "model_name": "gpt-4o"}"#;
        let raw = RawRecord::from(&full[..cut.min(full.len())]);
        let _ = RecoveryEngine::new().recover(&raw);
    }
}
