use rag_audit_core::{ConversationTurn, RawRecord, RecoveryMode};
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::values::{
    id_from_value, normalize_text, snippet_from_value, synthesize_turn_id, timestamp_from_value,
};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StrictParseError {
    #[error("{0}")]
    Malformed(String),

    #[error("well-formed record has neither a user query nor an AI response")]
    MissingEssentials,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    #[serde(default)]
    role: Option<String>,
    #[serde(default, alias = "text")]
    content: Option<String>,
}

/// Accepted shape of a well-formed record. Loosely typed fields go through
/// the same decoders as the salvage path.
#[derive(Debug, Deserialize)]
struct StrictRecord {
    #[serde(default, alias = "id")]
    turn_id: Option<Value>,
    #[serde(default, alias = "query", alias = "question", alias = "user_message")]
    user_query: Option<String>,
    #[serde(
        default,
        alias = "response",
        alias = "answer",
        alias = "assistant_response",
        alias = "completion"
    )]
    ai_response: Option<String>,
    #[serde(
        default,
        alias = "context",
        alias = "contexts",
        alias = "retrieved_context",
        alias = "documents"
    )]
    context_snippets: Option<Value>,
    #[serde(
        default,
        alias = "request_ts",
        alias = "request_time",
        alias = "requested_at"
    )]
    request_timestamp: Option<Value>,
    #[serde(
        default,
        alias = "response_ts",
        alias = "response_time",
        alias = "responded_at"
    )]
    response_timestamp: Option<Value>,
    #[serde(default, alias = "tokens", alias = "total_tokens", alias = "num_tokens")]
    token_count: Option<u64>,
    #[serde(default, alias = "model")]
    model_name: Option<String>,
    #[serde(default)]
    messages: Vec<ChatMessage>,
}

impl StrictRecord {
    fn first_message(&self, roles: &[&str]) -> Option<String> {
        self.messages
            .iter()
            .filter(|m| {
                m.role
                    .as_deref()
                    .is_some_and(|r| roles.iter().any(|want| r.eq_ignore_ascii_case(want)))
            })
            .find_map(|m| normalize_text(m.content.clone()))
    }
}

fn snippets_from_value(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items.iter().filter_map(snippet_from_value).collect(),
        Some(other) => snippet_from_value(other).into_iter().collect(),
        None => Vec::new(),
    }
}

/// Parses a well-formed JSON object record.
///
/// Flat fields take precedence over a `messages` array; the first `user`
/// message and the first `assistant` message fill whichever is missing.
pub fn parse_strict(raw: &RawRecord) -> Result<ConversationTurn, StrictParseError> {
    let record: StrictRecord = serde_json::from_slice(raw.as_bytes())
        .map_err(|e| StrictParseError::Malformed(e.to_string()))?;

    let user_query = normalize_text(record.user_query.clone())
        .or_else(|| record.first_message(&["user", "human"]));
    let ai_response = normalize_text(record.ai_response.clone())
        .or_else(|| record.first_message(&["assistant", "ai", "bot"]));

    if user_query.is_none() && ai_response.is_none() {
        return Err(StrictParseError::MissingEssentials);
    }

    let turn_id = record
        .turn_id
        .as_ref()
        .and_then(id_from_value)
        .unwrap_or_else(|| synthesize_turn_id(raw));

    ConversationTurn::builder(turn_id)
        .user_query(user_query)
        .ai_response(ai_response)
        .context_snippets(snippets_from_value(record.context_snippets.as_ref()))
        .request_timestamp(record.request_timestamp.as_ref().and_then(timestamp_from_value))
        .response_timestamp(record.response_timestamp.as_ref().and_then(timestamp_from_value))
        .token_count(record.token_count)
        .model_name(normalize_text(record.model_name))
        .recovery(RecoveryMode::Strict)
        .build()
        .map_err(|_| StrictParseError::MissingEssentials)
}
