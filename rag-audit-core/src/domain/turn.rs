use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::RecoveryFailure;

pub const USER_QUERY_FIELD: &str = "user_query";
pub const AI_RESPONSE_FIELD: &str = "ai_response";

/// How a turn was obtained from its raw record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecoveryMode {
    /// The record parsed as well-formed JSON.
    Strict,
    /// Fields were pulled out of a malformed record one by one.
    Salvaged,
}

/// A recovered conversation turn.
///
/// At least one of `user_query` and `ai_response` is always present; the only
/// way to obtain a value is [`TurnBuilder::build`], which enforces this.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConversationTurn {
    turn_id: String,
    user_query: Option<String>,
    ai_response: Option<String>,
    context_snippets: Vec<String>,
    request_timestamp: Option<DateTime<Utc>>,
    response_timestamp: Option<DateTime<Utc>>,
    token_count: Option<u64>,
    model_name: Option<String>,
    recovery: RecoveryMode,
}

impl ConversationTurn {
    pub fn builder(turn_id: impl Into<String>) -> TurnBuilder {
        TurnBuilder::new(turn_id)
    }

    pub fn turn_id(&self) -> &str {
        &self.turn_id
    }

    pub fn user_query(&self) -> Option<&str> {
        self.user_query.as_deref()
    }

    pub fn ai_response(&self) -> Option<&str> {
        self.ai_response.as_deref()
    }

    pub fn context_snippets(&self) -> &[String] {
        &self.context_snippets
    }

    pub fn request_timestamp(&self) -> Option<DateTime<Utc>> {
        self.request_timestamp
    }

    pub fn response_timestamp(&self) -> Option<DateTime<Utc>> {
        self.response_timestamp
    }

    pub fn token_count(&self) -> Option<u64> {
        self.token_count
    }

    pub fn model_name(&self) -> Option<&str> {
        self.model_name.as_deref()
    }

    pub fn recovery(&self) -> RecoveryMode {
        self.recovery
    }

    /// Essential fields this turn lacks. Empty when the turn can be judged.
    pub fn missing_essentials(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.user_query.is_none() {
            missing.push(USER_QUERY_FIELD);
        }
        if self.ai_response.is_none() {
            missing.push(AI_RESPONSE_FIELD);
        }
        missing
    }

    pub fn is_judgeable(&self) -> bool {
        self.user_query.is_some() && self.ai_response.is_some()
    }
}

#[derive(Debug, Clone)]
pub struct TurnBuilder {
    turn_id: String,
    user_query: Option<String>,
    ai_response: Option<String>,
    context_snippets: Vec<String>,
    request_timestamp: Option<DateTime<Utc>>,
    response_timestamp: Option<DateTime<Utc>>,
    token_count: Option<u64>,
    model_name: Option<String>,
    recovery: RecoveryMode,
}

impl TurnBuilder {
    pub fn new(turn_id: impl Into<String>) -> Self {
        Self {
            turn_id: turn_id.into(),
            user_query: None,
            ai_response: None,
            context_snippets: Vec::new(),
            request_timestamp: None,
            response_timestamp: None,
            token_count: None,
            model_name: None,
            recovery: RecoveryMode::Strict,
        }
    }

    pub fn user_query(mut self, query: Option<String>) -> Self {
        self.user_query = query;
        self
    }

    pub fn ai_response(mut self, response: Option<String>) -> Self {
        self.ai_response = response;
        self
    }

    pub fn context_snippets(mut self, snippets: Vec<String>) -> Self {
        self.context_snippets = snippets;
        self
    }

    pub fn request_timestamp(mut self, ts: Option<DateTime<Utc>>) -> Self {
        self.request_timestamp = ts;
        self
    }

    pub fn response_timestamp(mut self, ts: Option<DateTime<Utc>>) -> Self {
        self.response_timestamp = ts;
        self
    }

    pub fn token_count(mut self, count: Option<u64>) -> Self {
        self.token_count = count;
        self
    }

    pub fn model_name(mut self, model: Option<String>) -> Self {
        self.model_name = model;
        self
    }

    pub fn recovery(mut self, mode: RecoveryMode) -> Self {
        self.recovery = mode;
        self
    }

    /// Fails when both the user query and the AI response are absent.
    pub fn build(self) -> Result<ConversationTurn, RecoveryFailure> {
        if self.user_query.is_none() && self.ai_response.is_none() {
            return Err(RecoveryFailure::new(
                vec![USER_QUERY_FIELD.to_string(), AI_RESPONSE_FIELD.to_string()],
                None,
            ));
        }

        Ok(ConversationTurn {
            turn_id: self.turn_id,
            user_query: self.user_query,
            ai_response: self.ai_response,
            context_snippets: self.context_snippets,
            request_timestamp: self.request_timestamp,
            response_timestamp: self.response_timestamp,
            token_count: self.token_count,
            model_name: self.model_name,
            recovery: self.recovery,
        })
    }
}
