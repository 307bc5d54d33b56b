use chrono::{DateTime, Utc};
use rag_audit_core::{ConversationTurn, MetricCalculator};

/// Milliseconds from request to response. A response stamped before its
/// request is clock skew and yields zero.
pub fn latency_between(request: DateTime<Utc>, response: DateTime<Utc>) -> u64 {
    let delta = response.signed_duration_since(request).num_milliseconds();
    u64::try_from(delta).unwrap_or(0)
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LatencyCalculator;

impl LatencyCalculator {
    pub fn new() -> Self {
        Self
    }
}

impl MetricCalculator for LatencyCalculator {
    type Input = ConversationTurn;
    type Output = Option<u64>;

    fn calculate(&self, turn: &ConversationTurn) -> Option<u64> {
        match (turn.request_timestamp(), turn.response_timestamp()) {
            (Some(request), Some(response)) => Some(latency_between(request, response)),
            _ => None,
        }
    }
}
