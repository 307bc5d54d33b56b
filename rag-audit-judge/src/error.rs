//! Judge error types
//!
//! [`TransportError`] is what a judge service reports for one call.
//! [`JudgeFailure`] is the terminal outcome of a whole judge invocation once
//! the resilience policy has given up.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A failed call to the judge service.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{}", self.describe())]
pub struct TransportError {
    /// HTTP status, when the service answered at all.
    pub status: Option<u16>,
    pub message: String,
    pub timed_out: bool,
}

impl TransportError {
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        Self {
            status: Some(status),
            message: message.into(),
            timed_out: false,
        }
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self {
            status: None,
            message: message.into(),
            timed_out: true,
        }
    }

    /// Connection failures and anything else without a status.
    pub fn other(message: impl Into<String>) -> Self {
        Self {
            status: None,
            message: message.into(),
            timed_out: false,
        }
    }

    pub fn rate_limited() -> Self {
        Self::from_status(429, "rate limit exceeded")
    }

    pub fn unavailable() -> Self {
        Self::from_status(503, "service unavailable")
    }

    pub fn not_found() -> Self {
        Self::from_status(404, "model not found")
    }

    /// Maps the error onto the policy's failure classes. Timeouts and
    /// statuses other than 429, 503 and 404 are unclassified.
    pub fn kind(&self) -> JudgeFailureKind {
        if self.timed_out {
            return JudgeFailureKind::Unknown;
        }
        match self.status {
            Some(429) => JudgeFailureKind::RateLimited,
            Some(503) => JudgeFailureKind::Unavailable,
            Some(404) => JudgeFailureKind::ModelNotFound,
            _ => JudgeFailureKind::Unknown,
        }
    }

    fn describe(&self) -> String {
        match (self.status, self.timed_out) {
            (_, true) => format!("request timed out: {}", self.message),
            (Some(status), false) => format!("HTTP {}: {}", status, self.message),
            (None, false) => format!("transport error: {}", self.message),
        }
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            TransportError::timeout(err.to_string())
        } else if let Some(status) = err.status() {
            TransportError::from_status(status.as_u16(), err.to_string())
        } else {
            TransportError::other(err.to_string())
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JudgeFailureKind {
    RateLimited,
    Unavailable,
    ModelNotFound,
    MalformedResponse,
    Unknown,
    /// The run was cancelled while waiting to retry.
    Cancelled,
}

impl JudgeFailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            JudgeFailureKind::RateLimited => "rate_limited",
            JudgeFailureKind::Unavailable => "unavailable",
            JudgeFailureKind::ModelNotFound => "model_not_found",
            JudgeFailureKind::MalformedResponse => "malformed_response",
            JudgeFailureKind::Unknown => "unknown",
            JudgeFailureKind::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for JudgeFailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Terminal failure of one judge invocation.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[error("judge failed on {model} after {attempts} attempt(s): {kind}: {message}")]
pub struct JudgeFailure {
    pub kind: JudgeFailureKind,
    /// Model of the last attempt.
    pub model: String,
    pub attempts: u32,
    pub message: String,
}
