use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, CoreError>;

impl From<serde_json::Error> for CoreError {
    fn from(err: serde_json::Error) -> Self {
        CoreError::Serialization(err.to_string())
    }
}

impl From<validator::ValidationErrors> for CoreError {
    fn from(err: validator::ValidationErrors) -> Self {
        CoreError::Validation(err.to_string())
    }
}

impl From<std::io::Error> for CoreError {
    fn from(err: std::io::Error) -> Self {
        CoreError::Storage(err.to_string())
    }
}

/// A raw record from which neither a user query nor an AI response could be
/// recovered. Scoped to one record; the pipeline keeps going.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[error("unrecoverable record: missing {}", .missing_fields.join(", "))]
pub struct RecoveryFailure {
    /// Essential fields no extractor could locate.
    pub missing_fields: Vec<String>,
    /// Why the strict parse was rejected, if it was attempted and failed.
    pub parse_error: Option<String>,
    /// Id found in the record even though its content was not.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub turn_id: Option<String>,
}

impl RecoveryFailure {
    pub fn new(missing_fields: Vec<String>, parse_error: Option<String>) -> Self {
        Self {
            missing_fields,
            parse_error,
            turn_id: None,
        }
    }

    pub fn with_turn_id(mut self, turn_id: Option<String>) -> Self {
        self.turn_id = turn_id;
        self
    }
}
