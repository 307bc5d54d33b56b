use rag_audit_core::{ConversationTurn, RawRecord, RecoveryFailure};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::extractors::SalvageExtractors;
use crate::strict::{parse_strict, StrictParseError};

/// Strict-then-salvage recovery of conversation turns.
///
/// Stateless apart from its extractor set, so recovering the same record
/// twice always yields the same turn.
#[derive(Debug, Clone, Default)]
pub struct RecoveryEngine {
    extractors: Arc<SalvageExtractors>,
}

impl RecoveryEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_extractors(extractors: SalvageExtractors) -> Self {
        Self {
            extractors: Arc::new(extractors),
        }
    }

    pub fn recover(&self, raw: &RawRecord) -> Result<ConversationTurn, RecoveryFailure> {
        let parse_error = match parse_strict(raw) {
            Ok(turn) => {
                debug!(turn_id = turn.turn_id(), "Record parsed strictly");
                record_outcome("strict");
                return Ok(turn);
            }
            Err(StrictParseError::MissingEssentials) => None,
            Err(err @ StrictParseError::Malformed(_)) => Some(err.to_string()),
        };

        match self.extractors.salvage(raw) {
            Ok(turn) => {
                debug!(
                    turn_id = turn.turn_id(),
                    missing = ?turn.missing_essentials(),
                    "Record salvaged from malformed input"
                );
                record_outcome("salvaged");
                Ok(turn)
            }
            Err(mut failure) => {
                failure.parse_error = parse_error;
                warn!(
                    bytes = raw.len(),
                    missing = ?failure.missing_fields,
                    "Record could not be recovered"
                );
                record_outcome("failed");
                Err(failure)
            }
        }
    }
}

fn record_outcome(mode: &'static str) {
    metrics::counter!("records_recovered_total", "mode" => mode).increment(1);
}
