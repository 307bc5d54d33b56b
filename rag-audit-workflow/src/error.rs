use rag_audit_core::CoreError;
use thiserror::Error;

/// Run-level failures. Everything scoped to a single record is reported in
/// the evaluation report instead.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("failed to load input records: {0}")]
    Load(#[source] CoreError),

    #[error("failed to serialize report: {0}")]
    Serialize(#[source] CoreError),

    #[error("failed to store report: {0}")]
    Store(#[source] CoreError),
}
