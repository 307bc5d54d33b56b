use async_trait::async_trait;

use crate::domain::RawRecord;
use crate::error::Result;

/// A pure derivation from a borrowed input. Calculators in this workspace
/// degrade to sentinels instead of failing, so there is no error channel.
pub trait MetricCalculator {
    type Input: ?Sized;
    type Output;

    fn calculate(&self, input: &Self::Input) -> Self::Output;
}

/// Supplies the raw conversation records for one pipeline run.
#[async_trait]
pub trait RecordSource: Send + Sync {
    async fn load(&self) -> Result<Vec<RawRecord>>;
}

/// Persists the serialized report. A failure here is fatal to the run.
#[async_trait]
pub trait ReportSink: Send + Sync {
    async fn store(&self, report: &[u8]) -> Result<()>;
}
