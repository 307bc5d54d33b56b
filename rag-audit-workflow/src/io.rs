//! File-backed record source and report sink.

use async_trait::async_trait;
use rag_audit_core::{CoreError, RawRecord, RecordSource, ReportSink, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// One raw record per line. Lines are kept as bytes, so invalid UTF-8
/// reaches the recovery engine untouched. Blank lines are skipped.
#[derive(Debug, Clone)]
pub struct LineRecordSource {
    path: PathBuf,
}

impl LineRecordSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn split_records(bytes: &[u8]) -> Vec<RawRecord> {
        bytes
            .split(|b| *b == b'\n')
            .map(|line| line.strip_suffix(b"\r").unwrap_or(line))
            .filter(|line| !line.iter().all(u8::is_ascii_whitespace))
            .map(|line| RawRecord::new(line.to_vec()))
            .collect()
    }
}

#[async_trait]
impl RecordSource for LineRecordSource {
    async fn load(&self) -> Result<Vec<RawRecord>> {
        let bytes = tokio::fs::read(&self.path).await.map_err(|e| {
            CoreError::Storage(format!("cannot read {}: {}", self.path.display(), e))
        })?;
        let records = Self::split_records(&bytes);
        info!(path = %self.path.display(), records = records.len(), "Loaded input records");
        Ok(records)
    }
}

/// Writes the serialized report to a file, creating parent directories.
#[derive(Debug, Clone)]
pub struct JsonFileReportSink {
    path: PathBuf,
}

impl JsonFileReportSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl ReportSink for JsonFileReportSink {
    async fn store(&self, report: &[u8]) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&self.path, report).await.map_err(|e| {
            CoreError::Storage(format!("cannot write {}: {}", self.path.display(), e))
        })?;
        debug!(path = %self.path.display(), bytes = report.len(), "Report stored");
        Ok(())
    }
}
