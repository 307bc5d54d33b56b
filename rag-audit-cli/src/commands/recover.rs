//! `recover` command: recovery dry-run without judging.

use anyhow::{Context as _, Result};
use clap::Args;
use rag_audit_core::{RawRecord, RecordSource};
use rag_audit_recovery::{synthesize_turn_id, RecoveryEngine};
use rag_audit_workflow::LineRecordSource;
use serde_json::{json, Value};
use std::io::Write;
use std::path::PathBuf;

#[derive(Debug, Args)]
pub struct RecoverArgs {
    /// Line-delimited input file, one raw record per line
    #[arg(short, long)]
    pub input: PathBuf,
}

pub async fn execute(args: RecoverArgs) -> Result<()> {
    let source = LineRecordSource::new(&args.input);
    let records = source
        .load()
        .await
        .with_context(|| format!("Failed to load records from {:?}", args.input))?;

    let engine = RecoveryEngine::new();
    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    for (index, raw) in records.iter().enumerate() {
        let line = serde_json::to_string(&diagnose(&engine, index, raw))?;
        writeln!(out, "{line}").context("Failed to write to stdout")?;
    }

    Ok(())
}

/// One JSON line describing what recovery made of a record.
pub fn diagnose(engine: &RecoveryEngine, index: usize, raw: &RawRecord) -> Value {
    match engine.recover(raw) {
        Ok(turn) => json!({
            "index": index,
            "status": "recovered",
            "recovery": turn.recovery(),
            "missing": turn.missing_essentials(),
            "turn": turn,
        }),
        Err(failure) => json!({
            "index": index,
            "status": "failed",
            "turn_id": failure.turn_id.clone().unwrap_or_else(|| synthesize_turn_id(raw)),
            "failure": failure,
        }),
    }
}
