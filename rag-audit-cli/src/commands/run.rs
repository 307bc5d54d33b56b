//! `run` command: full audit from input file to report file.

use anyhow::{Context as _, Result};
use clap::Args;
use rag_audit_core::{AuditConfig, EvaluationReport};
use rag_audit_judge::{JudgeClient, OpenAiJudgeService};
use rag_audit_workflow::{EvaluationPipeline, JsonFileReportSink, LineRecordSource};
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Line-delimited input file, one raw record per line
    #[arg(short, long)]
    pub input: PathBuf,

    /// Where to write the JSON report
    #[arg(short, long)]
    pub output: PathBuf,

    /// Records evaluated at once (overrides pipeline.max_concurrency)
    #[arg(long)]
    pub concurrency: Option<usize>,
}

pub async fn execute(args: RunArgs, mut config: AuditConfig) -> Result<()> {
    if let Some(concurrency) = args.concurrency {
        config.pipeline.max_concurrency = concurrency.max(1);
    }
    if config.judge.api_key.is_none() {
        warn!("No judge API key configured; requests are sent without authorization");
    }

    let service = OpenAiJudgeService::new(&config.judge).context("Failed to create judge service")?;
    info!(
        endpoint = %service.endpoint_url(),
        primary_model = %config.judge.primary_model,
        fallback_model = ?config.judge.fallback_model,
        "Judge service ready"
    );
    let judge = JudgeClient::new(&config.judge, Arc::new(service));

    let cancel = CancellationToken::new();
    spawn_interrupt_handler(cancel.clone());

    let pipeline = EvaluationPipeline::new(&config, judge).with_cancellation(cancel);
    let report = pipeline
        .run_and_store(
            &LineRecordSource::new(&args.input),
            &JsonFileReportSink::new(&args.output),
        )
        .await
        .context("Evaluation run failed")?;

    println!("{}", summary_line(&report));
    println!("Report written to {}", args.output.display());
    Ok(())
}

/// First Ctrl-C cancels pending judge work; the partial report is still written.
fn spawn_interrupt_handler(cancel: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, cancelling outstanding judge calls");
            cancel.cancel();
        }
    });
}

pub fn summary_line(report: &EvaluationReport) -> String {
    format!(
        "Evaluated {} record(s): {} scored, {} incomplete, {} judge-failed, {} skipped, {} cancelled (total cost ${:.4})",
        report.total_count,
        report.scored_count,
        report.incomplete_count,
        report.judge_failed_count,
        report.skipped_count,
        report.cancelled_count,
        report.summary.total_cost_usd,
    )
}
