//! RAG Audit CLI
//!
//! Audits logged RAG conversations: recovers malformed records, computes
//! latency and cost, and scores each turn with an LLM judge.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;
mod config;
mod logging;

use commands::{RecoverArgs, RunArgs};

#[derive(Debug, Parser)]
#[command(name = "rag-audit", version, about = "Audit RAG conversation logs")]
struct Cli {
    /// Configuration file layered over config/default and config/local
    #[arg(short, long, global = true, env = "RAG_AUDIT_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (overridden by RUST_LOG)
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Recover, measure and judge every record, then write the report
    Run(RunArgs),

    /// Show how each record would be recovered, as JSON lines
    Recover(RecoverArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = config::load(cli.config.as_deref())?;
    if let Some(level) = cli.log_level {
        config.logging.level = level;
    }
    logging::init(&config.logging);

    match cli.command {
        Commands::Run(args) => commands::run::execute(args, config).await,
        Commands::Recover(args) => commands::recover::execute(args).await,
    }
}
