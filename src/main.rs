//! # Memory Harness CLI (`memo`)
//!
//! The `memo` binary drives the extraction pipeline. It provides commands for
//! running one batch and for inspecting the durable state between runs.
//!
//! ## Usage
//!
//! ```bash
//! memo --config ./config/memo.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `memo run` | Scan the source tree and process every pending file |
//! | `memo status` | Summarise the state catalogue and note collection |
//!
//! The process exits non-zero on any unhandled pipeline error; interrupting
//! it mid-run is safe because every state transition is persisted before it
//! becomes observable.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use memory_harness::config::{self, Config};
use memory_harness::doc_writer::DocWriter;
use memory_harness::embedder::EmbeddingClient;
use memory_harness::extractor::ChatExtractor;
use memory_harness::file_store::FileStore;
use memory_harness::note_store::NoteStore;
use memory_harness::pipeline::Pipeline;
use memory_harness::progress::StderrProgress;
use memory_harness::status;

/// Memory Harness — distill source files into an embedded project memory.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/memo.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "memo",
    about = "Memory Harness — distill source files into an embedded project memory",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/memo.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Run one extraction batch.
    ///
    /// Scans the source tree, extracts notes from every pending file via the
    /// configured chat model, embeds and persists them, and regenerates the
    /// documentation tree. Already-processed files are skipped; modified
    /// files are re-extracted.
    Run,

    /// Summarise the durable state.
    ///
    /// Prints per-status file counts, recorded error reasons, and the size
    /// of the note collection. Reads only local files; no model calls.
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Run => {
            run_batch(&cfg).await?;
            println!("Extraction completed successfully.");
        }
        Commands::Status => {
            status::run_status(&cfg)?;
        }
    }

    Ok(())
}

/// Wire the pipeline components from configuration and run one batch.
async fn run_batch(cfg: &Config) -> Result<()> {
    let files = FileStore::new(
        &cfg.source.root,
        &cfg.storage.state_file,
        &cfg.source.extensions,
    )?;

    let extractor = ChatExtractor::new(
        &cfg.llm.api_key,
        &cfg.llm.base_url,
        &cfg.llm.chat_model,
        Duration::from_secs(cfg.llm.chat_timeout_secs),
    )?;

    let embedder = EmbeddingClient::new(
        &cfg.llm.api_key,
        &cfg.llm.base_url,
        &cfg.llm.embed_model,
        Duration::from_secs(cfg.llm.embed_timeout_secs),
    )?;

    let notes = NoteStore::new(&cfg.storage.notes_file)?;
    let docs = DocWriter::new(&cfg.storage.docs_dir)?;

    let pipeline = Pipeline::new(
        files,
        Box::new(extractor),
        Box::new(embedder),
        notes,
        docs,
        Box::new(StderrProgress),
    );

    pipeline.run().await?;
    Ok(())
}
