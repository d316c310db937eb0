//! State catalogue summary.
//!
//! Provides a quick overview of the pipeline's durable state: how many files
//! are in each status, which files errored and why, and how many notes the
//! knowledge base holds. Used by `memo status` to give confidence that runs
//! are progressing without reading raw JSON.

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::path::PathBuf;

use crate::config::Config;
use crate::models::FileStatus;

#[derive(Deserialize)]
struct StateRecord {
    path: PathBuf,
    status: FileStatus,
    #[serde(default)]
    reason: Option<String>,
    mod_time: i64,
}

/// Run the status command: read the state and notes files and print a summary.
pub fn run_status(config: &Config) -> Result<()> {
    let records = load_records(&config.storage.state_file)?;
    let note_count = load_note_count(&config.storage.notes_file)?;

    let count = |status: FileStatus| records.iter().filter(|r| r.status == status).count();

    println!("Memory Harness — Status");
    println!("=======================");
    println!();
    println!("  State file:  {}", config.storage.state_file.display());
    println!("  Notes file:  {}", config.storage.notes_file.display());
    println!();
    println!("  Tracked files: {}", records.len());
    println!("    pending:    {}", count(FileStatus::Pending));
    println!("    processing: {}", count(FileStatus::Processing));
    println!("    processed:  {}", count(FileStatus::Processed));
    println!("    error:      {}", count(FileStatus::Error));
    println!();
    println!("  Notes: {}", note_count);

    if let Some(newest) = records.iter().map(|r| r.mod_time).max() {
        if let Some(ts) = nanos_to_datetime(newest) {
            println!("  Newest tracked change: {}", ts.format("%Y-%m-%d %H:%M:%S UTC"));
        }
    }

    let errors: Vec<&StateRecord> = records
        .iter()
        .filter(|r| r.status == FileStatus::Error)
        .collect();
    if !errors.is_empty() {
        println!();
        println!("  Errors:");
        for record in errors {
            println!(
                "    {} — {}",
                record.path.display(),
                record.reason.as_deref().unwrap_or("(no reason recorded)")
            );
        }
    }

    Ok(())
}

fn load_records(path: &std::path::Path) -> Result<Vec<StateRecord>> {
    match std::fs::read(path) {
        Ok(data) => Ok(serde_json::from_slice(&data)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
        Err(e) => Err(e.into()),
    }
}

fn load_note_count(path: &std::path::Path) -> Result<usize> {
    match std::fs::read(path) {
        Ok(data) => {
            let notes: Vec<serde_json::Value> = serde_json::from_slice(&data)?;
            Ok(notes.len())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(0),
        Err(e) => Err(e.into()),
    }
}

fn nanos_to_datetime(nanos: i64) -> Option<DateTime<Utc>> {
    let secs = nanos.div_euclid(1_000_000_000);
    let nsecs = nanos.rem_euclid(1_000_000_000) as u32;
    DateTime::from_timestamp(secs, nsecs)
}
