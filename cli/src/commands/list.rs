//! # slipstream List Handler
//!
//! File: cli/src/commands/list.rs
//!
//! Implements `slipstream list`: a dry run of `pack` that prints the entry
//! names that would be archived, one per line, in archive order. Directories
//! carry a trailing `/`. Uses the same planning and walk as `pack`, so the
//! output matches the archive exactly.
//!
use super::FilterArgs;
use crate::common::archive::tar::EntryKind;
use crate::core::error::{ArchiveError, Result};
use clap::Parser;
use std::io::{self, Write};
use std::path::PathBuf;
use tracing::info;

/// Arguments for `slipstream list`.
#[derive(Parser, Debug)]
#[command(about = "List the paths that would be archived, without archiving them")]
pub struct ListArgs {
    /// Directory or file to inspect.
    #[arg(value_name = "PATH")]
    pub path: PathBuf,

    /// Print a totals line to stderr when done.
    #[arg(short, long)]
    pub summary: bool,

    #[command(flatten)]
    pub filters: FilterArgs,
}

/// Handles `slipstream list`.
pub fn handle_list(args: ListArgs) -> Result<()> {
    info!("Handling list command for {}", args.path.display());
    let (archiver, opts) = super::prepare(&args.path, &args.filters)?;
    let plan = archiver.plan(&args.path, &opts)?;

    let stdout = io::stdout();
    let mut out = io::BufWriter::new(stdout.lock());
    let write_err = |e: io::Error| ArchiveError::Pipeline(format!("writing listing: {}", e));

    let summary = plan.walk(|entry| {
        let suffix = if entry.kind == EntryKind::Directory { "/" } else { "" };
        writeln!(out, "{}{}", entry.relative_path, suffix).map_err(write_err)
    })?;
    out.flush().map_err(write_err)?;

    if args.summary {
        eprintln!(
            "{} files, {} directories, {} symlinks, {} bytes ({} skipped)",
            summary.files, summary.directories, summary.symlinks, summary.bytes_in, summary.skipped
        );
    }
    Ok(())
}
