//! # slipstream Pack Handler
//!
//! File: cli/src/commands/pack.rs
//!
//! ## Overview
//!
//! Implements `slipstream pack`, which streams a gzipped tarball of a
//! directory (or a single file) to a file or stdout.
//!
//! ## Architecture
//!
//! 1. Resolve configuration and filter flags (`commands::prepare`).
//! 2. Start the archive. Setup problems (missing path, options on a file
//!    target, no VCS found, bad patterns) fail here, before any output
//!    file is created.
//! 3. Copy the stream into the output as it is produced.
//! 4. Wait on the stream's error signal, then collect the summary. Only
//!    then is a file output moved into place; on failure the partial file
//!    is removed.
//!
//! ## Usage
//!
//! ```bash
//! # Archive a project to a file, skipping build output
//! slipstream pack ./app --exclude target/ -o app.tar.gz
//!
//! # Only what git tracks, piped over ssh
//! slipstream pack ./app --vcs | ssh host 'tar xzf - -C /srv/app'
//! ```
//!
use super::FilterArgs;
use crate::common::fs::io::ArchiveOutput;
use crate::core::{config, error::Result};
use anyhow::Context;
use clap::Parser;
use std::io;
use std::path::PathBuf;
use tracing::{debug, info};

/// Arguments for `slipstream pack`.
#[derive(Parser, Debug)]
#[command(
    about = "Stream a .tar.gz of a directory or file",
    long_about = "Walks PATH and writes a gzipped tarball of it to --output (or stdout).\n\
                  Entry names are relative to PATH; a single file is archived under its own name."
)]
pub struct PackArgs {
    /// Directory or file to archive.
    #[arg(value_name = "PATH")]
    pub path: PathBuf,

    /// Write the archive to FILE instead of stdout. `-` also means stdout.
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    #[command(flatten)]
    pub filters: FilterArgs,
}

/// Handles `slipstream pack`.
///
/// # Errors
///
/// Any setup, walk, encoding or output failure. When writing to a file,
/// nothing is left at the output path on error.
pub fn handle_pack(args: PackArgs) -> Result<()> {
    info!("Handling pack command for {}", args.path.display());
    let (archiver, opts) = super::prepare(&args.path, &args.filters)?;
    debug!("Pipeline settings: {:?}", archiver.settings());

    let mut stream = archiver.archive(&args.path, &opts)?;

    let output_path = args.output.as_deref().map(config::expand_path);
    let mut output = ArchiveOutput::open(output_path.as_deref())?;

    if let Err(e) = io::copy(&mut stream, &mut output) {
        output.discard();
        // the producer's own error, if any, explains the failure better
        return match stream.finish() {
            Err(archive_err) => Err(archive_err.into()),
            Ok(_) => Err(e).context("Failed to write archive"),
        };
    }

    // end-of-stream alone is not success; wait for the producer's verdict
    if let Ok(err) = stream.errors().recv() {
        output.discard();
        return Err(err.into());
    }

    match stream.finish() {
        Ok(summary) => {
            output.commit()?;
            debug!("Pack summary: {:?}", summary);
            info!(
                "Packed {} files, {} directories and {} symlinks ({} bytes before compression)",
                summary.files, summary.directories, summary.symlinks, summary.bytes_in
            );
            Ok(())
        }
        Err(e) => {
            output.discard();
            Err(e.into())
        }
    }
}
