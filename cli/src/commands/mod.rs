//! # slipstream Command Modules
//!
//! File: cli/src/commands/mod.rs
//!
//! ## Overview
//!
//! This module aggregates the subcommands of the slipstream CLI and the
//! argument groups they share.
//!
//! ## Commands
//!
//! - `pack`: Stream a `.tar.gz` of a directory or file to a file or stdout
//! - `list`: Print the paths `pack` would archive, without archiving them
//!
//! Both commands accept the same filter flags (`FilterArgs`) and resolve
//! them against the loaded configuration through `prepare`, so a dry run
//! always matches the real thing.
//!
use crate::common::archive::{ArchiveOptions, Archiver};
use crate::common::vcs::VcsRegistry;
use crate::core::{config, error::Result};
use anyhow::Context;
use clap::Args;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Archive a directory or file into a gzipped tarball.
pub mod pack;
/// Dry run: list what would be archived.
pub mod list;

/// Filter and configuration flags shared by `pack` and `list`.
#[derive(Args, Debug, Clone, Default)]
pub struct FilterArgs {
    /// Leave out paths matching PATTERN (repeatable). A trailing `/` matches
    /// directories only.
    #[arg(short = 'x', long = "exclude", value_name = "PATTERN")]
    pub exclude: Vec<String>,

    /// Keep paths matching PATTERN (repeatable). Without `--vcs`, everything
    /// else is left out.
    #[arg(short = 'i', long = "include", value_name = "PATTERN")]
    pub include: Vec<String>,

    /// Only archive files tracked by the version control system at PATH.
    #[arg(long)]
    pub vcs: bool,

    /// Read configuration from FILE instead of the user and project files.
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    pub config: Option<PathBuf>,
}

/// Loads configuration and builds the archiver and options for `path`.
///
/// Configured `[archive]` defaults only apply to directory targets; a file
/// target only sees what was given on the command line.
pub fn prepare(path: &Path, filters: &FilterArgs) -> Result<(Archiver, ArchiveOptions)> {
    let cfg = config::load_config(path, filters.config.as_deref())
        .context("Failed to load slipstream configuration")?;

    let opts = if path.is_dir() {
        cfg.archive_options(&filters.exclude, &filters.include, filters.vcs)
    } else {
        ArchiveOptions {
            exclude: filters.exclude.clone(),
            include: filters.include.clone(),
            vcs: filters.vcs,
        }
    };
    debug!("Resolved archive options for {}: {:?}", path.display(), opts);

    Ok((Archiver::new(VcsRegistry::builtin(), cfg.pipeline_settings()), opts))
}
