//! # slipstream Error Types
//!
//! File: cli/src/core/error.rs
//!
//! ## Overview
//!
//! This module defines the error types used by the archive pipeline and the
//! command handlers. It separates errors a caller can see *before* streaming
//! starts (configuration problems, VCS listing failures) from errors that
//! happen *during* the walk (filesystem and encoding failures), which travel
//! through the archive's error signal instead of the return value.
//!
//! ## Architecture
//!
//! The error system consists of three pieces:
//! - `ArchiveError`: the taxonomy for the archive core, derived with `thiserror`
//! - `VcsError`: failures of a version-control listing command
//! - `Result<T>`: an alias for `anyhow::Result<T>` used by commands and config loading
//!
//! ## Examples
//!
//! ```rust
//! // Synchronous setup errors are returned directly
//! let stream = archiver.archive(&path, &opts)?;
//!
//! // Asynchronous errors arrive after the stream has been drained
//! match stream.finish() {
//!     Ok(summary) => println!("{} files", summary.files),
//!     Err(e) if e.is_configuration() => unreachable!(),
//!     Err(e) => return Err(e.into()),
//! }
//! ```
//!
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors produced while setting up or running an archive operation.
#[derive(Error, Debug)]
pub enum ArchiveError {
    /// Invalid combination of target and options, VCS requested but not
    /// detected, or an unparsable pattern.
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("VCS error: {0}")]
    Vcs(#[from] VcsError),

    #[error("Filesystem error at '{}': {source}", .path.display())]
    Filesystem {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Cannot encode '{}' into the archive: {reason}", .path.display())]
    Encoding { path: PathBuf, reason: String },

    #[error("Archive pipeline failed: {0}")]
    Pipeline(String),
}

impl ArchiveError {
    /// Shorthand for wrapping an I/O error with the path it concerns.
    pub fn fs(path: &Path, source: io::Error) -> Self {
        ArchiveError::Filesystem {
            path: path.to_path_buf(),
            source,
        }
    }

    /// True for errors that are reported before any stream exists.
    pub fn is_configuration(&self) -> bool {
        matches!(self, ArchiveError::Config(_) | ArchiveError::Vcs(_))
    }
}

/// Failures of an external version-control listing command.
#[derive(Error, Debug)]
pub enum VcsError {
    #[error("Error executing {command}: {source}")]
    Execution {
        command: String,
        #[source]
        source: io::Error,
    },

    #[error("External command failed: {command}, Status: {status}, Output:\n{stderr}")]
    Failed {
        command: String,
        status: String,
        stderr: String,
    },
}

/// Type alias for Result using anyhow::Error for command-level code.
pub type Result<T> = anyhow::Result<T>;
