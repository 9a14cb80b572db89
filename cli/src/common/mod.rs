//! # slipstream Common Utilities (`common`)
//!
//! File: cli/src/common/mod.rs
//!
//! ## Overview
//!
//! Shared building blocks used by the command handlers. Command-specific
//! logic lives in `commands::`, infrastructure (errors, config) in `core::`.
//!
//! ## Architecture
//!
//! - **`archive`**: The streaming archive pipeline: path filter, tar encoder,
//!   gzip sink, bounded pipe and the producer thread that ties them together.
//! - **`fs`**: Output sinks for finished archives.
//! - **`process`**: Running external commands and capturing their output.
//! - **`vcs`**: Version-control providers that list tracked files.
//!

/// Streaming `.tar.gz` creation.
pub mod archive;
/// Filesystem output helpers.
pub mod fs;
/// External command execution.
pub mod process;
/// Version-control detection and tracked-file listing.
pub mod vcs;
