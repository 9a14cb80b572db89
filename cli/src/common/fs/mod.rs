//! # slipstream Filesystem Utilities (`common::fs`)
//!
//! File: cli/src/common/fs/mod.rs
//!
//! Filesystem helpers used by the command handlers. Reading the archive
//! target itself is the job of `common::archive`; this module only deals with
//! where results are written.
//!

/// Output destinations for archives (stdout or an atomically placed file).
pub mod io;
