//! # slipstream VCS Provider Registry (`common::vcs`)
//!
//! File: cli/src/common/vcs.rs
//!
//! ## Overview
//!
//! When `--vcs` is given, only files tracked by the version-control system
//! managing the archive root are archived. This module knows how to
//! recognise a VCS (by marker paths such as `.git`) and how to ask it for
//! the list of tracked files.
//!
//! ## Architecture
//!
//! - **`VcsProvider`**: capability trait, `detect(root)` + `tracked_files(root)`.
//!   Any implementation works: shelling out, linking a VCS library, or
//!   reading an index file directly.
//! - **`CommandProvider`**: a provider backed by an external listing command
//!   whose stdout is NUL-separated relative paths (`ls-files -z`, `files -0`),
//!   so names with quotes, backslashes or newlines come through verbatim.
//! - **`VcsRegistry`**: an ordered, immutable list of providers built once
//!   (`VcsRegistry::builtin()`) and handed to the archiver. Detection returns
//!   the first provider whose markers exist.
//!
//! Nothing is cached; the listing runs once per archive operation.
//!
use crate::common::process;
use crate::core::error::VcsError;
use std::fmt;
use std::path::Path;
use tracing::{debug, info};

/// A version-control system that can report which files it tracks.
pub trait VcsProvider: Send + Sync {
    /// Short name used in logs and error messages (e.g. "git").
    fn name(&self) -> &str;

    /// True if `root` looks like a working tree managed by this VCS.
    fn detect(&self, root: &Path) -> bool;

    /// Lists tracked paths relative to `root`, `/`-separated.
    fn tracked_files(&self, root: &Path) -> Result<Vec<String>, VcsError>;
}

/// A provider that runs an external command and reads NUL-separated paths.
#[derive(Debug, Clone)]
pub struct CommandProvider {
    name: &'static str,
    markers: &'static [&'static str],
    program: &'static str,
    args: &'static [&'static str],
}

impl CommandProvider {
    pub const fn new(
        name: &'static str,
        markers: &'static [&'static str],
        program: &'static str,
        args: &'static [&'static str],
    ) -> Self {
        Self {
            name,
            markers,
            program,
            args,
        }
    }

    /// Git: `.git` is a directory in normal clones and a file in worktrees
    /// and submodules, so only existence is checked.
    pub const fn git() -> Self {
        Self::new("git", &[".git"], "git", &["ls-files", "-z"])
    }

    pub const fn mercurial() -> Self {
        Self::new("hg", &[".hg"], "hg", &["files", "-0"])
    }
}

impl VcsProvider for CommandProvider {
    fn name(&self) -> &str {
        self.name
    }

    fn detect(&self, root: &Path) -> bool {
        self.markers.iter().any(|marker| root.join(marker).exists())
    }

    fn tracked_files(&self, root: &Path) -> Result<Vec<String>, VcsError> {
        let stdout = process::run_command_capture(self.program, self.args, root)?;
        Ok(parse_listing(&String::from_utf8_lossy(&stdout)))
    }
}

/// Splits NUL-separated listing output into paths. Names are taken as-is;
/// no unquoting or separator rewriting is applied.
pub fn parse_listing(output: &str) -> Vec<String> {
    output
        .split('\0')
        .filter(|path| !path.is_empty())
        .map(str::to_string)
        .collect()
}

/// Ordered set of providers consulted when VCS mode is requested.
pub struct VcsRegistry {
    providers: Vec<Box<dyn VcsProvider>>,
}

impl VcsRegistry {
    pub fn new(providers: Vec<Box<dyn VcsProvider>>) -> Self {
        Self { providers }
    }

    /// The providers slipstream knows about out of the box, in detection order.
    pub fn builtin() -> Self {
        Self::new(vec![
            Box::new(CommandProvider::git()),
            Box::new(CommandProvider::mercurial()),
        ])
    }

    /// Returns the first provider whose markers exist under `root`.
    pub fn detect(&self, root: &Path) -> Option<&dyn VcsProvider> {
        let found = self
            .providers
            .iter()
            .map(|provider| provider.as_ref())
            .find(|provider| provider.detect(root));
        match found {
            Some(provider) => info!("Detected {} working tree at {}", provider.name(), root.display()),
            None => debug!("No VCS detected at {}", root.display()),
        }
        found
    }

    pub fn names(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.name()).collect()
    }
}

impl Default for VcsRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl fmt::Debug for VcsRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VcsRegistry")
            .field("providers", &self.names())
            .finish()
    }
}
