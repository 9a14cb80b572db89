//! # slipstream Archive Walk (`common::archive::walk`)
//!
//! File: cli/src/common/archive/walk.rs
//!
//! Depth-first traversal of the archive target. Every node is run through
//! the `PathFilter`; included nodes are turned into `ArchiveEntry` values
//! and handed to a visitor (the tar encoder when packing, a printer when
//! listing). Pruned directories are never descended into.
//!
use super::filter::{Decision, PathFilter};
use super::tar::{ArchiveEntry, EntryKind};
use super::ArchiveSummary;
use crate::core::error::ArchiveError;
use std::fs;
use std::io;
use std::path::{Component, Path};
use tracing::{debug, trace};
use walkdir::WalkDir;

/// Walks the directory `root`, calling `visit` for each included node in
/// name order. Stops at the first error.
pub(crate) fn walk_dir<F>(root: &Path, filter: &PathFilter, mut visit: F) -> Result<ArchiveSummary, ArchiveError>
where
    F: FnMut(ArchiveEntry) -> Result<(), ArchiveError>,
{
    let mut summary = ArchiveSummary::default();
    let mut entries = WalkDir::new(root)
        .min_depth(1)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter();

    while let Some(next) = entries.next() {
        let dent = next.map_err(|e| walk_error(root, e))?;
        summary.visited += 1;

        let relative_path = relative_name(root, dent.path())?;
        let is_dir = dent.file_type().is_dir();

        match filter.decide(&relative_path, is_dir) {
            Decision::Include => {}
            Decision::SkipEntry => {
                trace!("Skipping '{}'", relative_path);
                summary.skipped += 1;
                continue;
            }
            Decision::SkipSubtree => {
                debug!("Pruning directory '{}'", relative_path);
                summary.skipped += 1;
                entries.skip_current_dir();
                continue;
            }
        }

        let metadata = dent.metadata().map_err(|e| walk_error(root, e))?;
        let entry = ArchiveEntry::new(dent.path(), relative_path, metadata)?;
        summary.record(&entry);
        visit(entry)?;
    }

    Ok(summary)
}

/// A single-file target becomes one entry named after the file. A symlinked
/// target is followed, so the entry carries the content it points at.
pub(crate) fn walk_file<F>(path: &Path, mut visit: F) -> Result<ArchiveSummary, ArchiveError>
where
    F: FnMut(ArchiveEntry) -> Result<(), ArchiveError>,
{
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| ArchiveError::Encoding {
            path: path.to_path_buf(),
            reason: "file name is missing or not valid UTF-8".into(),
        })?
        .to_string();
    let metadata = fs::metadata(path).map_err(|e| ArchiveError::fs(path, e))?;
    let entry = ArchiveEntry::new(path, name, metadata)?;
    let mut summary = ArchiveSummary {
        visited: 1,
        ..Default::default()
    };
    summary.record(&entry);
    visit(entry)?;
    Ok(summary)
}

/// Root-relative, `/`-separated name for `path`.
fn relative_name(root: &Path, path: &Path) -> Result<String, ArchiveError> {
    let relative = path.strip_prefix(root).map_err(|_| ArchiveError::Encoding {
        path: path.to_path_buf(),
        reason: format!("path is not below the archive root {}", root.display()),
    })?;
    let mut parts = Vec::new();
    for component in relative.components() {
        match component {
            Component::Normal(part) => parts.push(part.to_str().ok_or_else(|| ArchiveError::Encoding {
                path: path.to_path_buf(),
                reason: "path is not valid UTF-8".into(),
            })?),
            Component::CurDir => {}
            _ => {
                return Err(ArchiveError::Encoding {
                    path: path.to_path_buf(),
                    reason: "unexpected path component".into(),
                })
            }
        }
    }
    Ok(parts.join("/"))
}

fn walk_error(root: &Path, err: walkdir::Error) -> ArchiveError {
    let path = err.path().unwrap_or(root).to_path_buf();
    let message = err.to_string();
    let source = err
        .into_io_error()
        .unwrap_or_else(|| io::Error::new(io::ErrorKind::Other, message));
    ArchiveError::Filesystem { path, source }
}

impl ArchiveSummary {
    fn record(&mut self, entry: &ArchiveEntry) {
        match entry.kind {
            EntryKind::File => {
                self.files += 1;
                self.bytes_in += entry.size();
            }
            EntryKind::Directory => self.directories += 1,
            EntryKind::Symlink => self.symlinks += 1,
        }
    }
}
