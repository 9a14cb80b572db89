//! # slipstream Output Sinks (`common::fs::io`)
//!
//! File: cli/src/common/fs/io.rs
//!
//! ## Overview
//!
//! Where a finished archive goes. `pack` writes either to stdout or to a
//! file; a file is written under a temporary `.partial` name and only moved
//! into place by `ArchiveOutput::commit`, so a failed or interrupted run never
//! leaves a truncated archive behind under the requested name.
//!
//! - **`ensure_dir_exists`**: `mkdir -p`, but refuses paths that exist as files.
//! - **`ArchiveOutput`**: stdout or a partial file, with `commit`/`discard`.
//!
use crate::core::error::Result;
use anyhow::Context;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Ensures that a directory exists at the specified path, creating parents.
///
/// # Errors
///
/// Returns an `Err` if the path exists but is not a directory, or if creating
/// it fails.
pub fn ensure_dir_exists(path: &Path) -> Result<()> {
    if !path.exists() {
        fs::create_dir_all(path).with_context(|| format!("Failed to create directory {}", path.display()))?;
        info!("Created directory: {}", path.display());
    } else if !path.is_dir() {
        anyhow::bail!("Path exists but is not a directory: {}", path.display());
    } else {
        debug!("Directory already exists: {}", path.display());
    }
    Ok(())
}

/// Destination of an archive.
pub enum ArchiveOutput {
    Stdout(io::Stdout),
    File {
        target: PathBuf,
        partial: PathBuf,
        writer: BufWriter<File>,
    },
}

impl ArchiveOutput {
    /// Opens `target`; `None` or `-` means stdout.
    pub fn open(target: Option<&Path>) -> Result<Self> {
        let target = match target {
            None => return Ok(Self::Stdout(io::stdout())),
            Some(p) if p.as_os_str() == "-" => return Ok(Self::Stdout(io::stdout())),
            Some(p) => p,
        };
        if target.is_dir() {
            anyhow::bail!("Output path is a directory: {}", target.display());
        }
        if let Some(parent) = target.parent().filter(|p| !p.as_os_str().is_empty()) {
            ensure_dir_exists(parent)?;
        }

        let partial = partial_path(target);
        let file = File::create(&partial)
            .with_context(|| format!("Failed to create output file {}", partial.display()))?;
        debug!("Writing archive to {}", partial.display());
        Ok(Self::File {
            target: target.to_path_buf(),
            partial,
            writer: BufWriter::new(file),
        })
    }

    /// Flushes and moves the archive into place.
    pub fn commit(self) -> Result<()> {
        match self {
            Self::Stdout(mut out) => out.flush().context("Failed to flush stdout"),
            Self::File {
                target,
                partial,
                writer,
            } => {
                let file = writer
                    .into_inner()
                    .map_err(|e| e.into_error())
                    .with_context(|| format!("Failed to write {}", partial.display()))?;
                file.sync_all()
                    .with_context(|| format!("Failed to sync {}", partial.display()))?;
                drop(file);
                fs::rename(&partial, &target)
                    .with_context(|| format!("Failed to move archive into place at {}", target.display()))?;
                info!("Wrote archive to {}", target.display());
                Ok(())
            }
        }
    }

    /// Drops whatever was written. For stdout that is nothing.
    pub fn discard(self) {
        if let Self::File { partial, writer, .. } = self {
            drop(writer);
            if let Err(e) = fs::remove_file(&partial) {
                warn!("Failed to remove partial archive {}: {}", partial.display(), e);
            }
        }
    }
}

impl Write for ArchiveOutput {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Self::Stdout(out) => out.write(buf),
            Self::File { writer, .. } => writer.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Self::Stdout(out) => out.flush(),
            Self::File { writer, .. } => writer.flush(),
        }
    }
}

fn partial_path(target: &Path) -> PathBuf {
    let mut name = target.file_name().unwrap_or_default().to_os_string();
    name.push(".partial");
    target.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_ensure_dir_exists_creates_new() -> Result<()> {
        let base_dir = tempdir()?;
        let new_dir = base_dir.path().join("new/subdir");
        assert!(!new_dir.exists());
        ensure_dir_exists(&new_dir)?;
        assert!(new_dir.is_dir());
        // second call is a no-op
        ensure_dir_exists(&new_dir)?;
        Ok(())
    }

    #[test]
    fn test_ensure_dir_exists_path_is_file() -> Result<()> {
        let base_dir = tempdir()?;
        let file_path = base_dir.path().join("a_file.txt");
        fs::write(&file_path, "hello")?;
        let result = ensure_dir_exists(&file_path);
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("Path exists but is not a directory"));
        Ok(())
    }

    #[test]
    fn test_output_commit_moves_file_into_place() -> Result<()> {
        let base_dir = tempdir()?;
        let target = base_dir.path().join("out/app.tar.gz");
        let mut output = ArchiveOutput::open(Some(&target))?;
        output.write_all(b"archive bytes")?;
        assert!(!target.exists());
        assert!(base_dir.path().join("out/app.tar.gz.partial").exists());
        output.commit()?;
        assert_eq!(fs::read(&target)?, b"archive bytes");
        assert!(!base_dir.path().join("out/app.tar.gz.partial").exists());
        Ok(())
    }

    #[test]
    fn test_output_discard_leaves_nothing() -> Result<()> {
        let base_dir = tempdir()?;
        let target = base_dir.path().join("app.tar.gz");
        let mut output = ArchiveOutput::open(Some(&target))?;
        output.write_all(b"half an archive")?;
        output.discard();
        assert_eq!(fs::read_dir(base_dir.path())?.count(), 0);
        Ok(())
    }

    #[test]
    fn test_output_rejects_directory() -> Result<()> {
        let base_dir = tempdir()?;
        assert!(ArchiveOutput::open(Some(base_dir.path())).is_err());
        Ok(())
    }

    #[test]
    fn test_dash_means_stdout() -> Result<()> {
        assert!(matches!(ArchiveOutput::open(Some(Path::new("-")))?, ArchiveOutput::Stdout(_)));
        assert!(matches!(ArchiveOutput::open(None)?, ArchiveOutput::Stdout(_)));
        Ok(())
    }
}
