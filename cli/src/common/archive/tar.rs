//! # slipstream Tar Encoder (`common::archive::tar`)
//!
//! File: cli/src/common/archive/tar.rs
//!
//! ## Overview
//!
//! Turns one filesystem node into one tar entry. The walker hands over an
//! `ArchiveEntry` (root-relative name, kind, metadata, on-disk location) and
//! `encode` writes the header followed by the content, if any, into a
//! `tar::Builder`.
//!
//! ## Architecture
//!
//! The module leverages the `tar` crate for header layout, GNU long-name
//! extensions and the end-of-archive marker (written when the builder is
//! finished by the producer).
//!
//! - **Regular files**: header, then the content copied verbatim. The copy is
//!   held to the size recorded in the header; a file that shrinks mid-copy is
//!   an error, and bytes appended mid-copy are ignored.
//! - **Directories**: header only, size zero.
//! - **Symlinks**: header carrying the link target. An unreadable target is
//!   recorded as empty rather than failing the archive.
//! - **Anything else** (sockets, FIFOs, devices): `ArchiveError::Encoding`.
//!
//! Each file handle is opened inside `encode` and dropped before it returns,
//! whether the copy succeeded or not.
//!
//! A read that fails after the header went out leaves the entry short. The
//! missing content is zero-filled up to the recorded size and block boundary
//! before the error is returned, so the tar stream stays well-formed and the
//! error reaches the caller through the archive's error signal.
//!
use crate::core::error::ArchiveError;
use std::fs::{self, File, Metadata};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, trace, warn};

/// Kind of node being archived.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Directory,
    Symlink,
}

/// A filesystem node on its way into the archive. Created by the walker,
/// consumed by `encode`, never stored.
#[derive(Debug)]
pub struct ArchiveEntry {
    /// Root-relative, `/`-separated name written into the header.
    pub relative_path: String,
    /// Where the node lives on disk.
    pub source: PathBuf,
    pub kind: EntryKind,
    pub symlink_target: Option<PathBuf>,
    pub metadata: Metadata,
}

impl ArchiveEntry {
    /// Classifies `source` using its (non-following) metadata.
    pub fn new(source: &Path, relative_path: String, metadata: Metadata) -> Result<Self, ArchiveError> {
        let file_type = metadata.file_type();
        let kind = if file_type.is_symlink() {
            EntryKind::Symlink
        } else if file_type.is_dir() {
            EntryKind::Directory
        } else if file_type.is_file() {
            EntryKind::File
        } else {
            return Err(ArchiveError::Encoding {
                path: source.to_path_buf(),
                reason: "unsupported file type (only files, directories and symlinks can be archived)"
                    .into(),
            });
        };

        let symlink_target = match kind {
            EntryKind::Symlink => Some(fs::read_link(source).unwrap_or_else(|e| {
                warn!(
                    "Cannot read link target of {}: {}; recording an empty target",
                    source.display(),
                    e
                );
                PathBuf::new()
            })),
            _ => None,
        };

        Ok(Self {
            relative_path,
            source: source.to_path_buf(),
            kind,
            symlink_target,
            metadata,
        })
    }

    /// Reads the metadata of `source` without following symlinks.
    #[cfg(test)]
    pub fn from_path(source: &Path, relative_path: String) -> Result<Self, ArchiveError> {
        let metadata = fs::symlink_metadata(source).map_err(|e| ArchiveError::fs(source, e))?;
        Self::new(source, relative_path, metadata)
    }

    /// Content size recorded in the header.
    pub fn size(&self) -> u64 {
        match self.kind {
            EntryKind::File => self.metadata.len(),
            _ => 0,
        }
    }
}

/// Writes `entry` into `builder` and returns the number of content bytes copied.
pub fn encode<W: Write>(entry: &ArchiveEntry, builder: &mut tar::Builder<W>) -> Result<u64, ArchiveError> {
    let mut header = tar::Header::new_gnu();
    header.set_metadata_in_mode(&entry.metadata, tar::HeaderMode::Complete);
    header.set_size(entry.size());

    let path = entry.relative_path.as_str();
    let fs_err = |e: io::Error| ArchiveError::fs(&entry.source, e);
    trace!("Encoding {:?} '{}' ({} bytes)", entry.kind, path, entry.size());

    match entry.kind {
        EntryKind::Directory => {
            header.set_entry_type(tar::EntryType::Directory);
            builder
                .append_data(&mut header, path, io::empty())
                .map_err(fs_err)?;
            Ok(0)
        }
        EntryKind::Symlink => {
            header.set_entry_type(tar::EntryType::Symlink);
            match entry.symlink_target.as_deref() {
                Some(target) if !target.as_os_str().is_empty() => builder
                    .append_link(&mut header, path, target)
                    .map_err(fs_err)?,
                // leave the link name blank
                _ => builder
                    .append_data(&mut header, path, io::empty())
                    .map_err(fs_err)?,
            }
            Ok(0)
        }
        EntryKind::File => {
            header.set_entry_type(tar::EntryType::Regular);
            let size = entry.size();
            let file = File::open(&entry.source).map_err(fs_err)?;
            append_content(builder, &mut header, path, file, size).map_err(fs_err)?;
            Ok(size)
        }
    }
}

const BLOCK_SIZE: u64 = 512;

/// Appends `size` bytes of `content` under `header`. If reading `content`
/// fails partway, the entry is padded with zeros before the error is returned.
fn append_content<W: Write, R: Read>(
    builder: &mut tar::Builder<W>,
    header: &mut tar::Header,
    path: &str,
    content: R,
    size: u64,
) -> io::Result<()> {
    let mut reader = ExactLen::new(content, size);
    let err = match builder.append_data(header, path, &mut reader) {
        Ok(()) => return Ok(()),
        Err(e) => e,
    };
    if reader.read_failed {
        let padding = reader.remaining + (BLOCK_SIZE - size % BLOCK_SIZE) % BLOCK_SIZE;
        if let Err(pad_err) = io::copy(&mut io::repeat(0).take(padding), builder.get_mut()) {
            debug!("Cannot pad truncated entry '{}': {}", path, pad_err);
        }
    }
    Err(err)
}

/// Yields exactly `len` bytes from `inner`, or fails if it runs out early.
struct ExactLen<R> {
    inner: io::Take<R>,
    remaining: u64,
    read_failed: bool,
}

impl<R: Read> ExactLen<R> {
    fn new(inner: R, len: u64) -> Self {
        Self {
            inner: inner.take(len),
            remaining: len,
            read_failed: false,
        }
    }
}

impl<R: Read> Read for ExactLen<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = match self.inner.read(buf) {
            Ok(n) => n,
            Err(e) => {
                self.read_failed = true;
                return Err(e);
            }
        };
        if n == 0 && self.remaining > 0 && !buf.is_empty() {
            self.read_failed = true;
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("file shrank while being archived ({} bytes missing)", self.remaining),
            ));
        }
        self.remaining -= n as u64;
        Ok(n)
    }
}
