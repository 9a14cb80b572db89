//! # slipstream Archive Pipeline (`common::archive`)
//!
//! File: cli/src/common/archive/mod.rs
//!
//! ## Overview
//!
//! Packages a directory tree (or a single file) into a gzipped tarball that
//! is streamed to the caller *while* it is being built. Nothing close to the
//! full archive is ever held in memory: a background thread walks, encodes
//! and compresses, and only runs as fast as the caller reads.
//!
//! ## Architecture
//!
//! ```text
//!  walk ─▶ PathFilter ─▶ tar encoder ─▶ GzipSink ─▶ BufWriter ─▶ ChunkWriter ═▶ ChunkReader ─▶ caller
//!  └──────────────────────── producer thread ──────────────────────────────┘  (bounded channel)
//! ```
//!
//! - **`filter`**: include/exclude patterns and the VCS tracked-file list.
//! - **`tar`**: one filesystem node → one tar entry.
//! - **`compression`**: gzip sink with an explicit close.
//! - **`pipe`**: bounded chunk channel with `Write`/`Read` halves.
//! - **`walk`**: the depth-first traversal shared by `pack` and `list`.
//!
//! `Archiver::archive` validates everything that can be checked up front
//! (missing path, options on a file target, VCS detection and listing,
//! pattern syntax) and returns those failures directly. Once it returns an
//! `ArchiveStream`, later failures arrive on the stream's error signal,
//! *after* the data side has reached end-of-stream. End-of-stream alone
//! therefore never means success: call `ArchiveStream::finish` (or watch
//! `errors()`, which disconnects without a message once the producer has
//! exited cleanly) before trusting the bytes.
//!
//! Producer finalization always runs in this order: tar end-of-archive
//! marker, gzip trailer, buffer flush, pipe close, then the error (if any).
//!
//! ## Usage
//!
//! ```rust
//! use crate::common::archive::{ArchiveOptions, Archiver};
//! use std::io;
//! use std::path::Path;
//!
//! # fn run() -> anyhow::Result<()> {
//! let archiver = Archiver::default();
//! let mut stream = archiver.archive(Path::new("./app"), &ArchiveOptions::default())?;
//! io::copy(&mut stream, &mut io::sink())?;
//! let summary = stream.finish()?;
//! println!("archived {} files", summary.files);
//! # Ok(())
//! # }
//! ```
//!
pub mod compression;
pub mod filter;
pub mod pipe;
pub mod tar;
mod walk;

use crate::common::vcs::VcsRegistry;
use crate::core::error::ArchiveError;
use compression::GzipSink;
use crossbeam_channel::{Receiver, Sender};
use filter::{PathFilter, TrackedFiles};
use pipe::{ChunkReader, ChunkWriter};
use std::fs;
use std::io::{self, BufWriter, Read};
use std::path::{Path, PathBuf};
use std::thread::{self, JoinHandle};
use tracing::{debug, info, warn};

/// Default size of the buffer between the gzip sink and the pipe.
pub const DEFAULT_BUFFER_SIZE: usize = 4 * 1024 * 1024;

/// What to put in the archive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArchiveOptions {
    pub exclude: Vec<String>,
    pub include: Vec<String>,
    /// Restrict the archive to files tracked by the detected VCS.
    pub vcs: bool,
}

impl ArchiveOptions {
    /// Whether any option was given. Empty pattern lists do not count.
    pub fn is_set(&self) -> bool {
        !self.exclude.is_empty() || !self.include.is_empty() || self.vcs
    }
}

/// Tuning knobs for the producer/consumer pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineSettings {
    pub buffer_size: usize,
    pub chunk_size: usize,
    pub channel_depth: usize,
    pub compression_level: u32,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            buffer_size: DEFAULT_BUFFER_SIZE,
            chunk_size: pipe::DEFAULT_CHUNK_SIZE,
            channel_depth: pipe::DEFAULT_DEPTH,
            compression_level: compression::DEFAULT_LEVEL,
        }
    }
}

/// Counters reported once an archive run has completed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArchiveSummary {
    /// Filesystem nodes the walk looked at, pruned ones included.
    pub visited: u64,
    pub files: u64,
    pub directories: u64,
    pub symlinks: u64,
    /// Entries and subtrees left out by the filter.
    pub skipped: u64,
    /// Uncompressed file content bytes.
    pub bytes_in: u64,
}

#[derive(Debug)]
enum Target {
    Directory,
    File,
}

/// A validated archive request: target, kind, and the filter to apply.
#[derive(Debug)]
pub struct ArchivePlan {
    root: PathBuf,
    target: Target,
    filter: PathFilter,
}

impl ArchivePlan {
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Walks the target, handing every included entry to `visit`.
    pub fn walk<F>(&self, visit: F) -> Result<ArchiveSummary, ArchiveError>
    where
        F: FnMut(tar::ArchiveEntry) -> Result<(), ArchiveError>,
    {
        match self.target {
            Target::Directory => walk::walk_dir(&self.root, &self.filter, visit),
            Target::File => walk::walk_file(&self.root, visit),
        }
    }
}

/// Entry point of the archive core. Holds the VCS providers and pipeline
/// settings; cheap to keep around for the life of the process.
#[derive(Debug, Default)]
pub struct Archiver {
    registry: VcsRegistry,
    settings: PipelineSettings,
}

impl Archiver {
    pub fn new(registry: VcsRegistry, settings: PipelineSettings) -> Self {
        Self { registry, settings }
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    /// Runs every check that can fail before streaming starts.
    pub fn plan(&self, path: &Path, opts: &ArchiveOptions) -> Result<ArchivePlan, ArchiveError> {
        let metadata = fs::metadata(path).map_err(|e| ArchiveError::fs(path, e))?;

        if !metadata.is_dir() {
            if opts.is_set() {
                return Err(ArchiveError::Config(
                    "Options such as exclude, include, and VCS can't be set when the path is a file."
                        .into(),
                ));
            }
            if !metadata.is_file() {
                return Err(ArchiveError::Config(format!(
                    "'{}' is neither a regular file nor a directory",
                    path.display()
                )));
            }
            return Ok(ArchivePlan {
                root: path.to_path_buf(),
                target: Target::File,
                filter: PathFilter::default(),
            });
        }

        let tracked = if opts.vcs {
            let provider = self.registry.detect(path).ok_or_else(|| {
                ArchiveError::Config(format!(
                    "VCS mode requested but no supported VCS ({}) was detected at '{}'",
                    self.registry.names().join(", "),
                    path.display()
                ))
            })?;
            let tracked = TrackedFiles::new(provider.tracked_files(path)?);
            if tracked.is_empty() {
                warn!("{} reports no tracked files under {}", provider.name(), path.display());
            }
            info!("{} tracks {} files under {}", provider.name(), tracked.len(), path.display());
            Some(tracked)
        } else {
            None
        };

        let filter = PathFilter::new(&opts.include, &opts.exclude, tracked)?;
        if filter.is_empty() {
            debug!("No filters for {}, archiving everything", path.display());
        } else {
            debug!("Archive filter for {}: {:?}", path.display(), filter);
        }

        Ok(ArchivePlan {
            root: path.to_path_buf(),
            target: Target::Directory,
            filter,
        })
    }

    /// Starts archiving `path` and returns the stream of compressed bytes.
    ///
    /// # Errors
    ///
    /// Only setup failures are returned here (see [`Archiver::plan`]); failures
    /// during the walk are reported through the returned stream.
    pub fn archive(&self, path: &Path, opts: &ArchiveOptions) -> Result<ArchiveStream, ArchiveError> {
        let plan = self.plan(path, opts)?;
        ArchiveStream::spawn(plan, self.settings)
    }
}

/// The read side of a running archive operation.
///
/// Read it to end-of-stream, then call [`ArchiveStream::finish`]. Dropping it
/// early aborts the producer.
#[derive(Debug)]
pub struct ArchiveStream {
    reader: ChunkReader,
    errors: Receiver<ArchiveError>,
    worker: JoinHandle<Option<ArchiveSummary>>,
}

impl ArchiveStream {
    fn spawn(plan: ArchivePlan, settings: PipelineSettings) -> Result<Self, ArchiveError> {
        let (writer, reader) = pipe::pipe(settings.chunk_size, settings.channel_depth);
        let (error_tx, errors) = crossbeam_channel::bounded(1);
        info!("Archiving {}", plan.root().display());

        let worker = thread::Builder::new()
            .name("slipstream-archive".into())
            .spawn(move || produce(plan, settings, writer, error_tx))
            .map_err(|e| ArchiveError::Pipeline(format!("cannot start archive thread: {}", e)))?;

        Ok(Self {
            reader,
            errors,
            worker,
        })
    }

    /// Error signal. Holds at most one error, posted after the data side has
    /// been closed. Disconnects without a message when the producer exits
    /// cleanly, so a blocking `recv()` after end-of-stream always returns.
    pub fn errors(&self) -> &Receiver<ArchiveError> {
        &self.errors
    }

    /// Waits for the producer and returns its final status.
    ///
    /// Call this after reading to end-of-stream. Unread data is discarded by
    /// closing the read side, which makes the producer fail.
    pub fn finish(self) -> Result<ArchiveSummary, ArchiveError> {
        let ArchiveStream {
            reader,
            errors,
            worker,
        } = self;
        drop(reader);

        let summary = worker
            .join()
            .map_err(|_| ArchiveError::Pipeline("archive thread panicked".into()))?;
        if let Ok(err) = errors.try_recv() {
            return Err(err);
        }
        summary.ok_or_else(|| ArchiveError::Pipeline("archive thread stopped without a status".into()))
    }
}

impl Read for ArchiveStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.reader.read(buf)
    }
}

type Encoder = ::tar::Builder<GzipSink<BufWriter<ChunkWriter>>>;

/// Producer thread body: walk + encode, finalize, then report.
fn produce(
    plan: ArchivePlan,
    settings: PipelineSettings,
    writer: ChunkWriter,
    errors: Sender<ArchiveError>,
) -> Option<ArchiveSummary> {
    let buffered = BufWriter::with_capacity(settings.buffer_size, writer);
    let mut builder: Encoder = ::tar::Builder::new(GzipSink::new(buffered, settings.compression_level));

    let walked = plan.walk(|entry| tar::encode(&entry, &mut builder).map(|_| ()));
    let finalized = finalize(builder);

    let outcome = match (walked, finalized) {
        (Ok(summary), Ok(())) => Ok(summary),
        (Ok(_), Err(e)) => Err(e),
        (Err(e), finalized) => {
            if let Err(fe) = finalized {
                debug!("Finalization after a failed walk also failed: {}", fe);
            }
            Err(e)
        }
    };

    match outcome {
        Ok(summary) => {
            info!(
                "Archived {}: {} files, {} directories, {} symlinks, {} bytes",
                plan.root().display(),
                summary.files,
                summary.directories,
                summary.symlinks,
                summary.bytes_in
            );
            Some(summary)
        }
        Err(e) => {
            warn!("Archiving {} failed: {}", plan.root().display(), e);
            // capacity one, only this thread sends
            let _ = errors.try_send(e);
            None
        }
    }
}

/// End-of-archive marker, gzip trailer, buffer flush, pipe close.
fn finalize(builder: Encoder) -> Result<(), ArchiveError> {
    let stage = |what: &str, e: io::Error| ArchiveError::Pipeline(format!("{}: {}", what, e));

    let sink = builder
        .into_inner()
        .map_err(|e| stage("writing end-of-archive marker", e))?;
    let buffered = sink.close().map_err(|e| stage("finishing gzip stream", e))?;
    let writer = buffered
        .into_inner()
        .map_err(|e| stage("flushing archive buffer", e.into_error()))?;
    writer.close();
    Ok(())
}
