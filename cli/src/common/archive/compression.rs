//! # slipstream Compression Sink (`common::archive::compression`)
//!
//! File: cli/src/common/archive/compression.rs
//!
//! ## Overview
//!
//! A gzip transform in front of a downstream writer. Bytes written to the
//! sink come out of the downstream writer compressed. The compressed stream
//! is only independently decodable after `close()` has written the gzip
//! trailer.
//!
//! ## Ordering
//!
//! `close()` must run before the downstream writer is closed, and any buffer
//! sitting between this sink and the pipe must be flushed *after* `close()`
//! returns. The archive producer follows exactly that order; skipping a step
//! yields a truncated stream.
//!
use flate2::write::GzEncoder;
use flate2::Compression;
use std::io::{self, Write};

/// Default gzip level (same as `gzip -6`).
pub const DEFAULT_LEVEL: u32 = 6;

/// Gzip-compressing writer with an explicit close step.
pub struct GzipSink<W: Write> {
    encoder: GzEncoder<W>,
}

impl<W: Write> GzipSink<W> {
    /// Wraps `inner`. `level` is clamped to the valid 0..=9 range.
    pub fn new(inner: W, level: u32) -> Self {
        Self {
            encoder: GzEncoder::new(inner, Compression::new(level.min(9))),
        }
    }

    /// Writes the gzip trailer and hands back the downstream writer.
    ///
    /// The downstream writer is *not* flushed; that is the caller's job.
    pub fn close(self) -> io::Result<W> {
        self.encoder.finish()
    }
}

impl<W: Write> Write for GzipSink<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.encoder.write(buf)
    }

    /// Sync-flushes compressed output downstream without ending the stream.
    fn flush(&mut self) -> io::Result<()> {
        self.encoder.flush()
    }
}
