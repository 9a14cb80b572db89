//! # slipstream Streaming Pipe (`common::archive::pipe`)
//!
//! File: cli/src/common/archive/pipe.rs
//!
//! ## Overview
//!
//! An in-memory handoff between the archive producer thread and whoever
//! reads the archive. Written bytes are cut into chunks and pushed through a
//! bounded `crossbeam-channel`; when the channel is full the writer blocks
//! until the reader catches up. That blocking is the only flow control: a
//! slow consumer throttles the walk, and memory stays capped at
//! `chunk_size * depth` no matter how big the archive gets.
//!
//! ## Architecture
//!
//! - **`ChunkWriter`** (`Write`): producer half. Closing it (or dropping it)
//!   ends the stream.
//! - **`ChunkReader`** (`Read`): consumer half. Returns `Ok(0)` once the
//!   writer is gone and every chunk has been read.
//!
//! If the reader is dropped first, the next write fails with
//! `ErrorKind::BrokenPipe`, which aborts the producer instead of leaving it
//! blocked forever.
//!
use crossbeam_channel::{Receiver, Sender};
use std::io::{self, Read, Write};

/// Default size of a single chunk pushed through the channel.
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;
/// Default number of chunks that may be in flight.
pub const DEFAULT_DEPTH: usize = 16;

/// Creates a connected writer/reader pair.
pub fn pipe(chunk_size: usize, depth: usize) -> (ChunkWriter, ChunkReader) {
    let (sender, receiver) = crossbeam_channel::bounded(depth);
    (
        ChunkWriter {
            sender,
            chunk_size: chunk_size.max(1),
        },
        ChunkReader {
            receiver,
            current: Vec::new(),
            pos: 0,
        },
    )
}

/// Producer half of the pipe.
#[derive(Debug)]
pub struct ChunkWriter {
    sender: Sender<Vec<u8>>,
    chunk_size: usize,
}

impl ChunkWriter {
    /// Ends the stream. Equivalent to dropping the writer, spelled out so the
    /// finalization sequence reads in order.
    pub fn close(self) {
        drop(self);
    }
}

impl Write for ChunkWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        let n = buf.len().min(self.chunk_size);
        self.sender
            .send(buf[..n].to_vec())
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "archive reader was dropped"))?;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Consumer half of the pipe.
#[derive(Debug)]
pub struct ChunkReader {
    receiver: Receiver<Vec<u8>>,
    current: Vec<u8>,
    pos: usize,
}

impl Read for ChunkReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        while self.pos == self.current.len() {
            match self.receiver.recv() {
                Ok(chunk) => {
                    self.current = chunk;
                    self.pos = 0;
                }
                // writer closed and channel drained
                Err(_) => return Ok(0),
            }
        }
        let n = buf.len().min(self.current.len() - self.pos);
        buf[..n].copy_from_slice(&self.current[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }
}
