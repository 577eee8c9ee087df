//! In-memory byte pipe between a rendering thread and a consumer.
//!
//! The writer half implements [`io::Write`]; every write becomes one chunk on
//! a bounded channel. Dropping the writer ends the stream. Closing it with an
//! error hands that error to the reader after all earlier chunks.

use std::io::{self, Write};
use std::sync::mpsc::{Receiver, SyncSender, sync_channel};

use crate::error::Error;

/// Chunks buffered before the writer blocks.
const PIPE_CAPACITY: usize = 16;

type Chunk = Result<Vec<u8>, Error>;

/// Create a connected writer/reader pair.
#[must_use]
pub fn pipe() -> (PipeWriter, PipeReader) {
    let (tx, rx) = sync_channel(PIPE_CAPACITY);
    (PipeWriter { tx }, PipeReader { rx })
}

/// Producer half.
#[derive(Debug)]
pub struct PipeWriter {
    tx: SyncSender<Chunk>,
}

impl PipeWriter {
    /// End the stream, passing `err` to the reader if there is one.
    pub fn close_with_error(self, err: Option<Error>) {
        if let Some(err) = err {
            // Reader already gone: nobody left to tell.
            let _ = self.tx.send(Err(err));
        }
    }
}

impl Write for PipeWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        self.tx
            .send(Ok(buf.to_vec()))
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "pipe reader closed"))?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Consumer half.
#[derive(Debug)]
pub struct PipeReader {
    rx: Receiver<Chunk>,
}

impl PipeReader {
    /// Next chunk, `Ok(None)` at end of stream, or the writer's error.
    pub fn next_chunk(&mut self) -> Result<Option<Vec<u8>>, Error> {
        match self.rx.recv() {
            Ok(Ok(chunk)) => Ok(Some(chunk)),
            Ok(Err(err)) => Err(err),
            Err(_) => Ok(None),
        }
    }
}
