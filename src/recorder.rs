//! In-memory response writer for tests and demos.

use std::io;

use http::StatusCode;

use crate::writer::{Flusher, ResponseWriter};

/// Buffering response writer: captures the status and body so a test can
/// assert on what a handler produced.
///
/// An optional per-call write limit makes the recorder accept fewer
/// bytes than offered, for exercising partial-write accounting.
pub struct Recorder {
    status: u16,
    body: Vec<u8>,
    flushes: usize,
    write_limit: Option<usize>,
}

impl Recorder {
    /// Recorder accepting every byte it is offered.
    pub fn new() -> Self {
        Self {
            status: 0,
            body: Vec::new(),
            flushes: 0,
            write_limit: None,
        }
    }

    /// Recorder accepting at most `limit` bytes per write call.
    pub fn with_write_limit(limit: usize) -> Self {
        Self {
            write_limit: Some(limit),
            ..Self::new()
        }
    }

    /// Explicitly set status, 0 when none was set.
    pub fn status(&self) -> u16 {
        self.status
    }

    /// Body bytes accepted so far.
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Number of flush calls that reached this recorder.
    pub fn flushes(&self) -> usize {
        self.flushes
    }
}

impl Default for Recorder {
    fn default() -> Self {
        Self::new()
    }
}

impl ResponseWriter for Recorder {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.write_limit.map_or(buf.len(), |l| buf.len().min(l));
        self.body.extend_from_slice(&buf[..n]);
        Ok(n)
    }

    fn set_status(&mut self, status: StatusCode) {
        self.status = status.as_u16();
    }

    fn as_flusher(&mut self) -> Option<&mut dyn Flusher> {
        Some(self)
    }
}

impl Flusher for Recorder {
    fn flush(&mut self) -> io::Result<()> {
        self.flushes += 1;
        Ok(())
    }
}
