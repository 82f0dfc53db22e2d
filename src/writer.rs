//! Response writer contract, optional capabilities, and the logging
//! decorator.
//!
//! A [`ResponseWriter`] is the sink a handler writes its response into.
//! Some sinks can do more than write: flush buffered output, hand over
//! the raw connection, push resources, or report client disconnects.
//! Each of those is a narrow capability trait, discovered at call time
//! through a probe method with a `None` default, so no sink is forced to
//! support behavior it cannot provide.
//!
//! [`LogWriter`] is the access log decorator: it wraps the real sink,
//! records status and byte counts into a [`SharedRecord`] as they
//! happen, and forwards everything else. It always *offers* the optional
//! capabilities and degrades per capability when the wrapped sink turns
//! out not to support one, so wrapping never downgrades a capable sink
//! and never panics over an incapable one.

use std::io::{self, Read, Write};
use std::sync::mpsc;

use http::{HeaderMap, StatusCode};

use crate::core::{Error, Result};
use crate::record::SharedRecord;

/// Status recorded on the first body write when no explicit status was
/// set.
pub const DEFAULT_STATUS: u16 = 200;

/// Response sink contract every writer implements.
pub trait ResponseWriter {
    /// Write body bytes. May accept fewer bytes than offered; the
    /// returned count is authoritative.
    fn write(&mut self, buf: &[u8]) -> io::Result<usize>;

    /// Set the response status. Per HTTP semantics this should happen
    /// before any body write.
    fn set_status(&mut self, status: StatusCode);

    /// Probe for streaming flush support.
    fn as_flusher(&mut self) -> Option<&mut dyn Flusher> {
        None
    }

    /// Probe for connection takeover support.
    fn as_hijacker(&mut self) -> Option<&mut dyn Hijacker> {
        None
    }

    /// Probe for server push support.
    fn as_pusher(&mut self) -> Option<&mut dyn Pusher> {
        None
    }

    /// Probe for client-close notification support.
    fn as_close_notifier(&mut self) -> Option<&mut dyn CloseNotifier> {
        None
    }

    /// Probe for the annotation surface. Only writers that own a log
    /// record return `Some`.
    fn as_annotated(&self) -> Option<&dyn Annotate> {
        None
    }

    /// Unwrap one decorator layer. `None` for writers that wrap nothing.
    fn wrapped(&self) -> Option<&dyn ResponseWriter> {
        None
    }

    /// Mutable variant of [`ResponseWriter::wrapped`].
    fn wrapped_mut(&mut self) -> Option<&mut dyn ResponseWriter> {
        None
    }
}

/// Flush any buffered response bytes to the client.
pub trait Flusher {
    fn flush(&mut self) -> io::Result<()>;
}

/// Take over the underlying connection, detaching it from HTTP
/// processing.
pub trait Hijacker {
    fn hijack(&mut self) -> Result<HijackedConn>;
}

/// Initiate an HTTP/2 server push for `target`.
pub trait Pusher {
    fn push(&mut self, target: &str, headers: &HeaderMap) -> Result<()>;
}

/// Subscribe to a notification that fires when the client goes away.
pub trait CloseNotifier {
    fn close_notify(&mut self) -> CloseSignal;
}

/// Read/write access to the in-flight log record's annotations.
///
/// Takes `&self`: implementors back this with a [`SharedRecord`] (or
/// other interior-mutable storage), which keeps the probe usable from a
/// shared chain walk.
pub trait Annotate {
    /// Insert or overwrite an annotation on the in-flight record.
    fn set_annotation(&self, key: &str, value: &str);

    /// Look up an annotation. `None` when unset, never an error.
    fn annotation(&self, key: &str) -> Option<String>;
}

/// Raw bidirectional stream surrendered by a hijack.
pub trait Connection: Read + Write + Send {}

impl<T: Read + Write + Send> Connection for T {}

impl std::fmt::Debug for dyn Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Connection")
    }
}

/// Boxed connection returned by [`Hijacker::hijack`].
pub type HijackedConn = Box<dyn Connection>;

/// Receiver side of a client-close notification.
pub struct CloseSignal {
    rx: mpsc::Receiver<()>,
}

impl CloseSignal {
    /// Wrap a receiver a capable sink will signal on disconnect.
    pub fn new(rx: mpsc::Receiver<()>) -> Self {
        Self { rx }
    }

    /// A signal that can never fire: the sending side is dropped before
    /// the receiver is handed out. Used when the wrapped sink cannot
    /// observe disconnects.
    pub fn never() -> Self {
        let (_tx, rx) = mpsc::channel();
        Self { rx }
    }

    /// Block until the client goes away. Returns `false` when the sink
    /// cannot observe disconnects (the channel is dead).
    pub fn wait(&self) -> bool {
        self.rx.recv().is_ok()
    }

    /// Non-blocking poll for a close event.
    pub fn fired(&self) -> bool {
        self.rx.try_recv().is_ok()
    }
}

/// The access log decorator around the real response sink.
///
/// Owns nothing but a borrow of the wrapped sink and a handle to the
/// exchange's record; lives exactly as long as one dispatch.
pub struct LogWriter<'a> {
    inner: &'a mut dyn ResponseWriter,
    record: SharedRecord,
}

impl<'a> LogWriter<'a> {
    /// Wrap `inner`, recording into `record`.
    pub fn new(inner: &'a mut dyn ResponseWriter, record: SharedRecord) -> Self {
        Self { inner, record }
    }

    /// Handle to the record this writer populates.
    pub fn record(&self) -> &SharedRecord {
        &self.record
    }
}

impl ResponseWriter for LogWriter<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        // First body byte implies success if no status was set.
        self.record.default_status(DEFAULT_STATUS);

        let result = self.inner.write(buf);
        if let Ok(written) = result {
            self.record.add_response_size(written as u64);
        }
        // The wrapped sink's result is returned verbatim, partial writes
        // and errors included.
        result
    }

    fn set_status(&mut self, status: StatusCode) {
        self.record.set_status(status.as_u16());
        self.inner.set_status(status);
    }

    fn as_flusher(&mut self) -> Option<&mut dyn Flusher> {
        Some(self)
    }

    fn as_hijacker(&mut self) -> Option<&mut dyn Hijacker> {
        Some(self)
    }

    fn as_pusher(&mut self) -> Option<&mut dyn Pusher> {
        Some(self)
    }

    fn as_close_notifier(&mut self) -> Option<&mut dyn CloseNotifier> {
        Some(self)
    }

    fn as_annotated(&self) -> Option<&dyn Annotate> {
        Some(self)
    }

    fn wrapped(&self) -> Option<&dyn ResponseWriter> {
        Some(&*self.inner)
    }

    fn wrapped_mut(&mut self) -> Option<&mut dyn ResponseWriter> {
        Some(&mut *self.inner)
    }
}

impl Flusher for LogWriter<'_> {
    fn flush(&mut self) -> io::Result<()> {
        match self.inner.as_flusher() {
            Some(flusher) => flusher.flush(),
            None => Ok(()),
        }
    }
}

impl Hijacker for LogWriter<'_> {
    fn hijack(&mut self) -> Result<HijackedConn> {
        match self.inner.as_hijacker() {
            Some(hijacker) => hijacker.hijack(),
            None => Err(Error::Unsupported {
                capability: "hijack",
            }),
        }
    }
}

impl Pusher for LogWriter<'_> {
    fn push(&mut self, target: &str, headers: &HeaderMap) -> Result<()> {
        match self.inner.as_pusher() {
            Some(pusher) => pusher.push(target, headers),
            None => Err(Error::Unsupported { capability: "push" }),
        }
    }
}

impl CloseNotifier for LogWriter<'_> {
    fn close_notify(&mut self) -> CloseSignal {
        match self.inner.as_close_notifier() {
            Some(notifier) => notifier.close_notify(),
            None => CloseSignal::never(),
        }
    }
}

impl Annotate for LogWriter<'_> {
    fn set_annotation(&self, key: &str, value: &str) {
        self.record.set_annotation(key, value);
    }

    fn annotation(&self, key: &str) -> Option<String> {
        self.record.annotation(key)
    }
}
