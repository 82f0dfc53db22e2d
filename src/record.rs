//! Per-exchange log record and its shared handle.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, SystemTime};

use http::HeaderMap;

/// Sentinel user name when the request carries no credentials.
pub const ABSENT_USERNAME: &str = "-";

/// Everything the access log knows about one request/response exchange.
///
/// Built by the dispatch handler before the inner handler runs, mutated
/// by the [`LogWriter`](crate::writer::LogWriter) decorator as the
/// response is written, finalized (time + elapsed) after the inner
/// handler returns, and delivered to the sink as a snapshot.
#[derive(Clone, Debug, Default)]
pub struct LogRecord {
    /// Wall-clock time of the exchange; start or finish depending on the
    /// dispatch mode. `None` until first stamped.
    pub time: Option<SystemTime>,
    /// Client IP, port already stripped.
    pub ip: String,
    /// HTTP method.
    pub method: String,
    /// Request URI as received.
    pub uri: String,
    /// Protocol version string, e.g. `"HTTP/1.1"`.
    pub protocol: String,
    /// User name from the request URI credentials, [`ABSENT_USERNAME`]
    /// when absent.
    pub username: String,
    /// Virtual host serving the request.
    pub host: String,
    /// Client agent string, empty when not sent.
    pub user_agent: String,
    /// Response status; 0 until a status is set or the first body byte
    /// is written.
    pub status: u16,
    /// Bytes the underlying sink accepted so far.
    pub response_size: u64,
    /// Declared request content length, `None` when unknown.
    pub request_size: Option<u64>,
    /// Time spent inside the inner handler.
    pub elapsed: Duration,
    /// Snapshot of the request headers.
    pub headers: HeaderMap,
    /// Caller-supplied annotations; allocated on first write.
    pub annotations: Option<HashMap<String, String>>,
}

impl LogRecord {
    /// Insert or overwrite an annotation, allocating the map on first use.
    pub fn set_annotation(&mut self, key: &str, value: &str) {
        self.annotations
            .get_or_insert_with(HashMap::new)
            .insert(key.to_string(), value.to_string());
    }

    /// Look up an annotation. `None` when the key is missing or the map
    /// was never created.
    pub fn annotation(&self, key: &str) -> Option<&str> {
        self.annotations
            .as_ref()
            .and_then(|m| m.get(key))
            .map(String::as_str)
    }

    /// Elapsed time in milliseconds.
    #[inline]
    pub fn elapsed_ms(&self) -> f64 {
        self.elapsed.as_secs_f64() * 1000.0
    }
}

/// Cheaply clonable handle to the record of one in-flight exchange.
///
/// The decorator and the request context both hold one; within an
/// exchange access is single-threaded, the mutex only exists to make the
/// aliasing sound. Must not be cached across exchanges.
#[derive(Clone)]
pub struct SharedRecord {
    inner: Arc<Mutex<LogRecord>>,
}

impl SharedRecord {
    /// Wrap a freshly built record.
    pub fn new(record: LogRecord) -> Self {
        Self {
            inner: Arc::new(Mutex::new(record)),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, LogRecord> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Deep copy of the current state, for sink delivery.
    pub fn snapshot(&self) -> LogRecord {
        self.lock().clone()
    }

    /// Run a closure over the current state.
    pub fn with<R>(&self, f: impl FnOnce(&LogRecord) -> R) -> R {
        f(&self.lock())
    }

    /// Current status code (0 until set).
    pub fn status(&self) -> u16 {
        self.lock().status
    }

    /// Record a status code. Last write wins.
    pub fn set_status(&self, status: u16) {
        self.lock().status = status;
    }

    /// Record `status` only if none was observed yet.
    pub fn default_status(&self, status: u16) {
        let mut record = self.lock();
        if record.status == 0 {
            record.status = status;
        }
    }

    /// Add bytes the underlying sink accepted.
    pub fn add_response_size(&self, n: u64) {
        self.lock().response_size += n;
    }

    /// Current response size.
    pub fn response_size(&self) -> u64 {
        self.lock().response_size
    }

    /// Insert or overwrite an annotation.
    pub fn set_annotation(&self, key: &str, value: &str) {
        self.lock().set_annotation(key, value);
    }

    /// Look up an annotation, cloned out of the record.
    pub fn annotation(&self, key: &str) -> Option<String> {
        self.lock().annotation(key).map(str::to_string)
    }

    /// Stamp the record's wall-clock time.
    pub fn set_time(&self, time: SystemTime) {
        self.lock().time = Some(time);
    }

    /// Finalize: stamp the finish time and the elapsed duration.
    pub fn finish(&self, time: SystemTime, elapsed: Duration) {
        let mut record = self.lock();
        record.time = Some(time);
        record.elapsed = elapsed;
    }
}
