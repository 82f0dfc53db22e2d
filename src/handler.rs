//! Dispatch handler: wraps an inner handler so every exchange produces a
//! log record.
//!
//! [`AccessLogHandler`] is the entry point. It builds the record from
//! the request, wraps the response writer in a
//! [`LogWriter`](crate::writer::LogWriter), dispatches, measures, and
//! delivers the record to the [`LogSink`]. Two modes:
//!
//! - [`Mode::Finalize`] — one emission, after the inner handler returns.
//! - [`Mode::Around`] — one emission before dispatch (annotation
//!   `at=before`, status and size still zero) and one after
//!   (`at=after`, final status/size, annotations merged).

use std::str::FromStr;
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime};

use crate::core::{Context, HttpVersion, Request};
use crate::lookup;
use crate::record::{LogRecord, SharedRecord, ABSENT_USERNAME};
use crate::writer::{LogWriter, ResponseWriter};

/// Annotation key distinguishing the two around-mode emissions.
const AT_KEY: &str = "at";

/// Request handler contract of the host framework.
pub trait Handler: Send + Sync {
    /// Handle one exchange, writing the response into `writer`.
    fn serve(&self, writer: &mut dyn ResponseWriter, req: &Request, ctx: &mut Context);
}

impl<H: Handler + ?Sized> Handler for Box<H> {
    fn serve(&self, writer: &mut dyn ResponseWriter, req: &Request, ctx: &mut Context) {
        (**self).serve(writer, req, ctx)
    }
}

impl<H: Handler + ?Sized> Handler for Arc<H> {
    fn serve(&self, writer: &mut dyn ResponseWriter, req: &Request, ctx: &mut Context) {
        (**self).serve(writer, req, ctx)
    }
}

/// Adapter turning a closure into a [`Handler`].
pub struct HandlerFn<F>(F);

impl<F> Handler for HandlerFn<F>
where
    F: Fn(&mut dyn ResponseWriter, &Request, &mut Context) + Send + Sync,
{
    fn serve(&self, writer: &mut dyn ResponseWriter, req: &Request, ctx: &mut Context) {
        (self.0)(writer, req, ctx)
    }
}

/// Wrap a closure as a [`Handler`].
pub fn handler_fn<F>(f: F) -> HandlerFn<F>
where
    F: Fn(&mut dyn ResponseWriter, &Request, &mut Context) + Send + Sync,
{
    HandlerFn(f)
}

/// Consumer of finished (or, in around mode, in-flight) log records.
///
/// Implementations must be thread-safe: many exchanges emit
/// concurrently. They receive a snapshot by value and own it; failures
/// are the sink's concern and are never surfaced to the dispatch
/// handler.
pub trait LogSink: Send + Sync {
    /// Accept one record snapshot.
    fn log(&self, record: LogRecord);

    /// Accept one record snapshot together with the exchange context.
    ///
    /// Sinks that want values the inner handler stored in the
    /// [`Context`] override this; the default delegates to
    /// [`LogSink::log`].
    fn log_with_context(&self, record: LogRecord, _ctx: &Context) {
        self.log(record)
    }
}

/// When records are emitted relative to dispatch.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Mode {
    /// Emit once, after the inner handler returns.
    #[default]
    Finalize,
    /// Emit before and after the inner handler runs.
    Around,
}

impl FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "finalize" => Ok(Mode::Finalize),
            "around" => Ok(Mode::Around),
            other => Err(format!("unknown access log mode: {}", other)),
        }
    }
}

/// The dispatch handler: wraps `inner` so every exchange is logged to
/// `sink`.
pub struct AccessLogHandler<H> {
    inner: H,
    sink: Arc<dyn LogSink>,
    mode: Mode,
}

impl<H: Handler> AccessLogHandler<H> {
    /// Finalize-only wrapping: one record per exchange.
    pub fn new(inner: H, sink: Arc<dyn LogSink>) -> Self {
        Self::with_mode(inner, sink, Mode::Finalize)
    }

    /// Around wrapping: a `before` and an `after` record per exchange.
    pub fn around(inner: H, sink: Arc<dyn LogSink>) -> Self {
        Self::with_mode(inner, sink, Mode::Around)
    }

    /// Explicit-mode constructor.
    pub fn with_mode(inner: H, sink: Arc<dyn LogSink>, mode: Mode) -> Self {
        Self { inner, sink, mode }
    }

    /// The configured emission mode.
    pub fn mode(&self) -> Mode {
        self.mode
    }
}

impl<H: Handler> Handler for AccessLogHandler<H> {
    fn serve(&self, writer: &mut dyn ResponseWriter, req: &Request, ctx: &mut Context) {
        let record = SharedRecord::new(start_record(req));
        lookup::store_record(ctx, record.clone());

        if self.mode == Mode::Around {
            record.set_time(SystemTime::now());
            record.set_annotation(AT_KEY, "before");
            self.sink.log_with_context(record.snapshot(), ctx);
        }

        let start = Instant::now();
        {
            let mut log_writer = LogWriter::new(writer, record.clone());
            self.inner.serve(&mut log_writer, req, ctx);
        }
        let elapsed = start.elapsed();

        record.finish(SystemTime::now(), elapsed);
        if self.mode == Mode::Around {
            record.set_annotation(AT_KEY, "after");
        }
        self.sink.log_with_context(record.snapshot(), ctx);
    }
}

/// Record state at the start of an exchange: request-derived fields set,
/// status/size/duration zero, time unset (stamped later per mode).
fn start_record(req: &Request) -> LogRecord {
    LogRecord {
        time: None,
        ip: req.remote_ip().to_string(),
        method: req.method().to_string(),
        uri: req.uri().to_string(),
        protocol: HttpVersion::from_http(req.version()).as_str().to_string(),
        username: req
            .username()
            .map_or_else(|| ABSENT_USERNAME.to_string(), str::to_string),
        host: req.host().to_string(),
        user_agent: req.user_agent().unwrap_or_default().to_string(),
        status: 0,
        response_size: 0,
        request_size: req.content_length(),
        elapsed: Duration::ZERO,
        headers: req.headers().clone(),
        annotations: None,
    }
}

/// Middleware factory: adapts any boxed handler into its finalize-mode
/// logged form, for chaining.
pub fn logging_middleware(
    sink: Arc<dyn LogSink>,
) -> impl Fn(Box<dyn Handler>) -> Box<dyn Handler> {
    move |inner| Box::new(AccessLogHandler::new(inner, Arc::clone(&sink)))
}

/// Middleware factory for around mode.
pub fn around_logging_middleware(
    sink: Arc<dyn LogSink>,
) -> impl Fn(Box<dyn Handler>) -> Box<dyn Handler> {
    move |inner| Box::new(AccessLogHandler::around(inner, Arc::clone(&sink)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recorder::Recorder;
    use bytes::Bytes;
    use http::{HeaderMap, Method};
    use std::sync::Mutex;

    struct MemorySink {
        records: Mutex<Vec<LogRecord>>,
    }

    impl MemorySink {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                records: Mutex::new(Vec::new()),
            })
        }

        fn records(&self) -> Vec<LogRecord> {
            self.records.lock().unwrap().clone()
        }
    }

    impl LogSink for MemorySink {
        fn log(&self, record: LogRecord) {
            self.records.lock().unwrap().push(record);
        }
    }

    fn request() -> Request {
        let mut headers = HeaderMap::new();
        headers.insert("host", "example.com".parse().unwrap());
        Request::new(Method::GET, "/".parse().unwrap(), headers, Bytes::new())
            .with_remote_addr("127.0.0.1:50000")
    }

    fn ok_handler() -> impl Handler {
        handler_fn(|w: &mut dyn ResponseWriter, _req: &Request, _ctx: &mut Context| {
            w.write(b"ok").unwrap();
        })
    }

    #[test]
    fn test_finalize_mode_emits_once() {
        let sink = MemorySink::new();
        let handler = AccessLogHandler::new(ok_handler(), sink.clone());

        let mut recorder = Recorder::new();
        let mut ctx = Context::new();
        handler.serve(&mut recorder, &request(), &mut ctx);

        let records = sink.records();
        assert_eq!(records.len(), 1);

        let record = &records[0];
        assert_eq!(record.method, "GET");
        assert_eq!(record.uri, "/");
        assert_eq!(record.protocol, "HTTP/1.1");
        assert_eq!(record.username, "-");
        assert_eq!(record.host, "example.com");
        assert_eq!(record.ip, "127.0.0.1");
        assert_eq!(record.status, 200);
        assert_eq!(record.response_size, 2);
        assert!(record.time.is_some());
        assert_eq!(recorder.body(), b"ok");
    }

    #[test]
    fn test_around_mode_emits_twice() {
        let sink = MemorySink::new();
        let handler = AccessLogHandler::around(
            handler_fn(|w: &mut dyn ResponseWriter, _req: &Request, _ctx: &mut Context| {
                if let Some(annotate) = crate::lookup::annotations(w) {
                    annotate.set_annotation("x-user-id", "1");
                }
                w.write(b"ok").unwrap();
            }),
            sink.clone(),
        );

        let mut recorder = Recorder::new();
        let mut ctx = Context::new();
        handler.serve(&mut recorder, &request(), &mut ctx);

        let records = sink.records();
        assert_eq!(records.len(), 2);

        let before = &records[0];
        assert_eq!(before.annotation(AT_KEY), Some("before"));
        assert_eq!(before.status, 0);
        assert_eq!(before.response_size, 0);
        assert!(before.time.is_some());

        let after = &records[1];
        assert_eq!(after.annotation(AT_KEY), Some("after"));
        assert_eq!(after.annotation("x-user-id"), Some("1"));
        assert_eq!(after.status, 200);
        assert_eq!(after.response_size, 2);
    }

    #[test]
    fn test_elapsed_non_negative_and_measured() {
        let sink = MemorySink::new();
        let handler = AccessLogHandler::new(
            handler_fn(|w: &mut dyn ResponseWriter, _req: &Request, _ctx: &mut Context| {
                std::thread::sleep(Duration::from_millis(5));
                w.write(b"slow").unwrap();
            }),
            sink.clone(),
        );

        let mut recorder = Recorder::new();
        let mut ctx = Context::new();
        handler.serve(&mut recorder, &request(), &mut ctx);

        let record = &sink.records()[0];
        assert!(record.elapsed >= Duration::from_millis(5));
    }

    #[test]
    fn test_request_size_from_content_length() {
        let sink = MemorySink::new();
        let handler = AccessLogHandler::new(ok_handler(), sink.clone());

        let mut headers = HeaderMap::new();
        headers.insert("content-length", "11".parse().unwrap());
        let req = Request::new(
            Method::POST,
            "/submit".parse().unwrap(),
            headers,
            Bytes::from_static(b"hello world"),
        );

        let mut recorder = Recorder::new();
        let mut ctx = Context::new();
        handler.serve(&mut recorder, &req, &mut ctx);

        let record = &sink.records()[0];
        assert_eq!(record.request_size, Some(11));
        assert_eq!(record.method, "POST");
    }

    #[test]
    fn test_no_write_leaves_status_zero() {
        let sink = MemorySink::new();
        let handler = AccessLogHandler::new(
            handler_fn(|_w: &mut dyn ResponseWriter, _req: &Request, _ctx: &mut Context| {}),
            sink.clone(),
        );

        let mut recorder = Recorder::new();
        let mut ctx = Context::new();
        handler.serve(&mut recorder, &request(), &mut ctx);

        assert_eq!(sink.records()[0].status, 0);
        assert_eq!(sink.records()[0].response_size, 0);
    }

    #[test]
    fn test_mode_from_str() {
        assert_eq!("finalize".parse::<Mode>().unwrap(), Mode::Finalize);
        assert_eq!("Around".parse::<Mode>().unwrap(), Mode::Around);
        assert!("sometimes".parse::<Mode>().is_err());
    }

    #[test]
    fn test_middleware_factory_composes() {
        let sink = MemorySink::new();
        let wrap = logging_middleware(sink.clone());

        let inner: Box<dyn Handler> = Box::new(ok_handler());
        let wrapped = wrap(inner);

        let mut recorder = Recorder::new();
        let mut ctx = Context::new();
        wrapped.serve(&mut recorder, &request(), &mut ctx);

        assert_eq!(sink.records().len(), 1);
    }
}
