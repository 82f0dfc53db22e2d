//! accesslog - HTTP access logging middleware.
//!
//! Wraps a request handler so every request/response exchange produces a
//! structured [`LogRecord`] — method, URI, status, byte counts, timing,
//! and caller-supplied annotations — without the wrapped handler knowing
//! anything about logging.
//!
//! # Features
//!
//! - **Response writer decoration**: status and byte counts are captured
//!   as a side effect of normal response writing
//! - **Capability pass-through**: flush, connection hijack, server push
//!   and close notification survive the wrapping when the underlying
//!   sink supports them, and degrade safely when it does not
//! - **Two emission modes**: one record after the exchange, or a
//!   before/after pair around it
//! - **Annotation lookup**: reach the in-flight record via the request
//!   context or by walking a chain of nested writer decorators
//! - **Pluggable sinks**: `tracing`-based and JSON-lines sinks bundled,
//!   one-method trait for everything else
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use accesslog::{handler_fn, AccessLogHandler, Context, Recorder, TracingSink};
//!
//! let handler = AccessLogHandler::new(
//!     handler_fn(|w, _req, _ctx| {
//!         w.write(b"ok").unwrap();
//!     }),
//!     Arc::new(TracingSink::new()),
//! );
//!
//! let mut writer = Recorder::new();
//! let mut ctx = Context::new();
//! handler.serve(&mut writer, &request, &mut ctx);
//! ```

/// Package version from Cargo.toml
pub const PKG_VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod config;
pub mod core;
pub mod handler;
pub mod logging;
pub mod lookup;
pub mod record;
pub mod recorder;
pub mod sink;
pub mod writer;

// Re-exports for convenience
pub use config::{AccessLogConfig, ConfigError, LoggingConfig};
pub use crate::core::{Context, Error, HttpVersion, Request, Result};
pub use handler::{
    around_logging_middleware, handler_fn, logging_middleware, AccessLogHandler, Handler,
    HandlerFn, LogSink, Mode,
};
pub use lookup::{active_record, annotations, find_writer, find_writer_mut, store_record};
pub use record::{LogRecord, SharedRecord, ABSENT_USERNAME};
pub use recorder::Recorder;
pub use sink::{JsonWriterSink, TracingSink};
pub use writer::{
    Annotate, CloseNotifier, CloseSignal, Connection, Flusher, HijackedConn, Hijacker, LogWriter,
    Pusher, ResponseWriter, DEFAULT_STATUS,
};
