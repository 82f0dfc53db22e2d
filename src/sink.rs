//! Bundled log sink implementations.
//!
//! [`TracingSink`] feeds records into the `tracing` pipeline under the
//! `"access"` target; [`JsonWriterSink`] serializes each record as one
//! JSON line to any writer. Anything else implements
//! [`LogSink`](crate::handler::LogSink) directly.

use std::collections::HashMap;
use std::io::Write;
use std::sync::{Mutex, PoisonError};

use serde::Serialize;

use crate::handler::LogSink;
use crate::logging::iso8601_utc;
use crate::record::LogRecord;

/// Emits each record as a `tracing` event, target `"access"`, level
/// INFO.
///
/// Pairs with [`crate::logging::init`], which renders `"access"` events
/// in the unified JSON shape; works under any subscriber.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingSink;

impl TracingSink {
    pub fn new() -> Self {
        Self
    }
}

impl LogSink for TracingSink {
    fn log(&self, record: LogRecord) {
        let annotations = record
            .annotations
            .as_ref()
            .map(|m| serde_json::to_string(m).unwrap_or_default());

        tracing::info!(
            target: "access",
            method = %record.method,
            uri = %record.uri,
            protocol = %record.protocol,
            status = record.status,
            bytes = record.response_size,
            request_bytes = record.request_size,
            duration_ms = record.elapsed_ms(),
            ip = %record.ip,
            host = %record.host,
            username = %record.username,
            user_agent = %record.user_agent,
            annotations = annotations.as_deref(),
            "{} {} {}",
            record.method,
            record.uri,
            record.status,
        );
    }
}

/// One serialized access entry; the unified log line shape.
#[derive(Serialize)]
struct AccessEntry<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    ts: Option<String>,
    level: &'static str,
    #[serde(rename = "type")]
    log_type: &'static str,
    msg: String,
    data: AccessData<'a>,
}

#[derive(Serialize)]
struct AccessData<'a> {
    method: &'a str,
    uri: &'a str,
    protocol: &'a str,
    status: u16,
    bytes: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    request_bytes: Option<u64>,
    duration_ms: f64,
    ip: &'a str,
    host: &'a str,
    username: &'a str,
    user_agent: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    annotations: Option<&'a HashMap<String, String>>,
}

impl<'a> AccessEntry<'a> {
    fn from_record(record: &'a LogRecord) -> Self {
        Self {
            ts: record.time.map(iso8601_utc),
            level: "info",
            log_type: "access",
            msg: format!("{} {} {}", record.method, record.uri, record.status),
            data: AccessData {
                method: &record.method,
                uri: &record.uri,
                protocol: &record.protocol,
                status: record.status,
                bytes: record.response_size,
                request_bytes: record.request_size,
                duration_ms: record.elapsed_ms(),
                ip: &record.ip,
                host: &record.host,
                username: &record.username,
                user_agent: &record.user_agent,
                annotations: record.annotations.as_ref(),
            },
        }
    }
}

/// Writes each record as one JSON object per line to the wrapped writer.
///
/// The writer sits behind a mutex because many exchanges emit
/// concurrently. Write failures stay the sink's concern and are
/// swallowed, matching the no-failure-path sink contract.
pub struct JsonWriterSink<W: Write + Send> {
    writer: Mutex<W>,
}

impl<W: Write + Send> JsonWriterSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    /// Consume the sink and hand back the wrapped writer.
    pub fn into_inner(self) -> W {
        self.writer
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl<W: Write + Send> LogSink for JsonWriterSink<W> {
    fn log(&self, record: LogRecord) {
        let entry = AccessEntry::from_record(&record);
        if let Ok(line) = serde_json::to_string(&entry) {
            let mut writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
            let _ = writeln!(writer, "{}", line);
        }
    }
}
