//! Locating the in-flight log record from deep inside a handler stack.
//!
//! Inner handlers rarely hold the [`LogWriter`](crate::writer::LogWriter)
//! directly: middleware layered between the dispatch handler and the
//! innermost code may wrap the writer again, or the writer may not be in
//! scope at all. Two complementary retrieval strategies cover both
//! cases:
//!
//! 1. **Context-based** — the dispatch handler stores the exchange's
//!    [`SharedRecord`] in the request [`Context`]; any code with the
//!    context can retrieve it with [`active_record`].
//! 2. **Chain-walking** — code holding only an opaque
//!    `&dyn ResponseWriter` unwraps decorator layers one at a time with
//!    [`find_writer`] until a caller-supplied predicate matches.

use crate::core::Context;
use crate::record::SharedRecord;
use crate::writer::{Annotate, ResponseWriter};

/// Context key under which the dispatch handler publishes the active
/// record handle.
pub const RECORD_KEY: &str = "accesslog.record";

/// Store the active exchange's record handle in the context.
///
/// Called by the dispatch handler before dispatch; valid only for the
/// duration of the one exchange.
pub fn store_record(ctx: &mut Context, record: SharedRecord) {
    ctx.set(RECORD_KEY, record);
}

/// Retrieve the active exchange's record handle, if a logging dispatch
/// handler is upstream.
pub fn active_record(ctx: &Context) -> Option<SharedRecord> {
    ctx.get::<SharedRecord>(RECORD_KEY).cloned()
}

/// Walk a chain of nested writers, returning the first one matching
/// `predicate`.
///
/// Tests the current handle; on match returns it, otherwise unwraps one
/// layer via [`ResponseWriter::wrapped`] and repeats. `None` when the
/// chain ends without a match — an expected outcome, not an error.
pub fn find_writer<'a, F>(
    writer: &'a dyn ResponseWriter,
    predicate: F,
) -> Option<&'a dyn ResponseWriter>
where
    F: Fn(&dyn ResponseWriter) -> bool,
{
    fn walk<'a>(
        writer: &'a dyn ResponseWriter,
        predicate: &dyn Fn(&dyn ResponseWriter) -> bool,
    ) -> Option<&'a dyn ResponseWriter> {
        if predicate(writer) {
            Some(writer)
        } else {
            writer.wrapped().and_then(|inner| walk(inner, predicate))
        }
    }
    walk(writer, &predicate)
}

/// Mutable variant of [`find_writer`].
pub fn find_writer_mut<'a, F>(
    writer: &'a mut dyn ResponseWriter,
    predicate: F,
) -> Option<&'a mut dyn ResponseWriter>
where
    F: Fn(&dyn ResponseWriter) -> bool,
{
    fn walk<'a>(
        writer: &'a mut dyn ResponseWriter,
        predicate: &dyn Fn(&dyn ResponseWriter) -> bool,
    ) -> Option<&'a mut dyn ResponseWriter> {
        if predicate(&*writer) {
            Some(writer)
        } else {
            writer
                .wrapped_mut()
                .and_then(|inner| walk(inner, predicate))
        }
    }
    walk(writer, &predicate)
}

/// Walk to the first writer exposing the annotation surface.
///
/// The common case of [`find_writer`]: reach the in-flight record from
/// an arbitrarily wrapped writer handle.
pub fn annotations(writer: &dyn ResponseWriter) -> Option<&dyn Annotate> {
    find_writer(writer, |w| w.as_annotated().is_some()).and_then(|w| w.as_annotated())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::LogRecord;
    use crate::writer::LogWriter;
    use http::StatusCode;
    use std::io;

    struct EndSink;

    impl ResponseWriter for EndSink {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            Ok(buf.len())
        }

        fn set_status(&mut self, _status: StatusCode) {}
    }

    /// Unrelated middleware decorator: forwards everything, annotates
    /// nothing.
    struct PassThrough<'a> {
        inner: &'a mut dyn ResponseWriter,
    }

    impl ResponseWriter for PassThrough<'_> {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.inner.write(buf)
        }

        fn set_status(&mut self, status: StatusCode) {
            self.inner.set_status(status)
        }

        fn wrapped(&self) -> Option<&dyn ResponseWriter> {
            Some(&*self.inner)
        }

        fn wrapped_mut(&mut self) -> Option<&mut dyn ResponseWriter> {
            Some(&mut *self.inner)
        }
    }

    #[test]
    fn test_context_roundtrip() {
        let mut ctx = Context::new();
        assert!(active_record(&ctx).is_none());

        let record = SharedRecord::new(LogRecord::default());
        store_record(&mut ctx, record.clone());

        let found = active_record(&ctx).expect("record stored");
        found.set_annotation("x-user-id", "1");
        assert_eq!(record.annotation("x-user-id"), Some("1".to_string()));
    }

    #[test]
    fn test_find_through_nested_decorators() {
        let mut end = EndSink;
        let record = SharedRecord::new(LogRecord::default());
        let mut log_writer = LogWriter::new(&mut end, record.clone());
        let mut outer = PassThrough {
            inner: &mut log_writer,
        };
        let mut outermost = PassThrough { inner: &mut outer };

        // The annotation-capable writer sits two layers down.
        let annotate = annotations(&outermost).expect("log writer in chain");
        annotate.set_annotation("found", "yes");
        assert_eq!(record.annotation("found"), Some("yes".to_string()));

        // Mutable walk lands on the same layer.
        let found =
            find_writer_mut(&mut outermost, |w| w.as_annotated().is_some()).expect("match");
        found.write(b"ok").unwrap();
        assert_eq!(record.response_size(), 2);
    }

    #[test]
    fn test_predicate_matching_nothing() {
        let mut end = EndSink;
        let mut outer = PassThrough { inner: &mut end };

        assert!(find_writer(&outer, |w| w.as_annotated().is_some()).is_none());
        assert!(annotations(&outer).is_none());
        assert!(find_writer_mut(&mut outer, |_| false).is_none());
    }

    #[test]
    fn test_predicate_matching_head() {
        let mut end = EndSink;
        let outer = PassThrough { inner: &mut end };

        // A predicate true for the first handle returns it without
        // unwrapping.
        assert!(find_writer(&outer, |_| true).is_some());
    }
}
