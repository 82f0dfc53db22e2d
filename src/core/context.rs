//! Request context for one exchange.

use std::any::Any;
use std::cell::Cell;
use std::collections::HashMap;
use std::time::Instant;

/// HTTP protocol version as static string (no allocation).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HttpVersion(&'static str);

impl HttpVersion {
    pub const HTTP_09: Self = Self("HTTP/0.9");
    pub const HTTP_10: Self = Self("HTTP/1.0");
    pub const HTTP_11: Self = Self("HTTP/1.1");
    pub const HTTP_20: Self = Self("HTTP/2.0");
    pub const HTTP_30: Self = Self("HTTP/3.0");

    /// Get the version string.
    #[inline]
    pub const fn as_str(&self) -> &'static str {
        self.0
    }

    /// Create from http::Version.
    #[inline]
    pub fn from_http(version: http::Version) -> Self {
        match version {
            http::Version::HTTP_09 => Self::HTTP_09,
            http::Version::HTTP_10 => Self::HTTP_10,
            http::Version::HTTP_11 => Self::HTTP_11,
            http::Version::HTTP_2 => Self::HTTP_20,
            http::Version::HTTP_3 => Self::HTTP_30,
            _ => Self::HTTP_11, // fallback
        }
    }
}

impl std::fmt::Display for HttpVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.0)
    }
}

impl Default for HttpVersion {
    fn default() -> Self {
        Self::HTTP_11
    }
}

/// Request-scoped context threaded alongside the request.
///
/// One instance per exchange, never reused across exchanges. Carries a
/// short request id for log correlation, the exchange start time, and a
/// typed key/value bag middleware uses to communicate — the access log
/// dispatch handler publishes the active record handle here (see
/// [`crate::lookup::active_record`]).
pub struct Context {
    /// Short request ID for logging.
    pub request_id: String,

    /// Exchange start time.
    pub started_at: Instant,

    /// Custom key-value storage for middleware.
    values: HashMap<String, Box<dyn Any + Send + Sync>>,
}

impl Context {
    /// Create a new context with a generated request id.
    #[inline]
    pub fn new() -> Self {
        Self::with_request_id(generate_request_id())
    }

    /// Create a new context with an explicit request id.
    #[inline]
    pub fn with_request_id(request_id: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
            started_at: Instant::now(),
            values: HashMap::new(),
        }
    }

    /// Set a custom value.
    #[inline]
    pub fn set<T: Send + Sync + 'static>(&mut self, key: &str, value: T) {
        self.values.insert(key.to_string(), Box::new(value));
    }

    /// Get a custom value.
    #[inline]
    pub fn get<T: 'static>(&self, key: &str) -> Option<&T> {
        self.values.get(key).and_then(|v| v.downcast_ref())
    }

    /// Get a mutable reference to a custom value.
    #[inline]
    pub fn get_mut<T: 'static>(&mut self, key: &str) -> Option<&mut T> {
        self.values.get_mut(key).and_then(|v| v.downcast_mut())
    }

    /// Remove a custom value.
    #[inline]
    pub fn remove<T: 'static>(&mut self, key: &str) -> Option<T> {
        self.values
            .remove(key)
            .and_then(|v| v.downcast().ok())
            .map(|b| *b)
    }

    /// Get elapsed time since the exchange started.
    #[inline]
    pub fn elapsed(&self) -> std::time::Duration {
        self.started_at.elapsed()
    }

    /// Get elapsed time in milliseconds.
    #[inline]
    pub fn elapsed_ms(&self) -> f64 {
        self.elapsed().as_secs_f64() * 1000.0
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Fast random ID generation with thread-local state
// ============================================================================

thread_local! {
    static RNG_STATE: Cell<u64> = Cell::new(init_rng_seed());
}

/// Initialize RNG seed from system entropy.
fn init_rng_seed() -> u64 {
    use std::collections::hash_map::RandomState;
    use std::hash::{BuildHasher, Hasher};
    use std::time::{SystemTime, UNIX_EPOCH};

    let state = RandomState::new();
    let mut hasher = state.build_hasher();
    hasher.write_u64(
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos() as u64,
    );
    hasher.finish()
}

/// Fast random u64 using thread-local xorshift64.
#[inline]
fn rand_u64() -> u64 {
    RNG_STATE.with(|state| {
        let mut x = state.get();
        // xorshift64 algorithm
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        state.set(x);
        x
    })
}

/// Generate a random request ID (16 hex chars).
#[inline]
pub fn generate_request_id() -> String {
    use std::fmt::Write;

    let mut id = String::with_capacity(16);
    let _ = write!(id, "{:016x}", rand_u64());
    id
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_new() {
        let ctx = Context::new();
        assert_eq!(ctx.request_id.len(), 16);
    }

    #[test]
    fn test_context_explicit_id() {
        let ctx = Context::with_request_id("req-1");
        assert_eq!(ctx.request_id, "req-1");
    }

    #[test]
    fn test_context_custom_values() {
        let mut ctx = Context::new();

        ctx.set("counter", 42u32);
        ctx.set("name", "test".to_string());

        assert_eq!(ctx.get::<u32>("counter"), Some(&42));
        assert_eq!(ctx.get::<String>("name"), Some(&"test".to_string()));
        assert_eq!(ctx.get::<u32>("missing"), None);

        // Mutate
        if let Some(counter) = ctx.get_mut::<u32>("counter") {
            *counter += 1;
        }
        assert_eq!(ctx.get::<u32>("counter"), Some(&43));

        // Remove
        let removed = ctx.remove::<u32>("counter");
        assert_eq!(removed, Some(43));
        assert_eq!(ctx.get::<u32>("counter"), None);
    }

    #[test]
    fn test_wrong_type_lookup() {
        let mut ctx = Context::new();
        ctx.set("counter", 7u32);
        assert_eq!(ctx.get::<String>("counter"), None);
    }

    #[test]
    fn test_context_elapsed() {
        let ctx = Context::new();
        std::thread::sleep(std::time::Duration::from_millis(5));
        assert!(ctx.elapsed_ms() >= 5.0);
    }

    #[test]
    fn test_generate_request_id() {
        let id1 = generate_request_id();
        let id2 = generate_request_id();

        assert_eq!(id1.len(), 16);
        assert_eq!(id2.len(), 16);
        assert_ne!(id1, id2);
    }

    #[test]
    fn test_http_version() {
        assert_eq!(HttpVersion::HTTP_10.as_str(), "HTTP/1.0");
        assert_eq!(HttpVersion::HTTP_11.as_str(), "HTTP/1.1");
        assert_eq!(HttpVersion::HTTP_20.as_str(), "HTTP/2.0");

        assert_eq!(
            HttpVersion::from_http(http::Version::HTTP_11),
            HttpVersion::HTTP_11
        );
        assert_eq!(
            HttpVersion::from_http(http::Version::HTTP_2),
            HttpVersion::HTTP_20
        );

        assert_eq!(format!("{}", HttpVersion::HTTP_20), "HTTP/2.0");
        assert_eq!(HttpVersion::default(), HttpVersion::HTTP_11);
    }
}
