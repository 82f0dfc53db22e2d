//! Core types shared by the access log pipeline.
//!
//! - [`Request`] - HTTP request abstraction
//! - [`Context`] - request-scoped context for middleware communication
//! - [`Error`] - writer error types
//!
//! # Example
//!
//! ```rust,ignore
//! use accesslog::core::{Context, Request};
//!
//! fn handle(req: &Request, ctx: &mut Context) {
//!     ctx.set("x-user-id", "1".to_string());
//! }
//! ```

mod context;
mod error;
mod request;

pub use context::{generate_request_id, Context, HttpVersion};
pub use error::{Error, Result};
pub use request::Request;
