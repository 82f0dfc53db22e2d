//! Core error types.

use std::fmt;

/// Errors produced while driving a response writer.
#[derive(Debug)]
pub enum Error {
    /// The wrapped response writer does not provide an optional capability.
    Unsupported { capability: &'static str },

    /// I/O error from the underlying response sink, passed through verbatim.
    Io(std::io::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Unsupported { capability } => {
                write!(
                    f,
                    "response writer doesn't support the {} capability",
                    capability
                )
            }
            Error::Io(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e)
    }
}

/// Result type alias for writer operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsupported_display() {
        let err = Error::Unsupported {
            capability: "hijack",
        };
        assert_eq!(
            err.to_string(),
            "response writer doesn't support the hijack capability"
        );
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "peer went away");
        let err: Error = io_err.into();

        assert!(matches!(err, Error::Io(_)));
        assert!(err.to_string().contains("I/O error"));
    }

    #[test]
    fn test_io_source() {
        let err: Error = std::io::Error::new(std::io::ErrorKind::Other, "boom").into();
        assert!(std::error::Error::source(&err).is_some());

        let err = Error::Unsupported { capability: "push" };
        assert!(std::error::Error::source(&err).is_none());
    }
}
