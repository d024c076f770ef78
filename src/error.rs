//! Error types for mcpgate
//!
//! This module defines the crate-internal error type, using `thiserror`
//! for ergonomic `?`-based propagation through the frame I/O, SSE, and
//! sender layers.

use thiserror::Error;

/// Crate-internal error type.
///
/// This is distinct from the runtime error *taxonomy* in
/// [`crate::classify`], which classifies observed error strings and HTTP
/// statuses for reconnect/protocol decisions. `GateError` classifies
/// *where* a failure originated in the code.
#[derive(Error, Debug)]
pub enum GateError {
    /// I/O failure reading stdin or writing stdout.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization failure.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP transport failure (connection, TLS, timeout, non-2xx handled
    /// separately by callers who need the status code).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Malformed upstream URL.
    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),

    /// SSE stream ended or was malformed in a way that is not a plain
    /// network error (e.g. missing `endpoint` event data).
    #[error("SSE error: {0}")]
    Sse(String),

    /// The upstream POST endpoint returned a non-2xx status.
    #[error("HTTP status {status}: {body}")]
    HttpStatus {
        /// The response status code.
        status: u16,
        /// A short description or response snippet.
        body: String,
    },

    /// The send or connect attempt was cancelled by the supervisor.
    #[error("operation aborted")]
    Aborted,

    /// Catch-all for conditions that don't fit another variant.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Result alias used throughout the library modules.
pub type Result<T> = std::result::Result<T, GateError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_status_display() {
        let e = GateError::HttpStatus {
            status: 404,
            body: "not found".into(),
        };
        assert_eq!(e.to_string(), "HTTP status 404: not found");
    }

    #[test]
    fn aborted_display() {
        assert_eq!(GateError::Aborted.to_string(), "operation aborted");
    }

    #[test]
    fn io_from_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe closed");
        let e: GateError = io_err.into();
        assert!(e.to_string().contains("pipe closed"));
    }
}
