//! Error Classifier (spec §4.5)
//!
//! Maps an error string and/or HTTP status to the bridge's internal error
//! taxonomy, and maps that taxonomy to the JSON-RPC error code to emit
//! (spec §7).

/// The bridge's internal error taxonomy (spec §4.5, §7).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The remote session is gone; reconnect and, after enough consecutive
    /// attempts, rotate the session id.
    SessionLost,
    /// The underlying connection dropped; reconnect with backoff.
    ConnectionLost,
    /// A request timed out; counted consecutively, escalates to
    /// `ConnectionLost` after 3 in a row.
    Timeout,
    /// JSON syntax error on either channel; emitted, no reconnect.
    Parse,
    /// Malformed JSON-RPC request; emitted, no reconnect.
    InvalidRequest,
    /// Any other sender failure; requeue to front and reconnect.
    Transient,
    /// Anything not otherwise classified.
    Internal,
}

/// JSON-RPC 2.0 standard and bridge-specific error codes (spec §4.5, §7).
pub mod codes {
    pub const PARSE_ERROR: i64 = -32700;
    pub const INVALID_REQUEST: i64 = -32600;
    pub const METHOD_NOT_FOUND: i64 = -32601;
    pub const INTERNAL_ERROR: i64 = -32603;
    /// Not a JSON-RPC standard code; the bridge's conventional code for a
    /// dropped/abandoned connection (spec §4.5 `ConnectionLost`).
    pub const CONNECTION_CLOSED: i64 = -32000;
    /// Not a JSON-RPC standard code; the bridge's conventional code for a
    /// request that timed out (spec §4.5 `Timeout`).
    pub const REQUEST_TIMEOUT: i64 = -32001;
}

/// Map `kind` to the JSON-RPC error code to emit (spec §4.5).
pub fn json_rpc_code(kind: ErrorKind) -> i64 {
    match kind {
        ErrorKind::SessionLost => codes::METHOD_NOT_FOUND,
        ErrorKind::Timeout => codes::REQUEST_TIMEOUT,
        ErrorKind::ConnectionLost => codes::CONNECTION_CLOSED,
        ErrorKind::Parse => codes::PARSE_ERROR,
        ErrorKind::InvalidRequest => codes::INVALID_REQUEST,
        ErrorKind::Transient | ErrorKind::Internal => codes::INTERNAL_ERROR,
    }
}

const SESSION_LOST_SUBSTRINGS: &[&str] = &[
    "Could not find session",
    "Session expired",
    "Invalid session",
    "Received request before initialization was complete",
];

const CONNECTION_LOST_SUBSTRINGS: &[&str] = &[
    "Connection lost",
    "fetch failed",
    "network error",
    "ECONNREFUSED",
    "Not connected",
];

const TIMEOUT_SUBSTRINGS: &[&str] = &["timed out", "timeout"];

const INVALID_REQUEST_SUBSTRINGS: &[&str] = &["invalid request"];

fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// Classify an error `message` and optional HTTP `status`, per the table
/// in spec §4.5. `Parse` is only ever returned by a caller that already
/// knows the failure was a JSON syntax error (see `classify_parse_error`)
/// since a bare message string can't always be distinguished from an
/// `InvalidRequest` otherwise.
pub fn classify(message: &str, status: Option<u16>) -> ErrorKind {
    if status == Some(404) || SESSION_LOST_SUBSTRINGS.iter().any(|s| message.contains(s)) {
        return ErrorKind::SessionLost;
    }
    if CONNECTION_LOST_SUBSTRINGS
        .iter()
        .any(|s| contains_ci(message, s))
    {
        return ErrorKind::ConnectionLost;
    }
    if TIMEOUT_SUBSTRINGS.iter().any(|s| contains_ci(message, s)) {
        return ErrorKind::Timeout;
    }
    if INVALID_REQUEST_SUBSTRINGS
        .iter()
        .any(|s| contains_ci(message, s))
    {
        return ErrorKind::InvalidRequest;
    }
    ErrorKind::Transient
}

/// Classify a cancellation notification's `reason` string for timeout
/// escalation (spec §4.5 `Timeout` row: "cancellation notifications whose
/// reason contains 'Request timed out'").
pub fn is_request_timed_out_reason(reason: &str) -> bool {
    contains_ci(reason, "Request timed out")
}
