//! Session identity and endpoint-URL tracking (spec §3 Session, §6).

use url::Url;
use uuid::Uuid;

/// Generate a fresh opaque session identifier (a canonical UUID string).
pub fn generate_session_id() -> String {
    Uuid::new_v4().to_string()
}

/// Tracks the bridge's session identity across reconnects.
///
/// `session_id` is the value currently attached to the SSE URL's
/// `session_id` query parameter; `original_session_id` is frozen at first
/// successful handshake and is never mutated afterward, per spec §3 and
/// §4.6's session-id policy.
#[derive(Debug, Clone)]
pub struct Session {
    session_id: String,
    original_session_id: Option<String>,
    endpoint_url: Option<Url>,
}

impl Session {
    /// Create a new session with a freshly generated id.
    pub fn new() -> Self {
        Self {
            session_id: generate_session_id(),
            original_session_id: None,
            endpoint_url: None,
        }
    }

    /// The session id currently in use.
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// The session id captured at first successful handshake, if any.
    pub fn original_session_id(&self) -> Option<&str> {
        self.original_session_id.as_deref()
    }

    /// The per-session POST endpoint URL, once known from the SSE
    /// `endpoint` event.
    pub fn endpoint_url(&self) -> Option<&Url> {
        self.endpoint_url.as_ref()
    }

    /// Record the endpoint URL delivered by the SSE `endpoint` event.
    pub fn set_endpoint_url(&mut self, url: Url) {
        self.endpoint_url = Some(url);
    }

    /// Clear the endpoint URL (on leaving READY, spec §4.6).
    pub fn clear_endpoint_url(&mut self) {
        self.endpoint_url = None;
    }

    /// Freeze `original_session_id` at first successful handshake. A no-op
    /// if already frozen.
    pub fn freeze_original(&mut self) {
        if self.original_session_id.is_none() {
            self.original_session_id = Some(self.session_id.clone());
        }
    }

    /// Reuse `original_session_id` for an early reconnect attempt (spec
    /// §4.6: first two reconnects after a drop).
    pub fn reuse_original(&mut self) {
        if let Some(ref original) = self.original_session_id {
            self.session_id = original.clone();
        }
    }

    /// Rotate to a freshly generated session id (spec §4.6: third
    /// reconnect attempt onward). `original_session_id` is untouched.
    pub fn rotate(&mut self) {
        self.session_id = generate_session_id();
    }

    /// Build the SSE subscription URL for `base`, attaching/replacing the
    /// `session_id` query parameter (spec §6).
    pub fn sse_url(&self, base: &Url) -> Url {
        let mut url = base.clone();
        url.query_pairs_mut()
            .clear()
            .extend_pairs(
                base.query_pairs()
                    .filter(|(k, _)| k != "session_id"),
            )
            .append_pair("session_id", &self.session_id);
        url
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_session_has_no_original_or_endpoint() {
        let session = Session::new();
        assert!(session.original_session_id().is_none());
        assert!(session.endpoint_url().is_none());
        assert!(!session.session_id().is_empty());
    }

    #[test]
    fn freeze_original_is_idempotent() {
        let mut session = Session::new();
        let first_id = session.session_id().to_string();
        session.freeze_original();
        session.rotate();
        session.freeze_original();
        assert_eq!(session.original_session_id(), Some(first_id.as_str()));
    }

    #[test]
    fn rotate_changes_session_id_but_not_original() {
        let mut session = Session::new();
        session.freeze_original();
        let original = session.original_session_id().unwrap().to_string();
        let before_rotate = session.session_id().to_string();
        session.rotate();
        assert_ne!(session.session_id(), before_rotate);
        assert_eq!(session.original_session_id(), Some(original.as_str()));
    }

    #[test]
    fn reuse_original_restores_frozen_id() {
        let mut session = Session::new();
        session.freeze_original();
        let original = session.original_session_id().unwrap().to_string();
        session.rotate();
        assert_ne!(session.session_id(), original);
        session.reuse_original();
        assert_eq!(session.session_id(), original);
    }

    #[test]
    fn sse_url_appends_session_id() {
        let session = Session::new();
        let base = Url::parse("https://example.com/sse").unwrap();
        let url = session.sse_url(&base);
        let pairs: Vec<_> = url.query_pairs().collect();
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].0, "session_id");
        assert_eq!(pairs[0].1, session.session_id());
    }

    #[test]
    fn sse_url_replaces_existing_session_id() {
        let mut session = Session::new();
        let base = Url::parse("https://example.com/sse?session_id=stale&foo=bar").unwrap();
        let first = session.sse_url(&base);
        session.rotate();
        let second = session.sse_url(&base);
        assert_ne!(first, second);
        assert!(second.query_pairs().any(|(k, v)| k == "foo" && v == "bar"));
        assert_eq!(
            second.query_pairs().filter(|(k, _)| k == "session_id").count(),
            1
        );
    }
}
