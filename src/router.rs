//! Frame Router (spec §4.7)
//!
//! Dispatches inbound SSE frames to stdout and outbound stdin frames to
//! the queue or the POST sender, depending on readiness. Implemented as
//! a second `impl Supervisor` block (the state machine in `supervisor.rs`
//! and the frame-dispatch rules here are one type, split by concern —
//! the same way `xbcsmith-xzatoma`'s `JsonRpcClient` keeps its
//! pending-map bookkeeping and its `dispatch_message` classification in
//! separate sections of one `impl`).

use serde_json::{json, Value};

use crate::classify::{classify, codes, is_request_timed_out_reason, ErrorKind};
use crate::frame_io::{gate_debug, gate_error, gate_warn};
use crate::sse::SseEvent;
use crate::supervisor::{build_error_frame, Supervisor, SupervisorState};

impl Supervisor {
    /// Handle one raw line read from stdin.
    pub async fn handle_outbound_line(&mut self, line: &str) {
        match serde_json::from_str::<Value>(line) {
            Ok(frame) => self.route_outbound_frame(frame).await,
            Err(e) => {
                gate_warn!("failed to parse stdin line as JSON: {e}");
                let frame = build_error_frame(None, codes::PARSE_ERROR, &format!("Parse error: {e}"));
                self.emit_frame(&frame).await;
            }
        }
    }

    async fn route_outbound_frame(&mut self, frame: Value) {
        let has_id = frame.get("id").is_some();
        if has_id {
            self.send_or_queue(frame).await;
            return;
        }

        let method = frame.get("method").and_then(Value::as_str);
        if method == Some("notifications/cancelled") {
            self.handle_cancelled_notification(&frame).await;
            return;
        }

        if self.state == SupervisorState::Ready {
            self.send_now(frame).await;
        } else {
            gate_debug!("dropping notification while not READY: {method:?}");
        }
    }

    async fn send_or_queue(&mut self, frame: Value) {
        if self.state != SupervisorState::Ready {
            self.queue.push(frame);
            if self.state == SupervisorState::Recovery {
                self.maybe_rearm_from_recovery().await;
            }
            return;
        }
        self.send_now(frame).await;
    }

    async fn handle_cancelled_notification(&mut self, frame: &Value) {
        if let Some(request_id) = frame.pointer("/params/requestId") {
            self.queue.remove_by_id(request_id);
        }
        if let Some(reason) = frame.pointer("/params/reason").and_then(Value::as_str) {
            if is_request_timed_out_reason(reason) {
                self.handle_error_kind(ErrorKind::Timeout, reason).await;
            }
        }
        if self.state == SupervisorState::Ready {
            self.send_now(frame.clone()).await;
        }
    }

    /// Handle one event dispatched from the active SSE subscription (or
    /// `None` if the channel closed without an explicit `Closed` event).
    pub async fn handle_sse_event(&mut self, event: Option<SseEvent>) {
        match event {
            None => self.on_sse_closed().await,
            Some(SseEvent::Open) => gate_debug!("SSE stream opened"),
            Some(SseEvent::Endpoint(raw)) => self.on_endpoint(&raw).await,
            Some(SseEvent::Message(text)) => self.on_message(&text).await,
            Some(SseEvent::Error { message, closed: _ }) => self.on_sse_error(&message).await,
            Some(SseEvent::Closed) => self.on_sse_closed().await,
            Some(SseEvent::Retry(ms)) => {
                gate_debug!("server suggested retry interval: {ms}ms");
                self.retry_hint = Some(std::time::Duration::from_millis(ms));
            }
        }
    }

    async fn on_endpoint(&mut self, raw: &str) {
        match self.config.url.join(raw) {
            Ok(url) => {
                self.session.set_endpoint_url(url);
                if self.state != SupervisorState::Ready {
                    self.enter_ready().await;
                }
            }
            Err(e) => gate_warn!("could not resolve endpoint url {raw:?}: {e}"),
        }
    }

    async fn on_message(&mut self, text: &str) {
        let frame: Value = match serde_json::from_str(text) {
            Ok(v) => v,
            Err(e) => {
                gate_warn!("dropping malformed SSE message: {e}");
                return;
            }
        };

        if let Some(error_obj) = frame.get("error") {
            let message = error_obj
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or_default();
            let id = frame.get("id").cloned();

            self.emit_frame(&frame).await;
            let cancelled = build_cancelled_derivative(id, &format!("Error: {message}"));
            self.emit_frame(&cancelled).await;

            if classify(message, None) == ErrorKind::SessionLost {
                self.handle_error_kind(ErrorKind::SessionLost, message).await;
            }
        } else {
            // Fallback readiness path (spec §4.6/§4.7): only a *non-error*
            // frame opportunistically promotes the supervisor to READY when
            // the server omits the explicit `endpoint` event.
            if self.state != SupervisorState::Ready {
                self.enter_ready().await;
            }
            self.emit_frame(&frame).await;
        }
    }

    async fn on_sse_error(&mut self, message: &str) {
        gate_error!("SSE error: {message}");
        let kind = classify(message, None);
        self.handle_error_kind(kind, message).await;
    }

    async fn on_sse_closed(&mut self) {
        if self.state == SupervisorState::Closing {
            return;
        }
        gate_warn!("SSE connection closed");
        self.handle_error_kind(ErrorKind::ConnectionLost, "SSE connection closed")
            .await;
    }
}

fn build_cancelled_derivative(request_id: Option<Value>, reason: &str) -> Value {
    json!({
        "jsonrpc": "2.0",
        "method": "notifications/cancelled",
        "params": {
            "requestId": request_id.unwrap_or(Value::Null),
            "reason": reason,
        }
    })
}
