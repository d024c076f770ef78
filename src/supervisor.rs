//! Session/Reconnect Supervisor (spec §4.6)
//!
//! The core of the bridge: owns the session identity, the pending-frame
//! queue, and the current SSE subscription, and drives the state machine
//! that keeps the bridge READY whenever possible.
//!
//! The explicit state enum and transition table below replace the
//! "callback graph with module-scope flags" shape a straight port would
//! produce; see `xbcsmith-xzatoma`'s `JsonRpcClient` pending-request map
//! for the channel-based ownership pattern this borrows (one task owns
//! all mutable state, everything else is a message into it), and `rmcp`'s
//! `SseClientWorker::run` for the `tokio::select!` loop shape.

use std::time::{Duration, Instant};

use reqwest::Client;
use serde_json::{json, Value};
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;

use crate::classify::{classify, codes, json_rpc_code, ErrorKind};
use crate::config::Config;
use crate::error::GateError;
use crate::frame_io::{gate_debug, gate_error, gate_info, gate_warn, FrameWriter, LineReader};
use crate::queue::MessageQueue;
use crate::sender::PostSender;
use crate::session::Session;
use crate::sse::{SseConnection, SseEvent};

/// The bridge's connection lifecycle state (spec §3 `SupervisorState`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupervisorState {
    Init,
    Connecting,
    Ready,
    Backoff,
    Recovery,
    Closing,
}

/// Owns every piece of mutable bridge state and drives it from a single
/// event loop (spec §5: one task mutates queue/supervisor/session fields).
pub struct Supervisor {
    pub(crate) config: Config,
    pub(crate) session: Session,
    pub(crate) queue: MessageQueue,
    pub(crate) client: Client,
    pub(crate) writer: FrameWriter,
    pub(crate) sender: PostSender,
    pub(crate) sse: Option<SseConnection>,
    pub(crate) state: SupervisorState,
    pub(crate) reconnect_attempts: u32,
    pub(crate) consecutive_timeouts: u32,
    pub(crate) last_reconnect_attempt_at: Option<Instant>,
    pub(crate) backoff_deadline: Option<Instant>,
    /// Lowest reconnect delay suggested by the server's SSE `retry:`
    /// field so far (spec_full.md §B "idle keep-alive tolerance"); only
    /// ever lowers the computed backoff, never raises it.
    pub(crate) retry_hint: Option<Duration>,
    pub(crate) frames_outbound: u64,
    pub(crate) frames_inbound: u64,
    pub(crate) conn_cancel: CancellationToken,
}

impl Supervisor {
    pub fn new(config: Config, client: Client, writer: FrameWriter) -> Self {
        Self {
            sender: PostSender::new(client.clone()),
            config,
            session: Session::new(),
            queue: MessageQueue::new(),
            client,
            writer,
            sse: None,
            state: SupervisorState::Init,
            reconnect_attempts: 0,
            consecutive_timeouts: 0,
            last_reconnect_attempt_at: None,
            backoff_deadline: None,
            retry_hint: None,
            frames_outbound: 0,
            frames_inbound: 0,
            conn_cancel: CancellationToken::new(),
        }
    }

    pub fn state(&self) -> SupervisorState {
        self.state
    }

    /// Drive the bridge until shutdown is requested and the graceful
    /// close sequence completes.
    pub async fn run(mut self, mut stdin: LineReader, mut shutdown_rx: oneshot::Receiver<()>) {
        self.connect().await;

        loop {
            if self.state == SupervisorState::Closing {
                break;
            }

            let deadline = self.backoff_deadline;

            tokio::select! {
                biased;

                _ = &mut shutdown_rx => {
                    self.begin_shutdown().await;
                }

                line = stdin.next_line() => {
                    match line {
                        Ok(Some(text)) => self.handle_outbound_line(&text).await,
                        Ok(None) => {
                            gate_info!("stdin closed, shutting down");
                            self.begin_shutdown().await;
                        }
                        Err(e) => gate_error!("stdin read error: {e}"),
                    }
                }

                event = recv_sse(&mut self.sse) => {
                    self.handle_sse_event(event).await;
                }

                _ = sleep_until(deadline), if self.state == SupervisorState::Backoff => {
                    self.connect().await;
                }
            }
        }
    }

    /// Open a new SSE subscription, applying the session-id policy for
    /// the current attempt count (spec §4.6 "Session-id policy").
    pub(crate) async fn connect(&mut self) {
        self.state = SupervisorState::Connecting;
        self.last_reconnect_attempt_at = Some(Instant::now());
        self.backoff_deadline = None;

        if self.reconnect_attempts > 0 {
            if self.reconnect_attempts <= 2 {
                self.session.reuse_original();
            } else {
                self.session.rotate();
            }
        }

        self.conn_cancel = CancellationToken::new();
        let sse_url = self.session.sse_url(&self.config.url);
        gate_debug!("connecting to {sse_url} (attempt {})", self.reconnect_attempts);

        match SseConnection::connect(&self.client, sse_url).await {
            Ok(conn) => {
                self.sse = Some(conn);
            }
            Err(e) => {
                gate_warn!("connect failed: {e}");
                self.schedule_reconnect(&e.to_string()).await;
            }
        }
    }

    /// Enter READY: reset counters, freeze the original session id, and
    /// drain the queue in FIFO order (spec §4.6 `CONNECTING → READY`).
    pub(crate) async fn enter_ready(&mut self) {
        gate_info!("session ready (session_id={})", self.session.session_id());
        self.state = SupervisorState::Ready;
        self.reconnect_attempts = 0;
        self.consecutive_timeouts = 0;
        self.session.freeze_original();
        self.drain_queue().await;
    }

    /// Drain the queue while READY. Stops (without consuming anything) if
    /// the endpoint URL isn't known yet: the fallback readiness path
    /// (spec §4.6/§4.7) can enter READY from a well-formed server frame
    /// before the `endpoint` event arrives, and `send_now` has nowhere to
    /// send to yet — looping here would just pop and re-push the same
    /// front frame forever.
    async fn drain_queue(&mut self) {
        while self.state == SupervisorState::Ready && self.session.endpoint_url().is_some() {
            let Some(frame) = self.queue.pop_front() else {
                break;
            };
            self.send_now(frame).await;
        }
    }

    /// Leave READY, idempotently. Emits one advisory error frame on the
    /// actual transition (never on a state that was already not-READY),
    /// matching "one advisory per transition, not per retry" (spec §7).
    pub(crate) async fn leave_ready(&mut self, cause: &str, code: i64) {
        if self.state != SupervisorState::Ready {
            return;
        }
        gate_warn!("leaving READY: {cause}");
        self.session.clear_endpoint_url();
        if let Some(sse) = self.sse.take() {
            sse.stop();
        }
        self.conn_cancel.cancel();
        self.queue.promote_initialize();
        self.state = SupervisorState::Backoff;

        let frame = build_error_frame(None, code, cause);
        let _ = self.writer.emit(&frame).await;
    }

    /// Central gate for every error kind that can move the bridge out of
    /// READY (spec §4.5's policy column). `Parse`/`InvalidRequest` are
    /// handled by the router directly and never reach here.
    pub(crate) async fn handle_error_kind(&mut self, kind: ErrorKind, message: &str) {
        match kind {
            ErrorKind::SessionLost | ErrorKind::ConnectionLost | ErrorKind::Transient => {
                self.leave_ready(message, json_rpc_code(kind)).await;
                self.schedule_reconnect(message).await;
            }
            ErrorKind::Timeout => {
                self.consecutive_timeouts += 1;
                if self.consecutive_timeouts >= 3 {
                    self.consecutive_timeouts = 0;
                    self.leave_ready(message, codes::CONNECTION_CLOSED).await;
                    self.schedule_reconnect(message).await;
                }
            }
            ErrorKind::Parse | ErrorKind::InvalidRequest | ErrorKind::Internal => {}
        }
    }

    /// Either schedule the next backoff (incrementing the attempt counter
    /// first so the scheduled delay's `k` matches the attempt it is for)
    /// or, once `max_reconnect_attempts` attempts have already been made,
    /// enter RECOVERY. Testing the count before incrementing (rather than
    /// after) ensures all `k = 1..=M` backoff delays in spec §8 P8 are
    /// actually scheduled, and RECOVERY is only entered after `M` real
    /// reconnect attempts have failed, per P9.
    pub(crate) async fn schedule_reconnect(&mut self, cause: &str) {
        if self.state == SupervisorState::Closing {
            return;
        }
        if self.reconnect_attempts >= self.config.max_reconnect_attempts {
            self.enter_recovery(cause).await;
            return;
        }
        self.reconnect_attempts += 1;
        self.enter_backoff();
    }

    fn enter_backoff(&mut self) {
        self.state = SupervisorState::Backoff;
        let k = self.reconnect_attempts;
        let base = self.config.base_delay.as_millis() as f64;
        let cap = self.config.max_delay.as_millis() as f64;
        let mut delay_ms = (base * 1.5f64.powi(k as i32 - 1)).min(cap) as u64;
        if let Some(hint) = self.retry_hint {
            delay_ms = delay_ms.min(hint.as_millis() as u64);
        }
        self.backoff_deadline = Some(Instant::now() + Duration::from_millis(delay_ms));
        gate_warn!("reconnect attempt {k} scheduled in {delay_ms}ms");
    }

    async fn enter_recovery(&mut self, cause: &str) {
        gate_error!("giving up after {} attempts: {cause}", self.config.max_reconnect_attempts);
        self.state = SupervisorState::Recovery;
        self.backoff_deadline = None;
        let message = format!(
            "Failed to reconnect after {} attempts: {cause}",
            self.config.max_reconnect_attempts
        );
        let frame = build_error_frame(None, codes::CONNECTION_CLOSED, &message);
        let _ = self.writer.emit(&frame).await;
    }

    /// Called when a client frame arrives while in RECOVERY: re-arm a
    /// connect attempt if the rate-limit window has elapsed (spec §4.6).
    pub(crate) async fn maybe_rearm_from_recovery(&mut self) {
        let elapsed_ok = match self.last_reconnect_attempt_at {
            Some(t) => t.elapsed() >= self.config.recovery_interval,
            None => true,
        };
        if elapsed_ok {
            gate_info!("recovery rate-limit elapsed, re-arming reconnect");
            self.reconnect_attempts = 0;
            self.connect().await;
        }
    }

    /// Enter CLOSING: best-effort shutdown notification, bounded wait,
    /// teardown (spec §5).
    pub(crate) async fn begin_shutdown(&mut self) {
        if self.state == SupervisorState::Closing {
            return;
        }
        gate_info!("shutdown requested");
        gate_info!(
            "shutdown summary: {} frame(s) forwarded to upstream, {} frame(s) forwarded to stdout, final state {:?}",
            self.frames_outbound,
            self.frames_inbound,
            self.state,
        );
        let endpoint = self.session.endpoint_url().cloned();
        self.state = SupervisorState::Closing;

        if let Some(endpoint) = endpoint {
            let notification = json!({
                "jsonrpc": "2.0",
                "method": "notifications/cancelled",
                "params": {
                    "requestId": format!("shutdown-{}", unix_millis()),
                    "reason": "Client shutting down",
                }
            });
            let deadline = tokio::time::sleep(Duration::from_millis(500));
            tokio::pin!(deadline);
            tokio::select! {
                result = self.sender.send(&endpoint, &notification, &self.conn_cancel) => {
                    if let Err(e) = result {
                        gate_error!("shutdown notification failed: {e}");
                    }
                }
                _ = &mut deadline => {
                    gate_warn!("shutdown notification timed out after 500ms");
                }
            }
        }

        if let Some(sse) = self.sse.take() {
            sse.stop();
        }
        self.conn_cancel.cancel();
    }

    pub(crate) async fn send_now(&mut self, frame: Value) {
        let Some(endpoint) = self.session.endpoint_url().cloned() else {
            self.queue.push_front(frame);
            return;
        };
        match self.sender.send(&endpoint, &frame, &self.conn_cancel).await {
            Ok(()) => self.frames_outbound += 1,
            Err(e) => {
                let (message, status) = describe_send_error(&e);
                let kind = classify(&message, status);
                gate_warn!("send failed ({kind:?}): {message}");
                self.queue.push_front(frame);
                self.handle_error_kind(kind, &message).await;
            }
        }
    }

    /// Write `frame` to stdout, counting it toward the shutdown summary
    /// (spec_full.md §B "structured shutdown summary").
    pub(crate) async fn emit_frame(&mut self, frame: &Value) {
        let _ = self.writer.emit(frame).await;
        self.frames_inbound += 1;
    }
}

pub(crate) fn build_error_frame(id: Option<Value>, code: i64, message: &str) -> Value {
    let id_value = id.unwrap_or_else(|| Value::String(format!("error-{}", unix_millis())));
    json!({
        "jsonrpc": "2.0",
        "id": id_value,
        "error": { "code": code, "message": message, "data": {} }
    })
}

pub(crate) fn unix_millis() -> u128 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis()
}

fn describe_send_error(err: &GateError) -> (String, Option<u16>) {
    match err {
        GateError::HttpStatus { status, body } => (format!("HTTP {status}: {body}"), Some(*status)),
        GateError::Http(e) => (e.to_string(), e.status().map(|s| s.as_u16())),
        GateError::Aborted => ("send aborted".to_string(), None),
        other => (other.to_string(), None),
    }
}

async fn recv_sse(sse: &mut Option<SseConnection>) -> Option<SseEvent> {
    match sse {
        Some(conn) => conn.recv().await,
        None => std::future::pending().await,
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(d) => tokio::time::sleep_until(d.into()).await,
        None => std::future::pending().await,
    }
}
