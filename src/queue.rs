//! Message Queue
//!
//! Ordered FIFO of pending client→server frames. Supports front-insertion
//! for handshake priority and id-based removal for cancellation.
//!
//! Invariants:
//! - at most one `initialize` frame ever present; if present it is at
//!   index 0.
//! - notifications without `id` are never queued.
//! - insertion preserves arrival order except where the supervisor
//!   explicitly promotes the handshake to the front.

use std::collections::VecDeque;

use serde_json::{json, Value};

/// The canonical MCP initialize handshake frame, byte-equivalent to what
/// the local client would send.
pub fn canonical_handshake() -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": 0,
        "method": "initialize",
        "params": {
            "protocolVersion": "2024-11-05",
            "capabilities": {},
            "clientInfo": { "name": "claude-ai", "version": "0.1.0" }
        }
    })
}

fn is_initialize(frame: &Value) -> bool {
    frame.get("method").and_then(Value::as_str) == Some("initialize")
        && frame.get("id").and_then(Value::as_i64) == Some(0)
}

/// An ordered, FIFO queue of pending outbound frames.
#[derive(Debug, Default)]
pub struct MessageQueue {
    frames: VecDeque<Value>,
}

impl MessageQueue {
    /// Construct an empty queue.
    pub fn new() -> Self {
        Self {
            frames: VecDeque::new(),
        }
    }

    /// Number of frames currently pending.
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// Whether the queue has no pending frames.
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Enqueue `frame` at the back. Notifications (frames with no `id`)
    /// must not reach this method while not READY — callers are expected
    /// to drop those themselves; `push` itself does not special-case
    /// notifications so that requests/responses pass through uniformly.
    pub fn push(&mut self, frame: Value) {
        self.frames.push_back(frame);
    }

    /// Enqueue `frame` at the front (used to re-queue a `Transient` send
    /// failure ahead of everything else).
    pub fn push_front(&mut self, frame: Value) {
        self.frames.push_front(frame);
    }

    /// Drain frames matching `predicate` in FIFO order, calling `action` on
    /// each and removing it from the queue.
    pub fn drain_while<F, A>(&mut self, mut predicate: F, mut action: A)
    where
        F: FnMut(&Value) -> bool,
        A: FnMut(Value),
    {
        let mut remaining = VecDeque::with_capacity(self.frames.len());
        for frame in self.frames.drain(..) {
            if predicate(&frame) {
                action(frame);
            } else {
                remaining.push_back(frame);
            }
        }
        self.frames = remaining;
    }

    /// Remove the (at most one) queued frame whose `id` equals `id`,
    /// returning it if found. Used for `notifications/cancelled`
    /// id-based cancellation (spec §8 P6).
    pub fn remove_by_id(&mut self, id: &Value) -> Option<Value> {
        let pos = self.frames.iter().position(|f| f.get("id") == Some(id));
        pos.map(|idx| self.frames.remove(idx).expect("index was just located"))
    }

    /// Ensure the handshake is at index 0 (spec §4.4/§4.6): locate any
    /// frame with `method == "initialize"` and `id == 0` and move it to
    /// the front; insert the canonical handshake if none exists.
    pub fn promote_initialize(&mut self) {
        if let Some(pos) = self.frames.iter().position(is_initialize) {
            if pos != 0 {
                let frame = self.frames.remove(pos).expect("index was just located");
                self.frames.push_front(frame);
            }
        } else {
            self.frames.push_front(canonical_handshake());
        }
    }

    /// Drain all frames in FIFO order, consuming the queue.
    pub fn drain_all(&mut self) -> Vec<Value> {
        self.frames.drain(..).collect()
    }

    /// Remove and return the frame at the front of the queue, if any.
    pub fn pop_front(&mut self) -> Option<Value> {
        self.frames.pop_front()
    }
}
