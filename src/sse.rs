//! SSE Client (spec §4.2)
//!
//! Opens a long-lived `GET` with `Accept: text/event-stream`, parses the
//! SSE wire format, and dispatches named events. The named event
//! `endpoint` carries the per-session POST URL; the default (unnamed or
//! `message`) event carries a JSON-RPC frame.
//!
//! The wire parser (`parse_sse_stream`/`process_sse_event`) is grounded on
//! `xbcsmith-xzatoma`'s `HttpTransport` SSE parser. The owning event loop
//! shape — a spawned task that can be torn down via a `CancellationToken`,
//! feeding events to a channel the caller selects over — is grounded on
//! `rmcp`'s `SseClientWorker::run` (`modelcontextprotocol-rust-sdk`).

use bytes::Bytes;
use futures::Stream;
use reqwest::Client;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::error::{GateError, Result};

/// Events dispatched from an active SSE subscription.
#[derive(Debug)]
pub enum SseEvent {
    /// The stream opened successfully.
    Open,
    /// The `endpoint` named event fired, carrying the raw data string (an
    /// absolute or endpoint-relative URL).
    Endpoint(String),
    /// A default (`message`) event fired, carrying the raw JSON-RPC frame
    /// text. Parsing is deferred to the caller so it can apply the same
    /// Parse-error emission path as other parse failures.
    Message(String),
    /// A transport-level error occurred. `closed` indicates whether the
    /// underlying connection is now closed (it always is, for this
    /// implementation, once an error surfaces).
    Error { message: String, closed: bool },
    /// The stream ended (server closed the connection, or EOF).
    Closed,
    /// The server suggested a reconnection delay via the `retry:` field,
    /// in milliseconds. The supervisor treats this as a floor on its own
    /// backoff schedule (never a ceiling).
    Retry(u64),
}

/// A live SSE subscription. Drop or call [`SseConnection::stop`] to abort
/// the underlying task; both are idempotent.
pub struct SseConnection {
    events_rx: mpsc::UnboundedReceiver<SseEvent>,
    cancel: CancellationToken,
    task: tokio::task::JoinHandle<()>,
}

impl SseConnection {
    /// Open an SSE subscription to `url`.
    pub async fn connect(client: &Client, url: Url) -> Result<Self> {
        let response = client
            .get(url)
            .header("Accept", "text/event-stream")
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(GateError::HttpStatus {
                status: response.status().as_u16(),
                body: "non-2xx response opening SSE stream".to_string(),
            });
        }

        let (tx, rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        let task_cancel = cancel.clone();
        let _ = tx.send(SseEvent::Open);

        let byte_stream = response.bytes_stream();
        let task = tokio::spawn(async move {
            run_sse_pump(byte_stream, tx, task_cancel).await;
        });

        Ok(Self {
            events_rx: rx,
            cancel,
            task,
        })
    }

    /// Await the next dispatched event. Returns `None` once the connection
    /// has been fully torn down and all buffered events drained.
    pub async fn recv(&mut self) -> Option<SseEvent> {
        self.events_rx.recv().await
    }

    /// Abort the in-flight subscription and unblock `recv`. Safe to call
    /// multiple times.
    pub fn stop(&self) {
        self.cancel.cancel();
        self.task.abort();
    }
}

impl Drop for SseConnection {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn run_sse_pump(
    byte_stream: impl Stream<Item = reqwest::Result<Bytes>>,
    tx: mpsc::UnboundedSender<SseEvent>,
    cancel: CancellationToken,
) {
    use futures::StreamExt;

    let mut buffer = String::new();
    tokio::pin!(byte_stream);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => return,
            chunk = byte_stream.next() => {
                let Some(chunk_result) = chunk else {
                    let _ = tx.send(SseEvent::Closed);
                    return;
                };
                let chunk = match chunk_result {
                    Ok(c) => c,
                    Err(e) => {
                        let _ = tx.send(SseEvent::Error { message: e.to_string(), closed: true });
                        return;
                    }
                };
                let Ok(text) = std::str::from_utf8(&chunk) else {
                    continue;
                };
                buffer.push_str(text);

                while let Some(pos) = buffer.find("\n\n") {
                    let event_block = buffer[..pos].to_string();
                    buffer = buffer[pos + 2..].to_string();
                    for event in process_sse_event(&event_block) {
                        if tx.send(event).is_err() {
                            return;
                        }
                    }
                }
            }
        }
    }
}

/// Parse one SSE event block (text between two `\n\n` delimiters) into zero
/// or more dispatchable [`SseEvent`]s. A block carries at most one data
/// event, but may additionally carry a `retry:` hint alongside it (or
/// stand alone as a bare reconnection-time suggestion).
fn process_sse_event(event_block: &str) -> Vec<SseEvent> {
    let mut data_lines: Vec<&str> = Vec::new();
    let mut event_type: Option<&str> = None;
    let mut retry_ms: Option<u64> = None;

    for line in event_block.lines() {
        if let Some(value) = line.strip_prefix("data:") {
            data_lines.push(value.trim());
        } else if let Some(value) = line.strip_prefix("event:") {
            event_type = Some(value.trim());
        } else if let Some(value) = line.strip_prefix("retry:") {
            retry_ms = value.trim().parse::<u64>().ok();
        }
        // `id:` fields and comment lines (`:`-prefixed) carry no
        // dispatch-relevant information for this bridge.
    }

    let mut events = Vec::new();
    if let Some(ms) = retry_ms {
        events.push(SseEvent::Retry(ms));
    }
    if !data_lines.is_empty() {
        let data = data_lines.join("\n");
        events.push(match event_type {
            Some("endpoint") => SseEvent::Endpoint(data),
            _ => SseEvent::Message(data),
        });
    }
    events
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_event_parsed() {
        let block = "event: endpoint\ndata: /messages?session_id=abc";
        match process_sse_event(block).as_slice() {
            [SseEvent::Endpoint(url)] => assert_eq!(url, "/messages?session_id=abc"),
            other => panic!("expected [Endpoint], got {other:?}"),
        }
    }

    #[test]
    fn default_message_event_parsed() {
        let block = "data: {\"jsonrpc\":\"2.0\",\"id\":1,\"result\":{}}";
        match process_sse_event(block).as_slice() {
            [SseEvent::Message(data)] => {
                assert_eq!(data, "{\"jsonrpc\":\"2.0\",\"id\":1,\"result\":{}}")
            }
            other => panic!("expected [Message], got {other:?}"),
        }
    }

    #[test]
    fn named_message_event_parsed() {
        let block = "event: message\ndata: payload";
        match process_sse_event(block).as_slice() {
            [SseEvent::Message(data)] => assert_eq!(data, "payload"),
            other => panic!("expected [Message], got {other:?}"),
        }
    }

    #[test]
    fn multi_line_data_joined_with_newline() {
        let block = "data: line1\ndata: line2";
        match process_sse_event(block).as_slice() {
            [SseEvent::Message(data)] => assert_eq!(data, "line1\nline2"),
            other => panic!("expected [Message], got {other:?}"),
        }
    }

    #[test]
    fn comment_only_block_yields_no_events() {
        let block = ": keep-alive";
        assert!(process_sse_event(block).is_empty());
    }

    #[test]
    fn retry_field_emits_retry_event() {
        let block = "retry: 2500";
        match process_sse_event(block).as_slice() {
            [SseEvent::Retry(ms)] => assert_eq!(*ms, 2500),
            other => panic!("expected [Retry], got {other:?}"),
        }
    }

    #[test]
    fn retry_and_data_in_the_same_block_both_dispatch() {
        let block = "retry: 1000\ndata: payload";
        match process_sse_event(block).as_slice() {
            [SseEvent::Retry(1000), SseEvent::Message(data)] => assert_eq!(data, "payload"),
            other => panic!("expected [Retry, Message], got {other:?}"),
        }
    }

    #[tokio::test]
    async fn stop_is_idempotent_and_unblocks_recv() {
        let (tx, rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        drop(tx);
        let task = tokio::spawn(async {});
        let mut conn = SseConnection {
            events_rx: rx,
            cancel,
            task,
        };
        conn.stop();
        conn.stop();
        assert!(conn.recv().await.is_none());
    }
}
