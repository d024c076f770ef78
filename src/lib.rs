//! mcpgate - a resilient stdio-to-HTTP/SSE bridge for MCP servers
//!
//! Bridges a local process speaking line-delimited JSON-RPC 2.0 over its
//! stdin/stdout to a remote MCP server exposing an HTTP POST + SSE
//! transport, hiding the session handshake, reconnection, and queueing
//! mechanics behind what looks to the local process like a single
//! bidirectional JSON-RPC channel.
//!
//! # Architecture
//!
//! - `frame_io`: line-delimited stdin reads, compact-JSON stdout writes, `[mcpgate]` stderr logging
//! - `sse`: the long-lived SSE subscription (`endpoint`/`message` events)
//! - `sender`: the POST channel back to the remote session endpoint
//! - `queue`: the ordered pending-frame queue with handshake priority
//! - `classify`: error-string/HTTP-status classification into the bridge's taxonomy
//! - `session`: session-id identity and rotation policy
//! - `supervisor`: the connection/reconnect state machine
//! - `router`: inbound/outbound frame dispatch (an `impl Supervisor` extension)
//! - `config`: environment-tunable reconnect parameters
//! - `cli`: command-line argument parsing
//! - `error`: error types and the crate's `Result` alias

pub mod classify;
pub mod cli;
pub mod config;
pub mod error;
pub mod frame_io;
pub mod queue;
pub mod router;
pub mod sender;
pub mod session;
pub mod sse;
pub mod supervisor;

pub use config::Config;
pub use error::{GateError, Result};
pub use supervisor::{Supervisor, SupervisorState};
