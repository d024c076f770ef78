//! Frame I/O (spec §4.1)
//!
//! Reads line-delimited JSON from stdin, writes compact-JSON-plus-newline
//! frames to stdout, and logs diagnostics to stderr with a stable
//! `[mcpgate]` prefix. Nothing but well-formed JSON frames and their
//! trailing newline may ever reach stdout.

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Stdin, Stdout};

/// Logs a debug-level diagnostic to stderr with the `[mcpgate]` prefix.
/// Debug logging is always enabled per spec §4.1; `RUST_LOG` only changes
/// the tracing filter, not whether this call site exists.
macro_rules! gate_debug {
    ($($arg:tt)*) => {
        tracing::debug!(target: "mcpgate", "[mcpgate] {}", format!($($arg)*))
    };
}

macro_rules! gate_warn {
    ($($arg:tt)*) => {
        tracing::warn!(target: "mcpgate", "[mcpgate] {}", format!($($arg)*))
    };
}

macro_rules! gate_error {
    ($($arg:tt)*) => {
        tracing::error!(target: "mcpgate", "[mcpgate] {}", format!($($arg)*))
    };
}

macro_rules! gate_info {
    ($($arg:tt)*) => {
        tracing::info!(target: "mcpgate", "[mcpgate] {}", format!($($arg)*))
    };
}

pub(crate) use gate_debug;
pub(crate) use gate_error;
pub(crate) use gate_info;
pub(crate) use gate_warn;

/// Lazily-constructed line reader over the process's stdin.
pub struct LineReader {
    lines: tokio::io::Lines<BufReader<Stdin>>,
}

impl LineReader {
    /// Construct a reader over the process stdin.
    pub fn new() -> Self {
        Self {
            lines: BufReader::new(tokio::io::stdin()).lines(),
        }
    }

    /// Read the next non-blank line. Returns `Ok(None)` at EOF.
    pub async fn next_line(&mut self) -> std::io::Result<Option<String>> {
        loop {
            match self.lines.next_line().await? {
                Some(line) if line.trim().is_empty() => continue,
                other => return Ok(other),
            }
        }
    }
}

impl Default for LineReader {
    fn default() -> Self {
        Self::new()
    }
}

/// Serializes JSON-RPC frames as compact JSON + `\n` to stdout. A single
/// owner (the Frame Router) should hold this so writes are naturally
/// serialized.
pub struct FrameWriter {
    stdout: Stdout,
}

impl FrameWriter {
    /// Construct a writer over the process stdout.
    pub fn new() -> Self {
        Self {
            stdout: tokio::io::stdout(),
        }
    }

    /// Write `frame` as compact JSON followed by a newline, atomically per
    /// call.
    pub async fn emit(&mut self, frame: &serde_json::Value) -> std::io::Result<()> {
        let mut line = serde_json::to_vec(frame).expect("Value serialization cannot fail");
        line.push(b'\n');
        self.stdout.write_all(&line).await?;
        self.stdout.flush().await
    }
}

impl Default for FrameWriter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn emit_writes_compact_json_with_newline() {
        // FrameWriter targets the real process stdout, so we exercise the
        // serialization path directly rather than capturing stdout bytes.
        let frame = json!({"jsonrpc": "2.0", "id": 1, "result": {}});
        let mut bytes = serde_json::to_vec(&frame).unwrap();
        bytes.push(b'\n');
        let text = String::from_utf8(bytes).unwrap();
        assert_eq!(text, "{\"id\":1,\"jsonrpc\":\"2.0\",\"result\":{}}\n");
    }

    #[test]
    fn gate_debug_does_not_panic() {
        gate_debug!("test {}", 1);
        gate_warn!("test {}", 2);
        gate_error!("test {}", 3);
        gate_info!("test {}", 4);
    }
}
