//! POST Sender (spec §4.3)
//!
//! Issues `POST <endpointUrl>` with the JSON-RPC frame as body. Success is
//! any 2xx; failure kinds (network/transport, 4xx, 5xx) are left for the
//! caller to classify — the sender never retries, that is the
//! supervisor's job. Sends race a supervisor-owned cancellation token so
//! tearing down a connection aborts any in-flight POST.
//!
//! Grounded on `xbcsmith-xzatoma`'s `HttpTransport::send` (same
//! `reqwest::Client` reuse, same 2xx/4xx/5xx split).

use reqwest::Client;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::error::{GateError, Result};

/// Stateless POST sender sharing one pooled [`reqwest::Client`].
#[derive(Clone)]
pub struct PostSender {
    client: Client,
}

impl PostSender {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Send `frame` to `endpoint`, aborting if `cancel` fires first.
    pub async fn send(&self, endpoint: &Url, frame: &Value, cancel: &CancellationToken) -> Result<()> {
        tokio::select! {
            _ = cancel.cancelled() => Err(GateError::Aborted),
            result = self.send_inner(endpoint, frame) => result,
        }
    }

    async fn send_inner(&self, endpoint: &Url, frame: &Value) -> Result<()> {
        let response = self
            .client
            .post(endpoint.clone())
            .header("Content-Type", "application/json")
            .json(frame)
            .send()
            .await?;

        if response.status().is_success() {
            return Ok(());
        }

        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        Err(GateError::HttpStatus { status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn send_is_aborted_by_a_pre_cancelled_token() {
        let sender = PostSender::new(Client::new());
        let endpoint = Url::parse("http://127.0.0.1:9/unreachable").unwrap();
        let cancel = CancellationToken::new();
        cancel.cancel();
        let frame = json!({"jsonrpc": "2.0", "id": 1, "method": "ping"});
        let result = sender.send(&endpoint, &frame, &cancel).await;
        assert!(matches!(result, Err(GateError::Aborted)));
    }
}
