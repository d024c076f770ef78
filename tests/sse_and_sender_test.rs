//! Integration coverage for the SSE client and POST sender against a real
//! (mocked) HTTP server, grounded on `xbcsmith-xzatoma`'s transport tests
//! which exercise `HttpTransport` against a `wiremock` server rather than
//! hand-rolled fakes.

use mcpgate::classify::{classify, ErrorKind};
use mcpgate::error::GateError;
use mcpgate::sender::PostSender;
use mcpgate::sse::SseEvent;
use reqwest::Client;
use serde_json::json;
use tokio_util::sync::CancellationToken;
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn sse_connection_dispatches_endpoint_then_message() {
    let server = MockServer::start().await;
    let body = concat!(
        "event: endpoint\ndata: /messages?session_id=abc\n\n",
        "data: {\"jsonrpc\":\"2.0\",\"id\":1,\"result\":{}}\n\n",
    );
    Mock::given(method("GET"))
        .and(path("/sse"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(body, "text/event-stream")
                .append_header("content-type", "text/event-stream"),
        )
        .mount(&server)
        .await;

    let client = Client::new();
    let url = Url::parse(&format!("{}/sse", server.uri())).unwrap();
    let mut conn = mcpgate::sse::SseConnection::connect(&client, url)
        .await
        .expect("SSE connect should succeed against a 200 response");

    assert!(matches!(conn.recv().await, Some(SseEvent::Open)));
    match conn.recv().await {
        Some(SseEvent::Endpoint(data)) => assert_eq!(data, "/messages?session_id=abc"),
        other => panic!("expected Endpoint, got {other:?}"),
    }
    match conn.recv().await {
        Some(SseEvent::Message(data)) => {
            let parsed: serde_json::Value = serde_json::from_str(&data).unwrap();
            assert_eq!(parsed["id"], 1);
        }
        other => panic!("expected Message, got {other:?}"),
    }
}

#[tokio::test]
async fn sse_connection_rejects_non_2xx() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/sse"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let client = Client::new();
    let url = Url::parse(&format!("{}/sse", server.uri())).unwrap();
    let result = mcpgate::sse::SseConnection::connect(&client, url).await;
    assert!(matches!(result, Err(GateError::HttpStatus { status: 503, .. })));
}

#[tokio::test]
async fn post_sender_success_on_2xx() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/messages"))
        .respond_with(ResponseTemplate::new(202))
        .mount(&server)
        .await;

    let sender = PostSender::new(Client::new());
    let endpoint = Url::parse(&format!("{}/messages", server.uri())).unwrap();
    let frame = json!({"jsonrpc": "2.0", "id": 1, "method": "ping"});
    let cancel = CancellationToken::new();
    sender
        .send(&endpoint, &frame, &cancel)
        .await
        .expect("2xx response should be treated as success");
}

#[tokio::test]
async fn post_sender_404_classifies_as_session_lost() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/messages"))
        .respond_with(ResponseTemplate::new(404).set_body_string("Could not find session"))
        .mount(&server)
        .await;

    let sender = PostSender::new(Client::new());
    let endpoint = Url::parse(&format!("{}/messages", server.uri())).unwrap();
    let frame = json!({"jsonrpc": "2.0", "id": 1, "method": "ping"});
    let cancel = CancellationToken::new();
    let err = sender
        .send(&endpoint, &frame, &cancel)
        .await
        .expect_err("404 should be surfaced as a failure");

    match err {
        GateError::HttpStatus { status, body } => {
            assert_eq!(status, 404);
            assert_eq!(classify(&body, Some(status)), ErrorKind::SessionLost);
        }
        other => panic!("expected HttpStatus, got {other:?}"),
    }
}

#[tokio::test]
async fn post_sender_is_cancellable_mid_flight() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/slow"))
        .respond_with(ResponseTemplate::new(202).set_delay(std::time::Duration::from_secs(5)))
        .mount(&server)
        .await;

    let sender = PostSender::new(Client::new());
    let endpoint = Url::parse(&format!("{}/slow", server.uri())).unwrap();
    let frame = json!({"jsonrpc": "2.0", "id": 1, "method": "ping"});
    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = sender
        .send(&endpoint, &frame, &cancel)
        .await
        .expect_err("a pre-cancelled token should abort the send immediately");
    assert!(matches!(err, GateError::Aborted));
}
