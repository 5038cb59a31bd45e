#![allow(clippy::unwrap_used)]
// Integration tests for `RpcClient` using wiremock.

use std::time::Duration;

use serde_json::json;
use url::Url;
use wiremock::matchers::{body_partial_json, method};
use wiremock::{Mock, MockServer, ResponseTemplate};

use dnetview_api::{Error, MessageDirectionTag, RpcClient, SessionKindTag, TransportConfig};

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup() -> (MockServer, RpcClient, Url) {
    let server = MockServer::start().await;
    let endpoint = Url::parse(&server.uri()).unwrap();
    let transport = TransportConfig::default().with_timeout(Duration::from_millis(500));
    let client = RpcClient::new(&transport).unwrap();
    (server, client, endpoint)
}

// ── get_info ────────────────────────────────────────────────────────

#[tokio::test]
async fn test_get_info_success() {
    let (server, client, endpoint) = setup().await;

    let body = json!({
        "jsonrpc": "2.0",
        "id": 1,
        "result": {
            "sessions": [{
                "kind": "outbound",
                "connections": [{
                    "addr": "1.2.3.4:9000",
                    "state": "connected",
                    "last_message": {
                        "direction": "recv",
                        "command": "pong",
                        "timestamp": 1_700_000_100
                    }
                }]
            }, {
                "kind": "inbound",
                "connections": []
            }]
        }
    });

    Mock::given(method("POST"))
        .and(body_partial_json(json!({"method": "p2p.get_info"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(&body))
        .expect(1)
        .mount(&server)
        .await;

    let payload = client.get_info(&endpoint).await.unwrap();

    assert_eq!(payload.sessions.len(), 2);
    assert_eq!(payload.sessions[0].kind, SessionKindTag::Outbound);
    let conn = &payload.sessions[0].connections[0];
    assert_eq!(conn.addr, "1.2.3.4:9000");
    assert_eq!(conn.slot, None);
    let msg = conn.last_message.as_ref().unwrap();
    assert_eq!(msg.direction, MessageDirectionTag::Recv);
    assert_eq!(msg.command, "pong");
}

#[tokio::test]
async fn test_get_info_rpc_error() {
    let (server, client, endpoint) = setup().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "jsonrpc": "2.0",
            "id": 1,
            "error": {"code": -32601, "message": "Method not found"}
        })))
        .mount(&server)
        .await;

    let result = client.get_info(&endpoint).await;
    assert!(
        matches!(result, Err(Error::Rpc { code: -32601, .. })),
        "expected Rpc error, got: {result:?}"
    );
}

#[tokio::test]
async fn test_get_info_malformed_payload() {
    let (server, client, endpoint) = setup().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "jsonrpc": "2.0",
            "id": 1,
            "result": {"sessions": [{"kind": "bogus"}]}
        })))
        .mount(&server)
        .await;

    let result = client.get_info(&endpoint).await;
    assert!(
        matches!(result, Err(Error::Protocol(_))),
        "expected Protocol error, got: {result:?}"
    );
}

#[tokio::test]
async fn test_get_info_http_error() {
    let (server, client, endpoint) = setup().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let result = client.get_info(&endpoint).await;
    assert!(
        matches!(result, Err(Error::Http { status: 503 })),
        "expected Http error, got: {result:?}"
    );
}

#[tokio::test]
async fn test_get_info_timeout() {
    let (server, client, endpoint) = setup().await;

    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"jsonrpc": "2.0", "id": 1, "result": {"sessions": []}}))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let result = client.get_info(&endpoint).await;
    assert!(
        result.as_ref().is_err_and(Error::is_timeout),
        "expected Timeout error, got: {result:?}"
    );
}

#[tokio::test]
async fn test_get_info_connection_refused() {
    // Bind then drop a listener to get a port with nothing behind it.
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let endpoint = Url::parse(&format!("http://127.0.0.1:{port}")).unwrap();
    let client = RpcClient::new(&TransportConfig::default()).unwrap();

    let result = client.get_info(&endpoint).await;
    assert!(
        matches!(result, Err(Error::ConnectionRefused { .. })),
        "expected ConnectionRefused, got: {result:?}"
    );
}
