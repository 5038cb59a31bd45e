// JSON-RPC HTTP client
//
// Wraps `reqwest::Client` with JSON-RPC 2.0 envelope handling. One client
// is shared across all configured nodes; the endpoint is supplied per call.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::de::DeserializeOwned;
use tracing::{debug, trace};
use url::Url;

use crate::error::Error;
use crate::transport::TransportConfig;
use crate::types::{NodeStatePayload, RpcRequest, RpcResponse};

/// Method name for the node state query.
pub const GET_INFO_METHOD: &str = "p2p.get_info";

/// Raw JSON-RPC client for node endpoints.
///
/// Cheap to clone (the inner `reqwest::Client` is reference counted), and
/// safe to call concurrently for different endpoints.
#[derive(Debug)]
pub struct RpcClient {
    http: reqwest::Client,
    timeout_secs: u64,
    next_id: AtomicU64,
}

impl Clone for RpcClient {
    fn clone(&self) -> Self {
        Self {
            http: self.http.clone(),
            timeout_secs: self.timeout_secs,
            next_id: AtomicU64::new(self.next_id.load(Ordering::Relaxed)),
        }
    }
}

impl RpcClient {
    /// Create a client from a `TransportConfig`.
    pub fn new(transport: &TransportConfig) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Ok(Self::with_client(http, transport.timeout.as_secs()))
    }

    /// Create a client with a pre-built `reqwest::Client`.
    pub fn with_client(http: reqwest::Client, timeout_secs: u64) -> Self {
        Self {
            http,
            timeout_secs,
            next_id: AtomicU64::new(1),
        }
    }

    /// Fetch the full peer-to-peer state of the node at `endpoint`.
    pub async fn get_info(&self, endpoint: &Url) -> Result<NodeStatePayload, Error> {
        self.call(endpoint, GET_INFO_METHOD).await
    }

    /// Issue a parameterless JSON-RPC call and decode its `result`.
    pub async fn call<T: DeserializeOwned>(
        &self,
        endpoint: &Url,
        method: &str,
    ) -> Result<T, Error> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let request = RpcRequest {
            jsonrpc: "2.0",
            method,
            params: Vec::new(),
            id,
        };

        debug!(%endpoint, method, id, "sending RPC request");

        let resp = self
            .http
            .post(endpoint.clone())
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::from_transport(&e, endpoint.as_str(), self.timeout_secs))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(Error::Http {
                status: status.as_u16(),
            });
        }

        let body = resp
            .text()
            .await
            .map_err(|e| Error::from_transport(&e, endpoint.as_str(), self.timeout_secs))?;

        trace!(%endpoint, body_len = body.len(), "RPC response body received");

        parse_response(&body)
    }
}

/// Unwrap a JSON-RPC envelope into its `result`.
fn parse_response<T: DeserializeOwned>(body: &str) -> Result<T, Error> {
    let envelope: RpcResponse<T> =
        serde_json::from_str(body).map_err(|e| Error::Protocol(e.to_string()))?;

    if let Some(err) = envelope.error {
        return Err(Error::Rpc {
            code: err.code,
            message: err.message,
        });
    }

    envelope
        .result
        .ok_or_else(|| Error::Protocol("response carries neither result nor error".into()))
}
