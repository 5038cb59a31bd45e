// ── Wire types ──
//
// Shapes of the `p2p.get_info` JSON-RPC result. These mirror the node's
// reply as-is; `dnetview-core` converts them into its domain model.

use serde::{Deserialize, Serialize};

/// JSON-RPC 2.0 request envelope.
#[derive(Debug, Serialize)]
pub(crate) struct RpcRequest<'a> {
    pub jsonrpc: &'static str,
    pub method: &'a str,
    pub params: Vec<serde_json::Value>,
    pub id: u64,
}

/// JSON-RPC 2.0 response envelope. Exactly one of `result` / `error` is set
/// by a well-behaved server.
#[derive(Debug, Deserialize)]
pub(crate) struct RpcResponse<T> {
    pub result: Option<T>,
    pub error: Option<RpcErrorObject>,
    #[allow(dead_code)]
    pub id: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RpcErrorObject {
    pub code: i64,
    pub message: String,
}

/// Everything a node reports about its peer-to-peer state in one call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct NodeStatePayload {
    #[serde(default)]
    pub sessions: Vec<SessionPayload>,
}

/// Session kind tag as sent on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionKindTag {
    Outbound,
    Inbound,
    Manual,
    Seed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionPayload {
    pub kind: SessionKindTag,
    #[serde(default)]
    pub connections: Vec<ConnectionPayload>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionPayload {
    /// Remote peer address, e.g. `tcp://1.2.3.4:9000` or `1.2.3.4:9000`.
    pub addr: String,
    /// Local slot index for sessions that run a fixed number of slots.
    #[serde(default)]
    pub slot: Option<u32>,
    /// Free-form state descriptor (`connected`, `handshaking`, ...).
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub last_message: Option<MessagePayload>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageDirectionTag {
    Send,
    Recv,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessagePayload {
    pub direction: MessageDirectionTag,
    pub command: String,
    /// Unix seconds.
    pub timestamp: i64,
}
