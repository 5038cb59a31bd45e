//! Async JSON-RPC client for peer-to-peer node endpoints.
//!
//! Each monitored node exposes one JSON-RPC endpoint. [`RpcClient::get_info`]
//! asks it for its sessions, their connections, and the last message seen on
//! each connection, returning the raw [`NodeStatePayload`]. Failures are
//! classified into [`Error`] so the poller can tell timeouts from refused
//! connections from malformed replies.

pub mod client;
pub mod error;
pub mod transport;
pub mod types;

pub use client::{GET_INFO_METHOD, RpcClient};
pub use error::Error;
pub use transport::TransportConfig;
pub use types::{
    ConnectionPayload, MessageDirectionTag, MessagePayload, NodeStatePayload, SessionKindTag,
    SessionPayload,
};
