use thiserror::Error;

/// Top-level error type for the `dnetview-api` crate.
///
/// Covers every way a single node fetch can fail: transport, HTTP,
/// JSON-RPC envelope, and payload decoding. `dnetview-core` folds these
/// into per-node fetch outcomes; none of them is fatal to the monitor.
#[derive(Debug, Error)]
pub enum Error {
    // ── Transport ───────────────────────────────────────────────────
    /// The request did not complete within the transport timeout.
    #[error("Request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    /// Nothing is listening at the endpoint.
    #[error("Connection refused by {endpoint}")]
    ConnectionRefused { endpoint: String },

    /// Any other transport failure (DNS, reset, TLS, ...).
    #[error("Connection error: {0}")]
    Connection(String),

    /// The endpoint answered with a non-success HTTP status.
    #[error("HTTP error: status {status}")]
    Http { status: u16 },

    // ── Protocol ────────────────────────────────────────────────────
    /// The JSON-RPC server returned an error object.
    #[error("RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    /// The response body could not be decoded into a node state payload.
    #[error("Protocol error: {0}")]
    Protocol(String),

    // ── Setup ───────────────────────────────────────────────────────
    /// The HTTP client could not be constructed.
    #[error("Failed to build HTTP client: {0}")]
    ClientBuild(String),
}

impl Error {
    /// Returns `true` if the fetch failed because it ran out of time.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// Classify a `reqwest` failure for a request sent to `endpoint`.
    pub(crate) fn from_transport(err: &reqwest::Error, endpoint: &str, timeout_secs: u64) -> Self {
        if err.is_timeout() {
            Self::Timeout { timeout_secs }
        } else if err.is_connect() {
            Self::ConnectionRefused {
                endpoint: endpoint.to_owned(),
            }
        } else if err.is_decode() {
            Self::Protocol(err.to_string())
        } else if let Some(status) = err.status() {
            Self::Http {
                status: status.as_u16(),
            }
        } else {
            Self::Connection(err.to_string())
        }
    }
}
