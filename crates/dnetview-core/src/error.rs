// ── Core error types ──
//
// Errors surfaced by dnetview-core. Per-node fetch failures are NOT errors
// at this level -- they travel through the poll batch as outcomes and end
// up as node annotations. What remains is startup misconfiguration and
// internal invariant violations.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Configuration errors (fatal, startup only) ───────────────────
    #[error("No nodes configured: at least one node endpoint is required")]
    NoNodes,

    #[error("Duplicate node id in configuration: {id}")]
    DuplicateNode { id: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    // ── Payload errors ───────────────────────────────────────────────
    #[error("Invalid node payload: {reason}")]
    InvalidPayload { reason: String },

    // ── Internal invariant violations ────────────────────────────────
    #[error("Navigation path does not resolve: {path}")]
    UnresolvablePath { path: String },

    #[error("Refusing to publish snapshot {attempted}: current is {current}")]
    StaleSequence { current: u64, attempted: u64 },
}

impl CoreError {
    /// Whether this error reflects bad configuration rather than a bug.
    pub fn is_config(&self) -> bool {
        matches!(
            self,
            Self::NoNodes | Self::DuplicateNode { .. } | Self::Config { .. }
        )
    }
}
