//! Topology model, polling and navigation for a P2P network monitor.
//!
//! - **[`Monitor`]** — Central facade: owns the configuration, the
//!   [`TopologyStore`] and the [`Poller`]. [`poll_once()`](Monitor::poll_once)
//!   runs a single round; [`start()`](Monitor::start) spawns a background task
//!   that runs one round per poll interval, never overlapping.
//!
//! - **[`reconcile`]** — Pure `Snapshot × Batch → Snapshot` merge. Successful
//!   fetches replace a node's subtree (matching connections by stable key);
//!   failed fetches keep the last-known subtree and mark the node unreachable.
//!
//! - **[`TopologyStore`]** — Holds the current immutable [`Snapshot`] behind an
//!   `ArcSwap` and announces each publish on a `watch` channel, consumed
//!   through [`SnapshotStream`].
//!
//! - **[`NavigationState`]** — Cursor over the tree stored as a
//!   [`NavigationPath`] of identities, rebound to each new snapshot with
//!   fallback to the nearest surviving ancestor.
//!
//! - **[`NodeGateway`]** — The seam to the transport. Implemented for
//!   [`dnetview_api::RpcClient`].

pub mod config;
pub mod controller;
pub mod convert;
pub mod error;
pub mod gateway;
pub mod model;
pub mod navigation;
pub mod scheduler;
pub mod store;
pub mod stream;

// ── Primary re-exports ──────────────────────────────────────────────
pub use config::{
    DEFAULT_FETCH_TIMEOUT, DEFAULT_POLL_INTERVAL, MonitorConfig, NodeConfig, StalePolicy,
};
pub use controller::Monitor;
pub use error::CoreError;
pub use gateway::NodeGateway;
pub use navigation::{
    Direction, Focus, NavCommand, NavOutcome, NavigationPath, NavigationState, Rebind,
};
pub use scheduler::{Batch, FetchOutcome, NodeFetch, Poller};
pub use store::{ReconcileSummary, Reconciliation, TIMEOUT_ERROR, TopologyStore, reconcile};
pub use stream::{SnapshotStream, SnapshotWatchStream};

pub use model::{
    Connection, ConnectionKey, Liveness, Message, MessageDirection, NodeId, NodeKind, NodeState,
    NodeView, ObservedConnection, ObservedSession, Session, SessionKind, Snapshot,
};
