// ── Topology store ──
//
// Snapshot storage plus the pure reconciliation that produces each new
// snapshot from the previous one and a poll batch.

mod reconcile;
mod topology_store;

pub use reconcile::{ReconcileSummary, Reconciliation, TIMEOUT_ERROR, reconcile};
pub use topology_store::TopologyStore;
