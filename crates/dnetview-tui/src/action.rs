//! All possible UI actions. Actions are the sole mechanism for state mutation.

use std::sync::Arc;

use dnetview_core::{NavCommand, Snapshot};

/// Every state transition in the TUI is expressed as an Action.
#[derive(Debug, Clone)]
pub enum Action {
    // ── Lifecycle ──────────────────────────────────────────────────
    Render,
    Resize,

    // ── Navigation ────────────────────────────────────────────────
    Navigate(NavCommand),
    ToggleHelp,

    // ── Data Events (from the monitor) ────────────────────────────
    SnapshotPublished(Arc<Snapshot>),
    MonitorStopped,
}
