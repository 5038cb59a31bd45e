//! Data bridge — connects [`Monitor`] publishes to TUI actions.
//!
//! Runs as a background task: starts the monitor's poll loop, then forwards
//! every published snapshot as an [`Action`] through the TUI's action
//! channel until cancelled.

use futures::StreamExt;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use dnetview_core::Monitor;

use crate::action::Action;

pub async fn spawn_data_bridge(
    monitor: Monitor,
    action_tx: mpsc::UnboundedSender<Action>,
    cancel: CancellationToken,
) {
    // Subscribe first so the first round cannot slip past us.
    let snapshots = monitor.subscribe();
    let initial = snapshots.current().clone();
    let mut stream = snapshots.into_stream();
    monitor.start().await;

    let _ = action_tx.send(Action::SnapshotPublished(initial));

    loop {
        tokio::select! {
            biased;

            () = cancel.cancelled() => break,

            next = stream.next() => {
                let Some(snapshot) = next else { break };
                debug!(seq = snapshot.seq(), "dispatching SnapshotPublished");
                if action_tx.send(Action::SnapshotPublished(snapshot)).is_err() {
                    break;
                }
            }
        }
    }

    monitor.shutdown().await;
    let _ = action_tx.send(Action::MonitorStopped);
    debug!("data bridge shut down");
}
