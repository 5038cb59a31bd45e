// ── Topology store ──
//
// The one mutable cell shared between the poller and the readers. Reads
// are lock-free `ArcSwap` loads; publishes swap the whole snapshot and
// notify subscribers over a `watch` channel.

use std::sync::Arc;

use arc_swap::ArcSwap;
use tokio::sync::watch;
use tracing::error;

use crate::error::CoreError;
use crate::model::Snapshot;
use crate::stream::SnapshotStream;

/// Holder of the current published [`Snapshot`].
///
/// Single writer (the monitor's round lock guarantees it), any number of
/// readers. A reader holding an `Arc<Snapshot>` keeps a complete tree
/// regardless of later publishes.
pub struct TopologyStore {
    current: ArcSwap<Snapshot>,
    published: watch::Sender<Arc<Snapshot>>,
}

impl TopologyStore {
    pub fn new(initial: Snapshot) -> Self {
        let initial = Arc::new(initial);
        let (published, _) = watch::channel(Arc::clone(&initial));
        Self {
            current: ArcSwap::new(initial),
            published,
        }
    }

    /// The latest published snapshot.
    pub fn load(&self) -> Arc<Snapshot> {
        self.current.load_full()
    }

    /// Make `snapshot` the current one.
    ///
    /// Sequence numbers must strictly increase; anything else means two
    /// writers raced or a caller replayed an old reconciliation. The swap
    /// is a compare-and-swap against the snapshot that was checked, so the
    /// visible sequence never goes backwards.
    pub(crate) fn publish(&self, snapshot: Snapshot) -> Result<Arc<Snapshot>, CoreError> {
        let attempted = snapshot.seq();
        let snapshot = Arc::new(snapshot);

        let mut checked = self.current.load_full();
        loop {
            if attempted <= checked.seq() {
                return Err(Self::reject(checked.seq(), attempted));
            }
            let previous = self.current.compare_and_swap(&checked, Arc::clone(&snapshot));
            if Arc::ptr_eq(&*previous, &checked) {
                break;
            }
            checked = Arc::clone(&*previous);
        }

        self.published.send_if_modified(|announced| {
            if announced.seq() < attempted {
                *announced = Arc::clone(&snapshot);
                true
            } else {
                false
            }
        });
        Ok(snapshot)
    }

    fn reject(current: u64, attempted: u64) -> CoreError {
        error!(current, attempted, "rejected out-of-order snapshot publish");
        CoreError::StaleSequence { current, attempted }
    }

    pub fn subscribe(&self) -> SnapshotStream {
        SnapshotStream::new(self.published.subscribe())
    }
}
