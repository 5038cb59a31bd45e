// ── Monitor ──
//
// Owns the configuration, the topology store and the poller, and drives
// rounds either on demand (`poll_once`) or from a background task on a
// fixed period (`start`). Every round is fetch → reconcile → publish.

use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use dnetview_api::RpcClient;

use crate::config::MonitorConfig;
use crate::error::CoreError;
use crate::gateway::NodeGateway;
use crate::model::Snapshot;
use crate::scheduler::Poller;
use crate::store::{ReconcileSummary, Reconciliation, TopologyStore, reconcile};
use crate::stream::SnapshotStream;

/// The main entry point for consumers.
///
/// Cheaply cloneable via `Arc<MonitorInner>`. Readers use
/// [`snapshot()`](Self::snapshot) or [`subscribe()`](Self::subscribe);
/// neither ever blocks on a round in progress.
pub struct Monitor<G: NodeGateway = RpcClient> {
    inner: Arc<MonitorInner<G>>,
}

struct MonitorInner<G> {
    config: MonitorConfig,
    store: Arc<TopologyStore>,
    poller: Poller<G>,
    /// Held for the whole of a round: at most one round in flight.
    round_lock: Mutex<()>,
    cancel: CancellationToken,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl<G: NodeGateway> Clone for Monitor<G> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<G: NodeGateway> Monitor<G> {
    /// Validate `config` and build a monitor with every node pending.
    /// Does NOT poll; call [`poll_once()`](Self::poll_once) or
    /// [`start()`](Self::start).
    pub fn new(config: MonitorConfig, gateway: G) -> Result<Self, CoreError> {
        config.validate()?;

        let store = Arc::new(TopologyStore::new(Snapshot::initial(&config)));
        let poller = Poller::new(gateway, config.nodes.clone(), config.fetch_timeout);

        Ok(Self {
            inner: Arc::new(MonitorInner {
                config,
                store,
                poller,
                round_lock: Mutex::new(()),
                cancel: CancellationToken::new(),
                task: Mutex::new(None),
            }),
        })
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.inner.config
    }

    /// The latest published snapshot.
    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.inner.store.load()
    }

    pub fn subscribe(&self) -> SnapshotStream {
        self.inner.store.subscribe()
    }

    /// Run one full round and publish its result.
    ///
    /// Waits for any round already in flight to finish first.
    pub async fn poll_once(&self) -> Result<ReconcileSummary, CoreError> {
        let _round = self.inner.round_lock.lock().await;
        let started = Instant::now();

        let batch = self.inner.poller.run_round().await;
        let previous = self.inner.store.load();
        let Reconciliation { snapshot, summary } =
            reconcile(&previous, &batch, self.inner.config.stale_policy);
        self.inner.store.publish(snapshot)?;

        let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        info!(
            seq = summary.seq,
            online = summary.online,
            unreachable = summary.unreachable,
            pending = summary.pending,
            elapsed_ms,
            "round completed"
        );
        debug!(
            seq = summary.seq,
            sessions_added = summary.sessions_added,
            sessions_removed = summary.sessions_removed,
            connections_added = summary.connections_added,
            connections_removed = summary.connections_removed,
            stale_cleared = summary.stale_cleared,
            "reconciliation summary"
        );

        Ok(summary)
    }

    /// Spawn the background poll task. The first round starts immediately.
    ///
    /// Calling this while the task is running does nothing. A monitor that
    /// has been shut down stays shut down.
    pub async fn start(&self) {
        let mut task = self.inner.task.lock().await;
        if task.as_ref().is_some_and(|handle| !handle.is_finished()) {
            warn!("poll task already running");
            return;
        }

        let interval_ms =
            u64::try_from(self.inner.config.poll_interval.as_millis()).unwrap_or(u64::MAX);
        info!(
            nodes = self.inner.config.nodes.len(),
            interval_ms,
            "starting poll task"
        );
        *task = Some(tokio::spawn(poll_task(self.clone(), self.inner.cancel.clone())));
    }

    /// Cancel the poll task and wait for it to exit. A round in flight is
    /// abandoned without publishing.
    pub async fn shutdown(&self) {
        self.inner.cancel.cancel();
        if let Some(handle) = self.inner.task.lock().await.take() {
            if let Err(e) = handle.await {
                warn!(error = %e, "poll task ended abnormally");
            }
        }
        debug!("monitor shut down");
    }

    pub fn is_shut_down(&self) -> bool {
        self.inner.cancel.is_cancelled()
    }
}

/// Run rounds on the configured period until cancelled.
///
/// A round that overruns the period delays the next tick instead of
/// triggering a burst of catch-up rounds.
async fn poll_task<G: NodeGateway>(monitor: Monitor<G>, cancel: CancellationToken) {
    let mut interval = tokio::time::interval(monitor.inner.config.poll_interval);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = interval.tick() => {
                tokio::select! {
                    biased;
                    () = cancel.cancelled() => break,
                    result = monitor.poll_once() => {
                        if let Err(e) = result {
                            warn!(error = %e, "round failed to publish");
                        }
                    }
                }
            }
        }
    }

    debug!("poll task exiting");
}
