// ── Reconciliation ──
//
// Pure merge of one poll batch into the previous snapshot. No I/O, no
// clock reads: every timestamp comes from the batch, so the same inputs
// always produce the same snapshot.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use tracing::warn;

use crate::config::StalePolicy;
use crate::model::{
    Connection, ConnectionKey, Liveness, NodeId, NodeState, NodeView, ObservedConnection,
    ObservedSession, Session, SessionKind, Snapshot,
};
use crate::scheduler::{Batch, FetchOutcome};

/// Error annotation for a node whose fetch hit the per-node deadline.
pub const TIMEOUT_ERROR: &str = "fetch timed out";

/// Structural changes made by one reconciliation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReconcileSummary {
    pub seq: u64,
    pub online: usize,
    pub unreachable: usize,
    /// Configured nodes no round has reported on yet.
    pub pending: usize,
    pub sessions_added: usize,
    pub sessions_removed: usize,
    pub connections_added: usize,
    pub connections_removed: usize,
    /// Nodes whose stale subtree was dropped by the stale policy this round.
    pub stale_cleared: usize,
}

impl ReconcileSummary {
    /// Whether any session or connection appeared or vanished.
    pub fn has_structural_changes(&self) -> bool {
        self.sessions_added > 0
            || self.sessions_removed > 0
            || self.connections_added > 0
            || self.connections_removed > 0
            || self.stale_cleared > 0
    }
}

/// Output of [`reconcile`].
#[derive(Debug, Clone)]
pub struct Reconciliation {
    pub snapshot: Snapshot,
    pub summary: ReconcileSummary,
}

/// Merge `batch` into `previous`, producing the next snapshot.
///
/// Each configured node is handled on its own:
/// - a successful fetch replaces the node's subtree, carrying connection
///   continuity over by key;
/// - a failed fetch keeps the previous subtree and marks the node
///   unreachable (subject to `policy`);
/// - a node with no batch entry is carried over unchanged.
///
/// Batch entries for nodes that are not in `previous` are ignored.
pub fn reconcile(previous: &Snapshot, batch: &Batch, policy: StalePolicy) -> Reconciliation {
    let by_node: HashMap<&NodeId, &FetchOutcome> = batch
        .entries
        .iter()
        .map(|entry| (&entry.node, &entry.outcome))
        .collect();

    for id in by_node.keys() {
        if previous.node(id).is_none() {
            warn!(node = %id, "ignoring fetch result for unconfigured node");
        }
    }

    let mut summary = ReconcileSummary {
        seq: previous.seq() + 1,
        ..ReconcileSummary::default()
    };

    let nodes: Vec<NodeView> = previous
        .nodes()
        .iter()
        .map(|prev| match by_node.get(&prev.id) {
            Some(FetchOutcome::Success(state)) => {
                merge_success(prev, state, batch.completed_at, &mut summary)
            }
            Some(FetchOutcome::Timeout) => {
                merge_failure(prev, TIMEOUT_ERROR.to_owned(), policy, &mut summary)
            }
            Some(FetchOutcome::ConnectionError(detail)) => {
                merge_failure(prev, detail.clone(), policy, &mut summary)
            }
            None => prev.clone(),
        })
        .collect();

    for node in &nodes {
        match node.liveness {
            Liveness::Online => summary.online += 1,
            Liveness::Unreachable => summary.unreachable += 1,
            Liveness::Pending => summary.pending += 1,
        }
    }

    Reconciliation {
        snapshot: Snapshot::new(summary.seq, batch.completed_at, nodes),
        summary,
    }
}

fn merge_success(
    prev: &NodeView,
    state: &NodeState,
    now: DateTime<Utc>,
    summary: &mut ReconcileSummary,
) -> NodeView {
    let mut sessions = BTreeMap::new();

    for (&kind, observed) in &state.sessions {
        let prev_session = prev.session(kind);
        if prev_session.is_none() {
            summary.sessions_added += 1;
        }
        sessions.insert(kind, merge_session(kind, prev_session, observed, now, summary));
    }

    // Absence on success is authoritative.
    for (kind, prev_session) in &prev.sessions {
        if let Some(next) = sessions.get(kind) {
            summary.connections_removed += prev_session
                .connections
                .keys()
                .filter(|key| !next.connections.contains_key(*key))
                .count();
        } else {
            summary.sessions_removed += 1;
            summary.connections_removed += prev_session.connections.len();
        }
    }

    NodeView {
        liveness: Liveness::Online,
        last_seen: Some(now),
        last_error: None,
        consecutive_failures: 0,
        sessions,
        ..prev.clone_header()
    }
}

fn merge_session(
    kind: SessionKind,
    prev: Option<&Session>,
    observed: &ObservedSession,
    now: DateTime<Utc>,
    summary: &mut ReconcileSummary,
) -> Session {
    let connections = observed
        .connections
        .iter()
        .map(|(key, seen)| {
            let conn = if let Some(existing) = prev.and_then(|s| s.connection(key)) {
                carry_forward(existing, seen, now)
            } else {
                summary.connections_added += 1;
                first_observation(key, seen, now)
            };
            (key.clone(), conn)
        })
        .collect();

    Session { kind, connections }
}

fn first_observation(
    key: &ConnectionKey,
    seen: &ObservedConnection,
    now: DateTime<Utc>,
) -> Connection {
    Connection {
        key: key.clone(),
        remote_addr: seen.remote_addr.clone(),
        state: seen.state.clone(),
        last_message: seen.last_message.clone(),
        first_seen: now,
        last_updated: now,
    }
}

fn carry_forward(
    existing: &Connection,
    seen: &ObservedConnection,
    now: DateTime<Utc>,
) -> Connection {
    let changed = existing.state != seen.state || existing.last_message != seen.last_message;
    Connection {
        key: existing.key.clone(),
        remote_addr: seen.remote_addr.clone(),
        state: seen.state.clone(),
        last_message: seen.last_message.clone(),
        first_seen: existing.first_seen,
        last_updated: if changed { now } else { existing.last_updated },
    }
}

fn merge_failure(
    prev: &NodeView,
    error: String,
    policy: StalePolicy,
    summary: &mut ReconcileSummary,
) -> NodeView {
    let consecutive_failures = prev.consecutive_failures.saturating_add(1);

    let sessions = if policy.should_clear(consecutive_failures) && !prev.sessions.is_empty() {
        summary.stale_cleared += 1;
        BTreeMap::new()
    } else {
        prev.sessions.clone()
    };

    NodeView {
        liveness: Liveness::Unreachable,
        last_seen: prev.last_seen,
        last_error: Some(error),
        consecutive_failures,
        sessions,
        ..prev.clone_header()
    }
}

impl NodeView {
    /// Copy of the configured identity with an empty subtree, used as the
    /// base for struct-update expressions above.
    fn clone_header(&self) -> Self {
        Self {
            id: self.id.clone(),
            title: self.title.clone(),
            kind: self.kind,
            liveness: self.liveness,
            last_seen: self.last_seen,
            last_error: None,
            consecutive_failures: self.consecutive_failures,
            sessions: BTreeMap::new(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::num::NonZeroU32;
    use std::time::Duration;

    use chrono::TimeZone;
    use pretty_assertions::assert_eq;
    use url::Url;

    use super::*;
    use crate::config::{MonitorConfig, NodeConfig};
    use crate::model::{Message, MessageDirection, NodeKind};
    use crate::scheduler::NodeFetch;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    fn config() -> MonitorConfig {
        let url = Url::parse("http://127.0.0.1:26660").unwrap();
        MonitorConfig::new(vec![
            NodeConfig::new("a", url.clone()),
            NodeConfig::new("b", url).with_kind(NodeKind::Lilith),
        ])
    }

    fn observed(sessions: &[(SessionKind, &[&str])]) -> NodeState {
        let mut state = NodeState::default();
        for (kind, keys) in sessions {
            let mut session = ObservedSession::default();
            for key in *keys {
                session.connections.insert(
                    ConnectionKey::from(*key),
                    ObservedConnection {
                        remote_addr: (*key).to_owned(),
                        state: "connected".into(),
                        last_message: None,
                    },
                );
            }
            state.sessions.insert(*kind, session);
        }
        state
    }

    fn batch(completed: i64, entries: Vec<(&str, FetchOutcome)>) -> Batch {
        Batch {
            started_at: at(completed - 1),
            completed_at: at(completed),
            entries: entries
                .into_iter()
                .map(|(id, outcome)| NodeFetch {
                    node: NodeId::from(id),
                    outcome,
                    elapsed: Duration::from_millis(10),
                })
                .collect(),
        }
    }

    /// One round under the default (retain) policy.
    fn step(prev: &Snapshot, completed: i64, entries: Vec<(&str, FetchOutcome)>) -> Reconciliation {
        reconcile(prev, &batch(completed, entries), StalePolicy::default())
    }

    fn outbound(keys: &[&str]) -> FetchOutcome {
        FetchOutcome::Success(observed(&[(SessionKind::Outbound, keys)]))
    }

    fn node<'a>(snapshot: &'a Snapshot, id: &str) -> &'a NodeView {
        snapshot.node(&NodeId::from(id)).unwrap()
    }

    #[test]
    fn success_populates_node_and_bumps_seq() {
        let initial = Snapshot::initial(&config());
        let next = step(&initial, 10, vec![("a", outbound(&["1.2.3.4:9000"]))]);

        assert_eq!(next.snapshot.seq(), 1);
        let a = node(&next.snapshot, "a");
        assert_eq!(a.liveness, Liveness::Online);
        assert_eq!(a.last_seen, Some(at(10)));
        assert_eq!(a.connection_count(), 1);
        assert_eq!(next.summary.sessions_added, 1);
        assert_eq!(next.summary.connections_added, 1);
        assert_eq!(next.summary.online, 1);

        // b had no entry: carried over as pending, not counted unreachable.
        assert!(node(&next.snapshot, "b").is_pending());
        assert_eq!(next.summary.unreachable, 0);
        assert_eq!(next.summary.pending, 1);
    }

    #[test]
    fn pending_nodes_are_not_unreachable() {
        let initial = Snapshot::initial(&config());
        assert_eq!(initial.pending_count(), 2);
        assert_eq!(initial.unreachable_count(), 0);
        assert!(initial.nodes().iter().all(|n| !n.is_stale()));

        let next = step(&initial, 10, vec![("a", FetchOutcome::Timeout)]);
        assert_eq!(next.summary.unreachable, 1);
        assert_eq!(next.summary.pending, 1);
        assert_eq!(next.snapshot.unreachable_count(), 1);
        assert_eq!(next.snapshot.pending_count(), 1);
    }

    #[test]
    fn timeout_retains_subtree_and_last_seen() {
        let initial = Snapshot::initial(&config());
        let round1 = step(&initial, 10, vec![("a", outbound(&["1.2.3.4:9000"]))]);
        let round2 = step(&round1.snapshot, 20, vec![("a", FetchOutcome::Timeout)]);

        let before = node(&round1.snapshot, "a");
        let after = node(&round2.snapshot, "a");

        assert_eq!(after.sessions, before.sessions);
        assert_eq!(after.liveness, Liveness::Unreachable);
        assert_eq!(after.last_seen, Some(at(10)));
        assert_eq!(after.last_error.as_deref(), Some(TIMEOUT_ERROR));
        assert_eq!(after.consecutive_failures, 1);
        assert!(after.is_stale());
        assert!(!round2.summary.has_structural_changes());
    }

    #[test]
    fn connection_error_is_recorded_verbatim() {
        let initial = Snapshot::initial(&config());
        let refused = FetchOutcome::ConnectionError("Connection refused by http://x".into());
        let next = step(&initial, 5, vec![("b", refused)]);

        let b = node(&next.snapshot, "b");
        assert_eq!(b.last_error.as_deref(), Some("Connection refused by http://x"));
        assert_eq!(b.last_seen, None);
        assert!(!b.is_pending());
        assert!(b.is_unreachable());
    }

    #[test]
    fn continuing_connection_keeps_first_seen() {
        let initial = Snapshot::initial(&config());
        let r1 = step(&initial, 10, vec![("a", outbound(&["1.2.3.4:9000"]))]);
        let r2 = step(
            &r1.snapshot,
            20,
            vec![("a", outbound(&["1.2.3.4:9000", "5.6.7.8:9000"]))],
        );

        let session = node(&r2.snapshot, "a").session(SessionKind::Outbound).unwrap();
        let kept = session.connection(&"1.2.3.4:9000".into()).unwrap();
        let fresh = session.connection(&"5.6.7.8:9000".into()).unwrap();

        assert_eq!(kept.first_seen, at(10));
        assert_eq!(kept.last_updated, at(10));
        assert_eq!(fresh.first_seen, at(20));
        assert_eq!(r2.summary.connections_added, 1);
        assert_eq!(r2.summary.connections_removed, 0);
    }

    #[test]
    fn changed_message_moves_last_updated_only() {
        let initial = Snapshot::initial(&config());
        let r1 = step(&initial, 10, vec![("a", outbound(&["k"]))]);

        let mut state = observed(&[(SessionKind::Outbound, &["k"])]);
        let seen = state
            .sessions
            .get_mut(&SessionKind::Outbound)
            .unwrap()
            .connections
            .get_mut(&ConnectionKey::from("k"))
            .unwrap();
        seen.last_message = Some(Message {
            direction: MessageDirection::Sent,
            command: "ping".into(),
            timestamp: at(15),
        });
        let r2 = step(&r1.snapshot, 20, vec![("a", FetchOutcome::Success(state))]);

        let session = node(&r2.snapshot, "a").session(SessionKind::Outbound).unwrap();
        let conn = session.connection(&"k".into()).unwrap();
        assert_eq!(conn.first_seen, at(10));
        assert_eq!(conn.last_updated, at(20));
        assert_eq!(conn.last_message.as_ref().unwrap().command, "ping");
    }

    #[test]
    fn absent_session_on_success_is_removed() {
        let initial = Snapshot::initial(&config());
        let both = FetchOutcome::Success(observed(&[
            (SessionKind::Outbound, &["o1"][..]),
            (SessionKind::Seed, &["s1", "s2"][..]),
        ]));
        let r1 = step(&initial, 10, vec![("a", both)]);
        let r2 = step(&r1.snapshot, 20, vec![("a", outbound(&["o1"]))]);

        let a = node(&r2.snapshot, "a");
        assert!(a.session(SessionKind::Seed).is_none());
        assert!(a.session(SessionKind::Outbound).is_some());
        assert_eq!(r2.summary.sessions_removed, 1);
        assert_eq!(r2.summary.connections_removed, 2);
    }

    #[test]
    fn absent_session_on_failure_is_kept() {
        let initial = Snapshot::initial(&config());
        let seed = FetchOutcome::Success(observed(&[(SessionKind::Seed, &["s1"])]));
        let r1 = step(&initial, 10, vec![("a", seed)]);
        let reset = FetchOutcome::ConnectionError("reset".into());
        let r2 = step(&r1.snapshot, 20, vec![("a", reset)]);

        assert!(node(&r2.snapshot, "a").session(SessionKind::Seed).is_some());
    }

    #[test]
    fn recovery_clears_error_and_failure_count() {
        let initial = Snapshot::initial(&config());
        let r1 = step(&initial, 10, vec![("a", FetchOutcome::Timeout)]);
        let r2 = step(&r1.snapshot, 20, vec![("a", outbound(&[]))]);

        let a = node(&r2.snapshot, "a");
        assert_eq!(a.liveness, Liveness::Online);
        assert_eq!(a.last_error, None);
        assert_eq!(a.consecutive_failures, 0);
    }

    #[test]
    fn clear_after_policy_drops_stale_subtree() {
        let policy = StalePolicy::ClearAfter(NonZeroU32::new(2).unwrap());
        let initial = Snapshot::initial(&config());
        let r1 = reconcile(&initial, &batch(10, vec![("a", outbound(&["k"]))]), policy);
        let r2 = reconcile(&r1.snapshot, &batch(20, vec![("a", FetchOutcome::Timeout)]), policy);
        assert!(node(&r2.snapshot, "a").is_stale());

        let r3 = reconcile(&r2.snapshot, &batch(30, vec![("a", FetchOutcome::Timeout)]), policy);
        let a = node(&r3.snapshot, "a");
        assert!(a.sessions.is_empty());
        assert_eq!(a.liveness, Liveness::Unreachable);
        assert_eq!(a.last_seen, Some(at(10)));
        assert_eq!(r3.summary.stale_cleared, 1);
    }

    #[test]
    fn unknown_node_entries_are_ignored() {
        let initial = Snapshot::initial(&config());
        let next = step(&initial, 10, vec![("ghost", outbound(&["k"]))]);
        assert_eq!(next.snapshot.nodes().len(), 2);
        assert!(next.snapshot.node(&NodeId::from("ghost")).is_none());
    }

    #[test]
    fn node_order_in_batch_does_not_matter() {
        let initial = Snapshot::initial(&config());
        let forward = batch(10, vec![("a", outbound(&["k"])), ("b", FetchOutcome::Timeout)]);
        let reverse = batch(10, vec![("b", FetchOutcome::Timeout), ("a", outbound(&["k"]))]);

        let x = reconcile(&initial, &forward, StalePolicy::default());
        let y = reconcile(&initial, &reverse, StalePolicy::default());
        assert_eq!(x.snapshot, y.snapshot);
        assert_eq!(x.summary, y.summary);
    }

    #[test]
    fn node_order_follows_configuration() {
        let initial = Snapshot::initial(&config());
        let next = step(&initial, 10, vec![("b", outbound(&[])), ("a", outbound(&[]))]);
        let ids: Vec<&str> = next.snapshot.nodes().iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }
}
