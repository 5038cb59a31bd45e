// ── Poll scheduler ──
//
// Runs one round: a concurrent fetch per configured node, each under its
// own deadline, collected into a single `Batch`. The round only returns
// once every fetch has finished or timed out, so a batch is never partial.
// Pacing between rounds lives in the monitor's poll task.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures_util::future::join_all;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::config::NodeConfig;
use crate::gateway::NodeGateway;
use crate::model::{NodeId, NodeState};

/// Result of fetching one node within a round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    Success(NodeState),
    /// The per-node deadline passed (or the transport itself timed out).
    Timeout,
    /// Unreachable, refused, or answered with something unusable.
    ConnectionError(String),
}

impl FetchOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }
}

/// One batch entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeFetch {
    pub node: NodeId,
    pub outcome: FetchOutcome,
    pub elapsed: Duration,
}

/// Everything one round produced, in configuration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch {
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub entries: Vec<NodeFetch>,
}

impl Batch {
    pub fn success_count(&self) -> usize {
        self.entries.iter().filter(|e| e.outcome.is_success()).count()
    }
}

/// Issues the fetches for a round.
pub struct Poller<G> {
    gateway: G,
    nodes: Arc<[NodeConfig]>,
    fetch_timeout: Duration,
}

impl<G: NodeGateway> Poller<G> {
    pub fn new(gateway: G, nodes: Vec<NodeConfig>, fetch_timeout: Duration) -> Self {
        Self {
            gateway,
            nodes: nodes.into(),
            fetch_timeout,
        }
    }

    pub fn nodes(&self) -> &[NodeConfig] {
        &self.nodes
    }

    /// Fetch every configured node concurrently and wait for all of them.
    pub async fn run_round(&self) -> Batch {
        let started_at = Utc::now();
        let fetches: Vec<_> = self.nodes.iter().map(|node| self.fetch_one(node)).collect();
        let entries = join_all(fetches).await;
        Batch {
            started_at,
            completed_at: Utc::now(),
            entries,
        }
    }

    async fn fetch_one(&self, node: &NodeConfig) -> NodeFetch {
        let started = Instant::now();
        let fetch = self.gateway.fetch_node_state(&node.endpoint);

        let outcome = match tokio::time::timeout(self.fetch_timeout, fetch).await {
            Err(_elapsed) => FetchOutcome::Timeout,
            Ok(Err(e)) if e.is_timeout() => FetchOutcome::Timeout,
            Ok(Err(e)) => FetchOutcome::ConnectionError(e.to_string()),
            Ok(Ok(payload)) => match NodeState::try_from(payload) {
                Ok(state) => FetchOutcome::Success(state),
                Err(e) => FetchOutcome::ConnectionError(e.to_string()),
            },
        };
        let elapsed = started.elapsed();
        let elapsed_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);

        match &outcome {
            FetchOutcome::Success(state) => {
                debug!(
                    node = %node.id,
                    sessions = state.sessions.len(),
                    elapsed_ms,
                    "node fetch succeeded"
                );
            }
            FetchOutcome::Timeout => {
                warn!(node = %node.id, elapsed_ms, "node fetch timed out");
            }
            FetchOutcome::ConnectionError(error) => {
                warn!(node = %node.id, %error, elapsed_ms, "node fetch failed");
            }
        }

        NodeFetch {
            node: node.id.clone(),
            outcome,
            elapsed,
        }
    }
}
