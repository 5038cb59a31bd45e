// ── Published topology snapshot ──

use chrono::{DateTime, Utc};

use super::node::{NodeId, NodeView};
use crate::config::MonitorConfig;

/// An immutable, versioned view of the whole topology tree.
///
/// Produced by reconciliation and shared as `Arc<Snapshot>`; there is no
/// way to mutate one after construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    seq: u64,
    published_at: Option<DateTime<Utc>>,
    /// Configured nodes, in configuration order.
    nodes: Vec<NodeView>,
}

impl Snapshot {
    /// Sequence 0: every configured node pending, nothing fetched yet.
    pub fn initial(config: &MonitorConfig) -> Self {
        Self {
            seq: 0,
            published_at: None,
            nodes: config.nodes.iter().map(NodeView::pending).collect(),
        }
    }

    pub(crate) fn new(seq: u64, published_at: DateTime<Utc>, nodes: Vec<NodeView>) -> Self {
        Self {
            seq,
            published_at: Some(published_at),
            nodes,
        }
    }

    pub fn seq(&self) -> u64 {
        self.seq
    }

    pub fn published_at(&self) -> Option<DateTime<Utc>> {
        self.published_at
    }

    pub fn nodes(&self) -> &[NodeView] {
        &self.nodes
    }

    pub fn node(&self, id: &NodeId) -> Option<&NodeView> {
        self.nodes.iter().find(|n| &n.id == id)
    }

    pub fn node_index(&self, id: &NodeId) -> Option<usize> {
        self.nodes.iter().position(|n| &n.id == id)
    }

    pub fn first_node(&self) -> Option<&NodeView> {
        self.nodes.first()
    }

    pub fn online_count(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_online()).count()
    }

    pub fn unreachable_count(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_unreachable()).count()
    }

    /// Nodes no round has reported on yet.
    pub fn pending_count(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_pending()).count()
    }
}
