// ── Runtime monitor configuration ──
//
// These types describe *what* to poll and how often. They never touch
// disk: dnetview-config (or a test) builds a `MonitorConfig` and hands it
// to `Monitor::new`, which validates it once.

use std::collections::HashSet;
use std::num::NonZeroU32;
use std::time::Duration;

use url::Url;

use crate::error::CoreError;
use crate::model::{NodeId, NodeKind};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(5);

/// One node to monitor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeConfig {
    pub id: NodeId,
    pub title: String,
    pub kind: NodeKind,
    /// JSON-RPC endpoint, e.g. `http://127.0.0.1:26660`.
    pub endpoint: Url,
}

impl NodeConfig {
    pub fn new(id: impl Into<NodeId>, endpoint: Url) -> Self {
        let id = id.into();
        Self {
            title: id.to_string(),
            id,
            kind: NodeKind::Normal,
            endpoint,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_kind(mut self, kind: NodeKind) -> Self {
        self.kind = kind;
        self
    }
}

/// What to do with the last-known subtree of a node that keeps failing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StalePolicy {
    /// Keep showing the last successful observation indefinitely.
    #[default]
    RetainForever,
    /// Drop a node's sessions once it has failed this many rounds in a row.
    ClearAfter(NonZeroU32),
}

impl StalePolicy {
    pub(crate) fn should_clear(self, consecutive_failures: u32) -> bool {
        match self {
            Self::RetainForever => false,
            Self::ClearAfter(limit) => consecutive_failures >= limit.get(),
        }
    }
}

/// Configuration for a monitor instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorConfig {
    /// Fixed for the process lifetime; order is display order.
    pub nodes: Vec<NodeConfig>,
    /// Period between round starts.
    pub poll_interval: Duration,
    /// Per-node fetch deadline within a round.
    pub fetch_timeout: Duration,
    pub stale_policy: StalePolicy,
}

impl MonitorConfig {
    pub fn new(nodes: Vec<NodeConfig>) -> Self {
        Self {
            nodes,
            poll_interval: DEFAULT_POLL_INTERVAL,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
            stale_policy: StalePolicy::default(),
        }
    }

    /// Check the startup invariants: a non-empty node set with unique ids
    /// and non-zero timings.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.nodes.is_empty() {
            return Err(CoreError::NoNodes);
        }

        let mut seen = HashSet::with_capacity(self.nodes.len());
        for node in &self.nodes {
            if !seen.insert(&node.id) {
                return Err(CoreError::DuplicateNode {
                    id: node.id.to_string(),
                });
            }
        }

        if self.poll_interval.is_zero() {
            return Err(CoreError::Config {
                message: "poll interval must be greater than zero".into(),
            });
        }
        if self.fetch_timeout.is_zero() {
            return Err(CoreError::Config {
                message: "fetch timeout must be greater than zero".into(),
            });
        }

        Ok(())
    }
}
