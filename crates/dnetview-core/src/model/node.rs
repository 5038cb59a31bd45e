// ── Node domain types ──

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display};

use super::session::{Session, SessionKind};
use crate::config::NodeConfig;

/// Stable, user-assigned node identity taken from configuration.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl From<String> for NodeId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// What sort of daemon sits behind an endpoint.
///
/// `Lilith` nodes are seed/bootstrap daemons; they report the same session
/// shape but are rendered differently.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Display, AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "UPPERCASE")]
pub enum NodeKind {
    #[default]
    Normal,
    Lilith,
}

/// Reachability as of the latest round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
pub enum Liveness {
    /// No fetch for this node has completed yet.
    Pending,
    Online,
    Unreachable,
}

/// One configured node and everything last known about it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeView {
    pub id: NodeId,
    pub title: String,
    pub kind: NodeKind,
    pub liveness: Liveness,
    /// Completion time of the last round in which this node answered.
    pub last_seen: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    /// Failed rounds since the last successful fetch.
    pub consecutive_failures: u32,
    pub sessions: BTreeMap<SessionKind, Session>,
}

impl NodeView {
    /// A node that has not been polled yet.
    pub fn pending(config: &NodeConfig) -> Self {
        Self {
            id: config.id.clone(),
            title: config.title.clone(),
            kind: config.kind,
            liveness: Liveness::Pending,
            last_seen: None,
            last_error: None,
            consecutive_failures: 0,
            sessions: BTreeMap::new(),
        }
    }

    pub fn session(&self, kind: SessionKind) -> Option<&Session> {
        self.sessions.get(&kind)
    }

    pub fn is_online(&self) -> bool {
        self.liveness == Liveness::Online
    }

    pub fn is_pending(&self) -> bool {
        self.liveness == Liveness::Pending
    }

    pub fn is_unreachable(&self) -> bool {
        self.liveness == Liveness::Unreachable
    }

    /// Unreachable but still showing data from an earlier success.
    pub fn is_stale(&self) -> bool {
        self.is_unreachable() && !self.sessions.is_empty()
    }

    pub fn connection_count(&self) -> usize {
        self.sessions.values().map(|s| s.connections.len()).sum()
    }
}
