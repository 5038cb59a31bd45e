// ── Session, connection and message types ──

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter};

/// The kind of a session. Declaration order is the display order.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    EnumIter,
)]
#[serde(rename_all = "lowercase")]
pub enum SessionKind {
    Outbound,
    Inbound,
    Manual,
    Seed,
}

/// Connection identity within a session.
///
/// Derived from what the node reports (remote address, plus the local slot
/// where the session has fixed slots) so the same logical link maps to the
/// same key on every poll. Orders by address, then slot.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ConnectionKey {
    addr: String,
    slot: Option<u32>,
}

impl ConnectionKey {
    pub fn new(addr: impl Into<String>, slot: Option<u32>) -> Self {
        Self {
            addr: addr.into(),
            slot,
        }
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }

    pub fn slot(&self) -> Option<u32> {
        self.slot
    }
}

impl fmt::Display for ConnectionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.slot {
            Some(slot) => write!(f, "{}#{slot}", self.addr),
            None => f.write_str(&self.addr),
        }
    }
}

/// A slotless key for `addr`.
impl From<&str> for ConnectionKey {
    fn from(addr: &str) -> Self {
        Self::new(addr, None)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
pub enum MessageDirection {
    Sent,
    Received,
}

/// The most recent message seen on a connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub direction: MessageDirection,
    pub command: String,
    pub timestamp: DateTime<Utc>,
}

/// A connection as it appears in a published snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Connection {
    pub key: ConnectionKey,
    pub remote_addr: String,
    pub state: String,
    pub last_message: Option<Message>,
    /// When this key was first observed. Survives rounds in which the key
    /// stays present; a reappearing key starts over.
    pub first_seen: DateTime<Utc>,
    /// When `state` or `last_message` last changed.
    pub last_updated: DateTime<Utc>,
}

/// A session and its connections, ordered by key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub kind: SessionKind,
    pub connections: BTreeMap<ConnectionKey, Connection>,
}

impl Session {
    pub fn connection(&self, key: &ConnectionKey) -> Option<&Connection> {
        self.connections.get(key)
    }
}
