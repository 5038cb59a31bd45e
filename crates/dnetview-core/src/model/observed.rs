// ── Observed node state ──
//
// The shape of one successful fetch after conversion from the wire payload:
// sessions keyed by kind, connections keyed by their stable key. Carries no
// history -- reconciliation merges it into the previous snapshot.

use std::collections::BTreeMap;

use super::session::{ConnectionKey, Message, SessionKind};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NodeState {
    pub sessions: BTreeMap<SessionKind, ObservedSession>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ObservedSession {
    pub connections: BTreeMap<ConnectionKey, ObservedConnection>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObservedConnection {
    pub remote_addr: String,
    pub state: String,
    pub last_message: Option<Message>,
}
