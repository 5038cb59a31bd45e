// ── Navigation state ──
//
// A cursor over the topology tree held as a path of identities, never as
// references into a snapshot. Every publish re-resolves the path against
// the new tree and falls back to the nearest surviving ancestor.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, error};

use crate::error::CoreError;
use crate::model::{Connection, ConnectionKey, NodeId, NodeView, Session, SessionKind, Snapshot};

// ── Path ─────────────────────────────────────────────────────────────

/// Identity path of the focused entity: a node, optionally one of its
/// sessions, optionally one connection of that session.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NavigationPath {
    node: NodeId,
    session: Option<SessionKind>,
    connection: Option<ConnectionKey>,
}

impl NavigationPath {
    pub fn node(node: NodeId) -> Self {
        Self {
            node,
            session: None,
            connection: None,
        }
    }

    pub fn session(node: NodeId, kind: SessionKind) -> Self {
        Self {
            node,
            session: Some(kind),
            connection: None,
        }
    }

    pub fn connection(node: NodeId, kind: SessionKind, key: ConnectionKey) -> Self {
        Self {
            node,
            session: Some(kind),
            connection: Some(key),
        }
    }

    pub fn node_id(&self) -> &NodeId {
        &self.node
    }

    pub fn session_kind(&self) -> Option<SessionKind> {
        self.session
    }

    pub fn connection_key(&self) -> Option<&ConnectionKey> {
        self.connection.as_ref()
    }

    /// 0 for a node, 1 for a session, 2 for a connection.
    pub fn depth(&self) -> usize {
        match (self.session, &self.connection) {
            (None, _) => 0,
            (Some(_), None) => 1,
            (Some(_), Some(_)) => 2,
        }
    }

    /// The enclosing path, or `None` at node level.
    pub fn parent(&self) -> Option<Self> {
        match (self.session, &self.connection) {
            (None, _) => None,
            (Some(_), None) => Some(Self::node(self.node.clone())),
            (Some(kind), Some(_)) => Some(Self::session(self.node.clone(), kind)),
        }
    }
}

impl fmt::Display for NavigationPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.node)?;
        if let Some(kind) = self.session {
            write!(f, "/{kind}")?;
        }
        if let Some(key) = &self.connection {
            write!(f, "/{key}")?;
        }
        Ok(())
    }
}

// ── Commands ─────────────────────────────────────────────────────────

/// Cursor movement within the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Previous sibling.
    Up,
    /// Next sibling.
    Down,
    /// First child.
    In,
    /// Parent.
    Out,
}

/// Commands emitted by the presentation layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavCommand {
    MoveUp,
    MoveDown,
    Enter,
    Back,
    Quit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavOutcome {
    Moved,
    /// Clamped at an edge, or nothing to descend into.
    Unchanged,
    Quit,
}

/// How [`NavigationState::rebind`] treated the previous focus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rebind {
    /// The exact path still resolves.
    Kept,
    /// The focused entity vanished; focus moved to its nearest ancestor.
    Ancestor { lost: NavigationPath },
    /// The focused node itself vanished; focus reset to the first node.
    FirstNode { lost: NavigationPath },
}

/// The entity a path resolves to.
#[derive(Debug, Clone, Copy)]
pub enum Focus<'a> {
    Node(&'a NodeView),
    Session {
        node: &'a NodeView,
        session: &'a Session,
    },
    Connection {
        node: &'a NodeView,
        session: &'a Session,
        connection: &'a Connection,
    },
}

impl<'a> Focus<'a> {
    pub fn node(&self) -> &'a NodeView {
        match *self {
            Self::Node(node) | Self::Session { node, .. } | Self::Connection { node, .. } => node,
        }
    }
}

/// Resolve `path` in `snapshot`.
pub fn resolve<'a>(snapshot: &'a Snapshot, path: &NavigationPath) -> Option<Focus<'a>> {
    let node = snapshot.node(&path.node)?;
    let Some(kind) = path.session else {
        return Some(Focus::Node(node));
    };
    let session = node.session(kind)?;
    let Some(key) = &path.connection else {
        return Some(Focus::Session { node, session });
    };
    let connection = session.connection(key)?;
    Some(Focus::Connection {
        node,
        session,
        connection,
    })
}

// ── State ────────────────────────────────────────────────────────────

/// The user's cursor together with the snapshot it is bound to.
///
/// Invariant: `path` always resolves in `snapshot`.
#[derive(Debug, Clone)]
pub struct NavigationState {
    snapshot: Arc<Snapshot>,
    path: NavigationPath,
}

impl NavigationState {
    /// Focus the first node of `snapshot`.
    pub fn new(snapshot: Arc<Snapshot>) -> Result<Self, CoreError> {
        let first = snapshot.first_node().ok_or(CoreError::NoNodes)?;
        let path = NavigationPath::node(first.id.clone());
        Ok(Self { snapshot, path })
    }

    pub fn current_focus(&self) -> &NavigationPath {
        &self.path
    }

    pub fn snapshot(&self) -> &Arc<Snapshot> {
        &self.snapshot
    }

    /// The focused entity, for the detail pane.
    pub fn resolve(&self) -> Result<Focus<'_>, CoreError> {
        resolve(&self.snapshot, &self.path).ok_or_else(|| {
            error!(
                path = %self.path,
                seq = self.snapshot.seq(),
                "navigation path does not resolve"
            );
            CoreError::UnresolvablePath {
                path: self.path.to_string(),
            }
        })
    }

    pub fn move_focus(&mut self, direction: Direction) -> NavOutcome {
        let target = match direction {
            Direction::Up => self.sibling(false),
            Direction::Down => self.sibling(true),
            Direction::In => self.first_child(),
            Direction::Out => self.path.parent(),
        };
        match target {
            Some(path) if path != self.path => {
                self.path = path;
                NavOutcome::Moved
            }
            _ => NavOutcome::Unchanged,
        }
    }

    pub fn apply(&mut self, command: NavCommand) -> NavOutcome {
        match command {
            NavCommand::MoveUp => self.move_focus(Direction::Up),
            NavCommand::MoveDown => self.move_focus(Direction::Down),
            NavCommand::Enter => self.move_focus(Direction::In),
            NavCommand::Back => self.move_focus(Direction::Out),
            NavCommand::Quit => NavOutcome::Quit,
        }
    }

    /// Bind the cursor to a newly published snapshot.
    ///
    /// Fails only on a snapshot without nodes, in which case the state is
    /// left untouched.
    pub fn rebind(&mut self, snapshot: Arc<Snapshot>) -> Result<Rebind, CoreError> {
        let Some(first) = snapshot.first_node() else {
            error!(
                seq = snapshot.seq(),
                "refusing to bind navigation to a snapshot without nodes"
            );
            return Err(CoreError::NoNodes);
        };
        let first = NavigationPath::node(first.id.clone());

        if resolve(&snapshot, &self.path).is_some() {
            self.snapshot = snapshot;
            return Ok(Rebind::Kept);
        }

        let lost = self.path.clone();
        let mut candidate = self.path.parent();
        while let Some(path) = candidate {
            if resolve(&snapshot, &path).is_some() {
                debug!(
                    lost = %lost,
                    focus = %path,
                    seq = snapshot.seq(),
                    "focused entity vanished, moved to parent"
                );
                self.path = path;
                self.snapshot = snapshot;
                return Ok(Rebind::Ancestor { lost });
            }
            candidate = path.parent();
        }

        error!(
            lost = %lost,
            focus = %first,
            seq = snapshot.seq(),
            "focused node vanished from snapshot"
        );
        self.path = first;
        self.snapshot = snapshot;
        Ok(Rebind::FirstNode { lost })
    }

    fn sibling(&self, forward: bool) -> Option<NavigationPath> {
        let snapshot = &self.snapshot;
        let node_id = &self.path.node;

        match (self.path.session, &self.path.connection) {
            (None, _) => {
                let idx = snapshot.node_index(node_id)?;
                let next = neighbour(idx, snapshot.nodes().len(), forward)?;
                let node = snapshot.nodes().get(next)?;
                Some(NavigationPath::node(node.id.clone()))
            }
            (Some(kind), None) => {
                let node = snapshot.node(node_id)?;
                let idx = node.sessions.keys().position(|k| *k == kind)?;
                let next = neighbour(idx, node.sessions.len(), forward)?;
                let next_kind = node.sessions.keys().nth(next)?;
                Some(NavigationPath::session(node_id.clone(), *next_kind))
            }
            (Some(kind), Some(key)) => {
                let session = snapshot.node(node_id)?.session(kind)?;
                let idx = session.connections.keys().position(|k| k == key)?;
                let next = neighbour(idx, session.connections.len(), forward)?;
                let next_key = session.connections.keys().nth(next)?;
                Some(NavigationPath::connection(node_id.clone(), kind, next_key.clone()))
            }
        }
    }

    fn first_child(&self) -> Option<NavigationPath> {
        let node = self.snapshot.node(&self.path.node)?;
        match (self.path.session, &self.path.connection) {
            (None, _) => {
                let kind = node.sessions.keys().next()?;
                Some(NavigationPath::session(node.id.clone(), *kind))
            }
            (Some(kind), None) => {
                let key = node.session(kind)?.connections.keys().next()?;
                Some(NavigationPath::connection(node.id.clone(), kind, key.clone()))
            }
            (Some(_), Some(_)) => None,
        }
    }
}

/// Index of the clamped neighbour, or `None` at the edge.
fn neighbour(idx: usize, len: usize, forward: bool) -> Option<usize> {
    if forward {
        let next = idx + 1;
        (next < len).then_some(next)
    } else {
        idx.checked_sub(1)
    }
}
