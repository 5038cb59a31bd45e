// ── Domain model ──
//
// Node → Session → Connection → last Message, plus the snapshot that
// wraps the whole tree and the observed shape of a single fetch.

pub mod node;
pub mod observed;
pub mod session;
pub mod snapshot;

pub use node::{Liveness, NodeId, NodeKind, NodeView};
pub use observed::{NodeState, ObservedConnection, ObservedSession};
pub use session::{Connection, ConnectionKey, Message, MessageDirection, Session, SessionKind};
pub use snapshot::Snapshot;
