// ── Wire → domain conversion ──
//
// Turns a raw `NodeStatePayload` from dnetview-api into the keyed
// `NodeState` the reconciler consumes. Structural problems the serde layer
// can't catch (a session kind listed twice, a connection key repeated,
// an out-of-range timestamp) are reported as `CoreError::InvalidPayload`.

use std::collections::btree_map::Entry;

use chrono::{DateTime, Utc};

use dnetview_api::{
    ConnectionPayload, MessageDirectionTag, MessagePayload, NodeStatePayload, SessionKindTag,
};

use crate::error::CoreError;
use crate::model::{
    ConnectionKey, Message, MessageDirection, NodeState, ObservedConnection, ObservedSession,
    SessionKind,
};

impl From<SessionKindTag> for SessionKind {
    fn from(tag: SessionKindTag) -> Self {
        match tag {
            SessionKindTag::Outbound => Self::Outbound,
            SessionKindTag::Inbound => Self::Inbound,
            SessionKindTag::Manual => Self::Manual,
            SessionKindTag::Seed => Self::Seed,
        }
    }
}

impl From<MessageDirectionTag> for MessageDirection {
    fn from(tag: MessageDirectionTag) -> Self {
        match tag {
            MessageDirectionTag::Send => Self::Sent,
            MessageDirectionTag::Recv => Self::Received,
        }
    }
}

impl TryFrom<MessagePayload> for Message {
    type Error = CoreError;

    fn try_from(raw: MessagePayload) -> Result<Self, Self::Error> {
        let timestamp =
            DateTime::<Utc>::from_timestamp(raw.timestamp, 0).ok_or_else(|| {
                CoreError::InvalidPayload {
                    reason: format!("message timestamp {} out of range", raw.timestamp),
                }
            })?;
        Ok(Self {
            direction: raw.direction.into(),
            command: raw.command,
            timestamp,
        })
    }
}

impl TryFrom<ConnectionPayload> for ObservedConnection {
    type Error = CoreError;

    fn try_from(raw: ConnectionPayload) -> Result<Self, Self::Error> {
        Ok(Self {
            last_message: raw.last_message.map(Message::try_from).transpose()?,
            remote_addr: raw.addr,
            state: raw.state,
        })
    }
}

impl TryFrom<NodeStatePayload> for NodeState {
    type Error = CoreError;

    fn try_from(raw: NodeStatePayload) -> Result<Self, Self::Error> {
        let mut state = NodeState::default();

        for session in raw.sessions {
            let kind = SessionKind::from(session.kind);
            let Entry::Vacant(slot) = state.sessions.entry(kind) else {
                return Err(CoreError::InvalidPayload {
                    reason: format!("session kind {kind} reported more than once"),
                });
            };

            let mut observed = ObservedSession::default();
            for conn in session.connections {
                let key = ConnectionKey::new(&conn.addr, conn.slot);
                let Entry::Vacant(conn_slot) = observed.connections.entry(key) else {
                    return Err(CoreError::InvalidPayload {
                        reason: format!(
                            "connection {} reported more than once in {kind} session",
                            ConnectionKey::new(&conn.addr, conn.slot)
                        ),
                    });
                };
                conn_slot.insert(ObservedConnection::try_from(conn)?);
            }
            slot.insert(observed);
        }

        Ok(state)
    }
}
