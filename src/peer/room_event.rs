use crate::peer::link_state::LinkState;
use crate::signaling::JoinErrorCode;
use crate::signaling::protocol::{Participant, RoomId, SessionId};

/// What the orchestrator reports to the embedding application for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoomEvent {
    /// The server assigned our session id.
    Connected { session_id: SessionId },
    /// We are in the room; `members` were there before us, oldest first.
    Joined {
        room_id: RoomId,
        members: Vec<Participant>,
    },
    /// `None` for a code this client does not know.
    JoinRejected { code: Option<JoinErrorCode> },
    MemberJoined(Participant),
    MemberLeft { session_id: SessionId },
    LinkChanged { remote: SessionId, state: LinkState },
    PeerUnreachable { session_id: SessionId },
    Error {
        remote: Option<SessionId>,
        message: String,
    },
    Left,
    Disconnected,
}
