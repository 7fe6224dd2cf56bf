use crate::signaling::protocol::ProtoError;

// ---- Basic types ----------------------------------------------------------

/// Opaque id the server assigns to a transport connection.
pub type SessionId = String;
/// Externally supplied meeting code.
pub type RoomId = String;
/// Human-facing participant name, display only.
pub type Label = String;
/// Logical sequence number (join order), never wall-clock.
pub type Seq = u64;

/// What a relayed envelope carries. The relay only reads this for logging.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
#[repr(u8)]
pub enum SignalKind {
    Offer = 1,
    Answer = 2,
    Candidate = 3,
}

impl SignalKind {
    pub fn from_u8(v: u8) -> Result<Self, ProtoError> {
        match v {
            1 => Ok(Self::Offer),
            2 => Ok(Self::Answer),
            3 => Ok(Self::Candidate),
            other => Err(ProtoError::UnknownSignalKind(other)),
        }
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Offer => "offer",
            Self::Answer => "answer",
            Self::Candidate => "candidate",
        }
    }
}

/// Addressed, opaque signaling payload between two sessions.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SignalEnvelope {
    pub kind: SignalKind,
    pub from: SessionId,
    pub to: SessionId,
    /// SDP or candidate bytes; never inspected by the server.
    pub payload: Vec<u8>,
}

/// A room member as seen on the wire.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Participant {
    pub session_id: SessionId,
    /// Position in the room's join order.
    pub joined_at: Seq,
    pub label: Option<Label>,
}

// ---- Public message enum --------------------------------------------------

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SignalingMsg {
    // Handshake
    Hello {
        client_version: String,
    },
    /// Server -> client, once per connection.
    Welcome {
        session_id: SessionId,
    },

    // Room membership
    JoinRoom {
        room_id: RoomId,
        session_id: SessionId,
        label: Option<Label>,
    },
    /// Sent once to the joiner: members present before it, in join order.
    ExistingMembers {
        room_id: RoomId,
        /// The joiner's own position in the join order.
        joined_at: Seq,
        members: Vec<Participant>,
    },
    JoinErr {
        code: u16, // JoinErrorCode
    },
    LeaveRoom,
    ParticipantJoined {
        participant: Participant,
    },
    ParticipantLeft {
        session_id: SessionId,
    },

    // Relay
    Signal(SignalEnvelope),
    PeerUnreachable {
        session_id: SessionId,
    },

    // Keepalive
    Ping {
        nonce: u64,
    },
    Pong {
        nonce: u64,
    },
}

impl SignalingMsg {
    /// Short variant name for logging. Never includes payloads.
    pub fn name(&self) -> &'static str {
        use SignalingMsg::*;
        match self {
            Hello { .. } => "Hello",
            Welcome { .. } => "Welcome",
            JoinRoom { .. } => "JoinRoom",
            ExistingMembers { .. } => "ExistingMembers",
            JoinErr { .. } => "JoinErr",
            LeaveRoom => "LeaveRoom",
            ParticipantJoined { .. } => "ParticipantJoined",
            ParticipantLeft { .. } => "ParticipantLeft",
            Signal(_) => "Signal",
            PeerUnreachable { .. } => "PeerUnreachable",
            Ping { .. } => "Ping",
            Pong { .. } => "Pong",
        }
    }
}
