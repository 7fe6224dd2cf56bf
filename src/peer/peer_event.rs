use std::sync::mpsc::Sender;

use crate::peer::media::RemoteStream;
use crate::signaling::protocol::{Participant, RoomId, Seq, SessionId, SignalKind, SignalingMsg};
use crate::signaling_client::SignalingEvent;

/// Everything that can move a peer link, in the order it happened.
///
/// Signaling messages and platform callbacks share one queue so the
/// orchestrator sees a single, ordered history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PeerEvent {
    // From the signaling server
    Welcome {
        session_id: SessionId,
    },
    Snapshot {
        room_id: RoomId,
        joined_at: Seq,
        members: Vec<Participant>,
    },
    JoinRejected {
        code: u16,
    },
    ParticipantJoined(Participant),
    ParticipantLeft {
        session_id: SessionId,
    },
    OfferReceived {
        from: SessionId,
        sdp: Vec<u8>,
    },
    AnswerReceived {
        from: SessionId,
        sdp: Vec<u8>,
    },
    CandidateReceived {
        from: SessionId,
        candidate: Vec<u8>,
    },
    PeerUnreachable {
        session_id: SessionId,
    },
    SignalingLost,

    // From the platform peer connection
    LocalCandidate {
        remote: SessionId,
        candidate: Vec<u8>,
    },
    ConnectivityConfirmed {
        remote: SessionId,
    },
    RemoteStream {
        remote: SessionId,
        stream: RemoteStream,
    },
    RemoteEnded {
        remote: SessionId,
    },
}

impl PeerEvent {
    /// Maps a signaling event to a peer event. Messages the client has no
    /// use for (pong, server-bound kinds) map to `None`.
    pub fn from_signaling(event: SignalingEvent) -> Option<Self> {
        let msg = match event {
            SignalingEvent::Msg(msg) => msg,
            SignalingEvent::Error(_) => return None,
            SignalingEvent::Disconnected => return Some(Self::SignalingLost),
        };
        let ev = match msg {
            SignalingMsg::Welcome { session_id } => Self::Welcome { session_id },
            SignalingMsg::ExistingMembers {
                room_id,
                joined_at,
                members,
            } => Self::Snapshot {
                room_id,
                joined_at,
                members,
            },
            SignalingMsg::JoinErr { code } => Self::JoinRejected { code },
            SignalingMsg::ParticipantJoined { participant } => Self::ParticipantJoined(participant),
            SignalingMsg::ParticipantLeft { session_id } => Self::ParticipantLeft { session_id },
            SignalingMsg::PeerUnreachable { session_id } => Self::PeerUnreachable { session_id },
            SignalingMsg::Signal(env) => match env.kind {
                SignalKind::Offer => Self::OfferReceived {
                    from: env.from,
                    sdp: env.payload,
                },
                SignalKind::Answer => Self::AnswerReceived {
                    from: env.from,
                    sdp: env.payload,
                },
                SignalKind::Candidate => Self::CandidateReceived {
                    from: env.from,
                    candidate: env.payload,
                },
            },
            _ => return None,
        };
        Some(ev)
    }
}

/// Handle a peer connection uses to report back, bound to one remote.
///
/// Every method returns `false` once the orchestrator is gone.
#[derive(Debug, Clone)]
pub struct PeerEventSender {
    tx: Sender<PeerEvent>,
    remote: SessionId,
}

impl PeerEventSender {
    pub(crate) fn new(tx: Sender<PeerEvent>, remote: SessionId) -> Self {
        Self { tx, remote }
    }

    pub fn remote(&self) -> &SessionId {
        &self.remote
    }

    pub fn local_candidate(&self, candidate: Vec<u8>) -> bool {
        self.emit(PeerEvent::LocalCandidate {
            remote: self.remote.clone(),
            candidate,
        })
    }

    pub fn connected(&self) -> bool {
        self.emit(PeerEvent::ConnectivityConfirmed {
            remote: self.remote.clone(),
        })
    }

    pub fn remote_stream(&self, stream: RemoteStream) -> bool {
        self.emit(PeerEvent::RemoteStream {
            remote: self.remote.clone(),
            stream,
        })
    }

    pub fn ended(&self) -> bool {
        self.emit(PeerEvent::RemoteEnded {
            remote: self.remote.clone(),
        })
    }

    fn emit(&self, ev: PeerEvent) -> bool {
        self.tx.send(ev).is_ok()
    }
}
