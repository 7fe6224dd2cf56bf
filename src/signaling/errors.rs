use thiserror::Error;

use crate::signaling::protocol::{RoomId, SessionId, SignalKind};
use crate::signaling::types::ClientId;

/// Codes carried by `SignalingMsg::JoinErr`.
#[repr(u16)]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum JoinErrorCode {
    NotRegistered = 10,
    InvalidRoom = 20,
    SessionMismatch = 22,
}

impl JoinErrorCode {
    pub fn as_u16(self) -> u16 {
        self as u16
    }

    pub fn from_u16(code: u16) -> Option<Self> {
        match code {
            10 => Some(Self::NotRegistered),
            20 => Some(Self::InvalidRoom),
            22 => Some(Self::SessionMismatch),
            _ => None,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("session limit of {max} reached")]
    Exhausted { max: usize },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum JoinError {
    #[error("room {0:?} was rejected by the room directory")]
    InvalidRoom(RoomId),
    #[error("session {0} is not registered")]
    UnknownSession(SessionId),
}

impl JoinError {
    pub fn code(&self) -> JoinErrorCode {
        match self {
            Self::InvalidRoom(_) => JoinErrorCode::InvalidRoom,
            Self::UnknownSession(_) => JoinErrorCode::NotRegistered,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RelayError {
    #[error("{kind:?} for {target} dropped: peer unreachable")]
    PeerUnreachable { kind: SignalKind, target: SessionId },
    #[error("malformed envelope: {0}")]
    MalformedEnvelope(&'static str),
    #[error("client {client} claimed sender {claimed} but owns {actual}")]
    SpoofedSender {
        client: ClientId,
        claimed: SessionId,
        actual: SessionId,
    },
    #[error("client {0} has no session")]
    NotRegistered(ClientId),
}
