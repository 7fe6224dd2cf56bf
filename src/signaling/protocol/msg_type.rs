// ---- Message type byte ----------------------------------------------------

use crate::signaling::protocol::ProtoError;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[repr(u8)]
pub enum MsgType {
    Hello = 0x01,
    Welcome = 0x02,

    JoinRoom = 0x10,
    ExistingMembers = 0x11,
    JoinErr = 0x12,
    LeaveRoom = 0x13,
    ParticipantJoined = 0x14,
    ParticipantLeft = 0x15,

    Signal = 0x20,
    PeerUnreachable = 0x21,

    Ping = 0x30,
    Pong = 0x31,
}

impl MsgType {
    pub fn from_u8(v: u8) -> Result<MsgType, ProtoError> {
        use MsgType::*;
        match v {
            0x01 => Ok(Hello),
            0x02 => Ok(Welcome),
            0x10 => Ok(JoinRoom),
            0x11 => Ok(ExistingMembers),
            0x12 => Ok(JoinErr),
            0x13 => Ok(LeaveRoom),
            0x14 => Ok(ParticipantJoined),
            0x15 => Ok(ParticipantLeft),
            0x20 => Ok(Signal),
            0x21 => Ok(PeerUnreachable),
            0x30 => Ok(Ping),
            0x31 => Ok(Pong),
            other => Err(ProtoError::UnknownType(other)),
        }
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }
}
