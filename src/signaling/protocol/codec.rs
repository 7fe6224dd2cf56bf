use super::{MsgType, Participant, ProtoError, SignalEnvelope, SignalKind, SignalingMsg};
use std::str;

// ---- Encode to body bytes -------------------------------------------------

pub fn encode_msg(msg: &SignalingMsg) -> Result<(MsgType, Vec<u8>), ProtoError> {
    use SignalingMsg::*;
    let mut body = Vec::new();

    let msg_type = match msg {
        Hello { client_version } => {
            put_str16(&mut body, client_version)?;
            MsgType::Hello
        }
        Welcome { session_id } => {
            put_str16(&mut body, session_id)?;
            MsgType::Welcome
        }

        JoinRoom {
            room_id,
            session_id,
            label,
        } => {
            put_str16(&mut body, room_id)?;
            put_str16(&mut body, session_id)?;
            put_opt_str16(&mut body, label.as_deref())?;
            MsgType::JoinRoom
        }
        ExistingMembers {
            room_id,
            joined_at,
            members,
        } => {
            put_str16(&mut body, room_id)?;
            put_u64(&mut body, *joined_at);
            if members.len() > u16::MAX as usize {
                return Err(ProtoError::InvalidFormat("too many members"));
            }
            put_u16(&mut body, members.len() as u16);
            for m in members {
                put_participant(&mut body, m)?;
            }
            MsgType::ExistingMembers
        }
        JoinErr { code } => {
            put_u16(&mut body, *code);
            MsgType::JoinErr
        }
        LeaveRoom => MsgType::LeaveRoom,
        ParticipantJoined { participant } => {
            put_participant(&mut body, participant)?;
            MsgType::ParticipantJoined
        }
        ParticipantLeft { session_id } => {
            put_str16(&mut body, session_id)?;
            MsgType::ParticipantLeft
        }

        Signal(env) => {
            put_u8(&mut body, env.kind.as_u8());
            put_str16(&mut body, &env.from)?;
            put_str16(&mut body, &env.to)?;
            put_u32(&mut body, env.payload.len() as u32);
            body.extend_from_slice(&env.payload);
            MsgType::Signal
        }
        PeerUnreachable { session_id } => {
            put_str16(&mut body, session_id)?;
            MsgType::PeerUnreachable
        }

        Ping { nonce } => {
            put_u64(&mut body, *nonce);
            MsgType::Ping
        }
        Pong { nonce } => {
            put_u64(&mut body, *nonce);
            MsgType::Pong
        }
    };

    Ok((msg_type, body))
}

// ---- Decode from body bytes ----------------------------------------------

pub fn decode_msg(msg_type: MsgType, body: &[u8]) -> Result<SignalingMsg, ProtoError> {
    use SignalingMsg::*;
    let mut cursor = Cursor::new(body);

    let msg = match msg_type {
        MsgType::Hello => Hello {
            client_version: cursor.get_str16()?.to_owned(),
        },
        MsgType::Welcome => Welcome {
            session_id: cursor.get_str16()?.to_owned(),
        },

        MsgType::JoinRoom => {
            let room_id = cursor.get_str16()?.to_owned();
            let session_id = cursor.get_str16()?.to_owned();
            let label = cursor.get_opt_str16()?;
            JoinRoom {
                room_id,
                session_id,
                label,
            }
        }
        MsgType::ExistingMembers => {
            let room_id = cursor.get_str16()?.to_owned();
            let joined_at = cursor.get_u64()?;
            let count = cursor.get_u16()? as usize;
            let mut members = Vec::with_capacity(count);
            for _ in 0..count {
                members.push(cursor.get_participant()?);
            }
            ExistingMembers {
                room_id,
                joined_at,
                members,
            }
        }
        MsgType::JoinErr => JoinErr {
            code: cursor.get_u16()?,
        },
        MsgType::LeaveRoom => LeaveRoom,
        MsgType::ParticipantJoined => ParticipantJoined {
            participant: cursor.get_participant()?,
        },
        MsgType::ParticipantLeft => ParticipantLeft {
            session_id: cursor.get_str16()?.to_owned(),
        },

        MsgType::Signal => {
            let kind = SignalKind::from_u8(cursor.get_u8()?)?;
            let from = cursor.get_str16()?.to_owned();
            let to = cursor.get_str16()?.to_owned();
            let len = cursor.get_u32()? as usize;
            let payload = cursor.get_bytes(len)?.to_vec();
            Signal(SignalEnvelope {
                kind,
                from,
                to,
                payload,
            })
        }
        MsgType::PeerUnreachable => PeerUnreachable {
            session_id: cursor.get_str16()?.to_owned(),
        },

        MsgType::Ping => Ping {
            nonce: cursor.get_u64()?,
        },
        MsgType::Pong => Pong {
            nonce: cursor.get_u64()?,
        },
    };

    cursor.finish()?;
    Ok(msg)
}

// ---- Primitive write helpers ---------------------------------------------

fn put_u8(buf: &mut Vec<u8>, v: u8) {
    buf.push(v);
}

fn put_u16(buf: &mut Vec<u8>, v: u16) {
    buf.extend_from_slice(&v.to_be_bytes());
}

fn put_u32(buf: &mut Vec<u8>, v: u32) {
    buf.extend_from_slice(&v.to_be_bytes());
}

fn put_u64(buf: &mut Vec<u8>, v: u64) {
    buf.extend_from_slice(&v.to_be_bytes());
}

/// str16 = u16 length + UTF-8 bytes
fn put_str16(buf: &mut Vec<u8>, s: &str) -> Result<(), ProtoError> {
    let bytes = s.as_bytes();
    let len = bytes.len();

    if len > u16::MAX as usize {
        return Err(ProtoError::StringTooLong {
            max: u16::MAX as usize,
            actual: len,
        });
    }

    put_u16(buf, len as u16);
    buf.extend_from_slice(bytes);
    Ok(())
}

/// u8 presence flag, then str16 when present.
fn put_opt_str16(buf: &mut Vec<u8>, s: Option<&str>) -> Result<(), ProtoError> {
    match s {
        Some(s) => {
            put_u8(buf, 1);
            put_str16(buf, s)
        }
        None => {
            put_u8(buf, 0);
            Ok(())
        }
    }
}

fn put_participant(buf: &mut Vec<u8>, p: &Participant) -> Result<(), ProtoError> {
    put_str16(buf, &p.session_id)?;
    put_u64(buf, p.joined_at);
    put_opt_str16(buf, p.label.as_deref())
}

// ---- Cursor for decoding --------------------------------------------------

#[derive(Debug)]
struct Cursor<'a> {
    buf: &'a [u8],
}

impl<'a> Cursor<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf }
    }

    fn take<const N: usize>(&mut self) -> Result<[u8; N], ProtoError> {
        if self.buf.len() < N {
            return Err(ProtoError::Truncated);
        }
        let (head, rest) = self.buf.split_at(N);
        self.buf = rest;
        let mut out = [0u8; N];
        out.copy_from_slice(head);
        Ok(out)
    }

    fn get_u8(&mut self) -> Result<u8, ProtoError> {
        Ok(self.take::<1>()?[0])
    }

    fn get_u16(&mut self) -> Result<u16, ProtoError> {
        Ok(u16::from_be_bytes(self.take::<2>()?))
    }

    fn get_u32(&mut self) -> Result<u32, ProtoError> {
        Ok(u32::from_be_bytes(self.take::<4>()?))
    }

    fn get_u64(&mut self) -> Result<u64, ProtoError> {
        Ok(u64::from_be_bytes(self.take::<8>()?))
    }

    fn get_bytes(&mut self, len: usize) -> Result<&'a [u8], ProtoError> {
        if self.buf.len() < len {
            return Err(ProtoError::Truncated);
        }
        let (head, rest) = self.buf.split_at(len);
        self.buf = rest;
        Ok(head)
    }

    /// Read str16 = u16 length + UTF-8 bytes
    fn get_str16(&mut self) -> Result<&'a str, ProtoError> {
        let len = self.get_u16()? as usize;
        let bytes = self.get_bytes(len)?;
        str::from_utf8(bytes).map_err(|_| ProtoError::InvalidUtf8)
    }

    fn get_opt_str16(&mut self) -> Result<Option<String>, ProtoError> {
        match self.get_u8()? {
            0 => Ok(None),
            1 => Ok(Some(self.get_str16()?.to_owned())),
            _ => Err(ProtoError::InvalidFormat("bad option flag")),
        }
    }

    fn get_participant(&mut self) -> Result<Participant, ProtoError> {
        let session_id = self.get_str16()?.to_owned();
        let joined_at = self.get_u64()?;
        let label = self.get_opt_str16()?;
        Ok(Participant {
            session_id,
            joined_at,
            label,
        })
    }

    /// Enforce that we've consumed the whole body.
    fn finish(self) -> Result<(), ProtoError> {
        if !self.buf.is_empty() {
            Err(ProtoError::InvalidFormat("trailing bytes in message body"))
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;

    #[test]
    fn existing_members_keeps_order_and_labels() {
        let msg = SignalingMsg::ExistingMembers {
            room_id: "standup".into(),
            joined_at: 7,
            members: vec![
                Participant {
                    session_id: "a1".into(),
                    joined_at: 2,
                    label: Some("Ana".into()),
                },
                Participant {
                    session_id: "b2".into(),
                    joined_at: 5,
                    label: None,
                },
            ],
        };

        let (ty, body) = encode_msg(&msg).unwrap();
        assert_eq!(ty, MsgType::ExistingMembers);
        assert_eq!(decode_msg(ty, &body).unwrap(), msg);
    }

    #[test]
    fn signal_payload_is_carried_byte_for_byte() {
        let payload = vec![0u8, 0xff, b'v', b'=', b'0', 0x00];
        let msg = SignalingMsg::Signal(SignalEnvelope {
            kind: SignalKind::Candidate,
            from: "s1".into(),
            to: "s2".into(),
            payload: payload.clone(),
        });

        let (ty, body) = encode_msg(&msg).unwrap();
        match decode_msg(ty, &body).unwrap() {
            SignalingMsg::Signal(env) => assert_eq!(env.payload, payload),
            other => panic!("expected Signal, got {other:?}"),
        }
    }

    #[test]
    fn unknown_signal_kind_is_rejected() {
        let mut body = vec![9u8];
        body.extend_from_slice(&[0, 1, b'a', 0, 1, b'b', 0, 0, 0, 0]);
        let err = decode_msg(MsgType::Signal, &body).unwrap_err();
        assert!(matches!(err, ProtoError::UnknownSignalKind(9)));
        assert!(err.is_recoverable());
    }

    #[test]
    fn truncated_and_trailing_bodies_fail() {
        let (ty, mut body) = encode_msg(&SignalingMsg::Ping { nonce: 1 }).unwrap();
        body.push(0);
        assert!(matches!(
            decode_msg(ty, &body),
            Err(ProtoError::InvalidFormat(_))
        ));
        assert!(matches!(
            decode_msg(MsgType::Welcome, &[0, 5, b'a']),
            Err(ProtoError::Truncated)
        ));
    }

    #[test]
    fn leave_room_has_empty_body() {
        let (ty, body) = encode_msg(&SignalingMsg::LeaveRoom).unwrap();
        assert_eq!(ty, MsgType::LeaveRoom);
        assert!(body.is_empty());
    }
}
