//! Wire protocol spoken between signaling clients and the server.
//!
//! Every message travels in one frame:
//! `[version u8][type u8][flags u16][body_len u32][body]`.

mod codec;
mod constants;
mod errors;
mod framing;
mod msg;
mod msg_type;

use std::io::{Read, Write};

pub use codec::{decode_msg, encode_msg};
pub use constants::{HEADER_LEN, MAX_BODY_LEN, MAX_LABEL_LEN, PROTO_VERSION};
pub use errors::{FrameError, ProtoError};
pub use framing::{read_frame, write_frame};
pub use msg::{
    Label, Participant, RoomId, Seq, SessionId, SignalEnvelope, SignalKind, SignalingMsg,
};
pub use msg_type::MsgType;

/// Read and decode one message.
pub fn read_msg<R: Read>(r: &mut R) -> Result<SignalingMsg, FrameError> {
    let (ty, body) = read_frame(r, MAX_BODY_LEN)?;
    let msg_type = MsgType::from_u8(ty)?;
    Ok(decode_msg(msg_type, &body)?)
}

/// Encode and write one message.
pub fn write_msg<W: Write>(w: &mut W, msg: &SignalingMsg) -> Result<(), FrameError> {
    let (msg_type, body) = encode_msg(msg)?;
    if body.len() > MAX_BODY_LEN {
        return Err(ProtoError::TooLarge.into());
    }
    write_frame(w, msg_type, &body)?;
    Ok(())
}
