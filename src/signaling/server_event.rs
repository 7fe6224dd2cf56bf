use std::sync::mpsc::Sender;

use crate::signaling::{protocol::SignalingMsg, types::ClientId};

/// Events sent *to* the central server thread.
pub enum ServerEvent {
    /// A new client is registered with its outgoing channel.
    RegisterClient {
        client_id: ClientId,
        to_client: Sender<SignalingMsg>,
    },

    /// A client sent a signaling message.
    MsgFromClient {
        client_id: ClientId,
        msg: SignalingMsg,
    },

    /// A frame arrived but could not be decoded; the connection stays open.
    Malformed { client_id: ClientId, error: String },

    /// A client disconnected (TCP/TLS closed or errored).
    Disconnected { client_id: ClientId },
}
