use crate::signaling::protocol::SignalingMsg;

/// Internal identifier for a transport connection (TCP/TLS).
pub type ClientId = u64;

/// A message the server wants to send to a client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMsg {
    pub client_id_target: ClientId,
    pub msg: SignalingMsg,
}

impl OutgoingMsg {
    pub fn new(client_id_target: ClientId, msg: SignalingMsg) -> Self {
        Self {
            client_id_target,
            msg,
        }
    }
}
