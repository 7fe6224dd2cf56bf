use crate::signaling::protocol::SignalingMsg;

/// What the reader thread hands back to the application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignalingEvent {
    Msg(SignalingMsg),
    /// A frame could not be decoded; the connection is still up.
    Error(String),
    /// The connection is gone. Always the last event.
    Disconnected,
}
