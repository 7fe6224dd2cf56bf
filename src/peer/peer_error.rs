use thiserror::Error;

use crate::peer::link_state::LinkState;
use crate::signaling::protocol::SessionId;
use crate::signaling_client::SignalingClientError;

#[derive(Debug, Error)]
pub enum PeerError {
    #[error("link to {remote}: cannot go from {from} to {to}")]
    InvalidTransition {
        remote: SessionId,
        from: LinkState,
        to: LinkState,
    },
    #[error("media capture failed: {0}")]
    Media(String),
    #[error("peer connection error: {0}")]
    Connection(String),
    #[error("no session assigned by the signaling server yet")]
    NotConnected,
    #[error(transparent)]
    Signaling(#[from] SignalingClientError),
}
