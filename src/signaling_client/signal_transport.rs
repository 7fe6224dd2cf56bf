use std::sync::mpsc::{self, Receiver, Sender};

use crate::signaling::protocol::SignalingMsg;
use crate::signaling_client::{SignalingClientError, SignalingEvent};

/// The part of a signaling connection the peer orchestrator depends on.
///
/// [`SignalingClient`](crate::signaling_client::SignalingClient) is the
/// network implementation; [`InProcessTransport`] wires a client straight to
/// an in-process server.
pub trait SignalTransport {
    fn send(&self, msg: SignalingMsg) -> Result<(), SignalingClientError>;

    /// Next pending event, without blocking.
    fn try_recv(&self) -> Option<SignalingEvent>;
}

/// Channel-backed transport with no socket underneath.
pub struct InProcessTransport {
    out: Sender<SignalingMsg>,
    inbox: Receiver<SignalingEvent>,
}

/// The server-facing end of an [`InProcessTransport`].
pub struct InProcessEndpoint {
    pub from_client: Receiver<SignalingMsg>,
    pub to_client: Sender<SignalingEvent>,
}

impl InProcessTransport {
    pub fn pair() -> (Self, InProcessEndpoint) {
        let (out, from_client) = mpsc::channel();
        let (to_client, inbox) = mpsc::channel();
        (
            Self { out, inbox },
            InProcessEndpoint {
                from_client,
                to_client,
            },
        )
    }
}

impl SignalTransport for InProcessTransport {
    fn send(&self, msg: SignalingMsg) -> Result<(), SignalingClientError> {
        self.out
            .send(msg)
            .map_err(|_| SignalingClientError::Disconnected)
    }

    fn try_recv(&self) -> Option<SignalingEvent> {
        self.inbox.try_recv().ok()
    }
}
