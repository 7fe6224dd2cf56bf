use std::io;

use thiserror::Error;

use crate::signaling::protocol::FrameError;

/// Errors surfaced by the signaling client.
///
/// Once the network threads have exited, `send()` can only report
/// `Disconnected`.
#[derive(Debug, Error)]
pub enum SignalingClientError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("protocol error: {0}")]
    Frame(#[from] FrameError),
    #[error("stream lock poisoned")]
    Poisoned,
    #[error("signaling client disconnected")]
    Disconnected,
    #[error("timed out waiting for the server")]
    Timeout,
}
