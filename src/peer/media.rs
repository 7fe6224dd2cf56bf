use crate::peer::peer_connection::PeerConnectionFactory;
use crate::peer::peer_error::PeerError;
use crate::signaling::protocol::SessionId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackKind {
    Audio,
    Video,
}

/// Handle on the locally captured stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalMedia {
    pub id: String,
    pub tracks: Vec<TrackKind>,
}

/// Handle on a stream received from a remote peer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteStream {
    pub id: String,
    pub tracks: Vec<TrackKind>,
}

/// Camera/microphone access.
pub trait MediaCapture: Send {
    fn acquire(&mut self) -> Result<LocalMedia, PeerError>;
    fn release(&mut self, media: LocalMedia);
}

/// Output surfaces: one local preview plus one slot per remote session.
pub trait MediaSinks: Send {
    fn bind_local(&mut self, media: &LocalMedia);
    fn unbind_local(&mut self);
    fn bind(&mut self, remote: &SessionId, stream: RemoteStream);
    fn unbind(&mut self, remote: &SessionId);
}

/// Everything the orchestrator needs from the host platform.
pub struct PeerPlatform {
    pub connections: Box<dyn PeerConnectionFactory>,
    pub capture: Box<dyn MediaCapture>,
    pub sinks: Box<dyn MediaSinks>,
}
