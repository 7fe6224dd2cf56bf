use crate::peer::media::LocalMedia;
use crate::peer::peer_error::PeerError;
use crate::peer::peer_event::PeerEventSender;
use crate::signaling::protocol::SessionId;

/// The platform's peer-connection object for one remote session.
///
/// Descriptions and candidates are opaque bytes. Asynchronous outcomes
/// (gathered candidates, connectivity, remote media, drops) are reported
/// through the [`PeerEventSender`] handed to the factory.
pub trait PeerConnection: Send {
    fn add_local_media(&mut self, media: &LocalMedia) -> Result<(), PeerError>;

    fn create_offer(&mut self) -> Result<Vec<u8>, PeerError>;

    /// Applies a remote offer and returns the local answer.
    fn accept_offer(&mut self, offer: &[u8]) -> Result<Vec<u8>, PeerError>;

    fn accept_answer(&mut self, answer: &[u8]) -> Result<(), PeerError>;

    fn add_remote_candidate(&mut self, candidate: &[u8]) -> Result<(), PeerError>;

    fn close(&mut self);
}

pub trait PeerConnectionFactory: Send {
    fn create(
        &mut self,
        remote: &SessionId,
        events: PeerEventSender,
    ) -> Result<Box<dyn PeerConnection>, PeerError>;
}
