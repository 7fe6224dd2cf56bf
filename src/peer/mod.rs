//! Client side of the mesh: one peer link per remote room member.

pub mod link_state;
pub mod media;
pub mod orchestrator;
pub mod peer_connection;
pub mod peer_error;
pub mod peer_event;
pub mod peer_link;
pub mod role;
pub mod room_event;

pub use link_state::LinkState;
pub use media::{LocalMedia, MediaCapture, MediaSinks, PeerPlatform, RemoteStream, TrackKind};
pub use orchestrator::PeerOrchestrator;
pub use peer_connection::{PeerConnection, PeerConnectionFactory};
pub use peer_error::PeerError;
pub use peer_event::{PeerEvent, PeerEventSender};
pub use role::Role;
pub use room_event::RoomEvent;
