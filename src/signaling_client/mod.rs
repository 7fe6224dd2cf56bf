//! Client side of the signaling connection.

pub mod signal_transport;
pub mod signaling_client_c;
pub mod signaling_client_error;
pub mod signaling_command;
pub mod signaling_event;
pub use signal_transport::{InProcessEndpoint, InProcessTransport, SignalTransport};
pub use signaling_client_c::SignalingClient;
pub use signaling_client_error::SignalingClientError;
pub use signaling_event::SignalingEvent;
