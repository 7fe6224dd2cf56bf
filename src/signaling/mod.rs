//! Server side: sessions, rooms, signal relay, and the TCP/TLS runtime
//! that feeds them.

pub mod errors;
pub mod protocol;
pub mod relay;
pub mod room;
pub mod room_coordinator;
pub mod room_directory;
pub mod router;
pub mod runtime;
pub mod server_engine;
pub mod server_event;
pub mod session_registry;
pub mod settings;
pub mod signaling_server;
pub mod stream_io;
pub mod tls;
pub mod transport;
pub mod types;

pub use errors::{JoinError, JoinErrorCode, RegistryError, RelayError};
pub use room_directory::{AllowAllRooms, InMemoryRoomDirectory, RoomDirectory};
pub use server_engine::ServerEngine;
pub use settings::SignalingSettings;
pub use signaling_server::SignalingServer;
