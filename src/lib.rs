//! meshroom: mesh WebRTC signaling.
//!
//! Clients join a named room and end up with a direct peer link to every
//! other member. The server side assigns sessions, tracks room membership
//! and relays opaque offer/answer/candidate envelopes; the client side
//! drives one peer connection per remote member.
//!
//! It provides one binary:
//! - `meshroom-server`: the signaling server, configured from an INI file.

/// Handles configuration loading and management.
pub mod config;
/// Logging utilities: sinks, the file logger and leveled macros.
pub mod log;
/// Client-side peer orchestration over the platform's peer connections.
pub mod peer;
/// Signaling server: sessions, rooms, relay, wire protocol and runtime.
pub mod signaling;
/// Signaling client for communicating with the signaling server.
pub mod signaling_client;
