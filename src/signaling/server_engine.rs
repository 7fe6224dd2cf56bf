use std::sync::Arc;

use crate::log::{LogSink, NoopLogSink};
use crate::signaling::errors::{JoinErrorCode, RegistryError, RelayError};
use crate::signaling::protocol::{
    Label, MAX_LABEL_LEN, RoomId, SessionId, SignalEnvelope, SignalingMsg,
};
use crate::signaling::relay::SignalRelay;
use crate::signaling::room_coordinator::RoomCoordinator;
use crate::signaling::room_directory::{AllowAllRooms, RoomDirectory};
use crate::signaling::session_registry::{DEFAULT_MAX_SESSIONS, SessionRegistry};
use crate::signaling::types::{ClientId, OutgoingMsg};
use crate::{sink_debug, sink_info, sink_trace, sink_warn};

/// The signaling state machine: transport events in, addressed messages out.
///
/// Holds no sockets. The runtime feeds it one event at a time, so every
/// membership change is fully applied before the next message is looked at.
pub struct ServerEngine {
    rooms: RoomCoordinator,
    relay: SignalRelay,
    log: Arc<dyn LogSink>,
}

impl ServerEngine {
    pub fn new() -> Self {
        Self::with_log(Arc::new(NoopLogSink))
    }

    pub fn with_log(log: Arc<dyn LogSink>) -> Self {
        Self::with_parts(log, DEFAULT_MAX_SESSIONS, Box::new(AllowAllRooms))
    }

    /// Fully explicit constructor: logger, session limit and room directory.
    pub fn with_parts(
        log: Arc<dyn LogSink>,
        max_sessions: usize,
        directory: Box<dyn RoomDirectory>,
    ) -> Self {
        let registry = SessionRegistry::with_log(max_sessions, log.clone());
        Self {
            rooms: RoomCoordinator::with_parts(registry, directory, log.clone()),
            relay: SignalRelay::with_log(log.clone()),
            log,
        }
    }

    pub fn rooms(&self) -> &RoomCoordinator {
        &self.rooms
    }

    /// A transport connected: assign its session and greet it.
    pub fn handle_connect(&mut self, client: ClientId) -> Result<Vec<OutgoingMsg>, RegistryError> {
        let session_id = self.rooms.connect(client)?;
        sink_info!(self.log, "client {} is session {}", client, session_id);
        Ok(vec![OutgoingMsg::new(
            client,
            SignalingMsg::Welcome { session_id },
        )])
    }

    /// Main entrypoint: handle a message from a client.
    pub fn handle(&mut self, from: ClientId, msg: SignalingMsg) -> Vec<OutgoingMsg> {
        match msg {
            SignalingMsg::Hello { client_version } => {
                sink_trace!(self.log, "client {} HELLO (version {})", from, client_version);
                Vec::new()
            }

            SignalingMsg::JoinRoom {
                room_id,
                session_id,
                label,
            } => self.handle_join(from, room_id, session_id, label),

            SignalingMsg::LeaveRoom => self.handle_leave(from),

            SignalingMsg::Signal(env) => self.handle_signal(from, env),

            SignalingMsg::Ping { nonce } => {
                vec![OutgoingMsg::new(from, SignalingMsg::Pong { nonce })]
            }
            SignalingMsg::Pong { .. } => Vec::new(),

            other => {
                sink_warn!(
                    self.log,
                    "client {} sent server-only message {}; ignoring",
                    from,
                    other.name()
                );
                Vec::new()
            }
        }
    }

    /// Transport closed. Safe to call more than once for the same client.
    pub fn handle_disconnect(&mut self, client: ClientId) -> Vec<OutgoingMsg> {
        let out = self.rooms.disconnect(client);
        sink_debug!(
            self.log,
            "client {} gone; {} departure notices",
            client,
            out.len()
        );
        out
    }

    /// A frame from `client` could not be decoded. The connection stays up.
    pub fn handle_malformed(&mut self, client: ClientId, error: &str) {
        sink_warn!(self.log, "malformed frame from client {}: {}", client, error);
    }

    fn session_of(&self, client: ClientId) -> Option<SessionId> {
        self.rooms
            .registry()
            .session_for_client(client)
            .map(|s| s.session_id.clone())
    }

    fn handle_join(
        &mut self,
        from: ClientId,
        room_id: RoomId,
        claimed: SessionId,
        label: Option<Label>,
    ) -> Vec<OutgoingMsg> {
        let Some(session_id) = self.session_of(from) else {
            return vec![join_err(from, JoinErrorCode::NotRegistered)];
        };
        if claimed != session_id {
            sink_warn!(
                self.log,
                "client {} tried to join {} as {} but is {}",
                from,
                room_id,
                claimed,
                session_id
            );
            return vec![join_err(from, JoinErrorCode::SessionMismatch)];
        }

        let label = label.map(|l| clamp_label(l, MAX_LABEL_LEN));
        match self.rooms.join(&session_id, &room_id, label) {
            Ok(outcome) => {
                // the joiner's snapshot goes out before anyone hears about it
                let mut out = Vec::with_capacity(outcome.notifications.len() + 1);
                out.push(OutgoingMsg::new(
                    from,
                    SignalingMsg::ExistingMembers {
                        room_id: outcome.room_id,
                        joined_at: outcome.joined_at,
                        members: outcome.snapshot,
                    },
                ));
                out.extend(outcome.notifications);
                out
            }
            Err(e) => {
                sink_info!(self.log, "join by client {} refused: {}", from, e);
                vec![join_err(from, e.code())]
            }
        }
    }

    fn handle_leave(&mut self, from: ClientId) -> Vec<OutgoingMsg> {
        match self.session_of(from) {
            Some(session_id) => self.rooms.leave(&session_id),
            None => Vec::new(),
        }
    }

    fn handle_signal(&mut self, from: ClientId, env: SignalEnvelope) -> Vec<OutgoingMsg> {
        match self.relay.relay(self.rooms.registry(), from, env) {
            Ok(out) => vec![out],
            Err(RelayError::PeerUnreachable { kind, target }) => {
                sink_debug!(
                    self.log,
                    "telling client {} that {} is unreachable ({})",
                    from,
                    target,
                    kind.as_str()
                );
                vec![OutgoingMsg::new(
                    from,
                    SignalingMsg::PeerUnreachable { session_id: target },
                )]
            }
            Err(e) => {
                sink_warn!(self.log, "dropping signal from client {}: {}", from, e);
                Vec::new()
            }
        }
    }
}

impl Default for ServerEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Cuts `label` to at most `max` bytes without splitting a char.
fn clamp_label(mut label: Label, max: usize) -> Label {
    if label.len() > max {
        let mut end = max;
        while !label.is_char_boundary(end) {
            end -= 1;
        }
        label.truncate(end);
    }
    label
}

fn join_err(to: ClientId, code: JoinErrorCode) -> OutgoingMsg {
    OutgoingMsg::new(
        to,
        SignalingMsg::JoinErr {
            code: code.as_u16(),
        },
    )
}
