use std::collections::HashMap;
use std::sync::Arc;

use crate::log::{LogSink, NoopLogSink};
use crate::signaling::errors::{JoinError, RegistryError};
use crate::signaling::protocol::{Label, Participant, RoomId, Seq, SessionId, SignalingMsg};
use crate::signaling::room::Room;
use crate::signaling::room_directory::{AllowAllRooms, RoomDirectory};
use crate::signaling::session_registry::{DEFAULT_MAX_SESSIONS, SessionRegistry};
use crate::signaling::types::{ClientId, OutgoingMsg};
use crate::{sink_debug, sink_info, sink_warn};

/// Result of a successful join.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinOutcome {
    pub room_id: RoomId,
    /// The joiner's own join-order position.
    pub joined_at: Seq,
    /// Members present before the joiner, oldest first.
    pub snapshot: Vec<Participant>,
    /// Messages for the other members (`ParticipantJoined`, plus
    /// `ParticipantLeft` for the old room when switching rooms).
    pub notifications: Vec<OutgoingMsg>,
    /// The session was already in this room; nothing changed.
    pub duplicate: bool,
}

/// Owns rooms and the session registry, and turns joins/leaves into
/// membership notifications.
///
/// All methods run to completion without I/O: they mutate state and return
/// the messages to deliver, so the caller sends only after the mutation is
/// done.
pub struct RoomCoordinator {
    registry: SessionRegistry,
    rooms: HashMap<RoomId, Room>,
    directory: Box<dyn RoomDirectory>,
    next_seq: Seq,
    log: Arc<dyn LogSink>,
}

impl RoomCoordinator {
    pub fn new() -> Self {
        Self::with_parts(
            SessionRegistry::new(DEFAULT_MAX_SESSIONS),
            Box::new(AllowAllRooms),
            Arc::new(NoopLogSink),
        )
    }

    pub fn with_parts(
        registry: SessionRegistry,
        directory: Box<dyn RoomDirectory>,
        log: Arc<dyn LogSink>,
    ) -> Self {
        Self {
            registry,
            rooms: HashMap::new(),
            directory,
            next_seq: 1,
            log,
        }
    }

    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    pub fn room(&self, room_id: &str) -> Option<&Room> {
        self.rooms.get(room_id)
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    /// Registers a new transport connection.
    pub fn connect(&mut self, client_id: ClientId) -> Result<SessionId, RegistryError> {
        self.registry.register(client_id)
    }

    /// Adds `session_id` to `room_id`, creating the room if needed.
    ///
    /// Joining the room the session is already in is a no-op that returns
    /// the same snapshot. Joining a different room leaves the old one first.
    pub fn join(
        &mut self,
        session_id: &SessionId,
        room_id: &RoomId,
        label: Option<Label>,
    ) -> Result<JoinOutcome, JoinError> {
        let session = self
            .registry
            .lookup(session_id)
            .ok_or_else(|| JoinError::UnknownSession(session_id.clone()))?;

        if session.room_id.as_ref() == Some(room_id) {
            let joined_at = session.joined_at.unwrap_or_default();
            let before = self
                .rooms
                .get(room_id)
                .map(|r| r.members_before(session_id).to_vec())
                .unwrap_or_default();
            sink_debug!(
                self.log,
                "session {} re-joined room {} (no-op)",
                session_id,
                room_id
            );
            return Ok(JoinOutcome {
                room_id: room_id.clone(),
                joined_at,
                snapshot: self.participants(&before),
                notifications: Vec::new(),
                duplicate: true,
            });
        }

        if !self.directory.is_valid(room_id) {
            sink_warn!(
                self.log,
                "session {} tried to join invalid room {:?}",
                session_id,
                room_id
            );
            return Err(JoinError::InvalidRoom(room_id.clone()));
        }

        let mut notifications = match session.room_id.clone() {
            Some(old_room) => self.remove_from_room(&old_room, session_id),
            None => Vec::new(),
        };

        let joined_at = self.alloc_seq();
        let created_at = joined_at;
        let room = self.rooms.entry(room_id.clone()).or_insert_with(|| {
            Room::new(room_id.clone(), created_at)
        });
        let existing: Vec<SessionId> = room.members().to_vec();
        room.push(session_id.clone());
        let room_size = room.len();

        self.registry
            .set_room(session_id, Some((room_id.clone(), joined_at, label.clone())));

        let joined = Participant {
            session_id: session_id.clone(),
            joined_at,
            label,
        };
        for member in &existing {
            if let Some(client) = self.client_of(member) {
                notifications.push(OutgoingMsg::new(
                    client,
                    SignalingMsg::ParticipantJoined {
                        participant: joined.clone(),
                    },
                ));
            }
        }

        sink_info!(
            self.log,
            "session {} joined room {} as #{} ({} members)",
            session_id,
            room_id,
            joined_at,
            room_size
        );

        Ok(JoinOutcome {
            room_id: room_id.clone(),
            joined_at,
            snapshot: self.participants(&existing),
            notifications,
            duplicate: false,
        })
    }

    /// Removes the session from its room; the session stays registered and
    /// may join again.
    pub fn leave(&mut self, session_id: &SessionId) -> Vec<OutgoingMsg> {
        let Some(room_id) = self
            .registry
            .lookup(session_id)
            .and_then(|s| s.room_id.clone())
        else {
            return Vec::new();
        };
        let out = self.remove_from_room(&room_id, session_id);
        self.registry.set_room(session_id, None);
        out
    }

    /// Transport closed: deregister the session and notify its room.
    ///
    /// Safe to call more than once; later calls do nothing.
    pub fn disconnect(&mut self, client_id: ClientId) -> Vec<OutgoingMsg> {
        let Some(session_id) = self
            .registry
            .session_for_client(client_id)
            .map(|s| s.session_id.clone())
        else {
            return Vec::new();
        };
        let Some(session) = self.registry.deregister(&session_id) else {
            return Vec::new();
        };

        match session.room_id {
            Some(room_id) => self.remove_from_room(&room_id, &session_id),
            None => Vec::new(),
        }
    }

    fn remove_from_room(&mut self, room_id: &RoomId, session_id: &SessionId) -> Vec<OutgoingMsg> {
        let Some(room) = self.rooms.get_mut(room_id) else {
            return Vec::new();
        };
        if !room.remove(session_id) {
            return Vec::new();
        }

        if room.is_empty() {
            self.rooms.remove(room_id);
            sink_info!(
                self.log,
                "session {} left room {}; room is empty and was removed",
                session_id,
                room_id
            );
            return Vec::new();
        }

        let remaining: Vec<SessionId> = room.members().to_vec();
        sink_info!(
            self.log,
            "session {} left room {} ({} remaining)",
            session_id,
            room_id,
            remaining.len()
        );

        remaining
            .iter()
            .filter_map(|m| self.client_of(m))
            .map(|client| {
                OutgoingMsg::new(
                    client,
                    SignalingMsg::ParticipantLeft {
                        session_id: session_id.clone(),
                    },
                )
            })
            .collect()
    }

    fn participants(&self, members: &[SessionId]) -> Vec<Participant> {
        members
            .iter()
            .filter_map(|m| self.registry.lookup(m))
            .filter_map(|s| s.participant())
            .collect()
    }

    fn client_of(&self, session_id: &SessionId) -> Option<ClientId> {
        self.registry.lookup(session_id).map(|s| s.client_id)
    }

    fn alloc_seq(&mut self) -> Seq {
        let seq = self.next_seq;
        self.next_seq += 1;
        seq
    }
}

impl Default for RoomCoordinator {
    fn default() -> Self {
        Self::new()
    }
}
