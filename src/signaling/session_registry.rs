use std::collections::HashMap;
use std::sync::Arc;

use rand::Rng;

use crate::log::{LogSink, NoopLogSink};
use crate::signaling::errors::RegistryError;
use crate::signaling::protocol::{Label, Participant, RoomId, Seq, SessionId};
use crate::signaling::types::ClientId;
use crate::{sink_debug, sink_warn};

/// Default upper bound on concurrently registered sessions.
pub const DEFAULT_MAX_SESSIONS: usize = 10_000;

/// One live transport connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub session_id: SessionId,
    pub client_id: ClientId,
    /// Back-reference only; membership itself lives in the room.
    pub room_id: Option<RoomId>,
    /// Join-order position within `room_id`, set while in a room.
    pub joined_at: Option<Seq>,
    pub label: Option<Label>,
}

impl Session {
    /// Wire form of this session as a room member.
    pub fn participant(&self) -> Option<Participant> {
        self.joined_at.map(|joined_at| Participant {
            session_id: self.session_id.clone(),
            joined_at,
            label: self.label.clone(),
        })
    }
}

/// Tracks which sessions are connected, on which transport, and in which room.
pub struct SessionRegistry {
    by_session: HashMap<SessionId, Session>,
    by_client: HashMap<ClientId, SessionId>,
    max_sessions: usize,
    log: Arc<dyn LogSink>,
}

impl SessionRegistry {
    pub fn new(max_sessions: usize) -> Self {
        Self::with_log(max_sessions, Arc::new(NoopLogSink))
    }

    pub fn with_log(max_sessions: usize, log: Arc<dyn LogSink>) -> Self {
        Self {
            by_session: HashMap::new(),
            by_client: HashMap::new(),
            max_sessions,
            log,
        }
    }

    /// Assigns a fresh session id to a transport connection.
    ///
    /// Registering the same client twice returns the id it already has.
    pub fn register(&mut self, client_id: ClientId) -> Result<SessionId, RegistryError> {
        if let Some(existing) = self.by_client.get(&client_id) {
            return Ok(existing.clone());
        }
        if self.by_session.len() >= self.max_sessions {
            sink_warn!(
                self.log,
                "refusing client {}: session limit {} reached",
                client_id,
                self.max_sessions
            );
            return Err(RegistryError::Exhausted {
                max: self.max_sessions,
            });
        }

        let session_id = self.alloc_session_id();
        self.by_client.insert(client_id, session_id.clone());
        self.by_session.insert(
            session_id.clone(),
            Session {
                session_id: session_id.clone(),
                client_id,
                room_id: None,
                joined_at: None,
                label: None,
            },
        );
        sink_debug!(
            self.log,
            "client {} registered as session {}",
            client_id,
            session_id
        );
        Ok(session_id)
    }

    pub fn lookup(&self, session_id: &SessionId) -> Option<&Session> {
        self.by_session.get(session_id)
    }

    pub fn session_for_client(&self, client_id: ClientId) -> Option<&Session> {
        self.by_client
            .get(&client_id)
            .and_then(|sid| self.by_session.get(sid))
    }

    /// Removes the session. The returned value still carries its former room.
    pub fn deregister(&mut self, session_id: &SessionId) -> Option<Session> {
        let session = self.by_session.remove(session_id)?;
        self.by_client.remove(&session.client_id);
        Some(session)
    }

    /// Records (or clears) room membership on the session side.
    pub(crate) fn set_room(
        &mut self,
        session_id: &SessionId,
        membership: Option<(RoomId, Seq, Option<Label>)>,
    ) {
        if let Some(session) = self.by_session.get_mut(session_id) {
            match membership {
                Some((room_id, joined_at, label)) => {
                    session.room_id = Some(room_id);
                    session.joined_at = Some(joined_at);
                    session.label = label;
                }
                None => {
                    session.room_id = None;
                    session.joined_at = None;
                }
            }
        }
    }

    pub fn len(&self) -> usize {
        self.by_session.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_session.is_empty()
    }

    /// 12 hex digits, random, collision-checked.
    fn alloc_session_id(&self) -> SessionId {
        let mut rng = rand::thread_rng();
        loop {
            let n: u64 = rng.gen_range(0..(1u64 << 48));
            let id = format!("{n:012x}");
            if !self.by_session.contains_key(&id) {
                return id;
            }
        }
    }
}
