use crate::signaling::protocol::{RoomId, Seq, SessionId};

/// A room and its members in join order.
///
/// Join order is what clients use to decide who initiates each pairwise
/// connection, so members are kept in a `Vec`, never a set.
#[derive(Debug, Clone)]
pub struct Room {
    pub room_id: RoomId,
    pub created_at: Seq,
    members: Vec<SessionId>,
}

impl Room {
    pub fn new(room_id: RoomId, created_at: Seq) -> Self {
        Self {
            room_id,
            created_at,
            members: Vec::new(),
        }
    }

    pub fn members(&self) -> &[SessionId] {
        &self.members
    }

    pub fn contains(&self, session_id: &SessionId) -> bool {
        self.members.contains(session_id)
    }

    /// Members that joined before `session_id` (all of them if absent).
    pub fn members_before(&self, session_id: &SessionId) -> &[SessionId] {
        match self.members.iter().position(|m| m == session_id) {
            Some(idx) => &self.members[..idx],
            None => &self.members,
        }
    }

    pub(crate) fn push(&mut self, session_id: SessionId) {
        if !self.contains(&session_id) {
            self.members.push(session_id);
        }
    }

    /// Returns true if the session was a member.
    pub(crate) fn remove(&mut self, session_id: &SessionId) -> bool {
        let before = self.members.len();
        self.members.retain(|m| m != session_id);
        self.members.len() != before
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }
}
