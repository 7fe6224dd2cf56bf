use std::collections::HashSet;

use crate::signaling::protocol::RoomId;

/// Source of truth for which meeting codes may be joined.
///
/// Meeting metadata lives outside the signaling core; this is the only
/// question the core asks of it.
pub trait RoomDirectory: Send + Sync {
    fn is_valid(&self, room_id: &str) -> bool;
}

/// Accepts any non-empty room id.
#[derive(Debug, Default)]
pub struct AllowAllRooms;

impl RoomDirectory for AllowAllRooms {
    fn is_valid(&self, room_id: &str) -> bool {
        !room_id.trim().is_empty()
    }
}

/// Fixed allow-list, usually filled from `[Signaling] allowed_rooms`.
#[derive(Debug, Default)]
pub struct InMemoryRoomDirectory {
    rooms: HashSet<RoomId>,
}

impl InMemoryRoomDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_room(mut self, room_id: impl Into<RoomId>) -> Self {
        self.rooms.insert(room_id.into());
        self
    }
}

impl FromIterator<RoomId> for InMemoryRoomDirectory {
    fn from_iter<I: IntoIterator<Item = RoomId>>(iter: I) -> Self {
        Self {
            rooms: iter.into_iter().collect(),
        }
    }
}

impl RoomDirectory for InMemoryRoomDirectory {
    fn is_valid(&self, room_id: &str) -> bool {
        self.rooms.contains(room_id)
    }
}
