//! Domain entities: participants, chat messages, persisted rooms and
//! user events.

use serde::{Deserialize, Serialize};

use super::value_object::{ConnectionId, RoomId, Timestamp, UserStatus, Username};

/// A connected member of a room.
///
/// Created on join with `Active` status, mutated on status updates, removed
/// on confirmed departure (after the grace window).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Participant {
    pub connection_id: ConnectionId,
    pub username: Username,
    pub status: UserStatus,
}

impl Participant {
    pub fn new(connection_id: ConnectionId, username: Username) -> Self {
        Self {
            connection_id,
            username,
            status: UserStatus::Active,
        }
    }
}

/// A chat message as relayed and persisted.
///
/// `time` is a client-supplied display string and purely cosmetic; message
/// ordering is arrival order at the router.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatMessage {
    pub username: Username,
    pub message: String,
    pub time: String,
    pub room_id: RoomId,
    pub reply_to: Option<String>,
}

/// Persisted room record held by the store collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoredRoom {
    pub room_id: RoomId,
    pub members: Vec<Username>,
}

impl StoredRoom {
    pub fn new(room_id: RoomId) -> Self {
        Self {
            room_id,
            members: Vec::new(),
        }
    }
}

/// Kind of a persisted user event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserEventKind {
    Join,
    Leave,
}

/// Persisted join/leave bookkeeping entry for a user and room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserEvent {
    pub username: Username,
    pub room_id: RoomId,
    pub kind: UserEventKind,
    pub timestamp: Timestamp,
}
