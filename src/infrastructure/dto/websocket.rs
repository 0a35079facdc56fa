//! WebSocket wire format.
//!
//! Every frame is a JSON object tagged with a `type` field; payload fields
//! use camelCase to match the browser client.

use serde::{Deserialize, Serialize};

use crate::domain::{ChatMessage, Participant, UserStatus};

/// Playback instruction relayed from the leader to followers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncAction {
    Play,
    Pause,
    Seek,
}

/// Events a client sends over the socket.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum ClientEvent {
    JoinRoom {
        room_id: String,
        username: String,
    },
    UpdateStatus {
        username: String,
        status: UserStatus,
    },
    Typing {
        room_id: String,
        username: String,
    },
    SendMessage {
        username: String,
        message: String,
        time: String,
        room_id: String,
        #[serde(default)]
        reply_to: Option<String>,
    },
    SyncVideo {
        room_id: String,
        action: SyncAction,
        time: f64,
        #[serde(default)]
        progress: Option<f64>,
    },
    VideoChanged {
        room_id: String,
        video_id: String,
    },
    SyncToggle {
        room_id: String,
        enabled: bool,
    },
}

/// One participant as shown to clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantDto {
    pub username: String,
    pub status: UserStatus,
}

impl From<&Participant> for ParticipantDto {
    fn from(participant: &Participant) -> Self {
        Self {
            username: participant.username.as_str().to_string(),
            status: participant.status,
        }
    }
}

/// Events the server pushes to clients in a room.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum ServerEvent {
    UpdateUsers {
        users: Vec<ParticipantDto>,
    },
    LeaderChanged {
        leader: Option<String>,
    },
    UserTyping {
        username: String,
    },
    ReceiveMessage {
        username: String,
        message: String,
        time: String,
        room_id: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        reply_to: Option<String>,
    },
    SyncVideo {
        action: SyncAction,
        time: f64,
        #[serde(skip_serializing_if = "Option::is_none")]
        progress: Option<f64>,
    },
    SyncVideoChange {
        video_id: String,
    },
    SystemNotice {
        text: String,
        time: String,
    },
}

impl ServerEvent {
    pub fn update_users(participants: &[Participant]) -> Self {
        Self::UpdateUsers {
            users: participants.iter().map(ParticipantDto::from).collect(),
        }
    }

    pub fn leader_changed(leader: Option<&crate::domain::Username>) -> Self {
        Self::LeaderChanged {
            leader: leader.map(|l| l.as_str().to_string()),
        }
    }

    pub fn receive_message(message: &ChatMessage) -> Self {
        Self::ReceiveMessage {
            username: message.username.as_str().to_string(),
            message: message.message.clone(),
            time: message.time.clone(),
            room_id: message.room_id.as_str().to_string(),
            reply_to: message.reply_to.clone(),
        }
    }

    pub fn system_notice(text: impl Into<String>, time: String) -> Self {
        Self::SystemNotice {
            text: text.into(),
            time,
        }
    }

    /// Serialize for the wire. These enums always serialize.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).expect("server event serializes")
    }
}
