//! UseCase: playback synchronization.
//!
//! The leader's play/pause/seek actions and video selections are relayed
//! verbatim to followers. Senders that fail the authority check are ignored
//! without an error: the check is UX policy, not a security boundary, and
//! the sender's own player already applied the action locally.

use std::sync::Arc;

use crate::domain::{ConnectionId, MessagePusher, RoomCoordinator, RoomId, VideoId};
use crate::infrastructure::dto::websocket::{ServerEvent, SyncAction};

pub struct PlaybackSyncUseCase {
    coordinator: Arc<RoomCoordinator>,
    pusher: Arc<dyn MessagePusher>,
}

impl PlaybackSyncUseCase {
    pub fn new(coordinator: Arc<RoomCoordinator>, pusher: Arc<dyn MessagePusher>) -> Self {
        Self { coordinator, pusher }
    }

    /// Relay a play/pause/seek action to followers. Stateless; returns
    /// whether the sender held sync authority and the relay went out.
    pub async fn relay_action(
        &self,
        room_id: &RoomId,
        sender: ConnectionId,
        action: SyncAction,
        time: f64,
        progress: Option<f64>,
    ) -> bool {
        if !self.coordinator.is_sync_authority(room_id, sender).await {
            tracing::debug!(
                "ignoring sync action from non-authoritative connection '{}' in room '{}'",
                sender,
                room_id
            );
            return false;
        }

        let targets = self.followers(room_id, sender).await;
        let event = ServerEvent::SyncVideo {
            action,
            time,
            progress,
        };
        if let Err(e) = self.pusher.broadcast(&targets, &event.to_json()).await {
            tracing::warn!("failed to relay sync action: {}", e);
        }
        true
    }

    /// Record the leader's video selection and relay it. The new video
    /// starts fresh for everyone; no seek is implied.
    pub async fn change_video(
        &self,
        room_id: &RoomId,
        sender: ConnectionId,
        video_id: VideoId,
    ) -> bool {
        if !self
            .coordinator
            .select_video(room_id, sender, video_id.clone())
            .await
        {
            tracing::debug!(
                "ignoring video selection from non-authoritative connection '{}' in room '{}'",
                sender,
                room_id
            );
            return false;
        }

        let targets = self.followers(room_id, sender).await;
        let event = ServerEvent::SyncVideoChange {
            video_id: video_id.into_string(),
        };
        if let Err(e) = self.pusher.broadcast(&targets, &event.to_json()).await {
            tracing::warn!("failed to relay video change: {}", e);
        }
        true
    }

    /// Leader-only toggle of room-level sync; no broadcast.
    pub async fn set_sync_enabled(
        &self,
        room_id: &RoomId,
        sender: ConnectionId,
        enabled: bool,
    ) -> bool {
        let applied = self
            .coordinator
            .set_sync_enabled(room_id, sender, enabled)
            .await;
        if applied {
            tracing::info!("sync {} for room '{}'", if enabled { "enabled" } else { "disabled" }, room_id);
        } else {
            tracing::debug!(
                "ignoring sync toggle from non-leader connection '{}' in room '{}'",
                sender,
                room_id
            );
        }
        applied
    }

    async fn followers(&self, room_id: &RoomId, sender: ConnectionId) -> Vec<ConnectionId> {
        self.coordinator
            .connections(room_id)
            .await
            .into_iter()
            .filter(|c| *c != sender)
            .collect()
    }
}
