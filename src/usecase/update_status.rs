//! UseCase: activity status updates.
//!
//! A client reports its user as active or idle; every room containing that
//! username gets a refreshed participant list. Rooms whose list did not
//! change are not re-broadcast.

use std::sync::Arc;

use crate::domain::{MessagePusher, RoomCoordinator, UserStatus, Username};
use crate::infrastructure::dto::websocket::ServerEvent;

pub struct UpdateStatusUseCase {
    coordinator: Arc<RoomCoordinator>,
    pusher: Arc<dyn MessagePusher>,
}

impl UpdateStatusUseCase {
    pub fn new(coordinator: Arc<RoomCoordinator>, pusher: Arc<dyn MessagePusher>) -> Self {
        Self { coordinator, pusher }
    }

    pub async fn execute(&self, username: &Username, status: UserStatus) {
        let changed = self.coordinator.record_status(username, status).await;
        for (room_id, participants) in changed {
            tracing::debug!("status of '{}' in room '{}' is now {:?}", username, room_id, status);
            let targets = self.coordinator.connections(&room_id).await;
            if let Err(e) = self
                .pusher
                .broadcast(&targets, &ServerEvent::update_users(&participants).to_json())
                .await
            {
                tracing::warn!("failed to broadcast status update: {}", e);
            }
        }
    }
}
