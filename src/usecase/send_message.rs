//! UseCase: chat message relay.
//!
//! Messages are ordered by arrival at the router, persisted, then fanned out
//! to the whole room including the sender. A message for a room unknown to
//! the store is dropped with a warning; there is no in-band error channel
//! back to the sender.

use std::sync::Arc;

use crate::domain::{ChatMessage, MessagePusher, RoomCoordinator, RoomStore};
use crate::infrastructure::dto::websocket::ServerEvent;

use super::error::SendMessageError;

/// Chat handling for one inbound `send_message` event.
pub struct SendMessageUseCase {
    coordinator: Arc<RoomCoordinator>,
    store: Arc<dyn RoomStore>,
    pusher: Arc<dyn MessagePusher>,
}

impl SendMessageUseCase {
    pub fn new(
        coordinator: Arc<RoomCoordinator>,
        store: Arc<dyn RoomStore>,
        pusher: Arc<dyn MessagePusher>,
    ) -> Self {
        Self {
            coordinator,
            store,
            pusher,
        }
    }

    pub async fn execute(&self, message: ChatMessage) -> Result<(), SendMessageError> {
        match self.store.find_room(&message.room_id).await {
            Ok(Some(_)) => {}
            Ok(None) => {
                tracing::warn!(
                    "dropping message from '{}': room '{}' not found",
                    message.username,
                    message.room_id
                );
                return Err(SendMessageError::RoomNotFound(
                    message.room_id.as_str().to_string(),
                ));
            }
            Err(e) => {
                tracing::warn!(
                    "dropping message from '{}': room lookup failed: {}",
                    message.username,
                    e
                );
                return Err(SendMessageError::PersistFailed(e.to_string()));
            }
        }

        if let Err(e) = self.store.save_message(message.clone()).await {
            tracing::warn!("dropping message from '{}': save failed: {}", message.username, e);
            return Err(SendMessageError::PersistFailed(e.to_string()));
        }

        // Chat fan-out includes the sender.
        let targets = self.coordinator.connections(&message.room_id).await;
        let event = ServerEvent::receive_message(&message);
        if let Err(e) = self.pusher.broadcast(&targets, &event.to_json()).await {
            tracing::warn!("failed to broadcast message from '{}': {}", message.username, e);
        }

        Ok(())
    }
}
