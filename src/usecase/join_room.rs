//! UseCase: joining a room.
//!
//! Applies the coordinator's atomic join step (grace cancel, presence append,
//! leader assignment), persists the room record, membership and join event
//! best effort, then fans the updated participant list and the leader value
//! out to the whole room. A fresh join also announces itself with a system
//! notice; a reconnect inside the grace window stays silent.

use std::sync::Arc;

use crate::common::time::{Clock, timestamp_to_rfc3339};
use crate::domain::{
    ConnectionId, JoinOutcome, MessagePusher, RoomCoordinator, RoomId, RoomStore, Username,
};
use crate::infrastructure::dto::websocket::ServerEvent;

/// Join handling for one inbound `join_room` event.
pub struct JoinRoomUseCase {
    coordinator: Arc<RoomCoordinator>,
    store: Arc<dyn RoomStore>,
    pusher: Arc<dyn MessagePusher>,
    clock: Arc<dyn Clock>,
}

impl JoinRoomUseCase {
    pub fn new(
        coordinator: Arc<RoomCoordinator>,
        store: Arc<dyn RoomStore>,
        pusher: Arc<dyn MessagePusher>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            coordinator,
            store,
            pusher,
            clock,
        }
    }

    /// Execute the join. Never fails: store trouble is logged and only costs
    /// durability, the in-memory room keeps working.
    pub async fn execute(
        &self,
        room_id: RoomId,
        connection_id: ConnectionId,
        username: Username,
    ) -> JoinOutcome {
        let outcome = self.coordinator.join(&room_id, connection_id, &username).await;
        tracing::info!("'{}' joined room '{}'", username, room_id);

        self.persist_membership(&room_id, &username).await;

        let targets = self.coordinator.connections(&room_id).await;
        if let Err(e) = self
            .pusher
            .broadcast(&targets, &ServerEvent::update_users(&outcome.participants).to_json())
            .await
        {
            tracing::warn!("failed to broadcast participant list: {}", e);
        }
        if let Err(e) = self
            .pusher
            .broadcast(
                &targets,
                &ServerEvent::leader_changed(Some(&outcome.leader)).to_json(),
            )
            .await
        {
            tracing::warn!("failed to broadcast leader: {}", e);
        }

        // A reconnect within the grace window, or a duplicate tab, must not
        // announce itself again.
        if !outcome.reconnected && !outcome.already_present {
            let notice = ServerEvent::system_notice(
                format!("{} joined the room", username),
                timestamp_to_rfc3339(self.clock.now_millis()),
            );
            if let Err(e) = self.pusher.broadcast(&targets, &notice.to_json()).await {
                tracing::warn!("failed to broadcast join notice: {}", e);
            }
        }

        outcome
    }

    /// Ensure the persisted room record, membership entry and join event.
    /// Each write is attempted independently; failures are logged and
    /// swallowed.
    async fn persist_membership(&self, room_id: &RoomId, username: &Username) {
        match self.store.find_room(room_id).await {
            Ok(Some(_)) => {}
            Ok(None) => {
                if let Err(e) = self.store.create_room(room_id).await {
                    tracing::warn!("failed to create room '{}': {}", room_id, e);
                }
            }
            Err(e) => {
                tracing::warn!("failed to look up room '{}': {}", room_id, e);
            }
        }

        if let Err(e) = self.store.add_member(room_id, username).await {
            tracing::warn!(
                "failed to add member '{}' to room '{}': {}",
                username,
                room_id,
                e
            );
        }

        match self.store.upsert_join_event(username, room_id).await {
            Ok(outcome) => {
                tracing::debug!("join event for '{}' in '{}': {:?}", username, room_id, outcome);
            }
            Err(e) => {
                tracing::warn!(
                    "failed to upsert join event for '{}' in '{}': {}",
                    username,
                    room_id,
                    e
                );
            }
        }
    }
}
