//! UseCase: connection drop and delayed departure.
//!
//! A raw disconnect removes the participant from the live presence list
//! immediately but defers every externally visible consequence (the leave
//! event, the "left the room" notice, leader handover, room teardown) by a
//! grace window, so a page reload does not flap presence or leadership.

use std::sync::Arc;
use std::time::Duration;

use crate::common::time::{Clock, timestamp_to_rfc3339};
use crate::domain::{
    ConnectionId, DepartureTicket, MessagePusher, RoomCoordinator, RoomId, RoomStore,
};
use crate::infrastructure::dto::websocket::ServerEvent;

/// Disconnect handling and grace-window finalization.
pub struct DisconnectUseCase {
    coordinator: Arc<RoomCoordinator>,
    store: Arc<dyn RoomStore>,
    pusher: Arc<dyn MessagePusher>,
    clock: Arc<dyn Clock>,
    grace: Duration,
}

impl DisconnectUseCase {
    pub fn new(
        coordinator: Arc<RoomCoordinator>,
        store: Arc<dyn RoomStore>,
        pusher: Arc<dyn MessagePusher>,
        clock: Arc<dyn Clock>,
        grace: Duration,
    ) -> Self {
        Self {
            coordinator,
            store,
            pusher,
            clock,
            grace,
        }
    }

    /// Handle a dropped connection: optimistic removal now, finalization
    /// after the grace window. Returns whether a departure was scheduled
    /// (false when the connection never joined a room).
    pub async fn execute(self: Arc<Self>, connection_id: ConnectionId) -> bool {
        let Some((room_id, participant)) =
            self.coordinator.remove_by_connection(connection_id).await
        else {
            return false;
        };

        tracing::info!(
            "'{}' disconnected from room '{}', grace window {:?} armed",
            participant.username,
            room_id,
            self.grace
        );

        let ticket = self
            .coordinator
            .schedule_departure(room_id, participant)
            .await;

        let usecase = Arc::clone(&self);
        tokio::spawn(async move {
            tokio::time::sleep(usecase.grace).await;
            usecase.finalize(ticket).await;
        });

        true
    }

    /// Grace-window expiry. Claims the pending departure (a rejoin makes the
    /// claim void), evaluates leader handover, persists the leave event,
    /// notifies the room and tears it down when it emptied.
    pub async fn finalize(&self, ticket: DepartureTicket) {
        let Some(pending) = self.coordinator.claim_departure(&ticket).await else {
            tracing::debug!("departure of '{}' cancelled by rejoin", ticket.username);
            return;
        };

        let username = pending.participant.username;
        let room_id = pending.room_id;
        let outcome = self.coordinator.finalize_departure(&room_id, &username).await;
        tracing::info!("'{}' left room '{}' for good", username, room_id);

        if let Err(e) = self.store.create_leave_event(&username, &room_id).await {
            tracing::warn!(
                "failed to persist leave event for '{}' in '{}': {}",
                username,
                room_id,
                e
            );
        }

        let targets = self.coordinator.connections(&room_id).await;
        if !targets.is_empty() {
            let list = ServerEvent::update_users(&outcome.participants).to_json();
            let notice = ServerEvent::system_notice(
                format!("{} left the room", username),
                timestamp_to_rfc3339(self.clock.now_millis()),
            )
            .to_json();
            // Leader value goes out on every finalized departure, changed or
            // not, so late joiners resolve any ambiguity.
            let leader = ServerEvent::leader_changed(outcome.leader.as_ref()).to_json();

            for payload in [list, notice, leader] {
                if let Err(e) = self.pusher.broadcast(&targets, &payload).await {
                    tracing::warn!("failed to broadcast departure of '{}': {}", username, e);
                }
            }
        }

        if outcome.room_empty {
            self.teardown(&room_id).await;
        }
    }

    /// Delete the emptied room's persisted artifacts. Each deletion is
    /// attempted independently; failures are logged, not retried.
    async fn teardown(&self, room_id: &RoomId) {
        tracing::info!("room '{}' is empty, tearing down", room_id);

        if let Err(e) = self.store.delete_room(room_id).await {
            tracing::warn!("failed to delete room '{}': {}", room_id, e);
        }
        if let Err(e) = self.store.delete_messages(room_id).await {
            tracing::warn!("failed to delete messages of room '{}': {}", room_id, e);
        }
        if let Err(e) = self.store.delete_events(room_id).await {
            tracing::warn!("failed to delete user events of room '{}': {}", room_id, e);
        }
    }
}
