//! UseCase: typing indicator relay.
//!
//! Stateless: the username is relayed to everyone in the room except the
//! sender's own connection. Clients time the indicator out themselves.

use std::sync::Arc;

use crate::domain::{ConnectionId, MessagePusher, RoomCoordinator, RoomId, Username};
use crate::infrastructure::dto::websocket::ServerEvent;

pub struct TypingUseCase {
    coordinator: Arc<RoomCoordinator>,
    pusher: Arc<dyn MessagePusher>,
}

impl TypingUseCase {
    pub fn new(coordinator: Arc<RoomCoordinator>, pusher: Arc<dyn MessagePusher>) -> Self {
        Self { coordinator, pusher }
    }

    pub async fn execute(&self, room_id: &RoomId, username: &Username, sender: ConnectionId) {
        let targets: Vec<ConnectionId> = self
            .coordinator
            .connections(room_id)
            .await
            .into_iter()
            .filter(|c| *c != sender)
            .collect();

        let event = ServerEvent::UserTyping {
            username: username.as_str().to_string(),
        };
        if let Err(e) = self.pusher.broadcast(&targets, &event.to_json()).await {
            tracing::warn!("failed to broadcast typing indicator: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::message_pusher::WebSocketMessagePusher;
    use serde_json::Value;
    use tokio::sync::mpsc;

    #[tokio::test]
    async fn test_typing_excludes_the_sender() {
        // given:
        let coordinator = Arc::new(RoomCoordinator::new());
        let pusher = Arc::new(WebSocketMessagePusher::new());
        let usecase = TypingUseCase::new(coordinator.clone(), pusher.clone());
        let room = RoomId::new("r1");

        let alice_conn = ConnectionId::new();
        let (alice_tx, mut alice_rx) = mpsc::unbounded_channel();
        pusher.register(alice_conn, alice_tx).await;
        coordinator.join(&room, alice_conn, &Username::new("alice")).await;

        let bob_conn = ConnectionId::new();
        let (bob_tx, mut bob_rx) = mpsc::unbounded_channel();
        pusher.register(bob_conn, bob_tx).await;
        coordinator.join(&room, bob_conn, &Username::new("bob")).await;

        // when: alice is typing
        usecase.execute(&room, &Username::new("alice"), alice_conn).await;

        // then: bob sees it, alice does not
        let event: Value = serde_json::from_str(&bob_rx.try_recv().unwrap()).unwrap();
        assert_eq!(event["type"], "user_typing");
        assert_eq!(event["username"], "alice");
        assert!(alice_rx.try_recv().is_err());
    }
}
