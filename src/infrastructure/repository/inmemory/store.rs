//! In-memory `RoomStore` implementation.
//!
//! HashMaps behind a single lock stand in for the external data store. The
//! trait boundary keeps the coordination core unaware of the backing choice,
//! so a DBMS-backed implementation can replace this one without touching the
//! use cases.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::common::time::{Clock, SystemClock};
use crate::domain::{
    ChatMessage, RoomId, RoomStore, StoreError, StoredRoom, Timestamp, UpsertOutcome, UserEvent,
    UserEventKind, Username,
};

#[derive(Default)]
struct StoreInner {
    rooms: HashMap<RoomId, StoredRoom>,
    messages: HashMap<RoomId, Vec<ChatMessage>>,
    events: HashMap<RoomId, Vec<UserEvent>>,
}

/// In-memory store for rooms, chat history and user events.
pub struct InMemoryRoomStore {
    inner: Mutex<StoreInner>,
    clock: Arc<dyn Clock>,
}

impl InMemoryRoomStore {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Create a store stamping user events with the given clock.
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: Mutex::new(StoreInner::default()),
            clock,
        }
    }
}

impl Default for InMemoryRoomStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RoomStore for InMemoryRoomStore {
    async fn find_room(&self, room_id: &RoomId) -> Result<Option<StoredRoom>, StoreError> {
        let inner = self.inner.lock().await;
        Ok(inner.rooms.get(room_id).cloned())
    }

    async fn create_room(&self, room_id: &RoomId) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().await;
        if inner.rooms.contains_key(room_id) {
            return Err(StoreError::RoomAlreadyExists(room_id.to_string()));
        }
        inner
            .rooms
            .insert(room_id.clone(), StoredRoom::new(room_id.clone()));
        Ok(())
    }

    async fn delete_room(&self, room_id: &RoomId) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().await;
        inner.rooms.remove(room_id);
        Ok(())
    }

    async fn add_member(&self, room_id: &RoomId, username: &Username) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().await;
        let room = inner
            .rooms
            .get_mut(room_id)
            .ok_or_else(|| StoreError::RoomNotFound(room_id.to_string()))?;
        if !room.members.contains(username) {
            room.members.push(username.clone());
        }
        Ok(())
    }

    async fn save_message(&self, message: ChatMessage) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().await;
        inner
            .messages
            .entry(message.room_id.clone())
            .or_default()
            .push(message);
        Ok(())
    }

    async fn find_messages(&self, room_id: &RoomId) -> Result<Vec<ChatMessage>, StoreError> {
        let inner = self.inner.lock().await;
        Ok(inner.messages.get(room_id).cloned().unwrap_or_default())
    }

    async fn delete_messages(&self, room_id: &RoomId) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().await;
        inner.messages.remove(room_id);
        Ok(())
    }

    async fn upsert_join_event(
        &self,
        username: &Username,
        room_id: &RoomId,
    ) -> Result<UpsertOutcome, StoreError> {
        let now = Timestamp::new(self.clock.now_millis());
        let mut inner = self.inner.lock().await;
        let events = inner.events.entry(room_id.clone()).or_default();

        if let Some(existing) = events
            .iter_mut()
            .find(|e| e.username == *username && e.kind == UserEventKind::Join)
        {
            existing.timestamp = now;
            return Ok(UpsertOutcome::Touched);
        }

        events.push(UserEvent {
            username: username.clone(),
            room_id: room_id.clone(),
            kind: UserEventKind::Join,
            timestamp: now,
        });
        Ok(UpsertOutcome::Created)
    }

    async fn create_leave_event(
        &self,
        username: &Username,
        room_id: &RoomId,
    ) -> Result<(), StoreError> {
        let now = Timestamp::new(self.clock.now_millis());
        let mut inner = self.inner.lock().await;
        inner.events.entry(room_id.clone()).or_default().push(UserEvent {
            username: username.clone(),
            room_id: room_id.clone(),
            kind: UserEventKind::Leave,
            timestamp: now,
        });
        Ok(())
    }

    async fn find_events(&self, room_id: &RoomId) -> Result<Vec<UserEvent>, StoreError> {
        let inner = self.inner.lock().await;
        Ok(inner.events.get(room_id).cloned().unwrap_or_default())
    }

    async fn delete_events(&self, room_id: &RoomId) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().await;
        inner.events.remove(room_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::time::FixedClock;

    fn room() -> RoomId {
        RoomId::new("r1")
    }

    fn message(text: &str) -> ChatMessage {
        ChatMessage {
            username: Username::new("alice"),
            message: text.to_string(),
            time: "10:30:00 AM".to_string(),
            room_id: room(),
            reply_to: None,
        }
    }

    #[tokio::test]
    async fn test_create_and_find_room() {
        // given:
        let store = InMemoryRoomStore::new();

        // when:
        store.create_room(&room()).await.unwrap();
        let found = store.find_room(&room()).await.unwrap();

        // then:
        let stored = found.expect("room should exist");
        assert_eq!(stored.room_id, room());
        assert!(stored.members.is_empty());
    }

    #[tokio::test]
    async fn test_create_existing_room_fails() {
        // given:
        let store = InMemoryRoomStore::new();
        store.create_room(&room()).await.unwrap();

        // when:
        let result = store.create_room(&room()).await;

        // then:
        assert!(matches!(result, Err(StoreError::RoomAlreadyExists(_))));
    }

    #[tokio::test]
    async fn test_add_member_is_idempotent() {
        // given:
        let store = InMemoryRoomStore::new();
        store.create_room(&room()).await.unwrap();

        // when:
        store.add_member(&room(), &Username::new("alice")).await.unwrap();
        store.add_member(&room(), &Username::new("alice")).await.unwrap();

        // then:
        let stored = store.find_room(&room()).await.unwrap().unwrap();
        assert_eq!(stored.members, vec![Username::new("alice")]);
    }

    #[tokio::test]
    async fn test_add_member_to_unknown_room_fails() {
        // given:
        let store = InMemoryRoomStore::new();

        // when:
        let result = store.add_member(&room(), &Username::new("alice")).await;

        // then:
        assert!(matches!(result, Err(StoreError::RoomNotFound(_))));
    }

    #[tokio::test]
    async fn test_save_and_find_messages() {
        // given:
        let store = InMemoryRoomStore::new();

        // when:
        store.save_message(message("hi")).await.unwrap();
        store.save_message(message("there")).await.unwrap();
        let messages = store.find_messages(&room()).await.unwrap();

        // then: arrival order is preserved
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].message, "hi");
        assert_eq!(messages[1].message, "there");
    }

    #[tokio::test]
    async fn test_upsert_join_event_creates_then_touches() {
        // given:
        let store = InMemoryRoomStore::with_clock(Arc::new(FixedClock::new(1000)));
        let alice = Username::new("alice");

        // when:
        let first = store.upsert_join_event(&alice, &room()).await.unwrap();
        let second = store.upsert_join_event(&alice, &room()).await.unwrap();

        // then: one event, touched on the second join
        assert_eq!(first, UpsertOutcome::Created);
        assert_eq!(second, UpsertOutcome::Touched);
        let events = store.find_events(&room()).await.unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, UserEventKind::Join);
        assert_eq!(events[0].timestamp, Timestamp::new(1000));
    }

    #[tokio::test]
    async fn test_leave_events_accumulate() {
        // given:
        let store = InMemoryRoomStore::new();
        let alice = Username::new("alice");

        // when:
        store.create_leave_event(&alice, &room()).await.unwrap();
        store.create_leave_event(&alice, &room()).await.unwrap();

        // then:
        let events = store.find_events(&room()).await.unwrap();
        assert_eq!(events.len(), 2);
        assert!(events.iter().all(|e| e.kind == UserEventKind::Leave));
    }

    #[tokio::test]
    async fn test_teardown_deletions_clear_all_room_artifacts() {
        // given:
        let store = InMemoryRoomStore::new();
        store.create_room(&room()).await.unwrap();
        store.save_message(message("hi")).await.unwrap();
        store
            .upsert_join_event(&Username::new("alice"), &room())
            .await
            .unwrap();

        // when:
        store.delete_room(&room()).await.unwrap();
        store.delete_messages(&room()).await.unwrap();
        store.delete_events(&room()).await.unwrap();

        // then:
        assert!(store.find_room(&room()).await.unwrap().is_none());
        assert!(store.find_messages(&room()).await.unwrap().is_empty());
        assert!(store.find_events(&room()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_deletes_are_idempotent() {
        // given:
        let store = InMemoryRoomStore::new();

        // when: deleting artifacts of a room that never existed
        let room_result = store.delete_room(&room()).await;
        let messages_result = store.delete_messages(&room()).await;
        let events_result = store.delete_events(&room()).await;

        // then:
        assert!(room_result.is_ok());
        assert!(messages_result.is_ok());
        assert!(events_result.is_ok());
    }
}
