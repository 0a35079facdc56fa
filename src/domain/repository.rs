//! Store trait for rooms, messages and user events.
//!
//! The coordination core persists best effort through this interface and
//! never lets a store failure escalate past the event that triggered it.
//! Concrete implementations live in the infrastructure layer (dependency
//! inversion).

use async_trait::async_trait;
use thiserror::Error;

use super::entity::{ChatMessage, StoredRoom, UserEvent};
use super::value_object::{RoomId, Username};

/// Errors surfaced by the store collaborator.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("room '{0}' already exists")]
    RoomAlreadyExists(String),
    #[error("room '{0}' not found")]
    RoomNotFound(String),
    #[error("store backend failure: {0}")]
    Backend(String),
}

/// Outcome of a join-event upsert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// No join event existed for this user and room; one was created.
    Created,
    /// An existing join event had its timestamp refreshed.
    Touched,
}

/// Persistence collaborator for rooms, chat history and user events.
///
/// All operations are fallible; callers catch and log failures without
/// interrupting event handling.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RoomStore: Send + Sync {
    async fn find_room(&self, room_id: &RoomId) -> Result<Option<StoredRoom>, StoreError>;

    async fn create_room(&self, room_id: &RoomId) -> Result<(), StoreError>;

    async fn delete_room(&self, room_id: &RoomId) -> Result<(), StoreError>;

    /// Add a username to the room's membership list; idempotent.
    async fn add_member(&self, room_id: &RoomId, username: &Username) -> Result<(), StoreError>;

    async fn save_message(&self, message: ChatMessage) -> Result<(), StoreError>;

    async fn find_messages(&self, room_id: &RoomId) -> Result<Vec<ChatMessage>, StoreError>;

    async fn delete_messages(&self, room_id: &RoomId) -> Result<(), StoreError>;

    /// Create a join event for the user and room, or refresh the timestamp
    /// of an existing one.
    async fn upsert_join_event(
        &self,
        username: &Username,
        room_id: &RoomId,
    ) -> Result<UpsertOutcome, StoreError>;

    async fn create_leave_event(
        &self,
        username: &Username,
        room_id: &RoomId,
    ) -> Result<(), StoreError>;

    async fn find_events(&self, room_id: &RoomId) -> Result<Vec<UserEvent>, StoreError>;

    async fn delete_events(&self, room_id: &RoomId) -> Result<(), StoreError>;
}
