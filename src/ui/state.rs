//! Server state shared across handlers.

use std::sync::Arc;

use crate::domain::{MessagePusher, RoomCoordinator, RoomStore};
use crate::usecase::{
    DisconnectUseCase, JoinRoomUseCase, PlaybackSyncUseCase, SendMessageUseCase, TypingUseCase,
    UpdateStatusUseCase,
};

/// Shared application state
pub struct AppState {
    pub join_room_usecase: Arc<JoinRoomUseCase>,
    pub disconnect_usecase: Arc<DisconnectUseCase>,
    pub send_message_usecase: Arc<SendMessageUseCase>,
    pub update_status_usecase: Arc<UpdateStatusUseCase>,
    pub typing_usecase: Arc<TypingUseCase>,
    pub playback_usecase: Arc<PlaybackSyncUseCase>,
    /// Coordinator handle for the debug snapshot endpoint.
    pub coordinator: Arc<RoomCoordinator>,
    /// Store handle for the HTTP API.
    pub store: Arc<dyn RoomStore>,
    /// Pusher handle for connection registration.
    pub pusher: Arc<dyn MessagePusher>,
}
