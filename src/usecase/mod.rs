//! Application use cases orchestrating the coordinator, the store and the
//! pusher, one per inbound event class.

mod disconnect;
mod error;
mod join_room;
mod playback;
mod send_message;
mod typing;
mod update_status;

pub use disconnect::DisconnectUseCase;
pub use error::SendMessageError;
pub use join_room::JoinRoomUseCase;
pub use playback::PlaybackSyncUseCase;
pub use send_message::SendMessageUseCase;
pub use typing::TypingUseCase;
pub use update_status::UpdateStatusUseCase;
