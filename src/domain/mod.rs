//! Domain layer: entities, value objects, the room coordinator and the
//! interfaces the coordination core expects from its collaborators.

pub mod coordinator;
pub mod entity;
pub mod pusher;
pub mod repository;
pub mod value_object;

pub use coordinator::{
    DepartureOutcome, DepartureTicket, JoinOutcome, ParticipantLifecycle, PendingDeparture,
    PlaybackState, RoomCoordinator, RoomSnapshot,
};
pub use entity::{ChatMessage, Participant, StoredRoom, UserEvent, UserEventKind};
pub use pusher::{MessagePushError, MessagePusher, PusherChannel};
pub use repository::{RoomStore, StoreError, UpsertOutcome};
pub use value_object::{ConnectionId, RoomId, Timestamp, UserStatus, Username, VideoId};
