//! UseCase error definitions.

use thiserror::Error;

/// Reasons a chat message is dropped. Never surfaced to the sender in-band;
/// callers log and move on.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SendMessageError {
    #[error("room '{0}' does not exist")]
    RoomNotFound(String),
    #[error("failed to persist message: {0}")]
    PersistFailed(String),
}
