//! Message pushing interface.
//!
//! The router fans events out through this trait; the WebSocket-backed
//! implementation lives in the infrastructure layer.

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;

use super::value_object::ConnectionId;

/// Outbound channel handed to the pusher when a connection is accepted.
pub type PusherChannel = mpsc::UnboundedSender<String>;

/// Errors surfaced by the message pusher.
#[derive(Debug, Error)]
pub enum MessagePushError {
    #[error("connection '{0}' is not registered")]
    ConnectionNotFound(String),
    #[error("failed to push message: {0}")]
    PushFailed(String),
}

/// Fan-out collaborator delivering serialized events to connections.
#[async_trait]
pub trait MessagePusher: Send + Sync {
    /// Register a connection's outbound channel.
    async fn register(&self, connection_id: ConnectionId, sender: PusherChannel);

    /// Drop a connection's outbound channel.
    async fn unregister(&self, connection_id: ConnectionId);

    /// Push a message to a single connection.
    async fn push_to(
        &self,
        connection_id: ConnectionId,
        content: &str,
    ) -> Result<(), MessagePushError>;

    /// Push a message to every target connection. Best effort: individual
    /// send failures are logged and skipped.
    async fn broadcast(
        &self,
        targets: &[ConnectionId],
        content: &str,
    ) -> Result<(), MessagePushError>;
}
