//! WebSocket connection handlers.
//!
//! One socket per client. The connection is identified by a fresh
//! `ConnectionId`; room membership is established by a `join_room` event on
//! the socket, not at upgrade time. Every inbound event is dispatched
//! best-effort: a failing handler logs and the loop keeps going, nothing
//! here can take the server down.

use std::sync::Arc;

use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
};
use futures_util::{sink::SinkExt, stream::StreamExt};
use tokio::sync::mpsc;

use crate::{
    domain::{ChatMessage, ConnectionId, RoomId, Username, VideoId},
    infrastructure::dto::websocket::ClientEvent,
    ui::state::AppState,
};

pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Spawns a task that receives messages from the rx channel and pushes them
/// to the WebSocket sender.
fn pusher_loop(
    mut rx: mpsc::UnboundedReceiver<String>,
    mut sender: futures_util::stream::SplitSink<WebSocket, Message>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if sender.send(Message::Text(msg.into())).await.is_err() {
                break;
            }
        }
    })
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let connection_id = ConnectionId::new();
    let (tx, rx) = mpsc::unbounded_channel();
    state.pusher.register(connection_id, tx).await;
    tracing::info!("connection '{}' established", connection_id);

    let (sender, mut receiver) = socket.split();

    // Outbound: events from the room fan out to this socket
    let mut send_task = pusher_loop(rx, sender);

    // Inbound: events from this socket drive the router
    let recv_state = state.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(msg) = receiver.next().await {
            let msg = match msg {
                Ok(msg) => msg,
                Err(e) => {
                    tracing::error!("websocket error on '{}': {}", connection_id, e);
                    break;
                }
            };

            match msg {
                Message::Text(text) => {
                    dispatch_event(&recv_state, connection_id, text.as_str()).await;
                }
                Message::Ping(_) => {
                    tracing::debug!("received ping from '{}'", connection_id);
                    // Ping/pong is handled automatically by the WebSocket protocol
                }
                Message::Close(_) => {
                    tracing::info!("connection '{}' requested close", connection_id);
                    break;
                }
                _ => {}
            }
        }
    });

    // If any one of the tasks completes, abort the other
    tokio::select! {
        _ = &mut recv_task => send_task.abort(),
        _ = &mut send_task => recv_task.abort(),
    };

    state.pusher.unregister(connection_id).await;
    if state.disconnect_usecase.clone().execute(connection_id).await {
        tracing::info!("connection '{}' dropped, departure scheduled", connection_id);
    } else {
        tracing::info!("connection '{}' dropped before joining a room", connection_id);
    }
}

/// Route one inbound event to its use case. Errors are logged and the event
/// is dropped; the connection keeps running.
async fn dispatch_event(state: &Arc<AppState>, connection_id: ConnectionId, text: &str) {
    let event = match serde_json::from_str::<ClientEvent>(text) {
        Ok(event) => event,
        Err(e) => {
            tracing::warn!("unparseable event from '{}': {}", connection_id, e);
            return;
        }
    };

    match event {
        ClientEvent::JoinRoom { room_id, username } => {
            state
                .join_room_usecase
                .execute(RoomId::new(room_id), connection_id, Username::new(username))
                .await;
        }
        ClientEvent::UpdateStatus { username, status } => {
            state
                .update_status_usecase
                .execute(&Username::new(username), status)
                .await;
        }
        ClientEvent::Typing { room_id, username } => {
            state
                .typing_usecase
                .execute(&RoomId::new(room_id), &Username::new(username), connection_id)
                .await;
        }
        ClientEvent::SendMessage {
            username,
            message,
            time,
            room_id,
            reply_to,
        } => {
            let chat_message = ChatMessage {
                username: Username::new(username),
                message,
                time,
                room_id: RoomId::new(room_id),
                reply_to,
            };
            if let Err(e) = state.send_message_usecase.execute(chat_message).await {
                tracing::warn!("message from '{}' dropped: {}", connection_id, e);
            }
        }
        ClientEvent::SyncVideo {
            room_id,
            action,
            time,
            progress,
        } => {
            state
                .playback_usecase
                .relay_action(&RoomId::new(room_id), connection_id, action, time, progress)
                .await;
        }
        ClientEvent::VideoChanged { room_id, video_id } => {
            state
                .playback_usecase
                .change_video(&RoomId::new(room_id), connection_id, VideoId::new(video_id))
                .await;
        }
        ClientEvent::SyncToggle { room_id, enabled } => {
            state
                .playback_usecase
                .set_sync_enabled(&RoomId::new(room_id), connection_id, enabled)
                .await;
        }
    }
}
