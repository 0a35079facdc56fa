//! HTTP API endpoint handlers.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};

use crate::{
    domain::{RoomId, RoomSnapshot},
    infrastructure::dto::http::{
        CreateRoomRequest, CreateRoomResponse, ErrorResponse, MessageDto, RoomExistsResponse,
    },
    ui::state::AppState,
};

/// Health check endpoint
pub async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "ok"}))
}

/// Create a room ahead of the first join. Rejected when the id is taken.
pub async fn create_room(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CreateRoomRequest>,
) -> Result<(StatusCode, Json<CreateRoomResponse>), (StatusCode, Json<ErrorResponse>)> {
    let room_id = RoomId::new(request.room_id.clone());

    match state.store.find_room(&room_id).await {
        Ok(Some(_)) => Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: "Room already exists".to_string(),
            }),
        )),
        Ok(None) => match state.store.create_room(&room_id).await {
            Ok(()) => Ok((
                StatusCode::CREATED,
                Json(CreateRoomResponse {
                    message: "Room created successfully".to_string(),
                    room_id: request.room_id,
                }),
            )),
            Err(e) => {
                tracing::error!("failed to create room '{}': {}", room_id, e);
                Err((
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ErrorResponse {
                        error: "Failed to create room".to_string(),
                    }),
                ))
            }
        },
        Err(e) => {
            tracing::error!("failed to look up room '{}': {}", room_id, e);
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "Failed to create room".to_string(),
                }),
            ))
        }
    }
}

/// Check whether a room exists.
pub async fn room_exists(
    State(state): State<Arc<AppState>>,
    Path(room_id): Path<String>,
) -> Result<(StatusCode, Json<RoomExistsResponse>), StatusCode> {
    match state.store.find_room(&RoomId::new(room_id)).await {
        Ok(Some(_)) => Ok((StatusCode::OK, Json(RoomExistsResponse { exists: true }))),
        Ok(None) => Ok((
            StatusCode::NOT_FOUND,
            Json(RoomExistsResponse { exists: false }),
        )),
        Err(e) => {
            tracing::error!("room existence check failed: {}", e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

/// Chat history of a room, in arrival order.
pub async fn get_room_messages(
    State(state): State<Arc<AppState>>,
    Path(room_id): Path<String>,
) -> Result<Json<Vec<MessageDto>>, StatusCode> {
    let room_id = RoomId::new(room_id);

    match state.store.find_room(&room_id).await {
        Ok(Some(_)) => {}
        Ok(None) => return Err(StatusCode::NOT_FOUND),
        Err(e) => {
            tracing::error!("failed to look up room '{}': {}", room_id, e);
            return Err(StatusCode::INTERNAL_SERVER_ERROR);
        }
    }

    match state.store.find_messages(&room_id).await {
        Ok(messages) => Ok(Json(messages.into_iter().map(MessageDto::from).collect())),
        Err(e) => {
            tracing::error!("failed to fetch messages of room '{}': {}", room_id, e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

/// Debug endpoint to get current coordination state (for testing purposes)
pub async fn debug_rooms(State(state): State<Arc<AppState>>) -> Json<Vec<RoomSnapshot>> {
    Json(state.coordinator.snapshot().await)
}
