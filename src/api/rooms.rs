use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;

use crate::auth::{CurrentUser, MaybeUser};
use crate::error::{AppError, Result};
use crate::models::{paginate, CreateRoomRequest, ListRoomsQuery, Room, RoomView};
use crate::state::AppState;

/// Room routes
pub fn room_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_rooms).post(create_room))
        .route("/{room_id}", get(get_room).delete(delete_room))
        .route("/{room_id}/join", post(join_room))
        .route("/{room_id}/leave", post(leave_room))
}

/// POST /api/v1/rooms - Create a new room
async fn create_room(
    State(state): State<AppState>,
    CurrentUser(account): CurrentUser,
    Json(request): Json<CreateRoomRequest>,
) -> Result<impl IntoResponse> {
    let name = request.name.trim();
    if name.is_empty() {
        return Err(AppError::Validation("Room name is required".to_string()));
    }
    if name.len() > 100 {
        return Err(AppError::Validation(
            "Room name must be at most 100 characters".to_string(),
        ));
    }

    let room = Room::new(
        request.name,
        account.id().to_string(),
        request.is_private,
        request.description.unwrap_or_default(),
    );

    state.rooms.create_room(&room).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "status": "success",
            "room": RoomView::new(room, Vec::new()),
        })),
    ))
}

/// GET /api/v1/rooms - List visible rooms, newest first
///
/// Works with or without authentication; unauthenticated requesters see only
/// public rooms.
async fn list_rooms(
    State(state): State<AppState>,
    MaybeUser(account): MaybeUser,
    Query(query): Query<ListRoomsQuery>,
) -> Result<impl IntoResponse> {
    let (page, limit) = query.normalize();
    let viewer = account.as_ref().map(|a| a.id());

    let mut visible = Vec::new();
    for room in state.rooms.list_rooms().await? {
        if !room.is_private {
            visible.push(room);
            continue;
        }
        let Some(viewer) = viewer else { continue };
        let members = state.rooms.get_members(&room.id).await?;
        if room.visible_to(Some(viewer), &members) {
            visible.push(room);
        }
    }

    let (page_rooms, total_pages) = paginate(visible, page, limit);

    let mut rooms = Vec::with_capacity(page_rooms.len());
    for room in page_rooms {
        let members = state.rooms.get_members(&room.id).await?;
        rooms.push(RoomView::new(room, members.into_iter().collect()));
    }

    Ok(Json(json!({
        "status": "success",
        "results": rooms.len(),
        "page": page,
        "totalPages": total_pages,
        "rooms": rooms,
    })))
}

/// GET /api/v1/rooms/:room_id - Get a room, subject to visibility
async fn get_room(
    State(state): State<AppState>,
    CurrentUser(account): CurrentUser,
    Path(room_id): Path<String>,
) -> Result<impl IntoResponse> {
    let room = state
        .rooms
        .get_room(&room_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Room not found".to_string()))?;

    let members = state.rooms.get_members(&room_id).await?;
    if !room.visible_to(Some(account.id()), &members) {
        return Err(AppError::Forbidden(
            "You do not have access to this room".to_string(),
        ));
    }

    Ok(Json(json!({
        "status": "success",
        "room": RoomView::new(room, members.into_iter().collect()),
    })))
}

/// POST /api/v1/rooms/:room_id/join
///
/// Private rooms cannot be joined through this path at all; there is no
/// invitation mechanism here.
async fn join_room(
    State(state): State<AppState>,
    CurrentUser(account): CurrentUser,
    Path(room_id): Path<String>,
) -> Result<impl IntoResponse> {
    let room = state
        .rooms
        .get_room(&room_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Room not found".to_string()))?;

    if !room.can_join(account.id()) {
        return Err(AppError::Forbidden(
            "Cannot join a private room directly.".to_string(),
        ));
    }

    // Add-if-absent; joining twice is not an error.
    state.rooms.add_member(&room_id, account.id()).await?;

    Ok(Json(json!({ "status": "success" })))
}

/// POST /api/v1/rooms/:room_id/leave
async fn leave_room(
    State(state): State<AppState>,
    CurrentUser(account): CurrentUser,
    Path(room_id): Path<String>,
) -> Result<impl IntoResponse> {
    let room = state
        .rooms
        .get_room(&room_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Room not found".to_string()))?;

    if room.leave_blocked_for(account.id()) {
        return Err(AppError::InvalidOperation(
            "creator cannot leave, must delete the room".to_string(),
        ));
    }

    // Remove-if-present; leaving a room you never joined is a no-op.
    state.rooms.remove_member(&room_id, account.id()).await?;

    Ok(Json(json!({ "status": "success" })))
}

/// DELETE /api/v1/rooms/:room_id - creator-only hard delete
async fn delete_room(
    State(state): State<AppState>,
    CurrentUser(account): CurrentUser,
    Path(room_id): Path<String>,
) -> Result<impl IntoResponse> {
    let room = state
        .rooms
        .get_room(&room_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Room not found".to_string()))?;

    if room.creator != account.id() {
        return Err(AppError::Forbidden(
            "Only the creator can delete this room".to_string(),
        ));
    }

    state.rooms.delete_room(&room_id).await?;

    Ok(StatusCode::NO_CONTENT)
}
