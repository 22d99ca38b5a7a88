use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, post},
};
use axum_valid::Valid;
use serde::Deserialize;
use utoipa::IntoParams;
use uuid::Uuid;

use crate::{
    dto::{
        game::SessionSummary,
        lobby::{
            CreateRoomRequest, JoinRoomRequest, LeaveOutcome, LobbyView, PlayerSummary,
            RoomActionRequest, RoomSummary,
        },
    },
    error::AppError,
    services::lobby_service,
    state::SharedState,
};

/// Query parameters identifying the viewing player.
#[derive(Debug, Deserialize, IntoParams)]
pub struct ViewerQuery {
    /// The viewing player's user id.
    pub user_id: Uuid,
}

/// Routes handling room lifecycle and roster operations.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/rooms", post(create_room))
        .route("/rooms/join", post(join_room))
        .route("/rooms/{id}", get(room_view))
        .route("/rooms/{id}/ready", post(toggle_ready))
        .route("/rooms/{id}/start", post(start_game))
        .route("/rooms/{id}/leave", post(leave_room))
}

/// Open a new room with the caller as its auto-ready creator.
#[utoipa::path(
    post,
    path = "/rooms",
    tag = "lobby",
    request_body = CreateRoomRequest,
    responses(
        (status = 200, description = "Room created", body = RoomSummary)
    )
)]
pub async fn create_room(
    State(state): State<SharedState>,
    Valid(Json(payload)): Valid<Json<CreateRoomRequest>>,
) -> Result<Json<RoomSummary>, AppError> {
    let summary = lobby_service::create_room(&state, payload).await?;
    Ok(Json(summary))
}

/// Join a waiting room by its 6-digit code.
#[utoipa::path(
    post,
    path = "/rooms/join",
    tag = "lobby",
    request_body = JoinRoomRequest,
    responses(
        (status = 200, description = "Joined (idempotent per user)", body = RoomSummary),
        (status = 404, description = "No waiting room with this code"),
        (status = 409, description = "Room is full")
    )
)]
pub async fn join_room(
    State(state): State<SharedState>,
    Valid(Json(payload)): Valid<Json<JoinRoomRequest>>,
) -> Result<Json<RoomSummary>, AppError> {
    let summary = lobby_service::join_room(&state, payload).await?;
    Ok(Json(summary))
}

/// Point-in-time lobby view for the initial page load.
#[utoipa::path(
    get,
    path = "/rooms/{id}",
    tag = "lobby",
    params(
        ("id" = Uuid, Path, description = "Room identifier"),
        ViewerQuery
    ),
    responses(
        (status = 200, description = "Lobby view", body = LobbyView)
    )
)]
pub async fn room_view(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Query(viewer): Query<ViewerQuery>,
) -> Result<Json<LobbyView>, AppError> {
    let view = lobby_service::lobby_view(&state, id, viewer.user_id).await?;
    Ok(Json(view))
}

/// Flip the caller's readiness flag.
#[utoipa::path(
    post,
    path = "/rooms/{id}/ready",
    tag = "lobby",
    params(("id" = Uuid, Path, description = "Room identifier")),
    request_body = RoomActionRequest,
    responses(
        (status = 200, description = "Updated roster entry", body = PlayerSummary)
    )
)]
pub async fn toggle_ready(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<RoomActionRequest>,
) -> Result<Json<PlayerSummary>, AppError> {
    let player = lobby_service::toggle_ready(&state, id, payload.user_id).await?;
    Ok(Json(player))
}

/// Start the game (creator-only, all players ready).
#[utoipa::path(
    post,
    path = "/rooms/{id}/start",
    tag = "lobby",
    params(("id" = Uuid, Path, description = "Room identifier")),
    request_body = RoomActionRequest,
    responses(
        (status = 200, description = "Session created", body = SessionSummary),
        (status = 401, description = "Caller is not the creator"),
        (status = 409, description = "At least one player is not ready")
    )
)]
pub async fn start_game(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<RoomActionRequest>,
) -> Result<Json<SessionSummary>, AppError> {
    let session = lobby_service::start_game(&state, id, payload.user_id).await?;
    Ok(Json(session))
}

/// Leave a room; the creator closes it for everyone.
#[utoipa::path(
    post,
    path = "/rooms/{id}/leave",
    tag = "lobby",
    params(("id" = Uuid, Path, description = "Room identifier")),
    request_body = RoomActionRequest,
    responses(
        (status = 200, description = "Left the room", body = LeaveOutcome)
    )
)]
pub async fn leave_room(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<RoomActionRequest>,
) -> Result<Json<LeaveOutcome>, AppError> {
    let outcome = lobby_service::leave_room(&state, id, payload.user_id).await?;
    Ok(Json(outcome))
}
