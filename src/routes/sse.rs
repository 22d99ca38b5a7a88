use std::convert::Infallible;

use axum::{
    Router,
    extract::{Path, Query, State},
    response::sse::Sse,
    routing::get,
};
use futures::{Stream, StreamExt, stream};
use tracing::info;
use uuid::Uuid;

use crate::{
    error::AppError,
    routes::lobby::ViewerQuery,
    services::{
        game_service, lobby_service, sse_events,
        sse_service::{self, StreamKind},
    },
    state::SharedState,
};

/// Configure the SSE endpoints.
pub fn router() -> Router<SharedState> {
    Router::<SharedState>::new()
        .route("/rooms/{id}/events", get(lobby_stream))
        .route("/games/{id}/scores/events", get(scores_stream))
}

#[utoipa::path(
    get,
    path = "/rooms/{id}/events",
    tag = "sse",
    params(
        ("id" = Uuid, Path, description = "Room identifier"),
        ViewerQuery
    ),
    responses((status = 200, description = "Lobby SSE stream", content_type = "text/event-stream", body = String))
)]
/// Stream lobby views to one player of a room.
pub async fn lobby_stream(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Query(viewer): Query<ViewerQuery>,
) -> Result<Sse<impl Stream<Item = Result<axum::response::sse::Event, Infallible>>>, AppError> {
    let views = lobby_service::watch_lobby(state, id, viewer.user_id).await?;
    info!(room = %id, user = %viewer.user_id, "new lobby SSE connection");

    let handshake = sse_service::handshake_event("lobby", "lobby stream connected");
    let events = stream::iter([handshake]).chain(sse_events::lobby_event_stream(views));

    Ok(sse_service::to_sse_stream(
        events,
        StreamKind::Lobby { room_id: id },
    ))
}

#[utoipa::path(
    get,
    path = "/games/{id}/scores/events",
    tag = "sse",
    params(("id" = Uuid, Path, description = "Session identifier")),
    responses((status = 200, description = "Leaderboard SSE stream", content_type = "text/event-stream", body = String))
)]
/// Stream live leaderboard snapshots for a session.
pub async fn scores_stream(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Sse<impl Stream<Item = Result<axum::response::sse::Event, Infallible>>>, AppError> {
    let views = game_service::watch_leaderboard(state, id).await?;
    info!(session = %id, "new scores SSE connection");

    let handshake = sse_service::handshake_event("scores", "scores stream connected");
    let events = stream::iter([handshake]).chain(sse_events::scoreboard_event_stream(views));

    Ok(sse_service::to_sse_stream(
        events,
        StreamKind::Scores { session_id: id },
    ))
}
