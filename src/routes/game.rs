use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
};
use axum_valid::Valid;
use uuid::Uuid;

use crate::{
    dto::game::{
        AnswerRequest, AnswerResponse, GameView, LeaderboardView, SessionActionRequest,
        SessionSummary, SoloGameRequest,
    },
    error::AppError,
    routes::lobby::ViewerQuery,
    services::game_service,
    state::SharedState,
};

/// Routes handling game session operations.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/games/solo", post(start_solo))
        .route("/games/{id}", get(session_summary))
        .route("/games/{id}/play", post(load_session))
        .route("/games/{id}/view", get(game_view))
        .route("/games/{id}/answer", post(submit_answer))
        .route("/games/{id}/quit", post(quit_session))
        .route("/games/{id}/scores", get(leaderboard))
}

/// Start a solo game session.
#[utoipa::path(
    post,
    path = "/games/solo",
    tag = "game",
    request_body = SoloGameRequest,
    responses(
        (status = 200, description = "Session created", body = SessionSummary)
    )
)]
pub async fn start_solo(
    State(state): State<SharedState>,
    Valid(Json(payload)): Valid<Json<SoloGameRequest>>,
) -> Result<Json<SessionSummary>, AppError> {
    let session = game_service::start_solo(&state, payload).await?;
    Ok(Json(session))
}

/// Fetch a session's public projection.
#[utoipa::path(
    get,
    path = "/games/{id}",
    tag = "game",
    params(("id" = Uuid, Path, description = "Session identifier")),
    responses(
        (status = 200, description = "Session", body = SessionSummary)
    )
)]
pub async fn session_summary(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionSummary>, AppError> {
    let session = game_service::session_summary(&state, id).await?;
    Ok(Json(session))
}

/// Load the session for the calling participant and start their run.
#[utoipa::path(
    post,
    path = "/games/{id}/play",
    tag = "game",
    params(("id" = Uuid, Path, description = "Session identifier")),
    request_body = SessionActionRequest,
    responses(
        (status = 200, description = "Run started (idempotent)", body = GameView),
        (status = 404, description = "No questions match the session filters")
    )
)]
pub async fn load_session(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<SessionActionRequest>,
) -> Result<Json<GameView>, AppError> {
    let view = game_service::load_session(&state, id, payload.user_id).await?;
    Ok(Json(view))
}

/// Live view of the calling participant's run, countdown included.
#[utoipa::path(
    get,
    path = "/games/{id}/view",
    tag = "game",
    params(
        ("id" = Uuid, Path, description = "Session identifier"),
        ViewerQuery
    ),
    responses(
        (status = 200, description = "Run view", body = GameView)
    )
)]
pub async fn game_view(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Query(viewer): Query<ViewerQuery>,
) -> Result<Json<GameView>, AppError> {
    let view = game_service::game_view(&state, id, viewer.user_id).await?;
    Ok(Json(view))
}

/// Record the caller's answer to their current question.
#[utoipa::path(
    post,
    path = "/games/{id}/answer",
    tag = "game",
    params(("id" = Uuid, Path, description = "Session identifier")),
    request_body = AnswerRequest,
    responses(
        (status = 200, description = "Answer outcome", body = AnswerResponse)
    )
)]
pub async fn submit_answer(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<AnswerRequest>,
) -> Result<Json<AnswerResponse>, AppError> {
    let outcome = game_service::submit_answer(&state, id, payload).await?;
    Ok(Json(outcome))
}

/// Abandon the caller's run, cancelling its countdown.
#[utoipa::path(
    post,
    path = "/games/{id}/quit",
    tag = "game",
    params(("id" = Uuid, Path, description = "Session identifier")),
    request_body = SessionActionRequest,
    responses(
        (status = 204, description = "Run torn down")
    )
)]
pub async fn quit_session(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<SessionActionRequest>,
) -> StatusCode {
    game_service::quit_session(&state, id, payload.user_id).await;
    StatusCode::NO_CONTENT
}

/// Leaderboard snapshot for a session.
#[utoipa::path(
    get,
    path = "/games/{id}/scores",
    tag = "game",
    params(("id" = Uuid, Path, description = "Session identifier")),
    responses(
        (status = 200, description = "Leaderboard", body = LeaderboardView)
    )
)]
pub async fn leaderboard(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<LeaderboardView>, AppError> {
    let board = game_service::leaderboard(&state, id).await?;
    Ok(Json(board))
}
