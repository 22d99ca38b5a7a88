use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI specification for Quiz Rush Back.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::lobby::create_room,
        crate::routes::lobby::join_room,
        crate::routes::lobby::room_view,
        crate::routes::lobby::toggle_ready,
        crate::routes::lobby::start_game,
        crate::routes::lobby::leave_room,
        crate::routes::game::start_solo,
        crate::routes::game::session_summary,
        crate::routes::game::load_session,
        crate::routes::game::game_view,
        crate::routes::game::submit_answer,
        crate::routes::game::quit_session,
        crate::routes::game::leaderboard,
        crate::routes::profile::ensure_profile,
        crate::routes::profile::username_taken,
        crate::routes::profile::get_profile,
        crate::routes::sse::lobby_stream,
        crate::routes::sse::scores_stream,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::lobby::CreateRoomRequest,
            crate::dto::lobby::JoinRoomRequest,
            crate::dto::lobby::RoomActionRequest,
            crate::dto::lobby::RoomSummary,
            crate::dto::lobby::PlayerSummary,
            crate::dto::lobby::LobbyView,
            crate::dto::lobby::LeaveOutcome,
            crate::dto::game::SoloGameRequest,
            crate::dto::game::SessionActionRequest,
            crate::dto::game::AnswerRequest,
            crate::dto::game::AnswerResponse,
            crate::dto::game::SessionSummary,
            crate::dto::game::QuestionView,
            crate::dto::game::GamePhaseView,
            crate::dto::game::GameView,
            crate::dto::game::LeaderboardEntry,
            crate::dto::game::LeaderboardView,
            crate::dto::profile::RegisterProfileRequest,
            crate::dto::profile::UsernameAvailability,
            crate::dto::profile::RankSnapshot,
            crate::dto::profile::ProfileResponse,
            crate::dto::sse::Handshake,
            crate::dto::sse::GameStartedEvent,
            crate::dto::sse::RoomClosedEvent,
            crate::dao::models::RoomStatus,
            crate::dao::models::SessionStatus,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "lobby", description = "Room lifecycle and roster operations"),
        (name = "game", description = "Game session operations"),
        (name = "profile", description = "Profiles and rank progression"),
        (name = "sse", description = "Server-sent events streams"),
    )
)]
pub struct ApiDoc;
