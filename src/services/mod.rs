/// OpenAPI documentation generation.
pub mod documentation;
/// Per-player game session operations and leaderboards.
pub mod game_service;
/// Health check service.
pub mod health_service;
/// Room lifecycle, roster, and readiness operations.
pub mod lobby_service;
/// Profile creation and rank projections.
pub mod profile_service;
/// Server-Sent Events message generation.
pub mod sse_events;
/// Server-Sent Events broadcasting service.
pub mod sse_service;
