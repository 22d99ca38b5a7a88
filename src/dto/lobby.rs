use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationErrors};

use crate::{
    dao::models::{RoomEntity, RoomPlayerEntity, RoomStatus},
    dto::{
        format_system_time,
        validation::{
            MAX_PLAYERS, MAX_QUESTIONS, MAX_TIME_LIMIT_SECONDS, MIN_PLAYERS, MIN_QUESTIONS,
            MIN_TIME_LIMIT_SECONDS, validate_category, validate_difficulty, validate_in_range,
            validate_non_blank, validate_room_code,
        },
    },
};

/// Payload used to open a brand-new room.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateRoomRequest {
    /// Creator's user id.
    pub user_id: Uuid,
    /// Creator's username, denormalized into the roster.
    pub username: String,
    /// Display name of the room.
    pub name: String,
    /// Maximum number of players (2..=8).
    pub max_players: u8,
    /// Number of questions per game (5..=20).
    pub num_questions: u8,
    /// Seconds per question (10..=60).
    pub time_limit_seconds: u32,
    /// Question category, or "all".
    pub category: String,
    /// Question difficulty.
    pub difficulty: String,
}

impl Validate for CreateRoomRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if let Err(e) = validate_non_blank("room_name", &self.name) {
            errors.add("name", e);
        }
        if let Err(e) = validate_non_blank("username", &self.username) {
            errors.add("username", e);
        }
        if let Err(e) = validate_in_range("max_players", self.max_players, MIN_PLAYERS, MAX_PLAYERS)
        {
            errors.add("max_players", e);
        }
        if let Err(e) = validate_in_range(
            "num_questions",
            self.num_questions,
            MIN_QUESTIONS,
            MAX_QUESTIONS,
        ) {
            errors.add("num_questions", e);
        }
        if let Err(e) = validate_in_range(
            "time_limit_seconds",
            self.time_limit_seconds,
            MIN_TIME_LIMIT_SECONDS,
            MAX_TIME_LIMIT_SECONDS,
        ) {
            errors.add("time_limit_seconds", e);
        }
        if let Err(e) = validate_category(&self.category) {
            errors.add("category", e);
        }
        if let Err(e) = validate_difficulty(&self.difficulty) {
            errors.add("difficulty", e);
        }

        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

/// Payload used to join an existing room by its 6-digit code.
#[derive(Debug, Deserialize, ToSchema)]
pub struct JoinRoomRequest {
    /// Joining user's id.
    pub user_id: Uuid,
    /// Joining user's username, denormalized into the roster.
    pub username: String,
    /// The room's 6-digit code.
    pub code: String,
}

impl Validate for JoinRoomRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if let Err(e) = validate_non_blank("username", &self.username) {
            errors.add("username", e);
        }
        if let Err(e) = validate_room_code(&self.code) {
            errors.add("code", e);
        }

        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

/// Identifies the acting player for roster operations.
#[derive(Debug, Deserialize, ToSchema)]
pub struct RoomActionRequest {
    /// The acting player's user id.
    pub user_id: Uuid,
}

/// Public projection of a room exposed to REST/SSE clients.
#[derive(Clone, Debug, Serialize, ToSchema)]
pub struct RoomSummary {
    /// Room id.
    pub id: Uuid,
    /// Shareable 6-digit join code.
    pub code: String,
    /// Display name.
    pub name: String,
    /// User who created the room.
    pub creator_id: Uuid,
    /// Maximum number of players.
    pub max_players: u8,
    /// Questions per game.
    pub num_questions: u8,
    /// Seconds per question.
    pub time_limit_seconds: u32,
    /// Question category.
    pub category: String,
    /// Question difficulty.
    pub difficulty: String,
    /// Current lifecycle status.
    pub status: RoomStatus,
    /// RFC 3339 creation timestamp.
    pub created_at: String,
}

impl From<RoomEntity> for RoomSummary {
    fn from(room: RoomEntity) -> Self {
        Self {
            id: room.id,
            code: room.code,
            name: room.name,
            creator_id: room.creator_id,
            max_players: room.max_players,
            num_questions: room.num_questions,
            time_limit_seconds: room.time_limit_seconds,
            category: room.category,
            difficulty: room.difficulty,
            status: room.status,
            created_at: format_system_time(room.created_at),
        }
    }
}

/// Public projection of one roster entry.
#[derive(Clone, Debug, Serialize, ToSchema)]
pub struct PlayerSummary {
    /// The member's user id.
    pub user_id: Uuid,
    /// Username captured at join time.
    pub username: String,
    /// Whether the player declared themselves ready.
    pub is_ready: bool,
    /// Whether the player created the room.
    pub is_creator: bool,
}

impl From<RoomPlayerEntity> for PlayerSummary {
    fn from(player: RoomPlayerEntity) -> Self {
        Self {
            user_id: player.user_id,
            username: player.username,
            is_ready: player.is_ready,
            is_creator: player.is_creator,
        }
    }
}

/// Everything a lobby screen needs, re-derived from the store on every
/// change notification.
#[derive(Clone, Debug, Serialize, ToSchema)]
pub struct LobbyView {
    /// The room's metadata and status.
    pub room: RoomSummary,
    /// Roster in join order.
    pub players: Vec<PlayerSummary>,
    /// Whether the viewing player is currently ready.
    pub is_ready: bool,
    /// Whether the viewing player created the room.
    pub is_creator: bool,
    /// Whether the game has started (room left the waiting state).
    pub game_started: bool,
}

/// Result of leaving a room.
#[derive(Debug, Serialize, ToSchema)]
pub struct LeaveOutcome {
    /// True when the caller was the creator and the room closed for everyone.
    pub closed: bool,
}
