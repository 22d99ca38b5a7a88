use serde::{Deserialize, Serialize};
use std::time::SystemTime;
use utoipa::ToSchema;
use uuid::Uuid;

/// Lifecycle status of a multiplayer room.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum RoomStatus {
    /// Room is open in the lobby and accepting players.
    Waiting,
    /// The creator started the game; a session is running.
    Active,
    /// Every participant finished the game.
    Completed,
    /// The creator left; terminal for everyone.
    Closed,
}

/// Lifecycle status of a game session.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    /// Players are still answering questions.
    Active,
    /// Every participant finished the session.
    Completed,
}

/// Player identity and accumulated progress, created at first authentication.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProfileEntity {
    /// Primary key, equal to the auth collaborator's user id.
    pub id: Uuid,
    /// Unique display name chosen at signup.
    pub username: String,
    /// Total experience points earned across games.
    pub experience: u32,
    /// Derived level: `experience / 100 + 1`.
    pub level: u32,
}

impl ProfileEntity {
    /// Fresh profile at level 1 with no experience.
    pub fn new(id: Uuid, username: String) -> Self {
        Self {
            id,
            username,
            experience: 0,
            level: 1,
        }
    }
}

/// A multiplayer lobby persisted by the storage layer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RoomEntity {
    /// Primary key of the room.
    pub id: Uuid,
    /// Human-shareable 6-digit join code; duplicates across time are accepted.
    pub code: String,
    /// Display name of the room.
    pub name: String,
    /// User who created the room and controls its lifecycle.
    pub creator_id: Uuid,
    /// Maximum number of players allowed to join.
    pub max_players: u8,
    /// Number of questions each player answers.
    pub num_questions: u8,
    /// Seconds allowed per question.
    pub time_limit_seconds: u32,
    /// Question category, or "all".
    pub category: String,
    /// Question difficulty.
    pub difficulty: String,
    /// Current lifecycle status.
    pub status: RoomStatus,
    /// Creation timestamp for auditing/debugging.
    pub created_at: SystemTime,
}

/// Membership of one user in one room, denormalizing the username at join time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RoomPlayerEntity {
    /// Room this membership belongs to.
    pub room_id: Uuid,
    /// The member's user id; one row per (room_id, user_id).
    pub user_id: Uuid,
    /// Username captured when the player joined.
    pub username: String,
    /// Whether the player declared themselves ready.
    pub is_ready: bool,
    /// Whether the player created the room.
    pub is_creator: bool,
}

/// One played quiz, solo or bound to a room.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GameSessionEntity {
    /// Primary key of the session.
    pub id: Uuid,
    /// User who started the session.
    pub creator_id: Uuid,
    /// Room the session belongs to; `None` for solo play.
    pub room_id: Option<Uuid>,
    /// Whether the session involves more than one participant.
    pub is_multiplayer: bool,
    /// Seconds allowed per question.
    pub time_limit_seconds: u32,
    /// Number of questions in the session.
    pub num_questions: u8,
    /// Question category, or "all".
    pub category: String,
    /// Question difficulty.
    pub difficulty: String,
    /// Current lifecycle status; the only mutable field.
    pub status: SessionStatus,
    /// Creation timestamp for auditing/debugging.
    pub created_at: SystemTime,
}

/// One participant's result within a session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlayerScoreEntity {
    /// Session this score belongs to.
    pub session_id: Uuid,
    /// The scoring player; one row per (session_id, user_id).
    pub user_id: Uuid,
    /// Running score, a multiple of 10.
    pub score: u32,
    /// Whether the player exhausted all questions.
    pub completed: bool,
}

/// Read-only quiz question reference data.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct QuestionEntity {
    /// Primary key of the question.
    pub id: Uuid,
    /// The question text shown to players.
    pub question: String,
    /// Ordered answer options; `correct_answer` is always one of them.
    pub options: Vec<String>,
    /// The single correct option.
    pub correct_answer: String,
    /// Category this question belongs to.
    pub category: String,
    /// Difficulty this question is rated at.
    pub difficulty: String,
}
