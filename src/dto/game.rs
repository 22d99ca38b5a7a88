use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationErrors};

use crate::{
    dao::models::{GameSessionEntity, QuestionEntity, SessionStatus},
    dto::{
        format_system_time,
        validation::{
            MAX_QUESTIONS, MAX_TIME_LIMIT_SECONDS, MIN_QUESTIONS, MIN_TIME_LIMIT_SECONDS,
            validate_category, validate_difficulty, validate_in_range,
        },
    },
    state::runner::{RunnerPhase, RunnerView},
};

/// Payload used to start a solo game session.
#[derive(Debug, Deserialize, ToSchema)]
pub struct SoloGameRequest {
    /// The playing user's id.
    pub user_id: Uuid,
    /// Number of questions (5..=20).
    pub num_questions: u8,
    /// Seconds per question (10..=60).
    pub time_limit_seconds: u32,
    /// Question category, or "all".
    pub category: String,
    /// Question difficulty.
    pub difficulty: String,
}

impl Validate for SoloGameRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

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

/// Identifies the acting player for session operations.
#[derive(Debug, Deserialize, ToSchema)]
pub struct SessionActionRequest {
    /// The acting player's user id.
    pub user_id: Uuid,
}

/// Payload recording a player's answer to the current question.
#[derive(Debug, Deserialize, ToSchema)]
pub struct AnswerRequest {
    /// The answering player's user id.
    pub user_id: Uuid,
    /// The chosen option.
    pub answer: String,
}

/// Public projection of a game session.
#[derive(Clone, Debug, Serialize, ToSchema)]
pub struct SessionSummary {
    /// Session id.
    pub id: Uuid,
    /// User who started the session.
    pub creator_id: Uuid,
    /// Bound room, when multiplayer.
    pub room_id: Option<Uuid>,
    /// Whether the session has multiple participants.
    pub is_multiplayer: bool,
    /// Seconds per question.
    pub time_limit_seconds: u32,
    /// Questions per game.
    pub num_questions: u8,
    /// Question category.
    pub category: String,
    /// Question difficulty.
    pub difficulty: String,
    /// Current lifecycle status.
    pub status: SessionStatus,
    /// RFC 3339 creation timestamp.
    pub created_at: String,
}

impl From<GameSessionEntity> for SessionSummary {
    fn from(session: GameSessionEntity) -> Self {
        Self {
            id: session.id,
            creator_id: session.creator_id,
            room_id: session.room_id,
            is_multiplayer: session.is_multiplayer,
            time_limit_seconds: session.time_limit_seconds,
            num_questions: session.num_questions,
            category: session.category,
            difficulty: session.difficulty,
            status: session.status,
            created_at: format_system_time(session.created_at),
        }
    }
}

/// A question as shown to players: the correct answer never leaves the server.
#[derive(Clone, Debug, Serialize, ToSchema)]
pub struct QuestionView {
    /// Question id.
    pub id: Uuid,
    /// Question text.
    pub question: String,
    /// Ordered answer options.
    pub options: Vec<String>,
    /// Category of the question.
    pub category: String,
    /// Difficulty of the question.
    pub difficulty: String,
}

impl From<QuestionEntity> for QuestionView {
    fn from(question: QuestionEntity) -> Self {
        Self {
            id: question.id,
            question: question.question,
            options: question.options,
            category: question.category,
            difficulty: question.difficulty,
        }
    }
}

/// Coarse phase reported to the game screen.
#[derive(Clone, Copy, Debug, Serialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum GamePhaseView {
    /// The player is answering questions.
    Playing,
    /// The player exhausted all questions.
    Finished,
}

/// Live snapshot of one player's run, including the read-only countdown.
#[derive(Clone, Debug, Serialize, ToSchema)]
pub struct GameView {
    /// The session being played.
    pub session: SessionSummary,
    /// Where the player is in the run.
    pub phase: GamePhaseView,
    /// Zero-based index of the current question.
    pub question_index: usize,
    /// Total questions in the run.
    pub total_questions: usize,
    /// Seconds left on the current question.
    pub remaining_seconds: u32,
    /// Running score.
    pub score: u32,
    /// Experience earned so far this run.
    pub exp_gained: u32,
    /// The current question, absent once finished.
    pub current_question: Option<QuestionView>,
}

impl From<(GameSessionEntity, RunnerView)> for GameView {
    fn from((session, view): (GameSessionEntity, RunnerView)) -> Self {
        let (phase, question_index) = match view.phase {
            RunnerPhase::Playing { question_index } => (GamePhaseView::Playing, question_index),
            RunnerPhase::Finished => (GamePhaseView::Finished, view.total_questions),
        };
        Self {
            session: session.into(),
            phase,
            question_index,
            total_questions: view.total_questions,
            remaining_seconds: view.remaining_seconds,
            score: view.score,
            exp_gained: view.exp_gained,
            current_question: view.current_question.map(Into::into),
        }
    }
}

/// Result of an answer submission.
#[derive(Debug, Serialize, ToSchema)]
pub struct AnswerResponse {
    /// False when the question was already resolved and nothing changed.
    pub accepted: bool,
    /// Whether the answer was correct.
    pub correct: bool,
    /// Running score after the submission.
    pub score: u32,
    /// Index of the question the submission applied to.
    pub question_index: usize,
}

impl From<crate::state::runner::AnswerOutcome> for AnswerResponse {
    fn from(outcome: crate::state::runner::AnswerOutcome) -> Self {
        Self {
            accepted: outcome.accepted,
            correct: outcome.correct,
            score: outcome.score,
            question_index: outcome.question_index,
        }
    }
}

/// One row of the live leaderboard, score-descending with stable ties.
#[derive(Clone, Debug, Serialize, ToSchema)]
pub struct LeaderboardEntry {
    /// The scoring player.
    pub user_id: Uuid,
    /// Username joined from the roster, when known.
    pub username: String,
    /// Current score.
    pub score: u32,
    /// Whether the player finished all questions.
    pub completed: bool,
}

/// Leaderboard snapshot for one session.
#[derive(Clone, Debug, Serialize, ToSchema)]
pub struct LeaderboardView {
    /// Session the scores belong to.
    pub session_id: Uuid,
    /// Entries in descending score order.
    pub entries: Vec<LeaderboardEntry>,
}
