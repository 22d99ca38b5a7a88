pub mod memory;

use futures::future::BoxFuture;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::dao::models::{
    GameSessionEntity, PlayerScoreEntity, ProfileEntity, QuestionEntity, RoomEntity,
    RoomPlayerEntity, RoomStatus, SessionStatus,
};
use crate::dao::storage::StorageResult;

/// Tables exposed by the storage collaborator; their names are the wire
/// contract shared with any external backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    /// `profiles`
    Profiles,
    /// `rooms`
    Rooms,
    /// `room_players`
    RoomPlayers,
    /// `game_sessions`
    GameSessions,
    /// `player_scores`
    PlayerScores,
    /// `questions`
    Questions,
}

impl Table {
    /// Wire-contract name of the table.
    pub fn name(self) -> &'static str {
        match self {
            Table::Profiles => "profiles",
            Table::Rooms => "rooms",
            Table::RoomPlayers => "room_players",
            Table::GameSessions => "game_sessions",
            Table::PlayerScores => "player_scores",
            Table::Questions => "questions",
        }
    }
}

/// What happened to a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    /// A new row was written.
    Inserted,
    /// An existing row was modified.
    Updated,
    /// A row was removed.
    Deleted,
}

/// Row-level change notification fanned out to subscribers of a table.
///
/// `key` is the table's filter key: the room id for `rooms` and
/// `room_players`, the session id for `game_sessions` and `player_scores`,
/// and the user id for `profiles`. Subscribers filter on it and re-read the
/// rows they care about; the payload itself carries no row data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowChange {
    /// Table the change happened in.
    pub table: Table,
    /// Kind of mutation.
    pub kind: ChangeKind,
    /// Filter key identifying the affected scope.
    pub key: Uuid,
}

/// Broadcast hub fanning out [`RowChange`] notifications for one table.
pub struct ChangeHub {
    sender: broadcast::Sender<RowChange>,
}

impl ChangeHub {
    /// Construct a hub backed by a Tokio broadcast channel with the given capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _receiver) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Register a new subscriber that will receive subsequent changes.
    pub fn subscribe(&self) -> broadcast::Receiver<RowChange> {
        self.sender.subscribe()
    }

    /// Notify all current subscribers, ignoring delivery errors.
    pub fn publish(&self, change: RowChange) {
        let _ = self.sender.send(change);
    }
}

/// Abstraction over the persistence collaborator: point-in-time reads,
/// single-row writes, and per-table row-change subscriptions.
///
/// Delivery contract for [`QuizStore::changes`]: at-least-once, ordered only
/// within a single table, nothing guaranteed across a re-subscribe. Consumers
/// must subscribe first and then re-fetch the rows they project, and re-fetch
/// again on every notification. Single-row writes are atomic; multi-row
/// sequences are not transactional.
pub trait QuizStore: Send + Sync {
    /// Insert a profile row; fails with a duplicate error when the id exists.
    fn insert_profile(&self, profile: ProfileEntity) -> BoxFuture<'static, StorageResult<()>>;
    /// Fetch a profile by user id.
    fn find_profile(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<ProfileEntity>>>;
    /// Whether any profile already uses this username.
    fn username_exists(&self, username: String) -> BoxFuture<'static, StorageResult<bool>>;
    /// Overwrite a profile's experience and level.
    fn update_profile_progress(
        &self,
        id: Uuid,
        experience: u32,
        level: u32,
    ) -> BoxFuture<'static, StorageResult<()>>;

    /// Insert a room row.
    fn insert_room(&self, room: RoomEntity) -> BoxFuture<'static, StorageResult<()>>;
    /// Fetch a room by id.
    fn find_room(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<RoomEntity>>>;
    /// Fetch the first room with this code still in the waiting state.
    fn find_waiting_room_by_code(
        &self,
        code: String,
    ) -> BoxFuture<'static, StorageResult<Option<RoomEntity>>>;
    /// Advance a room's status.
    fn set_room_status(
        &self,
        id: Uuid,
        status: RoomStatus,
    ) -> BoxFuture<'static, StorageResult<()>>;

    /// Insert a membership row.
    fn insert_room_player(
        &self,
        player: RoomPlayerEntity,
    ) -> BoxFuture<'static, StorageResult<()>>;
    /// Fetch one membership row.
    fn find_room_player(
        &self,
        room_id: Uuid,
        user_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<RoomPlayerEntity>>>;
    /// All membership rows of a room, in join order.
    fn list_room_players(
        &self,
        room_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<RoomPlayerEntity>>>;
    /// Update one player's readiness flag.
    fn set_player_ready(
        &self,
        room_id: Uuid,
        user_id: Uuid,
        is_ready: bool,
    ) -> BoxFuture<'static, StorageResult<()>>;
    /// Remove one membership row.
    fn delete_room_player(
        &self,
        room_id: Uuid,
        user_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<()>>;
    /// Remove every membership row of a room.
    fn delete_room_players(&self, room_id: Uuid) -> BoxFuture<'static, StorageResult<()>>;

    /// Insert a session row.
    fn insert_session(
        &self,
        session: GameSessionEntity,
    ) -> BoxFuture<'static, StorageResult<()>>;
    /// Fetch a session by id.
    fn find_session(
        &self,
        id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<GameSessionEntity>>>;
    /// Fetch the active session bound to a room, if any.
    fn find_active_session_for_room(
        &self,
        room_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<GameSessionEntity>>>;
    /// Advance a session's status.
    fn set_session_status(
        &self,
        id: Uuid,
        status: SessionStatus,
    ) -> BoxFuture<'static, StorageResult<()>>;

    /// Insert a score row.
    fn insert_player_score(
        &self,
        score: PlayerScoreEntity,
    ) -> BoxFuture<'static, StorageResult<()>>;
    /// All score rows of a session, in insertion order.
    fn list_session_scores(
        &self,
        session_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<PlayerScoreEntity>>>;
    /// Overwrite one player's running score.
    fn update_player_score(
        &self,
        session_id: Uuid,
        user_id: Uuid,
        score: u32,
    ) -> BoxFuture<'static, StorageResult<()>>;
    /// Record one player's final score and mark the row completed.
    fn complete_player_score(
        &self,
        session_id: Uuid,
        user_id: Uuid,
        score: u32,
    ) -> BoxFuture<'static, StorageResult<()>>;

    /// Insert a question into the reference bank.
    fn insert_question(&self, question: QuestionEntity) -> BoxFuture<'static, StorageResult<()>>;
    /// Up to `limit` questions matching the difficulty and, when given, the
    /// category, in stable bank order.
    fn select_questions(
        &self,
        category: Option<String>,
        difficulty: String,
        limit: usize,
    ) -> BoxFuture<'static, StorageResult<Vec<QuestionEntity>>>;
    /// Number of questions in the bank.
    fn count_questions(&self) -> BoxFuture<'static, StorageResult<usize>>;

    /// Subscribe to row-level changes on a table.
    fn changes(&self, table: Table) -> broadcast::Receiver<RowChange>;
}
