//! In-memory [`QuizStore`] backend used for tests and standalone deployments.

use std::sync::Arc;

use futures::future::BoxFuture;
use indexmap::IndexMap;
use tokio::sync::{RwLock, broadcast};
use uuid::Uuid;

use crate::dao::{
    models::{
        GameSessionEntity, PlayerScoreEntity, ProfileEntity, QuestionEntity, RoomEntity,
        RoomPlayerEntity, RoomStatus, SessionStatus,
    },
    quiz_store::{ChangeHub, ChangeKind, QuizStore, RowChange, Table},
    storage::{StorageError, StorageResult},
};

const CHANGE_CHANNEL_CAPACITY: usize = 64;

/// Memory-backed store: indexed tables plus one change hub per table.
///
/// Maps are `IndexMap`s so listings keep insertion order, which gives the
/// join-order player lists and the stable question selection the service
/// layer relies on.
#[derive(Clone)]
pub struct MemoryStore {
    inner: Arc<Inner>,
}

struct Inner {
    profiles: RwLock<IndexMap<Uuid, ProfileEntity>>,
    rooms: RwLock<IndexMap<Uuid, RoomEntity>>,
    room_players: RwLock<IndexMap<(Uuid, Uuid), RoomPlayerEntity>>,
    sessions: RwLock<IndexMap<Uuid, GameSessionEntity>>,
    player_scores: RwLock<IndexMap<(Uuid, Uuid), PlayerScoreEntity>>,
    questions: RwLock<IndexMap<Uuid, QuestionEntity>>,
    hubs: Hubs,
}

struct Hubs {
    profiles: ChangeHub,
    rooms: ChangeHub,
    room_players: ChangeHub,
    sessions: ChangeHub,
    player_scores: ChangeHub,
    questions: ChangeHub,
}

impl Hubs {
    fn new() -> Self {
        Self {
            profiles: ChangeHub::new(CHANGE_CHANNEL_CAPACITY),
            rooms: ChangeHub::new(CHANGE_CHANNEL_CAPACITY),
            room_players: ChangeHub::new(CHANGE_CHANNEL_CAPACITY),
            sessions: ChangeHub::new(CHANGE_CHANNEL_CAPACITY),
            player_scores: ChangeHub::new(CHANGE_CHANNEL_CAPACITY),
            questions: ChangeHub::new(CHANGE_CHANNEL_CAPACITY),
        }
    }

    fn hub(&self, table: Table) -> &ChangeHub {
        match table {
            Table::Profiles => &self.profiles,
            Table::Rooms => &self.rooms,
            Table::RoomPlayers => &self.room_players,
            Table::GameSessions => &self.sessions,
            Table::PlayerScores => &self.player_scores,
            Table::Questions => &self.questions,
        }
    }
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                profiles: RwLock::new(IndexMap::new()),
                rooms: RwLock::new(IndexMap::new()),
                room_players: RwLock::new(IndexMap::new()),
                sessions: RwLock::new(IndexMap::new()),
                player_scores: RwLock::new(IndexMap::new()),
                questions: RwLock::new(IndexMap::new()),
                hubs: Hubs::new(),
            }),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl Inner {
    fn publish(&self, table: Table, kind: ChangeKind, key: Uuid) {
        self.hubs.hub(table).publish(RowChange { table, kind, key });
    }
}

impl QuizStore for MemoryStore {
    fn insert_profile(&self, profile: ProfileEntity) -> BoxFuture<'static, StorageResult<()>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            let mut profiles = inner.profiles.write().await;
            if profiles.contains_key(&profile.id) {
                return Err(StorageError::duplicate(format!(
                    "profile `{}` already exists",
                    profile.id
                )));
            }
            if profiles.values().any(|p| p.username == profile.username) {
                return Err(StorageError::duplicate(format!(
                    "username `{}` already taken",
                    profile.username
                )));
            }
            let id = profile.id;
            profiles.insert(id, profile);
            drop(profiles);
            inner.publish(Table::Profiles, ChangeKind::Inserted, id);
            Ok(())
        })
    }

    fn find_profile(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<ProfileEntity>>> {
        let inner = self.inner.clone();
        Box::pin(async move { Ok(inner.profiles.read().await.get(&id).cloned()) })
    }

    fn username_exists(&self, username: String) -> BoxFuture<'static, StorageResult<bool>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            Ok(inner
                .profiles
                .read()
                .await
                .values()
                .any(|p| p.username == username))
        })
    }

    fn update_profile_progress(
        &self,
        id: Uuid,
        experience: u32,
        level: u32,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            let mut profiles = inner.profiles.write().await;
            let profile = profiles
                .get_mut(&id)
                .ok_or_else(|| StorageError::missing(format!("profile `{id}`")))?;
            profile.experience = experience;
            profile.level = level;
            drop(profiles);
            inner.publish(Table::Profiles, ChangeKind::Updated, id);
            Ok(())
        })
    }

    fn insert_room(&self, room: RoomEntity) -> BoxFuture<'static, StorageResult<()>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            let id = room.id;
            inner.rooms.write().await.insert(id, room);
            inner.publish(Table::Rooms, ChangeKind::Inserted, id);
            Ok(())
        })
    }

    fn find_room(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<RoomEntity>>> {
        let inner = self.inner.clone();
        Box::pin(async move { Ok(inner.rooms.read().await.get(&id).cloned()) })
    }

    fn find_waiting_room_by_code(
        &self,
        code: String,
    ) -> BoxFuture<'static, StorageResult<Option<RoomEntity>>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            Ok(inner
                .rooms
                .read()
                .await
                .values()
                .find(|room| room.code == code && room.status == RoomStatus::Waiting)
                .cloned())
        })
    }

    fn set_room_status(
        &self,
        id: Uuid,
        status: RoomStatus,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            let mut rooms = inner.rooms.write().await;
            let room = rooms
                .get_mut(&id)
                .ok_or_else(|| StorageError::missing(format!("room `{id}`")))?;
            room.status = status;
            drop(rooms);
            inner.publish(Table::Rooms, ChangeKind::Updated, id);
            Ok(())
        })
    }

    fn insert_room_player(
        &self,
        player: RoomPlayerEntity,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            let room_id = player.room_id;
            let key = (player.room_id, player.user_id);
            let mut players = inner.room_players.write().await;
            if players.contains_key(&key) {
                return Err(StorageError::duplicate(format!(
                    "player `{}` already in room `{}`",
                    player.user_id, player.room_id
                )));
            }
            players.insert(key, player);
            drop(players);
            inner.publish(Table::RoomPlayers, ChangeKind::Inserted, room_id);
            Ok(())
        })
    }

    fn find_room_player(
        &self,
        room_id: Uuid,
        user_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<RoomPlayerEntity>>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            Ok(inner
                .room_players
                .read()
                .await
                .get(&(room_id, user_id))
                .cloned())
        })
    }

    fn list_room_players(
        &self,
        room_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<RoomPlayerEntity>>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            Ok(inner
                .room_players
                .read()
                .await
                .values()
                .filter(|player| player.room_id == room_id)
                .cloned()
                .collect())
        })
    }

    fn set_player_ready(
        &self,
        room_id: Uuid,
        user_id: Uuid,
        is_ready: bool,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            let mut players = inner.room_players.write().await;
            let player = players.get_mut(&(room_id, user_id)).ok_or_else(|| {
                StorageError::missing(format!("player `{user_id}` in room `{room_id}`"))
            })?;
            player.is_ready = is_ready;
            drop(players);
            inner.publish(Table::RoomPlayers, ChangeKind::Updated, room_id);
            Ok(())
        })
    }

    fn delete_room_player(
        &self,
        room_id: Uuid,
        user_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            let removed = inner
                .room_players
                .write()
                .await
                .shift_remove(&(room_id, user_id));
            if removed.is_some() {
                inner.publish(Table::RoomPlayers, ChangeKind::Deleted, room_id);
            }
            Ok(())
        })
    }

    fn delete_room_players(&self, room_id: Uuid) -> BoxFuture<'static, StorageResult<()>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            let mut players = inner.room_players.write().await;
            let before = players.len();
            players.retain(|_, player| player.room_id != room_id);
            let removed = before - players.len();
            drop(players);
            if removed > 0 {
                inner.publish(Table::RoomPlayers, ChangeKind::Deleted, room_id);
            }
            Ok(())
        })
    }

    fn insert_session(
        &self,
        session: GameSessionEntity,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            let id = session.id;
            inner.sessions.write().await.insert(id, session);
            inner.publish(Table::GameSessions, ChangeKind::Inserted, id);
            Ok(())
        })
    }

    fn find_session(
        &self,
        id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<GameSessionEntity>>> {
        let inner = self.inner.clone();
        Box::pin(async move { Ok(inner.sessions.read().await.get(&id).cloned()) })
    }

    fn find_active_session_for_room(
        &self,
        room_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<GameSessionEntity>>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            Ok(inner
                .sessions
                .read()
                .await
                .values()
                .find(|session| {
                    session.room_id == Some(room_id) && session.status == SessionStatus::Active
                })
                .cloned())
        })
    }

    fn set_session_status(
        &self,
        id: Uuid,
        status: SessionStatus,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            let mut sessions = inner.sessions.write().await;
            let session = sessions
                .get_mut(&id)
                .ok_or_else(|| StorageError::missing(format!("session `{id}`")))?;
            session.status = status;
            drop(sessions);
            inner.publish(Table::GameSessions, ChangeKind::Updated, id);
            Ok(())
        })
    }

    fn insert_player_score(
        &self,
        score: PlayerScoreEntity,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            let session_id = score.session_id;
            let key = (score.session_id, score.user_id);
            inner.player_scores.write().await.insert(key, score);
            inner.publish(Table::PlayerScores, ChangeKind::Inserted, session_id);
            Ok(())
        })
    }

    fn list_session_scores(
        &self,
        session_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<PlayerScoreEntity>>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            Ok(inner
                .player_scores
                .read()
                .await
                .values()
                .filter(|score| score.session_id == session_id)
                .cloned()
                .collect())
        })
    }

    fn update_player_score(
        &self,
        session_id: Uuid,
        user_id: Uuid,
        score: u32,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            let mut scores = inner.player_scores.write().await;
            let row = scores.get_mut(&(session_id, user_id)).ok_or_else(|| {
                StorageError::missing(format!("score for `{user_id}` in session `{session_id}`"))
            })?;
            row.score = score;
            drop(scores);
            inner.publish(Table::PlayerScores, ChangeKind::Updated, session_id);
            Ok(())
        })
    }

    fn complete_player_score(
        &self,
        session_id: Uuid,
        user_id: Uuid,
        score: u32,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            let mut scores = inner.player_scores.write().await;
            let row = scores.get_mut(&(session_id, user_id)).ok_or_else(|| {
                StorageError::missing(format!("score for `{user_id}` in session `{session_id}`"))
            })?;
            row.score = score;
            row.completed = true;
            drop(scores);
            inner.publish(Table::PlayerScores, ChangeKind::Updated, session_id);
            Ok(())
        })
    }

    fn insert_question(&self, question: QuestionEntity) -> BoxFuture<'static, StorageResult<()>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            let id = question.id;
            inner.questions.write().await.insert(id, question);
            inner.publish(Table::Questions, ChangeKind::Inserted, id);
            Ok(())
        })
    }

    fn select_questions(
        &self,
        category: Option<String>,
        difficulty: String,
        limit: usize,
    ) -> BoxFuture<'static, StorageResult<Vec<QuestionEntity>>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            Ok(inner
                .questions
                .read()
                .await
                .values()
                .filter(|question| {
                    question.difficulty == difficulty
                        && category
                            .as_deref()
                            .is_none_or(|category| question.category == category)
                })
                .take(limit)
                .cloned()
                .collect())
        })
    }

    fn count_questions(&self) -> BoxFuture<'static, StorageResult<usize>> {
        let inner = self.inner.clone();
        Box::pin(async move { Ok(inner.questions.read().await.len()) })
    }

    fn changes(&self, table: Table) -> broadcast::Receiver<RowChange> {
        self.inner.hubs.hub(table).subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(username: &str) -> ProfileEntity {
        ProfileEntity::new(Uuid::new_v4(), username.into())
    }

    fn question(category: &str, difficulty: &str) -> QuestionEntity {
        QuestionEntity {
            id: Uuid::new_v4(),
            question: "?".into(),
            options: vec!["a".into(), "b".into()],
            correct_answer: "a".into(),
            category: category.into(),
            difficulty: difficulty.into(),
        }
    }

    #[tokio::test]
    async fn duplicate_profile_id_is_rejected() {
        let store = MemoryStore::new();
        let row = profile("ada");
        store.insert_profile(row.clone()).await.unwrap();

        let err = store.insert_profile(row).await.unwrap_err();
        assert!(err.is_duplicate());
    }

    #[tokio::test]
    async fn duplicate_username_is_rejected() {
        let store = MemoryStore::new();
        store.insert_profile(profile("ada")).await.unwrap();

        let err = store.insert_profile(profile("ada")).await.unwrap_err();
        assert!(err.is_duplicate());
        assert!(store.username_exists("ada".into()).await.unwrap());
    }

    #[tokio::test]
    async fn room_player_listing_keeps_join_order() {
        let store = MemoryStore::new();
        let room_id = Uuid::new_v4();
        for name in ["first", "second", "third"] {
            store
                .insert_room_player(RoomPlayerEntity {
                    room_id,
                    user_id: Uuid::new_v4(),
                    username: name.into(),
                    is_ready: false,
                    is_creator: name == "first",
                })
                .await
                .unwrap();
        }

        let players = store.list_room_players(room_id).await.unwrap();
        let names: Vec<_> = players.iter().map(|p| p.username.as_str()).collect();
        assert_eq!(names, ["first", "second", "third"]);
    }

    #[tokio::test]
    async fn mutations_notify_subscribers_with_the_filter_key() {
        let store = MemoryStore::new();
        let mut changes = store.changes(Table::RoomPlayers);
        let room_id = Uuid::new_v4();
        let user_id = Uuid::new_v4();

        store
            .insert_room_player(RoomPlayerEntity {
                room_id,
                user_id,
                username: "ada".into(),
                is_ready: false,
                is_creator: false,
            })
            .await
            .unwrap();
        store
            .set_player_ready(room_id, user_id, true)
            .await
            .unwrap();
        store.delete_room_player(room_id, user_id).await.unwrap();

        for kind in [ChangeKind::Inserted, ChangeKind::Updated, ChangeKind::Deleted] {
            let change = changes.recv().await.unwrap();
            assert_eq!(change.table, Table::RoomPlayers);
            assert_eq!(change.kind, kind);
            assert_eq!(change.key, room_id);
        }
    }

    #[tokio::test]
    async fn question_selection_filters_and_limits_in_bank_order() {
        let store = MemoryStore::new();
        let mut seeded = Vec::new();
        for index in 0..4 {
            let q = question(if index == 3 { "history" } else { "science" }, "easy");
            seeded.push(q.clone());
            store.insert_question(q).await.unwrap();
        }
        store.insert_question(question("science", "hard")).await.unwrap();

        let selected = store
            .select_questions(Some("science".into()), "easy".into(), 2)
            .await
            .unwrap();
        assert_eq!(selected.len(), 2);
        assert_eq!(selected[0].id, seeded[0].id);
        assert_eq!(selected[1].id, seeded[1].id);

        let all_easy = store.select_questions(None, "easy".into(), 10).await.unwrap();
        assert_eq!(all_easy.len(), 4);
    }
}
