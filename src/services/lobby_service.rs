use std::sync::Arc;
use std::time::SystemTime;

use futures::Stream;
use rand::Rng;
use tokio::sync::broadcast::error::RecvError;
use tracing::warn;
use uuid::Uuid;
use validator::Validate;

use crate::{
    dao::{
        models::{
            GameSessionEntity, PlayerScoreEntity, RoomEntity, RoomPlayerEntity, RoomStatus,
            SessionStatus,
        },
        quiz_store::{QuizStore, Table},
    },
    dto::{
        game::SessionSummary,
        lobby::{
            CreateRoomRequest, JoinRoomRequest, LeaveOutcome, LobbyView, PlayerSummary,
            RoomSummary,
        },
    },
    error::ServiceError,
    state::{
        SharedState,
        room::{RoomEvent, Transition, room_transition},
    },
};

/// Open a new room with the caller as its sole, auto-ready player.
///
/// The room insert and the creator's roster insert are two separate writes
/// with no transaction around them; a failure of the second is surfaced
/// as-is and the room row stays behind.
pub async fn create_room(
    state: &SharedState,
    request: CreateRoomRequest,
) -> Result<RoomSummary, ServiceError> {
    request
        .validate()
        .map_err(|err| ServiceError::InvalidInput(err.to_string()))?;

    let store = state.store();
    let room = RoomEntity {
        id: Uuid::new_v4(),
        code: generate_room_code(),
        name: request.name,
        creator_id: request.user_id,
        max_players: request.max_players,
        num_questions: request.num_questions,
        time_limit_seconds: request.time_limit_seconds,
        category: request.category,
        difficulty: request.difficulty,
        status: RoomStatus::Waiting,
        created_at: SystemTime::now(),
    };

    store.insert_room(room.clone()).await?;
    store
        .insert_room_player(RoomPlayerEntity {
            room_id: room.id,
            user_id: request.user_id,
            username: request.username,
            is_ready: true,
            is_creator: true,
        })
        .await?;

    Ok(room.into())
}

/// Join a waiting room by its 6-digit code.
///
/// Re-joining a room the caller is already in succeeds without writing a
/// second roster row. The capacity check and the insert are two separate
/// operations; two joiners racing past the check is accepted.
pub async fn join_room(
    state: &SharedState,
    request: JoinRoomRequest,
) -> Result<RoomSummary, ServiceError> {
    request
        .validate()
        .map_err(|err| ServiceError::InvalidInput(err.to_string()))?;

    let store = state.store();
    let Some(room) = store.find_waiting_room_by_code(request.code.clone()).await? else {
        return Err(ServiceError::NotFound(format!(
            "no waiting room with code `{}`",
            request.code
        )));
    };

    if store
        .find_room_player(room.id, request.user_id)
        .await?
        .is_some()
    {
        return Ok(room.into());
    }

    let players = store.list_room_players(room.id).await?;
    if players.len() >= room.max_players as usize {
        return Err(ServiceError::RoomFull(format!(
            "room `{}` already holds {} players",
            room.code,
            players.len()
        )));
    }

    let insert = store
        .insert_room_player(RoomPlayerEntity {
            room_id: room.id,
            user_id: request.user_id,
            username: request.username,
            is_ready: false,
            is_creator: false,
        })
        .await;

    match insert {
        Ok(()) => Ok(room.into()),
        // A racing join by the same user already wrote the row.
        Err(err) if err.is_duplicate() => Ok(room.into()),
        Err(err) => Err(err.into()),
    }
}

/// Flip the caller's readiness flag.
///
/// The creator's readiness is pinned to true from room creation, so the
/// toggle is a no-op for them.
pub async fn toggle_ready(
    state: &SharedState,
    room_id: Uuid,
    user_id: Uuid,
) -> Result<PlayerSummary, ServiceError> {
    let store = state.store();
    let Some(player) = store.find_room_player(room_id, user_id).await? else {
        return Err(ServiceError::NotFound(format!(
            "player `{user_id}` is not in room `{room_id}`"
        )));
    };

    if player.is_creator {
        return Ok(player.into());
    }

    let is_ready = !player.is_ready;
    store.set_player_ready(room_id, user_id, is_ready).await?;

    Ok(PlayerSummary {
        is_ready,
        ..player.into()
    })
}

/// Start the game: creator-only, all players ready.
///
/// Sets the room active, creates the bound session, and inserts one zeroed
/// score row per roster entry. This is the synchronization point every
/// lobby subscriber observes through the change stream.
pub async fn start_game(
    state: &SharedState,
    room_id: Uuid,
    user_id: Uuid,
) -> Result<SessionSummary, ServiceError> {
    let store = state.store();
    let Some(room) = store.find_room(room_id).await? else {
        return Err(ServiceError::NotFound(format!("room `{room_id}` not found")));
    };

    let players = store.list_room_players(room_id).await?;
    let Some(caller) = players.iter().find(|player| player.user_id == user_id) else {
        return Err(ServiceError::NotFound(format!(
            "player `{user_id}` is not in room `{room_id}`"
        )));
    };
    if !caller.is_creator {
        return Err(ServiceError::Unauthorized(
            "only the room creator can start the game".into(),
        ));
    }

    let not_ready = players.iter().filter(|player| !player.is_ready).count();
    if not_ready > 0 {
        return Err(ServiceError::NotReady(format!(
            "{not_ready} player(s) have not readied up"
        )));
    }

    match room_transition(room.status, RoomEvent::StartGame) {
        Ok(Transition::Advanced(next)) => store.set_room_status(room_id, next).await?,
        Ok(Transition::AlreadyThere) => {}
        Err(err) => return Err(ServiceError::InvalidState(err.to_string())),
    }

    let session = GameSessionEntity {
        id: Uuid::new_v4(),
        creator_id: user_id,
        room_id: Some(room_id),
        is_multiplayer: true,
        time_limit_seconds: room.time_limit_seconds,
        num_questions: room.num_questions,
        category: room.category.clone(),
        difficulty: room.difficulty.clone(),
        status: SessionStatus::Active,
        created_at: SystemTime::now(),
    };
    store.insert_session(session.clone()).await?;

    for player in &players {
        store
            .insert_player_score(PlayerScoreEntity {
                session_id: session.id,
                user_id: player.user_id,
                score: 0,
                completed: false,
            })
            .await?;
    }

    Ok(session.into())
}

/// Leave a room: the creator closes it for everyone, anyone else just
/// removes their own roster row.
pub async fn leave_room(
    state: &SharedState,
    room_id: Uuid,
    user_id: Uuid,
) -> Result<LeaveOutcome, ServiceError> {
    let store = state.store();
    let Some(room) = store.find_room(room_id).await? else {
        return Err(ServiceError::NotFound(format!("room `{room_id}` not found")));
    };

    if room.creator_id != user_id {
        store.delete_room_player(room_id, user_id).await?;
        return Ok(LeaveOutcome { closed: false });
    }

    match room_transition(room.status, RoomEvent::CloseRoom) {
        Ok(Transition::Advanced(next)) => store.set_room_status(room_id, next).await?,
        Ok(Transition::AlreadyThere) => {}
        Err(err) => {
            // Leaving a completed room only needs the roster cleanup.
            warn!(room = %room_id, error = %err, "skipping status write on close");
        }
    }

    if let Some(session) = store.find_active_session_for_room(room_id).await? {
        state.remove_session_runners(session.id).await;
    }
    store.delete_room_players(room_id).await?;

    Ok(LeaveOutcome { closed: true })
}

/// Point-in-time lobby view for the initial page load.
pub async fn lobby_view(
    state: &SharedState,
    room_id: Uuid,
    user_id: Uuid,
) -> Result<LobbyView, ServiceError> {
    fetch_lobby_view(&state.store(), room_id, user_id).await
}

/// Stream of lobby views, one per relevant change notification.
///
/// The change subscriptions are taken before the initial fetch so nothing
/// written between the fetch and the subscription start can be missed. The
/// stream ends once a closed room view has been delivered, or when the room
/// disappears underneath the reducer.
pub async fn watch_lobby(
    state: SharedState,
    room_id: Uuid,
    user_id: Uuid,
) -> Result<impl Stream<Item = LobbyView> + Send + 'static, ServiceError> {
    let store = state.store();
    let mut room_changes = store.changes(Table::Rooms);
    let mut player_changes = store.changes(Table::RoomPlayers);

    let initial = fetch_lobby_view(&store, room_id, user_id).await?;

    let stream = async_stream::stream! {
        let closed = initial.room.status == RoomStatus::Closed;
        yield initial;
        if closed {
            return;
        }

        loop {
            let relevant = tokio::select! {
                change = room_changes.recv() => match change {
                    Ok(change) => change.key == room_id,
                    Err(RecvError::Closed) => break,
                    Err(RecvError::Lagged(skipped)) => {
                        // Dropped notifications only cost a redundant re-fetch.
                        warn!(table = Table::Rooms.name(), skipped, "change stream lagged");
                        true
                    }
                },
                change = player_changes.recv() => match change {
                    Ok(change) => change.key == room_id,
                    Err(RecvError::Closed) => break,
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(table = Table::RoomPlayers.name(), skipped, "change stream lagged");
                        true
                    }
                },
            };

            if !relevant {
                continue;
            }

            match fetch_lobby_view(&store, room_id, user_id).await {
                Ok(view) => {
                    let closed = view.room.status == RoomStatus::Closed;
                    yield view;
                    if closed {
                        break;
                    }
                }
                Err(_) => break,
            }
        }
    };

    Ok(stream)
}

/// Re-derive the lobby view from fresh reads; the reducer holds no state of
/// its own beyond what is in the store.
async fn fetch_lobby_view(
    store: &Arc<dyn QuizStore>,
    room_id: Uuid,
    user_id: Uuid,
) -> Result<LobbyView, ServiceError> {
    let Some(room) = store.find_room(room_id).await? else {
        return Err(ServiceError::NotFound(format!("room `{room_id}` not found")));
    };
    let players = store.list_room_players(room_id).await?;

    let me = players.iter().find(|player| player.user_id == user_id);
    let is_ready = me.map(|player| player.is_ready).unwrap_or(false);
    let is_creator = me.map(|player| player.is_creator).unwrap_or(false);
    let game_started = room.status == RoomStatus::Active;

    Ok(LobbyView {
        room: room.into(),
        players: players.into_iter().map(Into::into).collect(),
        is_ready,
        is_creator,
        game_started,
    })
}

/// Generate a shareable 6-digit room code. Collisions across live rooms are
/// not checked; the code is a convenience lookup key, not an identifier.
fn generate_room_code() -> String {
    rand::rng().random_range(100_000..=999_999u32).to_string()
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use futures::StreamExt;

    use super::*;
    use crate::{config::AppConfig, dao::quiz_store::memory::MemoryStore, state::AppState};

    fn test_state() -> SharedState {
        AppState::new(
            AppConfig::with_delays(Duration::ZERO, Duration::ZERO),
            Arc::new(MemoryStore::new()),
        )
    }

    fn create_request(user_id: Uuid, name: &str) -> CreateRoomRequest {
        CreateRoomRequest {
            user_id,
            username: "host".into(),
            name: name.into(),
            max_players: 2,
            num_questions: 5,
            time_limit_seconds: 30,
            category: "all".into(),
            difficulty: "medium".into(),
        }
    }

    fn join_request(user_id: Uuid, username: &str, code: &str) -> JoinRoomRequest {
        JoinRoomRequest {
            user_id,
            username: username.into(),
            code: code.into(),
        }
    }

    #[tokio::test]
    async fn create_room_rejects_blank_name() {
        let state = test_state();
        let err = create_room(&state, create_request(Uuid::new_v4(), "  "))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn create_room_inserts_a_ready_creator() {
        let state = test_state();
        let creator = Uuid::new_v4();
        let room = create_room(&state, create_request(creator, "Quiz Night"))
            .await
            .unwrap();

        assert_eq!(room.status, RoomStatus::Waiting);
        assert_eq!(room.code.len(), 6);
        assert!(("100000"..="999999").contains(&room.code.as_str()));

        let players = state.store().list_room_players(room.id).await.unwrap();
        assert_eq!(players.len(), 1);
        assert!(players[0].is_creator);
        assert!(players[0].is_ready);
    }

    #[tokio::test]
    async fn join_room_is_idempotent_per_user() {
        let state = test_state();
        let creator = Uuid::new_v4();
        let joiner = Uuid::new_v4();
        let room = create_room(&state, create_request(creator, "Quiz Night"))
            .await
            .unwrap();

        let first = join_room(&state, join_request(joiner, "ada", &room.code))
            .await
            .unwrap();
        let second = join_room(&state, join_request(joiner, "ada", &room.code))
            .await
            .unwrap();
        assert_eq!(first.id, second.id);

        let players = state.store().list_room_players(room.id).await.unwrap();
        assert_eq!(players.len(), 2);
    }

    #[tokio::test]
    async fn join_room_refuses_when_full() {
        let state = test_state();
        let room = create_room(&state, create_request(Uuid::new_v4(), "Tiny"))
            .await
            .unwrap();

        join_room(&state, join_request(Uuid::new_v4(), "ada", &room.code))
            .await
            .unwrap();
        let err = join_room(&state, join_request(Uuid::new_v4(), "bob", &room.code))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::RoomFull(_)));

        let players = state.store().list_room_players(room.id).await.unwrap();
        assert_eq!(players.len(), 2);
    }

    #[tokio::test]
    async fn join_room_needs_a_waiting_room() {
        let state = test_state();
        let err = join_room(&state, join_request(Uuid::new_v4(), "ada", "123456"))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    #[tokio::test]
    async fn start_game_requires_the_creator_and_full_readiness() {
        let state = test_state();
        let creator = Uuid::new_v4();
        let joiner = Uuid::new_v4();
        let room = create_room(&state, create_request(creator, "Quiz Night"))
            .await
            .unwrap();
        join_room(&state, join_request(joiner, "ada", &room.code))
            .await
            .unwrap();

        let err = start_game(&state, room.id, joiner).await.unwrap_err();
        assert!(matches!(err, ServiceError::Unauthorized(_)));

        let err = start_game(&state, room.id, creator).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotReady(_)));

        toggle_ready(&state, room.id, joiner).await.unwrap();
        let session = start_game(&state, room.id, creator).await.unwrap();

        assert!(session.is_multiplayer);
        assert_eq!(session.room_id, Some(room.id));
        assert_eq!(session.status, SessionStatus::Active);

        let store = state.store();
        let updated = store.find_room(room.id).await.unwrap().unwrap();
        assert_eq!(updated.status, RoomStatus::Active);

        let scores = store.list_session_scores(session.id).await.unwrap();
        assert_eq!(scores.len(), 2);
        assert!(scores.iter().all(|row| row.score == 0 && !row.completed));
    }

    #[tokio::test]
    async fn toggle_ready_is_pinned_for_the_creator() {
        let state = test_state();
        let creator = Uuid::new_v4();
        let room = create_room(&state, create_request(creator, "Quiz Night"))
            .await
            .unwrap();

        let player = toggle_ready(&state, room.id, creator).await.unwrap();
        assert!(player.is_ready);
    }

    #[tokio::test]
    async fn creator_leaving_closes_the_room_and_clears_the_roster() {
        let state = test_state();
        let creator = Uuid::new_v4();
        let joiner = Uuid::new_v4();
        let room = create_room(&state, create_request(creator, "Quiz Night"))
            .await
            .unwrap();
        join_room(&state, join_request(joiner, "ada", &room.code))
            .await
            .unwrap();

        let outcome = leave_room(&state, room.id, joiner).await.unwrap();
        assert!(!outcome.closed);
        assert_eq!(
            state.store().list_room_players(room.id).await.unwrap().len(),
            1
        );

        let outcome = leave_room(&state, room.id, creator).await.unwrap();
        assert!(outcome.closed);

        let store = state.store();
        let updated = store.find_room(room.id).await.unwrap().unwrap();
        assert_eq!(updated.status, RoomStatus::Closed);
        assert!(store.list_room_players(room.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn watch_lobby_re_derives_views_from_change_notifications() {
        let state = test_state();
        let creator = Uuid::new_v4();
        let joiner = Uuid::new_v4();
        let room = create_room(&state, create_request(creator, "Quiz Night"))
            .await
            .unwrap();
        join_room(&state, join_request(joiner, "ada", &room.code))
            .await
            .unwrap();

        let stream = watch_lobby(state.clone(), room.id, creator).await.unwrap();
        futures::pin_mut!(stream);

        let initial = stream.next().await.unwrap();
        assert_eq!(initial.players.len(), 2);
        assert!(initial.is_creator);
        assert!(!initial.game_started);

        toggle_ready(&state, room.id, joiner).await.unwrap();
        let view = stream.next().await.unwrap();
        assert!(view.players.iter().all(|player| player.is_ready));

        leave_room(&state, room.id, creator).await.unwrap();
        let view = loop {
            let view = stream.next().await.unwrap();
            if view.room.status == RoomStatus::Closed {
                break view;
            }
        };
        assert!(view.players.is_empty());
        assert!(stream.next().await.is_none());
    }
}
