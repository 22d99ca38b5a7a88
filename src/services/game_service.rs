use std::collections::HashMap;
use std::sync::Arc;
use std::time::SystemTime;

use futures::Stream;
use tokio::sync::broadcast::error::RecvError;
use uuid::Uuid;
use validator::Validate;

use crate::{
    dao::{
        models::{GameSessionEntity, PlayerScoreEntity, SessionStatus},
        quiz_store::{QuizStore, Table},
    },
    dto::game::{
        AnswerRequest, AnswerResponse, GameView, LeaderboardEntry, LeaderboardView, SessionSummary,
        SoloGameRequest,
    },
    error::ServiceError,
    state::{SharedState, runner::GameRunner},
};

/// Name shown when a score row cannot be joined with a username.
const UNKNOWN_PLAYER: &str = "Unknown Player";

/// Start a solo session: one session row plus the caller's zeroed score row.
pub async fn start_solo(
    state: &SharedState,
    request: SoloGameRequest,
) -> Result<SessionSummary, ServiceError> {
    request
        .validate()
        .map_err(|err| ServiceError::InvalidInput(err.to_string()))?;

    let store = state.store();
    let session = GameSessionEntity {
        id: Uuid::new_v4(),
        creator_id: request.user_id,
        room_id: None,
        is_multiplayer: false,
        time_limit_seconds: request.time_limit_seconds,
        num_questions: request.num_questions,
        category: request.category,
        difficulty: request.difficulty,
        status: SessionStatus::Active,
        created_at: SystemTime::now(),
    };
    store.insert_session(session.clone()).await?;
    store
        .insert_player_score(PlayerScoreEntity {
            session_id: session.id,
            user_id: request.user_id,
            score: 0,
            completed: false,
        })
        .await?;

    Ok(session.into())
}

/// Load a session for one participant, selecting its questions and starting
/// the per-player runner (idempotently) with the first question's countdown.
pub async fn load_session(
    state: &SharedState,
    session_id: Uuid,
    user_id: Uuid,
) -> Result<GameView, ServiceError> {
    let store = state.store();
    let Some(session) = store.find_session(session_id).await? else {
        return Err(ServiceError::NotFound(format!(
            "session `{session_id}` not found"
        )));
    };

    if let Some(runner) = state.runner(session_id, user_id) {
        return Ok((session, runner.view().await).into());
    }

    if session.status == SessionStatus::Completed {
        return Err(ServiceError::InvalidState(
            "session already completed".into(),
        ));
    }

    let scores = store.list_session_scores(session_id).await?;
    if !scores.iter().any(|row| row.user_id == user_id) {
        return Err(ServiceError::Unauthorized(
            "not a participant of this session".into(),
        ));
    }

    let questions = select_session_questions(&store, &session).await?;

    let runner = GameRunner::new(
        session.clone(),
        user_id,
        questions,
        store,
        state.config().advance_delay(),
    );
    let (runner, registered) = state.insert_runner_if_absent(runner);
    if registered {
        runner.start().await;
    }

    Ok((session, runner.view().await).into())
}

/// Record a participant's answer to their current question.
pub async fn submit_answer(
    state: &SharedState,
    session_id: Uuid,
    request: AnswerRequest,
) -> Result<AnswerResponse, ServiceError> {
    let Some(runner) = state.runner(session_id, request.user_id) else {
        return Err(ServiceError::NotFound(
            "no active run for this player; load the session first".into(),
        ));
    };

    Ok(runner.submit_answer(request.answer).await?.into())
}

/// Tear down the caller's runner without recording completion, cancelling
/// its countdown. Used when a player navigates away mid-game.
pub async fn quit_session(state: &SharedState, session_id: Uuid, user_id: Uuid) {
    state.remove_runner(session_id, user_id).await;
}

/// Live view of one participant's run, including the countdown value.
pub async fn game_view(
    state: &SharedState,
    session_id: Uuid,
    user_id: Uuid,
) -> Result<GameView, ServiceError> {
    let store = state.store();
    let Some(session) = store.find_session(session_id).await? else {
        return Err(ServiceError::NotFound(format!(
            "session `{session_id}` not found"
        )));
    };
    let Some(runner) = state.runner(session_id, user_id) else {
        return Err(ServiceError::NotFound(
            "no active run for this player; load the session first".into(),
        ));
    };

    Ok((session, runner.view().await).into())
}

/// Public projection of a session row.
pub async fn session_summary(
    state: &SharedState,
    session_id: Uuid,
) -> Result<SessionSummary, ServiceError> {
    let Some(session) = state.store().find_session(session_id).await? else {
        return Err(ServiceError::NotFound(format!(
            "session `{session_id}` not found"
        )));
    };
    Ok(session.into())
}

/// Leaderboard snapshot: score-descending, ties in insertion order, joined
/// with usernames from the roster (falling back to profiles for solo play).
pub async fn leaderboard(
    state: &SharedState,
    session_id: Uuid,
) -> Result<LeaderboardView, ServiceError> {
    fetch_leaderboard(&state.store(), session_id).await
}

/// Stream of leaderboard snapshots, one per score-row change in the session.
///
/// Subscribes before the initial fetch so no score update written in between
/// is missed. Runs until the client disconnects.
pub async fn watch_leaderboard(
    state: SharedState,
    session_id: Uuid,
) -> Result<impl Stream<Item = LeaderboardView> + Send + 'static, ServiceError> {
    let store = state.store();
    let mut score_changes = store.changes(Table::PlayerScores);

    let initial = fetch_leaderboard(&store, session_id).await?;

    let stream = async_stream::stream! {
        yield initial;

        loop {
            let relevant = match score_changes.recv().await {
                Ok(change) => change.key == session_id,
                Err(RecvError::Closed) => break,
                Err(RecvError::Lagged(skipped)) => {
                    // Dropped notifications only cost a redundant re-fetch.
                    tracing::warn!(
                        table = Table::PlayerScores.name(),
                        skipped,
                        "change stream lagged"
                    );
                    true
                }
            };

            if !relevant {
                continue;
            }

            match fetch_leaderboard(&store, session_id).await {
                Ok(view) => yield view,
                Err(_) => break,
            }
        }
    };

    Ok(stream)
}

async fn fetch_leaderboard(
    store: &Arc<dyn QuizStore>,
    session_id: Uuid,
) -> Result<LeaderboardView, ServiceError> {
    let Some(session) = store.find_session(session_id).await? else {
        return Err(ServiceError::NotFound(format!(
            "session `{session_id}` not found"
        )));
    };

    let scores = store.list_session_scores(session_id).await?;

    let mut usernames: HashMap<Uuid, String> = HashMap::new();
    if let Some(room_id) = session.room_id {
        for player in store.list_room_players(room_id).await? {
            usernames.insert(player.user_id, player.username);
        }
    }

    let mut entries = Vec::with_capacity(scores.len());
    for row in scores {
        let username = match usernames.get(&row.user_id) {
            Some(name) => name.clone(),
            None => match store.find_profile(row.user_id).await? {
                Some(profile) => profile.username,
                None => UNKNOWN_PLAYER.to_string(),
            },
        };
        entries.push(LeaderboardEntry {
            user_id: row.user_id,
            username,
            score: row.score,
            completed: row.completed,
        });
    }

    // Stable sort keeps insertion order between equal scores.
    entries.sort_by(|a, b| b.score.cmp(&a.score));

    Ok(LeaderboardView {
        session_id,
        entries,
    })
}

async fn select_session_questions(
    store: &Arc<dyn QuizStore>,
    session: &GameSessionEntity,
) -> Result<Vec<crate::dao::models::QuestionEntity>, ServiceError> {
    let category = (session.category != "all").then(|| session.category.clone());
    let questions = store
        .select_questions(
            category,
            session.difficulty.clone(),
            session.num_questions as usize,
        )
        .await?;

    if questions.is_empty() {
        return Err(ServiceError::NoQuestions(format!(
            "category `{}`, difficulty `{}`",
            session.category, session.difficulty
        )));
    }

    Ok(questions)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::{
        config::AppConfig,
        dao::{
            models::{ProfileEntity, QuestionEntity, RoomStatus},
            quiz_store::memory::MemoryStore,
        },
        dto::lobby::{CreateRoomRequest, JoinRoomRequest},
        services::lobby_service,
        state::AppState,
    };

    fn test_state() -> SharedState {
        AppState::new(
            AppConfig::with_delays(Duration::ZERO, Duration::ZERO),
            Arc::new(MemoryStore::new()),
        )
    }

    async fn seed_questions(state: &SharedState, count: usize) -> Vec<QuestionEntity> {
        let store = state.store();
        let mut seeded = Vec::new();
        for index in 0..count {
            let question = QuestionEntity {
                id: Uuid::new_v4(),
                question: format!("Question {index}?"),
                options: vec!["right".into(), "wrong".into()],
                correct_answer: "right".into(),
                category: "science".into(),
                difficulty: "medium".into(),
            };
            store.insert_question(question.clone()).await.unwrap();
            seeded.push(question);
        }
        seeded
    }

    async fn seed_profile(state: &SharedState, username: &str) -> Uuid {
        let id = Uuid::new_v4();
        state
            .store()
            .insert_profile(ProfileEntity::new(id, username.into()))
            .await
            .unwrap();
        id
    }

    fn solo_request(user_id: Uuid) -> SoloGameRequest {
        SoloGameRequest {
            user_id,
            num_questions: 5,
            time_limit_seconds: 30,
            category: "science".into(),
            difficulty: "medium".into(),
        }
    }

    /// Let spawned advance/finalize tasks run to completion.
    async fn settle() {
        for _ in 0..64 {
            tokio::task::yield_now().await;
        }
    }

    async fn answer(state: &SharedState, session_id: Uuid, user_id: Uuid, answer: &str) {
        submit_answer(
            state,
            session_id,
            AnswerRequest {
                user_id,
                answer: answer.into(),
            },
        )
        .await
        .unwrap();
        settle().await;
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn solo_game_scores_and_levels_up_the_profile() {
        let state = test_state();
        seed_questions(&state, 5).await;
        let user_id = seed_profile(&state, "ada").await;

        let session = start_solo(&state, solo_request(user_id)).await.unwrap();
        assert!(!session.is_multiplayer);

        let view = load_session(&state, session.id, user_id).await.unwrap();
        assert_eq!(view.total_questions, 5);
        assert_eq!(view.remaining_seconds, 30);
        assert!(view.current_question.is_some());

        // 3 correct, 2 wrong.
        for index in 0..5 {
            let choice = if index < 3 { "right" } else { "wrong" };
            answer(&state, session.id, user_id, choice).await;
        }

        let store = state.store();
        let scores = store.list_session_scores(session.id).await.unwrap();
        assert_eq!(scores.len(), 1);
        assert_eq!(scores[0].score, 30);
        assert!(scores[0].completed);

        let profile = store.find_profile(user_id).await.unwrap().unwrap();
        assert_eq!(profile.experience, 30);
        assert_eq!(profile.level, 1);

        let session = store.find_session(session.id).await.unwrap().unwrap();
        assert_eq!(session.status, SessionStatus::Completed);
    }

    #[tokio::test]
    async fn load_session_fails_without_matching_questions() {
        let state = test_state();
        let user_id = seed_profile(&state, "ada").await;
        let session = start_solo(&state, solo_request(user_id)).await.unwrap();

        let err = load_session(&state, session.id, user_id).await.unwrap_err();
        assert!(matches!(err, ServiceError::NoQuestions(_)));
    }

    #[tokio::test]
    async fn load_session_refuses_non_participants() {
        let state = test_state();
        seed_questions(&state, 5).await;
        let user_id = seed_profile(&state, "ada").await;
        let session = start_solo(&state, solo_request(user_id)).await.unwrap();

        let err = load_session(&state, session.id, Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn second_answer_to_the_same_question_is_a_no_op() {
        let state = AppState::new(
            // Long advance delay keeps the runner on the same question
            // between the two calls.
            AppConfig::with_delays(Duration::from_secs(600), Duration::ZERO),
            Arc::new(MemoryStore::new()),
        );
        seed_questions(&state, 5).await;
        let user_id = seed_profile(&state, "ada").await;
        let session = start_solo(&state, solo_request(user_id)).await.unwrap();
        load_session(&state, session.id, user_id).await.unwrap();

        let first = submit_answer(
            &state,
            session.id,
            AnswerRequest {
                user_id,
                answer: "right".into(),
            },
        )
        .await
        .unwrap();
        assert!(first.accepted);
        assert!(first.correct);
        assert_eq!(first.score, 10);

        let second = submit_answer(
            &state,
            session.id,
            AnswerRequest {
                user_id,
                answer: "right".into(),
            },
        )
        .await
        .unwrap();
        assert!(!second.accepted);
        assert_eq!(second.score, 10);
        assert_eq!(second.question_index, first.question_index);
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn two_player_game_completes_session_and_room() {
        let state = test_state();
        let questions = seed_questions(&state, 5).await;
        let creator = seed_profile(&state, "host").await;
        let joiner = seed_profile(&state, "ada").await;

        let room = lobby_service::create_room(
            &state,
            CreateRoomRequest {
                user_id: creator,
                username: "host".into(),
                name: "Finals".into(),
                max_players: 2,
                num_questions: 5,
                time_limit_seconds: 30,
                category: "science".into(),
                difficulty: "medium".into(),
            },
        )
        .await
        .unwrap();
        lobby_service::join_room(
            &state,
            JoinRoomRequest {
                user_id: joiner,
                username: "ada".into(),
                code: room.code.clone(),
            },
        )
        .await
        .unwrap();
        lobby_service::toggle_ready(&state, room.id, joiner)
            .await
            .unwrap();

        let session = lobby_service::start_game(&state, room.id, creator)
            .await
            .unwrap();
        assert!(session.is_multiplayer);

        for user_id in [creator, joiner] {
            let view = load_session(&state, session.id, user_id).await.unwrap();
            assert_eq!(view.total_questions, questions.len());
        }

        // Both answer everything correctly, interleaved.
        for _ in 0..questions.len() {
            answer(&state, session.id, creator, "right").await;
            answer(&state, session.id, joiner, "right").await;
        }

        let store = state.store();
        let scores = store.list_session_scores(session.id).await.unwrap();
        assert_eq!(scores.len(), 2);
        assert!(scores.iter().all(|row| row.score == 50 && row.completed));

        let session_row = store.find_session(session.id).await.unwrap().unwrap();
        assert_eq!(session_row.status, SessionStatus::Completed);
        let room_row = store.find_room(room.id).await.unwrap().unwrap();
        assert_eq!(room_row.status, RoomStatus::Completed);

        for user_id in [creator, joiner] {
            let profile = store.find_profile(user_id).await.unwrap().unwrap();
            assert_eq!(profile.experience, 50);
            assert_eq!(profile.level, 1);
        }
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn multiplayer_scores_are_persisted_live_for_the_leaderboard() {
        let state = test_state();
        seed_questions(&state, 5).await;
        let creator = seed_profile(&state, "host").await;
        let joiner = seed_profile(&state, "ada").await;

        let room = lobby_service::create_room(
            &state,
            CreateRoomRequest {
                user_id: creator,
                username: "host".into(),
                name: "Finals".into(),
                max_players: 2,
                num_questions: 5,
                time_limit_seconds: 30,
                category: "all".into(),
                difficulty: "medium".into(),
            },
        )
        .await
        .unwrap();
        lobby_service::join_room(
            &state,
            JoinRoomRequest {
                user_id: joiner,
                username: "ada".into(),
                code: room.code.clone(),
            },
        )
        .await
        .unwrap();
        lobby_service::toggle_ready(&state, room.id, joiner)
            .await
            .unwrap();
        let session = lobby_service::start_game(&state, room.id, creator)
            .await
            .unwrap();

        load_session(&state, session.id, creator).await.unwrap();
        load_session(&state, session.id, joiner).await.unwrap();

        answer(&state, session.id, joiner, "right").await;

        let board = leaderboard(&state, session.id).await.unwrap();
        assert_eq!(board.entries.len(), 2);
        assert_eq!(board.entries[0].username, "ada");
        assert_eq!(board.entries[0].score, 10);
        assert_eq!(board.entries[1].username, "host");
        assert_eq!(board.entries[1].score, 0);
    }

    #[tokio::test]
    async fn watch_leaderboard_emits_a_snapshot_per_score_change() {
        use futures::StreamExt;

        let state = AppState::new(
            AppConfig::with_delays(Duration::from_secs(600), Duration::ZERO),
            Arc::new(MemoryStore::new()),
        );
        seed_questions(&state, 5).await;
        let creator = seed_profile(&state, "host").await;
        let joiner = seed_profile(&state, "ada").await;

        let room = lobby_service::create_room(
            &state,
            CreateRoomRequest {
                user_id: creator,
                username: "host".into(),
                name: "Finals".into(),
                max_players: 2,
                num_questions: 5,
                time_limit_seconds: 30,
                category: "all".into(),
                difficulty: "medium".into(),
            },
        )
        .await
        .unwrap();
        lobby_service::join_room(
            &state,
            JoinRoomRequest {
                user_id: joiner,
                username: "ada".into(),
                code: room.code.clone(),
            },
        )
        .await
        .unwrap();
        lobby_service::toggle_ready(&state, room.id, joiner)
            .await
            .unwrap();
        let session = lobby_service::start_game(&state, room.id, creator)
            .await
            .unwrap();
        load_session(&state, session.id, joiner).await.unwrap();

        let stream = watch_leaderboard(state.clone(), session.id).await.unwrap();
        futures::pin_mut!(stream);

        let initial = stream.next().await.unwrap();
        assert!(initial.entries.iter().all(|entry| entry.score == 0));

        submit_answer(
            &state,
            session.id,
            AnswerRequest {
                user_id: joiner,
                answer: "right".into(),
            },
        )
        .await
        .unwrap();

        let updated = loop {
            let view = stream.next().await.unwrap();
            if view.entries[0].score == 10 {
                break view;
            }
        };
        assert_eq!(updated.entries[0].username, "ada");
    }
}
