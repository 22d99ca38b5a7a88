use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::warn;
use uuid::Uuid;

use crate::{
    dao::{
        models::{GameSessionEntity, QuestionEntity},
        quiz_store::QuizStore,
    },
    error::ServiceError,
    state::room::{RoomEvent, SessionEvent, Transition, room_transition, session_transition},
};

/// Fixed points awarded for a correct answer.
const POINTS_PER_CORRECT_ANSWER: u32 = 10;
/// Experience granted per correct answer, equal to the points.
const EXPERIENCE_PER_CORRECT_ANSWER: u32 = 10;

/// Where one player currently is in their run through the questions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunnerPhase {
    /// Answering the question at this index.
    Playing {
        /// Zero-based index of the current question.
        question_index: usize,
    },
    /// All questions exhausted; results are final.
    Finished,
}

/// Result of an answer submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerOutcome {
    /// False when the question was already resolved and the call was a no-op.
    pub accepted: bool,
    /// Whether the submitted answer matched the correct one.
    pub correct: bool,
    /// Running score after the submission.
    pub score: u32,
    /// Index of the question the submission applied to.
    pub question_index: usize,
}

/// Point-in-time snapshot of a runner for read-only views.
#[derive(Debug, Clone)]
pub struct RunnerView {
    /// Current phase of the run.
    pub phase: RunnerPhase,
    /// Running score.
    pub score: u32,
    /// Experience accumulated so far this run.
    pub exp_gained: u32,
    /// Seconds left on the current question's countdown.
    pub remaining_seconds: u32,
    /// Total number of questions in the run.
    pub total_questions: usize,
    /// The question currently being answered, if any.
    pub current_question: Option<QuestionEntity>,
}

struct RunnerInner {
    question_index: usize,
    answered: bool,
    finished: bool,
    score: u32,
    exp_gained: u32,
    answers: Vec<Option<String>>,
    timer: Option<JoinHandle<()>>,
}

/// Drives one player's progression through one game session.
///
/// Both answer submission and the countdown reaching zero converge on the
/// same advance path, serialized through one mutex: the first resolution of
/// a question wins and every later one is a no-op, so a question is never
/// skipped and never scored twice.
pub struct GameRunner {
    session: GameSessionEntity,
    user_id: Uuid,
    questions: Vec<QuestionEntity>,
    store: Arc<dyn QuizStore>,
    advance_delay: Duration,
    remaining: watch::Sender<u32>,
    inner: Mutex<RunnerInner>,
}

impl GameRunner {
    /// Build a runner over a non-empty question selection.
    pub fn new(
        session: GameSessionEntity,
        user_id: Uuid,
        questions: Vec<QuestionEntity>,
        store: Arc<dyn QuizStore>,
        advance_delay: Duration,
    ) -> Arc<Self> {
        let (remaining, _) = watch::channel(session.time_limit_seconds);
        let answers = vec![None; questions.len()];
        Arc::new(Self {
            session,
            user_id,
            questions,
            store,
            advance_delay,
            remaining,
            inner: Mutex::new(RunnerInner {
                question_index: 0,
                answered: false,
                finished: false,
                score: 0,
                exp_gained: 0,
                answers,
                timer: None,
            }),
        })
    }

    /// Session this runner belongs to.
    pub fn session(&self) -> &GameSessionEntity {
        &self.session
    }

    /// Player this runner belongs to.
    pub fn user_id(&self) -> Uuid {
        self.user_id
    }

    /// Start the countdown for the first question.
    pub async fn start(self: &Arc<Self>) {
        self.remaining.send_replace(self.session.time_limit_seconds);
        self.start_timer().await;
    }

    /// Watch the per-question countdown, in whole seconds.
    pub fn countdown(&self) -> watch::Receiver<u32> {
        self.remaining.subscribe()
    }

    /// Snapshot the runner for a read-only view.
    pub async fn view(&self) -> RunnerView {
        let inner = self.inner.lock().await;
        let phase = if inner.finished {
            RunnerPhase::Finished
        } else {
            RunnerPhase::Playing {
                question_index: inner.question_index,
            }
        };
        RunnerView {
            phase,
            score: inner.score,
            exp_gained: inner.exp_gained,
            remaining_seconds: *self.remaining.borrow(),
            total_questions: self.questions.len(),
            current_question: (!inner.finished)
                .then(|| self.questions.get(inner.question_index).cloned())
                .flatten(),
        }
    }

    /// Record the player's answer for the current question.
    ///
    /// The first call per question wins; later calls return an unaccepted
    /// outcome without touching the score. A correct answer earns a fixed 10
    /// points and 10 XP and, in multiplayer, is persisted immediately so the
    /// other clients' leaderboards move. The advance to the next question
    /// happens after the configured display delay.
    pub async fn submit_answer(
        self: &Arc<Self>,
        answer: String,
    ) -> Result<AnswerOutcome, ServiceError> {
        let (outcome, persist_score) = {
            let mut inner = self.inner.lock().await;
            if inner.finished {
                return Err(ServiceError::InvalidState(
                    "session already finished".into(),
                ));
            }
            if inner.answered {
                return Ok(AnswerOutcome {
                    accepted: false,
                    correct: false,
                    score: inner.score,
                    question_index: inner.question_index,
                });
            }

            let index = inner.question_index;
            let correct = answer == self.questions[index].correct_answer;
            inner.answered = true;
            inner.answers[index] = Some(answer);
            if correct {
                inner.score += POINTS_PER_CORRECT_ANSWER;
                inner.exp_gained += EXPERIENCE_PER_CORRECT_ANSWER;
            }

            (
                AnswerOutcome {
                    accepted: true,
                    correct,
                    score: inner.score,
                    question_index: index,
                },
                correct && self.session.is_multiplayer,
            )
        };

        // Schedule the advance first: a failing score write must not strand
        // the question.
        let runner = Arc::clone(self);
        let from_index = outcome.question_index;
        tokio::spawn(async move {
            sleep(runner.advance_delay).await;
            if let Err(err) = runner.advance_from(from_index).await {
                warn!(
                    session = %runner.session.id,
                    user = %runner.user_id,
                    error = %err,
                    "failed to advance after answer"
                );
            }
        });

        if persist_score {
            self.store
                .update_player_score(self.session.id, self.user_id, outcome.score)
                .await?;
        }

        Ok(outcome)
    }

    /// Cancel the countdown and freeze the run. Called when the owning screen
    /// is torn down; any already-scheduled advance becomes a no-op.
    pub async fn shutdown(&self) {
        let mut inner = self.inner.lock().await;
        inner.finished = true;
        if let Some(timer) = inner.timer.take() {
            timer.abort();
        }
    }

    /// Spawn the one-second-resolution countdown for the current question.
    fn start_timer(
        self: &Arc<Self>,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = ()> + Send + '_>> {
        Box::pin(async move {
        let index = {
            let inner = self.inner.lock().await;
            if inner.finished {
                return;
            }
            inner.question_index
        };

        let runner = Arc::clone(self);
        let handle = tokio::spawn(async move {
            loop {
                sleep(Duration::from_secs(1)).await;
                let timed_out = {
                    let mut inner = runner.inner.lock().await;
                    if inner.finished || inner.question_index != index || inner.answered {
                        return;
                    }
                    let left = runner.remaining.borrow().saturating_sub(1);
                    runner.remaining.send_replace(left);
                    if left == 0 {
                        // Time-up resolves the question with a null answer;
                        // the answered flag blocks a racing manual answer.
                        inner.answered = true;
                        // Drop our own handle so advance does not abort the
                        // task that is running it.
                        inner.timer = None;
                        true
                    } else {
                        false
                    }
                };

                if timed_out {
                    if let Err(err) = runner.advance_from(index).await {
                        warn!(
                            session = %runner.session.id,
                            user = %runner.user_id,
                            error = %err,
                            "failed to advance after timeout"
                        );
                    }
                    return;
                }
            }
        });

        self.inner.lock().await.timer = Some(handle);
        })
    }

    /// Move past `from_index`, resetting the countdown or finishing the run.
    ///
    /// No-ops when the runner already moved on, which makes the timeout and
    /// answer paths safe to race.
    async fn advance_from(self: &Arc<Self>, from_index: usize) -> Result<(), ServiceError> {
        let next = {
            let mut inner = self.inner.lock().await;
            if inner.finished || inner.question_index != from_index {
                return Ok(());
            }
            if let Some(timer) = inner.timer.take() {
                timer.abort();
            }
            let next = from_index + 1;
            if next >= self.questions.len() {
                inner.finished = true;
                None
            } else {
                inner.question_index = next;
                inner.answered = false;
                Some(next)
            }
        };

        match next {
            Some(_) => {
                self.remaining.send_replace(self.session.time_limit_seconds);
                self.start_timer().await;
                Ok(())
            }
            None => {
                self.remaining.send_replace(0);
                self.finalize().await
            }
        }
    }

    /// Persist this player's completion and promote the session when every
    /// participant is done.
    async fn finalize(&self) -> Result<(), ServiceError> {
        let (score, exp_gained) = {
            let inner = self.inner.lock().await;
            (inner.score, inner.exp_gained)
        };

        self.store
            .complete_player_score(self.session.id, self.user_id, score)
            .await?;

        if let Some(profile) = self.store.find_profile(self.user_id).await? {
            let experience = profile.experience + exp_gained;
            let level = experience / 100 + 1;
            self.store
                .update_profile_progress(self.user_id, experience, level)
                .await?;
        }

        if self.session.is_multiplayer {
            // Last-finisher promotion: the check and the writes below are not
            // transactional, so two finishers may both promote. Both writes
            // are idempotent, so the race is harmless.
            let scores = self.store.list_session_scores(self.session.id).await?;
            if !scores.is_empty() && scores.iter().all(|row| row.completed) {
                self.promote_completed().await?;
            }
        } else {
            self.promote_completed().await?;
        }

        Ok(())
    }

    /// Advance the session, and any bound room, to `completed`.
    async fn promote_completed(&self) -> Result<(), ServiceError> {
        if let Some(session) = self.store.find_session(self.session.id).await? {
            match session_transition(session.status, SessionEvent::Complete) {
                Transition::Advanced(next) => {
                    self.store.set_session_status(session.id, next).await?;
                }
                Transition::AlreadyThere => {}
            }
        }

        if let Some(room_id) = self.session.room_id {
            if let Some(room) = self.store.find_room(room_id).await? {
                match room_transition(room.status, RoomEvent::CompleteGame) {
                    Ok(Transition::Advanced(next)) => {
                        self.store.set_room_status(room_id, next).await?;
                    }
                    Ok(Transition::AlreadyThere) => {}
                    Err(err) => {
                        // The creator may have closed the room mid-game.
                        warn!(room = %room_id, error = %err, "skipping room promotion");
                    }
                }
            }
        }

        Ok(())
    }
}

impl Drop for GameRunner {
    fn drop(&mut self) {
        if let Ok(mut inner) = self.inner.try_lock() {
            if let Some(timer) = inner.timer.take() {
                timer.abort();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::SystemTime;

    use super::*;
    use crate::dao::{
        models::{PlayerScoreEntity, ProfileEntity, SessionStatus},
        quiz_store::memory::MemoryStore,
    };

    fn question(index: usize) -> QuestionEntity {
        QuestionEntity {
            id: Uuid::new_v4(),
            question: format!("Question {index}?"),
            options: vec!["right".into(), "wrong".into()],
            correct_answer: "right".into(),
            category: "science".into(),
            difficulty: "medium".into(),
        }
    }

    async fn setup(
        num_questions: usize,
        time_limit_seconds: u32,
    ) -> (Arc<dyn QuizStore>, GameSessionEntity, Uuid) {
        let store: Arc<dyn QuizStore> = Arc::new(MemoryStore::new());
        let user_id = Uuid::new_v4();
        store
            .insert_profile(ProfileEntity::new(user_id, "ada".into()))
            .await
            .unwrap();

        let session = GameSessionEntity {
            id: Uuid::new_v4(),
            creator_id: user_id,
            room_id: None,
            is_multiplayer: false,
            time_limit_seconds,
            num_questions: num_questions as u8,
            category: "science".into(),
            difficulty: "medium".into(),
            status: SessionStatus::Active,
            created_at: SystemTime::now(),
        };
        store.insert_session(session.clone()).await.unwrap();
        store
            .insert_player_score(PlayerScoreEntity {
                session_id: session.id,
                user_id,
                score: 0,
                completed: false,
            })
            .await
            .unwrap();

        (store, session, user_id)
    }

    async fn settle() {
        for _ in 0..64 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn countdown_reaching_zero_advances_with_a_null_answer() {
        let (store, session, user_id) = setup(2, 3).await;
        let runner = GameRunner::new(
            session.clone(),
            user_id,
            vec![question(0), question(1)],
            Arc::clone(&store),
            Duration::ZERO,
        );
        runner.start().await;

        sleep(Duration::from_millis(3_100)).await;
        settle().await;

        let view = runner.view().await;
        assert_eq!(
            view.phase,
            RunnerPhase::Playing { question_index: 1 }
        );
        assert_eq!(view.score, 0);
        assert_eq!(view.remaining_seconds, 3);

        sleep(Duration::from_millis(3_100)).await;
        settle().await;

        let view = runner.view().await;
        assert_eq!(view.phase, RunnerPhase::Finished);

        let scores = store.list_session_scores(session.id).await.unwrap();
        assert_eq!(scores[0].score, 0);
        assert!(scores[0].completed);
        let session_row = store.find_session(session.id).await.unwrap().unwrap();
        assert_eq!(session_row.status, SessionStatus::Completed);
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn an_answer_blocks_the_racing_timeout() {
        let (store, session, user_id) = setup(2, 2).await;
        let runner = GameRunner::new(
            session,
            user_id,
            vec![question(0), question(1)],
            store,
            // Advance delay longer than the remaining countdown: the timeout
            // would fire first if the answer did not block it.
            Duration::from_secs(5),
        );
        runner.start().await;

        let outcome = runner.submit_answer("right".into()).await.unwrap();
        assert!(outcome.accepted);
        assert!(outcome.correct);
        assert_eq!(outcome.score, 10);

        // Past the countdown but before the display delay: still on q0.
        sleep(Duration::from_millis(3_000)).await;
        settle().await;
        let view = runner.view().await;
        assert_eq!(
            view.phase,
            RunnerPhase::Playing { question_index: 0 }
        );
        assert_eq!(view.score, 10);

        // The delayed advance moves on exactly once.
        sleep(Duration::from_millis(2_100)).await;
        settle().await;
        let view = runner.view().await;
        assert_eq!(
            view.phase,
            RunnerPhase::Playing { question_index: 1 }
        );
        assert_eq!(view.score, 10);
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn shutdown_freezes_the_run() {
        let (store, session, user_id) = setup(1, 2).await;
        let runner = GameRunner::new(
            session.clone(),
            user_id,
            vec![question(0)],
            Arc::clone(&store),
            Duration::ZERO,
        );
        runner.start().await;
        runner.shutdown().await;

        sleep(Duration::from_secs(10)).await;
        settle().await;

        // No timeout fired after teardown: the score row was never completed.
        let scores = store.list_session_scores(session.id).await.unwrap();
        assert!(!scores[0].completed);
    }
}
