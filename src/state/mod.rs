pub mod room;
pub mod runner;

use std::sync::Arc;

use dashmap::DashMap;
use uuid::Uuid;

use crate::{config::AppConfig, dao::quiz_store::QuizStore, state::runner::GameRunner};

/// Shared handle to the application state.
pub type SharedState = Arc<AppState>;

/// Key of an active runner: (session id, user id).
pub type RunnerKey = (Uuid, Uuid);

/// Central application state holding the storage handle, configuration, and
/// the registry of per-player game runners.
pub struct AppState {
    config: AppConfig,
    store: Arc<dyn QuizStore>,
    runners: DashMap<RunnerKey, Arc<GameRunner>>,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`] so it can be cloned cheaply.
    pub fn new(config: AppConfig, store: Arc<dyn QuizStore>) -> SharedState {
        Arc::new(Self {
            config,
            store,
            runners: DashMap::new(),
        })
    }

    /// Immutable runtime configuration.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Handle to the storage collaborator.
    pub fn store(&self) -> Arc<dyn QuizStore> {
        Arc::clone(&self.store)
    }

    /// The runner driving `user_id` through `session_id`, if one is active.
    pub fn runner(&self, session_id: Uuid, user_id: Uuid) -> Option<Arc<GameRunner>> {
        self.runners
            .get(&(session_id, user_id))
            .map(|entry| Arc::clone(entry.value()))
    }

    /// Register a runner under its (session, user) key unless one is already
    /// live. Returns the winning runner and whether the argument was the one
    /// registered.
    pub fn insert_runner_if_absent(&self, runner: Arc<GameRunner>) -> (Arc<GameRunner>, bool) {
        match self
            .runners
            .entry((runner.session().id, runner.user_id()))
        {
            dashmap::mapref::entry::Entry::Occupied(entry) => (Arc::clone(entry.get()), false),
            dashmap::mapref::entry::Entry::Vacant(entry) => {
                entry.insert(Arc::clone(&runner));
                (runner, true)
            }
        }
    }

    /// Remove and shut down one player's runner.
    pub async fn remove_runner(&self, session_id: Uuid, user_id: Uuid) {
        if let Some((_, runner)) = self.runners.remove(&(session_id, user_id)) {
            runner.shutdown().await;
        }
    }

    /// Remove and shut down every runner of a session. Used when a room
    /// closes underneath a running game.
    pub async fn remove_session_runners(&self, session_id: Uuid) {
        let keys: Vec<RunnerKey> = self
            .runners
            .iter()
            .map(|entry| *entry.key())
            .filter(|(session, _)| *session == session_id)
            .collect();

        for key in keys {
            if let Some((_, runner)) = self.runners.remove(&key) {
                runner.shutdown().await;
            }
        }
    }
}
