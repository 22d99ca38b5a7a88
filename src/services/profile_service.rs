use tokio::time::sleep;
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use crate::{
    dao::models::ProfileEntity,
    dto::profile::{ProfileResponse, RegisterProfileRequest, UsernameAvailability},
    error::ServiceError,
    state::SharedState,
};

/// Create the caller's profile right after signup.
///
/// The auth collaborator propagates new identities asynchronously, so the
/// single insert attempt waits one fixed grace delay first. An existing row
/// or a duplicate-key failure on the caller's id counts as success; there is
/// no retry beyond this one attempt.
pub async fn ensure_profile(
    state: &SharedState,
    request: RegisterProfileRequest,
) -> Result<ProfileResponse, ServiceError> {
    request
        .validate()
        .map_err(|err| ServiceError::InvalidInput(err.to_string()))?;

    sleep(state.config().profile_grace_delay()).await;

    let store = state.store();
    if let Some(existing) = store.find_profile(request.user_id).await? {
        info!(user = %request.user_id, "profile already exists");
        return Ok(existing.into());
    }

    let profile = ProfileEntity::new(request.user_id, request.username);
    match store.insert_profile(profile.clone()).await {
        Ok(()) => Ok(profile.into()),
        Err(err) if err.is_duplicate() => {
            // Either a concurrent creation for the same user (success) or a
            // username collision with someone else (surfaced as input error).
            match store.find_profile(request.user_id).await? {
                Some(existing) => Ok(existing.into()),
                None => Err(ServiceError::InvalidInput(format!(
                    "username `{}` is already taken",
                    profile.username
                ))),
            }
        }
        Err(err) => Err(err.into()),
    }
}

/// Signup-form pre-check for username availability.
pub async fn username_taken(
    state: &SharedState,
    username: String,
) -> Result<UsernameAvailability, ServiceError> {
    let taken = state.store().username_exists(username.clone()).await?;
    Ok(UsernameAvailability { username, taken })
}

/// Fetch a profile joined with its derived rank information.
pub async fn get_profile(state: &SharedState, id: Uuid) -> Result<ProfileResponse, ServiceError> {
    let Some(profile) = state.store().find_profile(id).await? else {
        return Err(ServiceError::NotFound(format!("profile `{id}` not found")));
    };
    Ok(profile.into())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;
    use crate::{config::AppConfig, dao::quiz_store::memory::MemoryStore, state::AppState};

    fn test_state() -> SharedState {
        AppState::new(
            AppConfig::with_delays(Duration::ZERO, Duration::ZERO),
            Arc::new(MemoryStore::new()),
        )
    }

    fn request(user_id: Uuid, username: &str) -> RegisterProfileRequest {
        RegisterProfileRequest {
            user_id,
            username: username.into(),
        }
    }

    #[tokio::test]
    async fn ensure_profile_creates_a_level_one_profile() {
        let state = test_state();
        let user_id = Uuid::new_v4();

        let profile = ensure_profile(&state, request(user_id, "ada")).await.unwrap();
        assert_eq!(profile.username, "ada");
        assert_eq!(profile.experience, 0);
        assert_eq!(profile.level, 1);
        assert_eq!(profile.rank.name, "Bronze");
        assert_eq!(profile.progress_percent, 0);
    }

    #[tokio::test]
    async fn ensure_profile_treats_an_existing_row_as_success() {
        let state = test_state();
        let user_id = Uuid::new_v4();

        ensure_profile(&state, request(user_id, "ada")).await.unwrap();
        let again = ensure_profile(&state, request(user_id, "ada")).await.unwrap();
        assert_eq!(again.username, "ada");
    }

    #[tokio::test]
    async fn ensure_profile_surfaces_a_foreign_username_collision() {
        let state = test_state();
        ensure_profile(&state, request(Uuid::new_v4(), "ada"))
            .await
            .unwrap();

        let err = ensure_profile(&state, request(Uuid::new_v4(), "ada"))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn username_taken_reflects_the_store() {
        let state = test_state();
        ensure_profile(&state, request(Uuid::new_v4(), "ada"))
            .await
            .unwrap();

        assert!(username_taken(&state, "ada".into()).await.unwrap().taken);
        assert!(!username_taken(&state, "bob".into()).await.unwrap().taken);
    }
}
