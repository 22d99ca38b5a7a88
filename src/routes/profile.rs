use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, post},
};
use axum_valid::Valid;
use serde::Deserialize;
use utoipa::IntoParams;
use uuid::Uuid;

use crate::{
    dto::profile::{ProfileResponse, RegisterProfileRequest, UsernameAvailability},
    error::AppError,
    services::profile_service,
    state::SharedState,
};

/// Query parameters of the username pre-check.
#[derive(Debug, Deserialize, IntoParams)]
pub struct UsernameQuery {
    /// Username to check.
    pub username: String,
}

/// Routes handling profile creation and reads.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/profiles", post(ensure_profile))
        .route("/profiles/username-taken", get(username_taken))
        .route("/profiles/{id}", get(get_profile))
}

/// Create the caller's profile after signup (single attempt, grace delay,
/// duplicate counts as success).
#[utoipa::path(
    post,
    path = "/profiles",
    tag = "profile",
    request_body = RegisterProfileRequest,
    responses(
        (status = 200, description = "Profile present", body = ProfileResponse)
    )
)]
pub async fn ensure_profile(
    State(state): State<SharedState>,
    Valid(Json(payload)): Valid<Json<RegisterProfileRequest>>,
) -> Result<Json<ProfileResponse>, AppError> {
    let profile = profile_service::ensure_profile(&state, payload).await?;
    Ok(Json(profile))
}

/// Signup-form pre-check for username availability.
#[utoipa::path(
    get,
    path = "/profiles/username-taken",
    tag = "profile",
    params(UsernameQuery),
    responses(
        (status = 200, description = "Availability", body = UsernameAvailability)
    )
)]
pub async fn username_taken(
    State(state): State<SharedState>,
    Query(query): Query<UsernameQuery>,
) -> Result<Json<UsernameAvailability>, AppError> {
    let availability = profile_service::username_taken(&state, query.username).await?;
    Ok(Json(availability))
}

/// Fetch a profile joined with its rank information.
#[utoipa::path(
    get,
    path = "/profiles/{id}",
    tag = "profile",
    params(("id" = Uuid, Path, description = "User identifier")),
    responses(
        (status = 200, description = "Profile", body = ProfileResponse)
    )
)]
pub async fn get_profile(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ProfileResponse>, AppError> {
    let profile = profile_service::get_profile(&state, id).await?;
    Ok(Json(profile))
}
