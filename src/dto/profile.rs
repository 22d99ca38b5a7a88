use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationErrors};

use crate::{
    dao::models::ProfileEntity,
    dto::validation::validate_non_blank,
    rank::{RankInfo, next_rank, progress_percent, rank_of},
};

/// Payload used to create a profile right after signup.
#[derive(Debug, Deserialize, ToSchema)]
pub struct RegisterProfileRequest {
    /// User id issued by the auth collaborator.
    pub user_id: Uuid,
    /// Unique username chosen at signup.
    pub username: String,
}

impl Validate for RegisterProfileRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if let Err(e) = validate_non_blank("username", &self.username) {
            errors.add("username", e);
        }

        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

/// Availability answer for the signup form's username pre-check.
#[derive(Debug, Serialize, ToSchema)]
pub struct UsernameAvailability {
    /// The username that was checked.
    pub username: String,
    /// True when a profile already uses it.
    pub taken: bool,
}

/// Display attributes of one rank tier.
#[derive(Debug, Serialize, ToSchema)]
pub struct RankSnapshot {
    /// Rank name.
    pub name: String,
    /// Minimum experience required to hold the rank.
    pub min_xp: u32,
    /// Emoji badge.
    pub icon: String,
    /// UI color token.
    pub color: String,
}

impl From<&RankInfo> for RankSnapshot {
    fn from(rank: &RankInfo) -> Self {
        Self {
            name: rank.name.to_string(),
            min_xp: rank.min_xp,
            icon: rank.icon.to_string(),
            color: rank.color.to_string(),
        }
    }
}

/// Profile joined with the derived rank information for the dashboard.
#[derive(Debug, Serialize, ToSchema)]
pub struct ProfileResponse {
    /// User id.
    pub id: Uuid,
    /// Username.
    pub username: String,
    /// Total experience.
    pub experience: u32,
    /// Level, `experience / 100 + 1`.
    pub level: u32,
    /// Current rank tier.
    pub rank: RankSnapshot,
    /// Next tier, absent at the top rank.
    pub next_rank: Option<RankSnapshot>,
    /// Progress through the current rank band, `0..=100`.
    pub progress_percent: u32,
}

impl From<ProfileEntity> for ProfileResponse {
    fn from(profile: ProfileEntity) -> Self {
        Self {
            id: profile.id,
            username: profile.username,
            experience: profile.experience,
            level: profile.level,
            rank: rank_of(profile.experience).into(),
            next_rank: next_rank(profile.experience).map(Into::into),
            progress_percent: progress_percent(profile.experience),
        }
    }
}
