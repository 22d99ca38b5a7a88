use tracing::warn;

use crate::{dto::health::HealthResponse, state::SharedState};

/// Respond with the backend health, reporting degraded when the question
/// bank is empty or unreachable.
pub async fn health_status(state: &SharedState) -> HealthResponse {
    match state.store().count_questions().await {
        Ok(0) => {
            warn!("question bank is empty; games cannot start");
            HealthResponse::degraded()
        }
        Ok(_) => HealthResponse::ok(),
        Err(err) => {
            warn!(error = %err, "storage health check failed");
            HealthResponse::degraded()
        }
    }
}
