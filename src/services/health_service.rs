use tracing::warn;

use crate::{dto::health::HealthResponse, state::SharedState};

/// Probe the history store and report it alongside the current draw state.
pub async fn health_status(state: &SharedState) -> HealthResponse {
    let draw_state = state.state().into();
    match state.history().health_check().await {
        Ok(()) => HealthResponse::ok(draw_state),
        Err(err) => {
            warn!(error = %err, "history store health check failed");
            HealthResponse::degraded(draw_state, err.to_string())
        }
    }
}
