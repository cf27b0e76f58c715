use serde::Serialize;
use utoipa::ToSchema;

use crate::dto::phase::VisibleDrawState;

/// Overall verdict of a health check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    /// Every dependency answered.
    Ok,
    /// The session runs but the history store does not answer.
    Degraded,
}

/// Body of the `/healthcheck` route.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// Overall verdict.
    pub status: HealthStatus,
    /// Draw state at check time.
    pub state: VisibleDrawState,
    /// Why the history store failed its check.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub history_error: Option<String>,
}

impl HealthResponse {
    /// Everything answered.
    pub fn ok(state: VisibleDrawState) -> Self {
        Self {
            status: HealthStatus::Ok,
            state,
            history_error: None,
        }
    }

    /// The history store failed with `reason`.
    pub fn degraded(state: VisibleDrawState, reason: impl Into<String>) -> Self {
        Self {
            status: HealthStatus::Degraded,
            state,
            history_error: Some(reason.into()),
        }
    }

    /// Whether the check passed.
    pub fn is_ok(&self) -> bool {
        self.status == HealthStatus::Ok
    }
}
