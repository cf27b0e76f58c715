use serde::Serialize;
use utoipa::ToSchema;

use crate::state::state_machine::{DrawState, OperatingMode};

/// Publicly visible draw state exposed to clients (REST/SSE).
#[derive(Debug, Serialize, ToSchema, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum VisibleDrawState {
    /// Nothing loaded.
    Idle,
    /// Data loaded, no mode chosen yet.
    DataLoaded,
    /// Waiting for the countdown.
    OperatingAuto,
    /// Waiting for the operator.
    OperatingManual,
    /// A draw is in flight.
    Spinning,
    /// Presenting the winner.
    Celebrating,
    /// Paused by the operator.
    Paused,
    /// Configuration screen open.
    Configuring,
    /// All prizes drawn.
    Finished,
}

impl From<DrawState> for VisibleDrawState {
    fn from(value: DrawState) -> Self {
        match value {
            DrawState::Idle => VisibleDrawState::Idle,
            DrawState::DataLoaded => VisibleDrawState::DataLoaded,
            DrawState::Operating(OperatingMode::Auto) => VisibleDrawState::OperatingAuto,
            DrawState::Operating(OperatingMode::Manual) => VisibleDrawState::OperatingManual,
            DrawState::Spinning => VisibleDrawState::Spinning,
            DrawState::Celebrating => VisibleDrawState::Celebrating,
            DrawState::Paused => VisibleDrawState::Paused,
            DrawState::Configuring => VisibleDrawState::Configuring,
            DrawState::Finished => VisibleDrawState::Finished,
        }
    }
}
