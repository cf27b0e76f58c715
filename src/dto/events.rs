use serde::Serialize;
use utoipa::ToSchema;

use crate::dto::{
    phase::VisibleDrawState,
    roster::{ParticipantSummary, PrizeSummary},
};

/// Geometry and identity of a draw that just started.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SpinStartedPayload {
    pub prize: PrizeSummary,
    pub winner: ParticipantSummary,
    pub duration_ms: u64,
    pub from_angle: f64,
    pub to_angle: f64,
    pub scroll_travel: f64,
}

/// Lifecycle events broadcast by the session.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DrawEvent {
    /// The state machine committed a transition.
    StateChanged {
        from: VisibleDrawState,
        to: VisibleDrawState,
    },
    /// The session entered `spinning`; a draw is about to run.
    SpinRequested,
    /// Animations started for a selected prize and winner.
    SpinStarted(SpinStartedPayload),
    /// A winner is being presented.
    CelebrationRequested {
        prize: PrizeSummary,
        winner: ParticipantSummary,
    },
    /// The draw failed and the session recovered.
    DrawFailed { message: String },
    /// Informational message for the operator.
    Notice { message: String },
}

impl DrawEvent {
    /// SSE event name.
    pub fn name(&self) -> &'static str {
        match self {
            DrawEvent::StateChanged { .. } => "state_changed",
            DrawEvent::SpinRequested => "spin_requested",
            DrawEvent::SpinStarted(_) => "spin_started",
            DrawEvent::CelebrationRequested { .. } => "celebration_requested",
            DrawEvent::DrawFailed { .. } => "draw_failed",
            DrawEvent::Notice { .. } => "notice",
        }
    }

    /// Shorthand for a [`DrawEvent::Notice`].
    pub fn notice(message: impl Into<String>) -> Self {
        DrawEvent::Notice {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_serialize_with_type_tag() {
        let event = DrawEvent::StateChanged {
            from: VisibleDrawState::OperatingAuto,
            to: VisibleDrawState::Spinning,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "state_changed");
        assert_eq!(json["from"], "operating_auto");
        assert_eq!(event.name(), "state_changed");

        let json = serde_json::to_value(DrawEvent::notice("hello")).unwrap();
        assert_eq!(json, serde_json::json!({ "type": "notice", "message": "hello" }));
    }
}
