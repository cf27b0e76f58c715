use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationErrors};

use crate::{
    dto::{
        phase::VisibleDrawState,
        roster::{ParticipantSummary, PrizeSummary},
        validation::{normalize_names, validate_names},
    },
    input::KeyChord,
    state::state_machine::OperatingMode,
};

/// Participants and prizes to load into a fresh session.
#[derive(Debug, Deserialize, ToSchema)]
pub struct LoadDataRequest {
    /// Prize names in draw order.
    pub prizes: Vec<String>,
    /// Participant names.
    pub participants: Vec<String>,
}

impl LoadDataRequest {
    /// Trimmed, de-duplicated `(prizes, participants)`.
    pub fn normalized(&self) -> (Vec<String>, Vec<String>) {
        (
            normalize_names(&self.prizes),
            normalize_names(&self.participants),
        )
    }
}

impl Validate for LoadDataRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if let Err(e) = validate_names(&self.prizes) {
            errors.add("prizes", e);
        }
        if let Err(e) = validate_names(&self.participants) {
            errors.add("participants", e);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Mode to operate in.
#[derive(Debug, Deserialize, ToSchema)]
pub struct StartRequest {
    pub mode: OperatingMode,
}

/// A keyboard shortcut forwarded by the client.
#[derive(Debug, Deserialize, ToSchema)]
pub struct InputRequest {
    #[serde(flatten)]
    pub chord: KeyChord,
    /// Whether a text field had focus.
    #[serde(default)]
    pub typing: bool,
}

/// Outcome of a control action. Rejections are routine and reported with `accepted: false`.
#[derive(Debug, Serialize, ToSchema)]
pub struct ActionResponse {
    pub accepted: bool,
    pub state: VisibleDrawState,
    pub message: String,
}

/// Current session state.
#[derive(Debug, Serialize, ToSchema)]
pub struct DrawStateResponse {
    pub state: VisibleDrawState,
    pub operating_mode: OperatingMode,
    /// States reachable right now.
    pub available_transitions: Vec<VisibleDrawState>,
    pub data_loaded: bool,
    pub prizes_available: bool,
    pub pending_prizes: usize,
    pub eligible_participants: usize,
    pub spin_in_flight: bool,
    pub wheel_running: bool,
    pub scroll_running: bool,
    /// Draw being presented while celebrating.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current: Option<DrawSummary>,
}

/// Prize and winner of one draw.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DrawSummary {
    pub prize: PrizeSummary,
    pub winner: ParticipantSummary,
}

/// Last rendered frame of both animators, as drawn on their surfaces.
#[derive(Debug, Serialize, ToSchema)]
pub struct FrameSnapshotResponse {
    pub wheel_angle: f64,
    pub wheel_running: bool,
    pub scroll_offset: f64,
    pub scroll_base_start: f64,
    pub copy_height: f64,
    pub row_step: f64,
    pub copies: usize,
    /// Rendered rows painted with the highlight style.
    pub highlighted: Vec<usize>,
    /// Participant marked as winner once the list settled.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub winner: Option<Uuid>,
    pub scroll_running: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_request_reports_each_blank_list() {
        let request = LoadDataRequest {
            prizes: vec![" ".into()],
            participants: vec![],
        };
        let errors = request.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("prizes"));
        assert!(fields.contains_key("participants"));
    }

    #[test]
    fn load_request_normalizes_names() {
        let request = LoadDataRequest {
            prizes: vec!["Bike ".into(), "Bike".into()],
            participants: vec![" Ana".into(), "Ben".into()],
        };
        request.validate().unwrap();
        let (prizes, participants) = request.normalized();
        assert_eq!(prizes, vec!["Bike".to_string()]);
        assert_eq!(participants, vec!["Ana".to_string(), "Ben".to_string()]);
    }

    #[test]
    fn input_request_flattens_chord() {
        let request: InputRequest =
            serde_json::from_str(r#"{ "code": "KeyP", "alt": true, "typing": true }"#).unwrap();
        assert_eq!(request.chord.code, "KeyP");
        assert!(request.chord.alt);
        assert!(request.typing);
    }
}
