//! Keyboard shortcuts routed to session actions.

use serde::Deserialize;
use utoipa::ToSchema;

/// A key press as reported by the client.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, ToSchema)]
pub struct KeyChord {
    /// Physical key code, e.g. `KeyC`.
    pub code: String,
    #[serde(default)]
    pub alt: bool,
    #[serde(default)]
    pub ctrl: bool,
    #[serde(default)]
    pub meta: bool,
    /// Auto-repeat of a held key.
    #[serde(default)]
    pub repeat: bool,
}

/// What a shortcut asks the session to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputAction {
    /// Open or close the configuration screen.
    ToggleConfiguring,
    /// Switch to auto mode and spin right away.
    StartAutoNow,
    /// Pause or resume.
    TogglePause,
}

struct Binding {
    code: &'static str,
    action: InputAction,
    // still fires while a text field has focus
    while_typing: bool,
}

/// Maps key chords to [`InputAction`]s.
pub struct InputRouter {
    bindings: Vec<Binding>,
}

impl Default for InputRouter {
    fn default() -> Self {
        Self::new()
    }
}

impl InputRouter {
    /// Router with the Alt+C, Alt+I and Alt+P shortcuts.
    pub fn new() -> Self {
        Self {
            bindings: vec![
                Binding {
                    code: "KeyC",
                    action: InputAction::ToggleConfiguring,
                    while_typing: true,
                },
                Binding {
                    code: "KeyI",
                    action: InputAction::StartAutoNow,
                    while_typing: false,
                },
                Binding {
                    code: "KeyP",
                    action: InputAction::TogglePause,
                    while_typing: false,
                },
            ],
        }
    }

    /// Resolve `chord`; `typing` tells whether a text field has focus.
    pub fn route(&self, chord: &KeyChord, typing: bool) -> Option<InputAction> {
        if !chord.alt || chord.ctrl || chord.meta || chord.repeat {
            return None;
        }
        self.bindings
            .iter()
            .find(|binding| binding.code == chord.code)
            .filter(|binding| binding.while_typing || !typing)
            .map(|binding| binding.action)
    }
}
