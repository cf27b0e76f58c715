use serde::Serialize;
use utoipa::ToSchema;

use crate::dto::{events::DrawEvent, phase::VisibleDrawState};

#[derive(Clone, Debug)]
/// Dispatched payload carried across the SSE channel.
pub struct ServerEvent {
    pub event: Option<String>,
    pub data: String,
}

impl ServerEvent {
    /// Convenience wrapper that serialises `payload` into the SSE data field.
    pub fn json<E, T>(event: E, payload: &T) -> serde_json::Result<Self>
    where
        E: Into<Option<String>>,
        T: Serialize,
    {
        Ok(Self {
            event: event.into(),
            data: serde_json::to_string(payload)?,
        })
    }
}

impl TryFrom<&DrawEvent> for ServerEvent {
    type Error = serde_json::Error;

    fn try_from(value: &DrawEvent) -> Result<Self, Self::Error> {
        ServerEvent::json(Some(value.name().to_string()), value)
    }
}

#[derive(Debug, Serialize, ToSchema)]
/// Initial metadata sent to an SSE client when it connects.
pub struct Handshake {
    /// Human-readable message confirming the subscription.
    pub message: String,
    /// Draw state at subscription time.
    pub state: VisibleDrawState,
}
