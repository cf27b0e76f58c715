use tokio::sync::broadcast;
use tracing::debug;

use crate::dto::events::DrawEvent;

/// Broadcast hub for lifecycle events; subscribers that lag lose old events.
#[derive(Clone)]
pub struct EventHub {
    sender: broadcast::Sender<DrawEvent>,
}

impl EventHub {
    /// Construct a new hub backed by a Tokio broadcast channel with the given capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _receiver) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Register a new subscriber that will receive subsequent events.
    pub fn subscribe(&self) -> broadcast::Receiver<DrawEvent> {
        self.sender.subscribe()
    }

    /// Send an event to all current subscribers, ignoring delivery errors.
    pub fn emit(&self, event: DrawEvent) {
        debug!(event = event.name(), "lifecycle event");
        let _ = self.sender.send(event);
    }
}
