use serde::{Deserialize, Serialize};
use std::time::SystemTime;
use uuid::Uuid;

/// How a history entry came about.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DrawOutcomeEntity {
    /// The participant won the prize.
    Won,
    /// The participant was drawn but marked absent; the prize went back in the queue.
    Absent,
}

/// One persisted line of the draw history.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HistoryEntryEntity {
    /// Stable identifier for the entry.
    pub id: Uuid,
    /// Prize name at the time of the draw.
    pub prize: String,
    /// Image slot of the prize (1 to 8).
    pub prize_image: u8,
    /// Name of the drawn participant.
    pub winner: String,
    /// Whether the prize was awarded or the winner was absent.
    pub outcome: DrawOutcomeEntity,
    /// When the entry was recorded.
    pub recorded_at: SystemTime,
}

impl HistoryEntryEntity {
    /// Build an entry stamped with the current time.
    pub fn now(
        prize: impl Into<String>,
        prize_image: u8,
        winner: impl Into<String>,
        outcome: DrawOutcomeEntity,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            prize: prize.into(),
            prize_image,
            winner: winner.into(),
            outcome,
            recorded_at: SystemTime::now(),
        }
    }
}
