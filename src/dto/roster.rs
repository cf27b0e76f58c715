use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    dao::models::{DrawOutcomeEntity, HistoryEntryEntity},
    dto::format_system_time,
    state::roster::{Participant, ParticipantColor, Prize},
};

/// Participant as shown to clients.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ParticipantSummary {
    pub id: Uuid,
    pub name: String,
    pub eliminated: bool,
    pub frozen: bool,
    pub color: ParticipantColor,
}

impl From<&Participant> for ParticipantSummary {
    fn from(value: &Participant) -> Self {
        Self {
            id: value.id,
            name: value.name.clone(),
            eliminated: value.eliminated,
            frozen: value.frozen,
            color: value.color,
        }
    }
}

/// Prize as shown to clients.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PrizeSummary {
    pub id: Uuid,
    pub name: String,
    pub image_index: u8,
    pub frozen: bool,
}

impl From<&Prize> for PrizeSummary {
    fn from(value: &Prize) -> Self {
        Self {
            id: value.id,
            name: value.name.clone(),
            image_index: value.image_index,
            frozen: value.frozen,
        }
    }
}

/// Pending and awarded prizes.
#[derive(Debug, Serialize, ToSchema)]
pub struct PrizeListResponse {
    /// Still to be drawn, in draw order.
    pub pending: Vec<PrizeSummary>,
    /// Already awarded, oldest first.
    pub used: Vec<PrizeSummary>,
}

/// Pin or unpin an entry.
#[derive(Debug, Deserialize, ToSchema)]
pub struct FreezeRequest {
    pub frozen: bool,
}

/// Reserve a participant for a prize.
#[derive(Debug, Deserialize, ToSchema)]
pub struct ReservationRequest {
    pub participant_id: Uuid,
}

/// How a history line came about.
#[derive(Debug, Clone, Copy, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum DrawOutcome {
    Won,
    Absent,
}

impl From<DrawOutcomeEntity> for DrawOutcome {
    fn from(value: DrawOutcomeEntity) -> Self {
        match value {
            DrawOutcomeEntity::Won => DrawOutcome::Won,
            DrawOutcomeEntity::Absent => DrawOutcome::Absent,
        }
    }
}

/// One line of the draw history.
#[derive(Debug, Serialize, ToSchema)]
pub struct HistoryEntryResponse {
    pub id: Uuid,
    pub prize: String,
    pub prize_image: u8,
    pub winner: String,
    pub outcome: DrawOutcome,
    /// RFC 3339 timestamp.
    pub recorded_at: String,
}

impl From<HistoryEntryEntity> for HistoryEntryResponse {
    fn from(value: HistoryEntryEntity) -> Self {
        Self {
            id: value.id,
            prize: value.prize,
            prize_image: value.prize_image,
            winner: value.winner,
            outcome: value.outcome.into(),
            recorded_at: format_system_time(value.recorded_at),
        }
    }
}
