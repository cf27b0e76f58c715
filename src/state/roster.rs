use std::collections::VecDeque;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{animation::ListRow, config::AppConfig};

/// Number of prize images cycled through by load position.
pub const PRIZE_IMAGE_COUNT: usize = 8;

/// HSV color assigned to a participant.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ParticipantColor {
    /// Hue in degrees.
    pub h: f32,
    /// Saturation in `[0, 1]`.
    pub s: f32,
    /// Value in `[0, 1]`.
    pub v: f32,
}

/// Someone who can win a prize.
#[derive(Debug, Clone, PartialEq)]
pub struct Participant {
    /// Identifier assigned at load.
    pub id: Uuid,
    /// Display name.
    pub name: String,
    /// Won (or was marked absent); never selectable again.
    pub eliminated: bool,
    /// Pinned out of random selection without being eliminated.
    pub frozen: bool,
    /// Palette entry picked by load position.
    pub color: ParticipantColor,
}

/// Something to be drawn.
#[derive(Debug, Clone, PartialEq)]
pub struct Prize {
    /// Identifier assigned at load.
    pub id: Uuid,
    /// Display name.
    pub name: String,
    /// `(load position mod 8) + 1`.
    pub image_index: u8,
    /// Skipped when picking the next prize.
    pub frozen: bool,
}

/// Prize and winner of the draw being presented.
#[derive(Debug, Clone, PartialEq)]
pub struct CurrentDraw {
    /// Prize being awarded.
    pub prize: Prize,
    /// Participant who won it.
    pub winner: Participant,
}

/// Errors raised by roster mutations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RosterError {
    /// The prize is not pending.
    #[error("prize {0} is not pending")]
    PrizeNotPending(Uuid),
    /// The participant does not exist or cannot win.
    #[error("participant {0} is not eligible")]
    ParticipantNotEligible(Uuid),
}

/// Participants and prizes of the session.
///
/// Pending prizes keep their load order; only absence corrections push a prize back to
/// the front.
#[derive(Debug, Clone, Default)]
pub struct Roster {
    participants: IndexMap<Uuid, Participant>,
    pending: VecDeque<Prize>,
    used: Vec<Prize>,
    current: Option<CurrentDraw>,
}

impl Roster {
    /// Build a roster from names, assigning ids, colors and prize images.
    pub fn load(prizes: Vec<String>, participants: Vec<String>, config: &AppConfig) -> Self {
        let participants = participants
            .into_iter()
            .enumerate()
            .map(|(position, name)| {
                let participant = Participant {
                    id: Uuid::new_v4(),
                    name,
                    eliminated: false,
                    frozen: false,
                    color: config.color_for(position),
                };
                (participant.id, participant)
            })
            .collect();

        let pending = prizes
            .into_iter()
            .enumerate()
            .map(|(position, name)| Prize {
                id: Uuid::new_v4(),
                name,
                image_index: (position % PRIZE_IMAGE_COUNT) as u8 + 1,
                frozen: false,
            })
            .collect();

        Self {
            participants,
            pending,
            used: Vec::new(),
            current: None,
        }
    }

    /// Whether anything was loaded.
    pub fn is_loaded(&self) -> bool {
        !self.participants.is_empty() || !self.pending.is_empty() || !self.used.is_empty()
    }

    /// All participants in load order.
    pub fn participants(&self) -> Vec<Participant> {
        self.participants.values().cloned().collect()
    }

    /// Look up one participant.
    pub fn participant(&self, id: Uuid) -> Option<&Participant> {
        self.participants.get(&id)
    }

    /// Pending prizes in draw order.
    pub fn pending_prizes(&self) -> Vec<Prize> {
        self.pending.iter().cloned().collect()
    }

    /// Prizes already awarded, oldest first.
    pub fn used_prizes(&self) -> Vec<Prize> {
        self.used.clone()
    }

    /// Whether `prize_id` is still pending.
    pub fn is_pending(&self, prize_id: Uuid) -> bool {
        self.pending.iter().any(|prize| prize.id == prize_id)
    }

    /// Participants that can be drawn: not eliminated and not frozen.
    pub fn eligible(&self) -> Vec<Participant> {
        self.participants
            .values()
            .filter(|participant| is_eligible(participant))
            .cloned()
            .collect()
    }

    /// Whether `id` can be drawn right now.
    pub fn is_eligible(&self, id: Uuid) -> bool {
        self.participants.get(&id).is_some_and(is_eligible)
    }

    /// Whether at least one participant can be drawn.
    pub fn has_eligible(&self) -> bool {
        self.participants.values().any(is_eligible)
    }

    /// Whether any prize is left in the queue.
    pub fn has_pending_prizes(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Whether a draw could happen right now.
    pub fn can_draw(&self) -> bool {
        self.next_prize().is_some() && self.has_eligible()
    }

    /// First pending prize that is not frozen.
    pub fn next_prize(&self) -> Option<&Prize> {
        self.pending.iter().find(|prize| !prize.frozen)
    }

    /// Rows for the looping list: everyone not eliminated, in load order.
    pub fn list_rows(&self) -> Vec<ListRow> {
        self.participants
            .values()
            .filter(|participant| !participant.eliminated)
            .map(|participant| ListRow {
                participant_id: participant.id,
                label: participant.name.clone(),
            })
            .collect()
    }

    /// Move `prize_id` to the used list and eliminate `winner_id`.
    pub fn commit(&mut self, prize_id: Uuid, winner_id: Uuid) -> Result<CurrentDraw, RosterError> {
        if !self.is_eligible(winner_id) {
            return Err(RosterError::ParticipantNotEligible(winner_id));
        }
        let position = self
            .pending
            .iter()
            .position(|prize| prize.id == prize_id)
            .ok_or(RosterError::PrizeNotPending(prize_id))?;

        let prize = self
            .pending
            .remove(position)
            .ok_or(RosterError::PrizeNotPending(prize_id))?;
        let winner = self
            .participants
            .get_mut(&winner_id)
            .ok_or(RosterError::ParticipantNotEligible(winner_id))?;
        winner.eliminated = true;

        let draw = CurrentDraw {
            prize: prize.clone(),
            winner: winner.clone(),
        };
        self.used.push(prize);
        self.current = Some(draw.clone());
        Ok(draw)
    }

    /// Draw being presented, if any.
    pub fn current(&self) -> Option<&CurrentDraw> {
        self.current.as_ref()
    }

    /// Close the presentation of the current draw.
    pub fn finish_current(&mut self) -> Option<CurrentDraw> {
        self.current.take()
    }

    /// The current winner was absent: keep them eliminated and put the prize back in front.
    pub fn reinstate_current_prize(&mut self) -> Option<CurrentDraw> {
        let draw = self.current.take()?;
        if let Some(position) = self.used.iter().rposition(|prize| prize.id == draw.prize.id) {
            let prize = self.used.remove(position);
            self.pending.push_front(prize);
        }
        Some(draw)
    }

    /// Pin or unpin a participant. Returns `None` for unknown ids.
    pub fn set_participant_frozen(&mut self, id: Uuid, frozen: bool) -> Option<Participant> {
        let participant = self.participants.get_mut(&id)?;
        participant.frozen = frozen;
        Some(participant.clone())
    }

    /// Skip or unskip a pending prize. Returns `None` for ids not pending.
    pub fn set_prize_frozen(&mut self, id: Uuid, frozen: bool) -> Option<Prize> {
        let prize = self.pending.iter_mut().find(|prize| prize.id == id)?;
        prize.frozen = frozen;
        Some(prize.clone())
    }
}

fn is_eligible(participant: &Participant) -> bool {
    !participant.eliminated && !participant.frozen
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| value.to_string()).collect()
    }

    fn roster() -> Roster {
        Roster::load(
            names(&["Bike", "Mug", "Cap"]),
            names(&["Ana", "Ben", "Cleo", "Dan"]),
            &AppConfig::default(),
        )
    }

    #[test]
    fn load_assigns_images_and_keeps_order() {
        let prizes: Vec<String> = (0..10).map(|index| format!("prize {index}")).collect();
        let roster = Roster::load(prizes, names(&["Ana"]), &AppConfig::default());
        let images: Vec<u8> = roster
            .pending_prizes()
            .iter()
            .map(|prize| prize.image_index)
            .collect();
        assert_eq!(images, vec![1, 2, 3, 4, 5, 6, 7, 8, 1, 2]);
        assert_eq!(roster.next_prize().unwrap().name, "prize 0");
    }

    #[test]
    fn commit_moves_prize_and_eliminates_winner() {
        let mut roster = roster();
        let prize = roster.next_prize().cloned().unwrap();
        let winner = roster.eligible()[1].clone();

        let draw = roster.commit(prize.id, winner.id).unwrap();
        assert_eq!(draw.prize.name, "Bike");
        assert!(draw.winner.eliminated);
        assert_eq!(roster.pending_prizes().len(), 2);
        assert_eq!(roster.used_prizes(), vec![prize.clone()]);
        assert!(!roster.is_eligible(winner.id));
        assert_eq!(roster.list_rows().len(), 3);

        assert_eq!(
            roster.commit(prize.id, roster.eligible()[0].id),
            Err(RosterError::PrizeNotPending(prize.id))
        );
    }

    #[test]
    fn absent_winner_stays_out_and_prize_returns_first() {
        let mut roster = roster();
        let prize = roster.next_prize().cloned().unwrap();
        let winner = roster.eligible()[0].clone();
        roster.commit(prize.id, winner.id).unwrap();

        let draw = roster.reinstate_current_prize().unwrap();
        assert_eq!(draw.winner.id, winner.id);
        assert_eq!(roster.next_prize().unwrap().id, prize.id);
        assert!(roster.used_prizes().is_empty());
        assert!(!roster.is_eligible(winner.id));
        assert!(roster.current().is_none());
    }

    #[test]
    fn frozen_entries_are_skipped() {
        let mut roster = roster();
        let first = roster.next_prize().cloned().unwrap();
        roster.set_prize_frozen(first.id, true).unwrap();
        assert_eq!(roster.next_prize().unwrap().name, "Mug");

        let ana = roster.participants()[0].id;
        roster.set_participant_frozen(ana, true).unwrap();
        assert_eq!(roster.eligible().len(), 3);
        assert!(roster.list_rows().iter().any(|row| row.participant_id == ana));
        assert!(roster.set_participant_frozen(Uuid::new_v4(), true).is_none());
    }

    #[test]
    fn draws_stop_when_nobody_is_left() {
        let mut roster = Roster::load(names(&["A", "B"]), names(&["Solo"]), &AppConfig::default());
        let solo = roster.participants()[0].id;
        let prize = roster.next_prize().unwrap().id;
        roster.commit(prize, solo).unwrap();

        assert!(roster.has_pending_prizes());
        assert!(!roster.can_draw());
    }
}
