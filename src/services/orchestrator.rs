//! One draw from `spinning` to `celebrating`: pick the prize and the winner, start the wheel,
//! the list and the audio cue together, wait out the spin, then commit.

use std::f64::consts::TAU;

use rand::Rng;
use thiserror::Error;
use tokio::time::sleep;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    animation::ScrollError,
    dao::models::{DrawOutcomeEntity, HistoryEntryEntity},
    dto::events::{DrawEvent, SpinStartedPayload},
    geometry,
    state::{
        DrawBusy, DrawGuard, SharedState,
        roster::{CurrentDraw, Participant, RosterError},
        state_machine::DrawState,
    },
};

/// Failures that abort a draw.
#[derive(Debug, Error)]
pub enum DrawError {
    /// No pending prize is left.
    #[error("no prize left to draw")]
    NoPrize,
    /// Nobody can win.
    #[error("no eligible participant")]
    NoEligibleParticipant,
    /// The list scroller could not target the winner.
    #[error(transparent)]
    Scroll(#[from] ScrollError),
    /// The roster refused the result.
    #[error(transparent)]
    Roster(#[from] RosterError),
    /// The session left `spinning` while the draw was running.
    #[error("draw interrupted: session moved to {0}")]
    Interrupted(DrawState),
    /// The session was reset while the draw was running.
    #[error("draw invalidated by a session reset")]
    Invalidated,
}

/// Pick the winner among `eligible`.
///
/// A reservation wins when it names an eligible participant; the flag in the result tells
/// whether it was used.
pub fn choose_winner<R>(
    eligible: &[Participant],
    reserved: Option<Uuid>,
    rng: &mut R,
) -> Option<(Participant, bool)>
where
    R: Rng + ?Sized,
{
    if let Some(participant) = reserved.and_then(|id| eligible.iter().find(|p| p.id == id)) {
        return Some((participant.clone(), true));
    }
    if eligible.is_empty() {
        return None;
    }
    let index = rng.random_range(0..eligible.len());
    Some((eligible[index].clone(), false))
}

/// React to the session entering `spinning`.
///
/// Busy animators or a draw already in flight make this a no-op; an exhausted roster moves
/// the session to `finished`.
pub async fn run_draw(state: SharedState) {
    if state.state() != DrawState::Spinning {
        debug!(state = %state.state(), "draw requested outside of spinning; ignoring");
        state.withdraw_spin_request();
        return;
    }

    let guard = match state.try_acquire_draw() {
        Ok(guard) => guard,
        Err(DrawBusy::InFlight) => {
            debug!("draw already in flight; ignoring request");
            return;
        }
        Err(DrawBusy::Animating) => {
            debug!("animations still running; draw skipped");
            recover(&state);
            return;
        }
    };

    if !state.read_roster(|roster| roster.can_draw()).await {
        info!("no prize or eligible participant left; finishing");
        state.with_machine(|machine| machine.flags_mut().prizes_available = false);
        if !state.transition(DrawState::Finished) {
            warn!(state = %state.state(), "could not finish the session");
        }
        return;
    }

    match draw(&state, &guard).await {
        Ok(draw) => {
            info!(prize = %draw.prize.name, winner = %draw.winner.name, "draw committed");
            if !state.transition(DrawState::Celebrating) {
                warn!(state = %state.state(), "could not start the celebration");
            }
        }
        Err(DrawError::Interrupted(current)) => {
            info!(state = %current, "draw interrupted; result discarded");
        }
        Err(DrawError::Invalidated) => {
            info!("session was reset during the draw; result discarded");
        }
        Err(err) => {
            warn!(error = %err, "draw failed");
            state.wheel().cancel();
            state.scroll().cancel();
            state.events().emit(DrawEvent::DrawFailed {
                message: format!("the draw could not be completed: {err}"),
            });
            recover(&state);
        }
    }
}

fn recover(state: &SharedState) {
    let mode = state.with_machine(|machine| machine.flags().operating_mode);
    if !state.transition(DrawState::Operating(mode)) {
        warn!(state = %state.state(), "could not return to operating");
    }
}

async fn draw(state: &SharedState, guard: &DrawGuard<'_>) -> Result<CurrentDraw, DrawError> {
    let config = state.config().snapshot().await;
    let (prize, eligible) = state
        .read_roster(|roster| (roster.next_prize().cloned(), roster.eligible()))
        .await;
    let prize = prize.ok_or(DrawError::NoPrize)?;

    let reserved = match state.reservations().get(prize.id).await {
        Ok(reserved) => reserved,
        Err(err) => {
            warn!(error = %err, prize = %prize.id, "reservation lookup failed; drawing at random");
            None
        }
    };

    let (winner, used_reservation, sub_turn) = {
        let mut rng = rand::rng();
        let (winner, used) = choose_winner(&eligible, reserved, &mut rng)
            .ok_or(DrawError::NoEligibleParticipant)?;
        (winner, used, rng.random_range(0.0..TAU))
    };

    if used_reservation {
        info!(prize = %prize.name, winner = %winner.name, "reservation honoured");
        if let Err(err) = state.reservations().clear(prize.id).await {
            warn!(error = %err, prize = %prize.id, "failed to clear the used reservation");
        }
    } else if let Some(reserved) = reserved {
        info!(prize = %prize.name, participant = %reserved, "reserved participant not eligible; drawing at random");
    }

    let duration = config.spin_duration;
    let from_angle = state.wheel().angle();
    let to_angle = geometry::wheel_target(from_angle, config.wheel_full_turns, sub_turn);
    let scroll = state
        .scroll()
        .start(winner.id, duration, config.list_extra_loops)?;
    state.wheel().start_spin(to_angle, duration);

    state.events().emit(DrawEvent::SpinStarted(SpinStartedPayload {
        prize: (&prize).into(),
        winner: (&winner).into(),
        duration_ms: duration.as_millis() as u64,
        from_angle,
        to_angle,
        scroll_travel: scroll.travel,
    }));

    let cue = state.audio().spin(duration);
    tokio::spawn(async move {
        if let Err(err) = cue.await {
            warn!(error = %err, "spin sound failed");
        }
    });

    sleep(duration).await;

    if !guard.is_current() {
        return Err(DrawError::Invalidated);
    }
    let current = state.state();
    if current != DrawState::Spinning {
        return Err(DrawError::Interrupted(current));
    }

    state.audio().celebrate();
    let committed = state
        .with_roster_mut(|roster| roster.commit(prize.id, winner.id))
        .await?;

    let entry = HistoryEntryEntity::now(
        committed.prize.name.clone(),
        committed.prize.image_index,
        committed.winner.name.clone(),
        DrawOutcomeEntity::Won,
    );
    if let Err(err) = state.history().record(entry).await {
        warn!(error = %err, "failed to record the draw");
    }

    let remaining = state.read_roster(|roster| roster.can_draw()).await;
    state.with_machine(|machine| {
        let flags = machine.flags_mut();
        flags.spin_completed = true;
        flags.prizes_available = remaining;
    });

    Ok(committed)
}

#[cfg(test)]
mod tests {
    use rand::{SeedableRng, rngs::StdRng};

    use super::*;
    use crate::state::roster::ParticipantColor;

    fn participant(name: &str) -> Participant {
        Participant {
            id: Uuid::new_v4(),
            name: name.into(),
            eliminated: false,
            frozen: false,
            color: ParticipantColor {
                h: 0.0,
                s: 0.0,
                v: 1.0,
            },
        }
    }

    #[test]
    fn reservation_for_an_eligible_participant_wins() {
        let eligible = vec![participant("Ana"), participant("Ben"), participant("Cleo")];
        let mut rng = StdRng::seed_from_u64(7);

        let (winner, used) = choose_winner(&eligible, Some(eligible[2].id), &mut rng).unwrap();
        assert_eq!(winner.id, eligible[2].id);
        assert!(used);
    }

    #[test]
    fn unknown_reservation_falls_back_to_random() {
        let eligible = vec![participant("Ana"), participant("Ben")];
        let mut rng = StdRng::seed_from_u64(7);

        for _ in 0..50 {
            let (winner, used) = choose_winner(&eligible, Some(Uuid::new_v4()), &mut rng).unwrap();
            assert!(!used);
            assert!(eligible.iter().any(|p| p.id == winner.id));
        }
    }

    #[test]
    fn nobody_eligible_means_no_winner() {
        let mut rng = StdRng::seed_from_u64(7);
        assert!(choose_winner(&[], None, &mut rng).is_none());
    }
}
