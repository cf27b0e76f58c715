//! Operator controls and read models for the draw session. Controls that the state machine
//! may legitimately refuse answer with an [`ActionResponse`] instead of an error.

use std::sync::Arc;

use tokio::time::sleep;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    config::OperationMode,
    dao::models::{DrawOutcomeEntity, HistoryEntryEntity},
    dto::{
        draw::{
            ActionResponse, DrawStateResponse, DrawSummary, FrameSnapshotResponse, InputRequest,
            LoadDataRequest,
        },
        events::DrawEvent,
        roster::{HistoryEntryResponse, ParticipantSummary, PrizeListResponse, PrizeSummary, ReservationRequest},
        settings::{ConfigResponse, ConfigUpdateRequest},
    },
    error::ServiceError,
    input::InputAction,
    state::{
        SessionCommand, SharedState,
        roster::Roster,
        state_machine::{DrawState, OperatingMode},
    },
};

fn respond(state: &SharedState, accepted: bool, message: impl Into<String>) -> ActionResponse {
    let message = message.into();
    if accepted {
        info!(state = %state.state(), "{message}");
    } else {
        debug!(state = %state.state(), "{message}");
    }
    ActionResponse {
        accepted,
        state: state.state().into(),
        message,
    }
}

fn request_transition(state: &SharedState, to: DrawState) -> ActionResponse {
    if state.transition(to) {
        respond(state, true, format!("moved to {to}"))
    } else {
        respond(state, false, format!("{to} is not reachable from {}", state.state()))
    }
}

async fn refresh_availability(state: &SharedState) -> bool {
    let ready = state.read_roster(|roster| roster.can_draw()).await;
    state.with_machine(|machine| machine.flags_mut().prizes_available = ready);
    ready
}

// ---------------------------------------------------------------------------
// Session lifecycle
// ---------------------------------------------------------------------------

async fn install_roster(state: &SharedState, prizes: Vec<String>, participants: Vec<String>) {
    let config = state.config().snapshot().await;
    let roster = Roster::load(prizes, participants, &config);
    let rows = roster.list_rows();
    let ready = roster.can_draw();
    let (prize_count, participant_count) = (roster.pending_prizes().len(), rows.len());

    state.with_roster_mut(|slot| *slot = roster).await;
    state.scroll().set_rows(rows);
    state.with_machine(|machine| {
        let flags = machine.flags_mut();
        flags.data_loaded = true;
        flags.prizes_available = ready;
        flags.countdown_expired = false;
        flags.spin_completed = false;
        flags.operating_mode = config.operation_mode.operating_mode();
    });
    info!(prizes = prize_count, participants = participant_count, "draw data loaded");
}

/// Load participants and prizes.
///
/// From `idle` the session moves on to `dataLoaded` and then to the configured operating
/// mode; while configuring the data replaces the current roster and is used once the
/// configuration screen closes.
pub async fn load_data(
    state: &SharedState,
    request: LoadDataRequest,
) -> Result<DrawStateResponse, ServiceError> {
    let (prizes, participants) = request.normalized();

    match state.state() {
        DrawState::Idle => {
            state
                .run_transition(DrawState::DataLoaded, || async move {
                    install_roster(state, prizes, participants).await;
                    Ok(())
                })
                .await?;
        }
        DrawState::Configuring => install_roster(state, prizes, participants).await,
        other => {
            return Err(ServiceError::InvalidState(format!(
                "data can only be loaded while idle or configuring, current state {other}"
            )));
        }
    }

    Ok(describe(state).await)
}

/// Operate in `mode`.
pub fn start(state: &SharedState, mode: OperatingMode) -> ActionResponse {
    request_transition(state, DrawState::Operating(mode))
}

/// Switch to auto mode and spin without waiting for the countdown.
pub fn start_auto_now(state: &SharedState) -> ActionResponse {
    let target = DrawState::Operating(OperatingMode::Auto);
    if state.state() != target && !state.transition(target) {
        return respond(state, false, format!("{target} is not reachable from {}", state.state()));
    }
    trigger_spin(state)
}

/// Request a spin from an operating state.
pub fn trigger_spin(state: &SharedState) -> ActionResponse {
    let current = state.state();
    if !matches!(current, DrawState::Operating(_)) {
        return respond(state, false, format!("cannot spin while {current}"));
    }
    if !state.request_spin() {
        return respond(state, false, "a spin is already in progress");
    }

    let started = state.with_machine(|machine| {
        machine.flags_mut().countdown_expired = true;
        let started = machine.transition(DrawState::Spinning);
        if !started {
            machine.flags_mut().countdown_expired = false;
        }
        started
    });

    if started {
        respond(state, true, "spin started")
    } else {
        state.withdraw_spin_request();
        respond(state, false, "spin rejected")
    }
}

/// Countdown expiry in auto mode.
pub fn countdown_expired(state: &SharedState) {
    if state.state() != DrawState::Operating(OperatingMode::Auto) {
        debug!(state = %state.state(), "countdown expired outside of auto mode");
        return;
    }
    if state.is_spin_requested() {
        debug!("countdown expired while a spin is pending; re-arming");
        state.send(SessionCommand::ArmCountdown);
        return;
    }
    let response = trigger_spin(state);
    debug!(accepted = response.accepted, "countdown expired");
}

/// Pause an operating session, or resume a paused one in its previous mode.
pub fn toggle_pause(state: &SharedState) -> ActionResponse {
    match state.state() {
        DrawState::Paused => {
            let mode = state.with_machine(|machine| machine.flags().operating_mode);
            request_transition(state, DrawState::Operating(mode))
        }
        DrawState::Operating(_) => request_transition(state, DrawState::Paused),
        other => respond(state, false, format!("cannot pause or resume while {other}")),
    }
}

/// Open the configuration screen, or close it.
///
/// Closing goes back through `dataLoaded` when data is loaded, `idle` otherwise.
pub fn toggle_configuring(state: &SharedState) -> ActionResponse {
    match state.state() {
        DrawState::Configuring => {
            let data_loaded = state.with_machine(|machine| machine.flags().data_loaded);
            let target = if data_loaded {
                DrawState::DataLoaded
            } else {
                DrawState::Idle
            };
            request_transition(state, target)
        }
        _ => request_transition(state, DrawState::Configuring),
    }
}

/// Drop all data and return to `idle`.
pub async fn reset(state: &SharedState) -> DrawStateResponse {
    state.invalidate_draw();
    state.disarm_countdown();
    state.cancel_celebration_timer();
    state.wheel().cancel();
    state.scroll().cancel();
    state.with_roster_mut(|roster| *roster = Roster::default()).await;
    state.scroll().set_rows(Vec::new());
    state.with_machine(|machine| machine.reset());
    info!("session reset");
    describe(state).await
}

// ---------------------------------------------------------------------------
// Celebration
// ---------------------------------------------------------------------------

/// Announce the committed draw; in full-auto mode the celebration closes by itself.
pub async fn begin_celebration(state: &SharedState) {
    let Some(draw) = state.read_roster(|roster| roster.current().cloned()).await else {
        warn!("celebration started without a committed draw");
        return;
    };

    state.events().emit(DrawEvent::CelebrationRequested {
        prize: (&draw.prize).into(),
        winner: (&draw.winner).into(),
    });

    let config = state.config().snapshot().await;
    if config.operation_mode == OperationMode::FullAuto {
        let session = Arc::clone(state);
        let linger = config.celebration_duration;
        state.set_celebration_timer(tokio::spawn(async move {
            sleep(linger).await;
            finish_celebration(&session).await;
        }));
    }
}

/// The winner is present: close the celebration.
pub async fn confirm_present(state: &SharedState) -> ActionResponse {
    if state.state() != DrawState::Celebrating {
        return respond(state, false, "no winner is being presented");
    }
    state.cancel_celebration_timer();
    finish_celebration(state).await
}

async fn finish_celebration(state: &SharedState) -> ActionResponse {
    if state.state() != DrawState::Celebrating {
        return respond(state, false, "no winner is being presented");
    }
    if let Some(draw) = state.with_roster_mut(|roster| roster.finish_current()).await {
        state.scroll().remove_row(draw.winner.id);
        info!(prize = %draw.prize.name, winner = %draw.winner.name, "prize handed over");
    }
    leave_celebration(state).await
}

/// The winner is absent: they stay out of the draw and the prize is drawn again next.
pub async fn mark_absent(state: &SharedState) -> ActionResponse {
    if state.state() != DrawState::Celebrating {
        return respond(state, false, "no winner is being presented");
    }
    state.cancel_celebration_timer();

    let Some(draw) = state
        .with_roster_mut(|roster| roster.reinstate_current_prize())
        .await
    else {
        return respond(state, false, "no winner is being presented");
    };
    state.scroll().remove_row(draw.winner.id);

    let entry = HistoryEntryEntity::now(
        draw.prize.name.clone(),
        draw.prize.image_index,
        draw.winner.name.clone(),
        DrawOutcomeEntity::Absent,
    );
    if let Err(err) = state.history().record(entry).await {
        warn!(error = %err, "failed to record the absence");
    }

    info!(prize = %draw.prize.name, winner = %draw.winner.name, "winner absent; prize back in the draw");
    state.events().emit(DrawEvent::notice(format!(
        "{} is absent; {} will be drawn again",
        draw.winner.name, draw.prize.name
    )));
    leave_celebration(state).await
}

async fn leave_celebration(state: &SharedState) -> ActionResponse {
    let ready = refresh_availability(state).await;
    let target = if ready {
        DrawState::Operating(state.with_machine(|machine| machine.flags().operating_mode))
    } else {
        DrawState::Finished
    };
    request_transition(state, target)
}

// ---------------------------------------------------------------------------
// Roster controls
// ---------------------------------------------------------------------------

/// Pin a participant out of random selection, or release them.
pub async fn set_participant_frozen(
    state: &SharedState,
    id: Uuid,
    frozen: bool,
) -> Result<ParticipantSummary, ServiceError> {
    let participant = state
        .with_roster_mut(|roster| roster.set_participant_frozen(id, frozen))
        .await
        .ok_or_else(|| ServiceError::NotFound(format!("participant `{id}` not found")))?;
    refresh_availability(state).await;
    Ok((&participant).into())
}

/// Skip a pending prize, or put it back in line.
pub async fn set_prize_frozen(
    state: &SharedState,
    id: Uuid,
    frozen: bool,
) -> Result<PrizeSummary, ServiceError> {
    let prize = state
        .with_roster_mut(|roster| roster.set_prize_frozen(id, frozen))
        .await
        .ok_or_else(|| ServiceError::NotFound(format!("prize `{id}` is not pending")))?;
    refresh_availability(state).await;
    Ok((&prize).into())
}

/// Reserve a participant for the next draw of `prize_id`.
pub async fn reserve(
    state: &SharedState,
    prize_id: Uuid,
    request: ReservationRequest,
) -> Result<(), ServiceError> {
    let (pending, participant) = state
        .read_roster(|roster| {
            (
                roster.is_pending(prize_id),
                roster.participant(request.participant_id).cloned(),
            )
        })
        .await;

    if !pending {
        return Err(ServiceError::NotFound(format!("prize `{prize_id}` is not pending")));
    }
    let participant = participant.ok_or_else(|| {
        ServiceError::NotFound(format!("participant `{}` not found", request.participant_id))
    })?;
    if participant.eliminated {
        return Err(ServiceError::InvalidInput(format!(
            "participant `{}` already left the draw",
            participant.name
        )));
    }

    state.reservations().reserve(prize_id, participant.id).await?;
    info!(prize = %prize_id, participant = %participant.name, "reservation stored");
    Ok(())
}

/// Drop the reservation for `prize_id`.
pub async fn clear_reservation(state: &SharedState, prize_id: Uuid) -> Result<(), ServiceError> {
    if state.reservations().clear(prize_id).await? {
        info!(prize = %prize_id, "reservation cleared");
        Ok(())
    } else {
        Err(ServiceError::NotFound(format!(
            "no reservation for prize `{prize_id}`"
        )))
    }
}

// ---------------------------------------------------------------------------
// Configuration and input
// ---------------------------------------------------------------------------

/// Current configuration.
pub async fn get_config(state: &SharedState) -> ConfigResponse {
    (&state.config().snapshot().await).into()
}

/// Apply and persist a configuration update. Running timers keep their old durations.
///
/// A new operation mode becomes the mode the session returns to after configuring, pausing
/// or celebrating.
pub async fn update_config(
    state: &SharedState,
    request: ConfigUpdateRequest,
) -> Result<ConfigResponse, ServiceError> {
    let mode = request.operation_mode;
    let updated = state
        .config()
        .update(|config| request.apply_to(config))
        .await?;
    if let Some(mode) = mode {
        state.with_machine(|machine| machine.flags_mut().operating_mode = mode.operating_mode());
    }
    info!(mode = ?updated.operation_mode, "configuration updated");
    Ok((&updated).into())
}

/// Route a keyboard shortcut to its control.
pub fn handle_input(state: &SharedState, request: InputRequest) -> ActionResponse {
    match state.input().route(&request.chord, request.typing) {
        Some(InputAction::ToggleConfiguring) => toggle_configuring(state),
        Some(InputAction::StartAutoNow) => start_auto_now(state),
        Some(InputAction::TogglePause) => toggle_pause(state),
        None => respond(state, false, "no shortcut bound to this key"),
    }
}

// ---------------------------------------------------------------------------
// Read-only projections
// ---------------------------------------------------------------------------

/// Current state, flags and counters.
pub async fn describe(state: &SharedState) -> DrawStateResponse {
    let snapshot = state.snapshot();
    let available = state.with_machine(|machine| machine.available_transitions());
    let (pending_prizes, eligible_participants, current) = state
        .read_roster(|roster| {
            (
                roster.pending_prizes().len(),
                roster.eligible().len(),
                roster.current().map(|draw| DrawSummary {
                    prize: (&draw.prize).into(),
                    winner: (&draw.winner).into(),
                }),
            )
        })
        .await;

    DrawStateResponse {
        state: snapshot.state.into(),
        operating_mode: snapshot.flags.operating_mode,
        available_transitions: available.into_iter().map(Into::into).collect(),
        data_loaded: snapshot.flags.data_loaded,
        prizes_available: snapshot.flags.prizes_available,
        pending_prizes,
        eligible_participants,
        spin_in_flight: state.is_draw_in_flight(),
        wheel_running: state.wheel().is_running(),
        scroll_running: state.scroll().is_running(),
        current,
    }
}

/// Last rendered frame of the wheel and the list.
///
/// Surfaces that keep what they drew are authoritative; the animators fill in the rest.
pub fn frame_snapshot(state: &SharedState) -> FrameSnapshotResponse {
    let view = state.scroll().view();
    let wheel_angle = state
        .wheel_surface()
        .last_angle()
        .unwrap_or_else(|| state.wheel().angle());
    let (scroll_offset, copies, highlighted, winner) = match state.list_surface().last_frame() {
        Some(frame) => (frame.offset, frame.copies, frame.highlighted, frame.winner),
        None => (view.offset, view.copies, view.highlighted.clone().collect(), None),
    };

    FrameSnapshotResponse {
        wheel_angle,
        wheel_running: state.wheel().is_running(),
        scroll_offset,
        scroll_base_start: view.base_start,
        copy_height: view.copy_height,
        row_step: view.row_step,
        copies,
        highlighted,
        winner,
        scroll_running: view.running,
    }
}

/// Participants in load order.
pub async fn participants(state: &SharedState) -> Vec<ParticipantSummary> {
    state
        .read_roster(|roster| roster.participants().iter().map(Into::into).collect())
        .await
}

/// Pending and awarded prizes.
pub async fn prizes(state: &SharedState) -> PrizeListResponse {
    state
        .read_roster(|roster| PrizeListResponse {
            pending: roster.pending_prizes().iter().map(Into::into).collect(),
            used: roster.used_prizes().iter().map(Into::into).collect(),
        })
        .await
}

/// Draw history, newest first.
pub async fn history(state: &SharedState) -> Result<Vec<HistoryEntryResponse>, ServiceError> {
    let entries = state.history().list().await?;
    Ok(entries.into_iter().map(Into::into).collect())
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::time::timeout;

    use super::*;
    use crate::{
        animation::{FrameScheduler, HeadlessListSurface, HeadlessWheelSurface, TokioFrameScheduler},
        audio::TimedAudioCue,
        config::{AppConfig, ConfigStore},
        dao::{history_store::MemoryHistoryStore, reservation_store::MemoryReservationStore},
        dto::{phase::VisibleDrawState, roster::DrawOutcome},
        input::KeyChord,
        services::{driver, orchestrator},
        state::SessionParts,
    };

    fn test_config(mode: OperationMode) -> AppConfig {
        let mut config = AppConfig::default();
        config.operation_mode = mode;
        config.history_path = None;
        config.spin_duration = Duration::from_secs(2);
        config.auto_interval = Duration::from_millis(500);
        config.celebration_duration = Duration::from_secs(1);
        config
    }

    fn session(config: AppConfig) -> SharedState {
        let frames: Arc<dyn FrameScheduler> =
            Arc::new(TokioFrameScheduler::new(config.frame_interval));
        driver::start_session(SessionParts {
            wheel_surface: Arc::new(HeadlessWheelSurface::new(config.wheel_diameter)),
            list_surface: Arc::new(HeadlessListSurface::new(config.list_geometry)),
            frames,
            audio: Arc::new(TimedAudioCue::default()),
            history: Arc::new(MemoryHistoryStore::new()),
            reservations: Arc::new(MemoryReservationStore::new()),
            config: ConfigStore::in_memory(config),
        })
    }

    fn names(prefix: &str, count: usize) -> Vec<String> {
        (1..=count).map(|i| format!("{prefix} {i}")).collect()
    }

    async fn load(state: &SharedState, prizes: usize, participants: usize) {
        load_data(
            state,
            LoadDataRequest {
                prizes: names("Prize", prizes),
                participants: names("Guest", participants),
            },
        )
        .await
        .unwrap();
    }

    async fn wait_for(state: &SharedState, target: DrawState) {
        timeout(Duration::from_secs(600), async {
            while state.state() != target {
                sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .unwrap_or_else(|_| panic!("session never reached {target}, stuck in {}", state.state()));
    }

    async fn settle() {
        sleep(Duration::from_millis(200)).await;
    }

    async fn spin_and_celebrate(state: &SharedState) -> (Uuid, Uuid) {
        settle().await;
        assert!(trigger_spin(state).accepted);
        wait_for(state, DrawState::Celebrating).await;
        state
            .read_roster(|roster| {
                let draw = roster.current().unwrap();
                (draw.prize.id, draw.winner.id)
            })
            .await
    }

    #[tokio::test(start_paused = true)]
    async fn full_auto_session_draws_every_prize_then_finishes() {
        let state = session(test_config(OperationMode::FullAuto));
        load(&state, 2, 5).await;

        wait_for(&state, DrawState::Finished).await;

        let (pending, used, eliminated) = state
            .read_roster(|roster| {
                (
                    roster.pending_prizes().len(),
                    roster.used_prizes().len(),
                    roster.participants().iter().filter(|p| p.eliminated).count(),
                )
            })
            .await;
        assert_eq!(pending, 0);
        assert_eq!(used, 2);
        assert_eq!(eliminated, 2);

        let history = history(&state).await.unwrap();
        assert_eq!(history.len(), 2);
        assert!(history.iter().all(|entry| matches!(entry.outcome, DrawOutcome::Won)));

        sleep(Duration::from_secs(10)).await;
        assert_eq!(state.state(), DrawState::Finished);
        assert!(!trigger_spin(&state).accepted);

        let response = reset(&state).await;
        assert_eq!(response.state, VisibleDrawState::Idle);
        assert!(!response.data_loaded);
        assert_eq!(response.pending_prizes, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn pending_queue_shrinks_by_one_per_draw() {
        let state = session(test_config(OperationMode::SemiAuto));
        load(&state, 3, 6).await;
        wait_for(&state, DrawState::Operating(OperatingMode::Manual)).await;

        for expected in (0..3).rev() {
            spin_and_celebrate(&state).await;
            let pending = state.read_roster(|roster| roster.pending_prizes().len()).await;
            assert_eq!(pending, expected);
            assert!(confirm_present(&state).await.accepted);
        }

        assert_eq!(state.state(), DrawState::Finished);
        assert_eq!(state.scroll().view().rows, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn valid_reservation_picks_the_reserved_winner() {
        let state = session(test_config(OperationMode::SemiAuto));
        load(&state, 2, 5).await;
        wait_for(&state, DrawState::Operating(OperatingMode::Manual)).await;

        let prize_id = prizes(&state).await.pending[0].id;
        let reserved = participants(&state).await[3].id;
        reserve(
            &state,
            prize_id,
            ReservationRequest {
                participant_id: reserved,
            },
        )
        .await
        .unwrap();

        let (drawn_prize, winner) = spin_and_celebrate(&state).await;
        assert_eq!(drawn_prize, prize_id);
        assert_eq!(winner, reserved);
        assert_eq!(state.reservations().get(prize_id).await.unwrap(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn reservation_for_an_eliminated_participant_falls_back_to_random() {
        let state = session(test_config(OperationMode::SemiAuto));
        load(&state, 2, 5).await;
        wait_for(&state, DrawState::Operating(OperatingMode::Manual)).await;

        let (_, first_winner) = spin_and_celebrate(&state).await;
        assert!(confirm_present(&state).await.accepted);

        let next_prize = prizes(&state).await.pending[0].id;
        let refused = reserve(
            &state,
            next_prize,
            ReservationRequest {
                participant_id: first_winner,
            },
        )
        .await;
        assert!(matches!(refused, Err(ServiceError::InvalidInput(_))));

        state
            .reservations()
            .reserve(next_prize, first_winner)
            .await
            .unwrap();
        let (_, second_winner) = spin_and_celebrate(&state).await;
        assert_ne!(second_winner, first_winner);
        assert_eq!(
            state.reservations().get(next_prize).await.unwrap(),
            Some(first_winner)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn absent_winner_stays_out_and_the_prize_is_drawn_again() {
        let state = session(test_config(OperationMode::SemiAuto));
        load(&state, 2, 4).await;
        wait_for(&state, DrawState::Operating(OperatingMode::Manual)).await;

        let (prize, absent) = spin_and_celebrate(&state).await;
        assert!(mark_absent(&state).await.accepted);
        assert_eq!(state.state(), DrawState::Operating(OperatingMode::Manual));

        let listing = prizes(&state).await;
        assert_eq!(listing.pending[0].id, prize);
        assert!(listing.used.is_empty());
        assert_eq!(state.scroll().view().rows, 3);
        let absent_participant = state
            .read_roster(|roster| roster.participant(absent).cloned())
            .await
            .unwrap();
        assert!(absent_participant.eliminated);

        let (redrawn, winner) = spin_and_celebrate(&state).await;
        assert_eq!(redrawn, prize);
        assert_ne!(winner, absent);

        let history = history(&state).await.unwrap();
        assert_eq!(history.len(), 3);
        assert!(matches!(history[0].outcome, DrawOutcome::Won));
        assert!(matches!(history[1].outcome, DrawOutcome::Absent));
        assert!(matches!(history[2].outcome, DrawOutcome::Won));
    }

    #[tokio::test(start_paused = true)]
    async fn frame_snapshot_reports_what_the_surfaces_drew() {
        let state = session(test_config(OperationMode::SemiAuto));
        load(&state, 1, 6).await;
        wait_for(&state, DrawState::Operating(OperatingMode::Manual)).await;

        let (_, winner) = spin_and_celebrate(&state).await;
        settle().await;

        let frame = frame_snapshot(&state);
        assert_eq!(frame.winner, Some(winner));
        assert!(!frame.wheel_running);
        assert!(!frame.scroll_running);
        assert_eq!(frame.wheel_angle, state.wheel().angle());
        assert!(frame.wheel_angle > 0.0);
        assert_eq!(frame.highlighted.len(), 5);
        let landed = frame.scroll_offset - frame.scroll_base_start;
        assert!((0.0..frame.copy_height).contains(&landed));
    }

    #[tokio::test(start_paused = true)]
    async fn second_request_during_a_draw_commits_nothing_more() {
        let state = session(test_config(OperationMode::SemiAuto));
        load(&state, 3, 5).await;
        wait_for(&state, DrawState::Operating(OperatingMode::Manual)).await;

        assert!(trigger_spin(&state).accepted);
        assert!(!trigger_spin(&state).accepted);
        sleep(Duration::from_millis(100)).await;
        tokio::spawn(orchestrator::run_draw(Arc::clone(&state)));

        wait_for(&state, DrawState::Celebrating).await;
        sleep(Duration::from_secs(5)).await;

        let used = state.read_roster(|roster| roster.used_prizes().len()).await;
        assert_eq!(used, 1);
        assert_eq!(history(&state).await.unwrap().len(), 1);
        assert_eq!(state.state(), DrawState::Celebrating);
    }

    #[tokio::test(start_paused = true)]
    async fn reset_mid_spin_lets_the_reloaded_auto_session_draw() {
        let state = session(test_config(OperationMode::FullAuto));
        load(&state, 3, 5).await;
        wait_for(&state, DrawState::Spinning).await;
        sleep(Duration::from_millis(300)).await;

        let response = reset(&state).await;
        assert_eq!(response.state, VisibleDrawState::Idle);
        assert!(!response.spin_in_flight);
        assert!(!state.is_spin_requested());

        load(&state, 3, 5).await;
        wait_for(&state, DrawState::Finished).await;

        let used = state.read_roster(|roster| roster.used_prizes().len()).await;
        assert_eq!(used, 3);
        let won = history(&state).await.unwrap();
        assert_eq!(won.len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn mode_changed_while_configuring_applies_on_close() {
        let state = session(test_config(OperationMode::SemiAuto));
        load(&state, 2, 4).await;
        wait_for(&state, DrawState::Operating(OperatingMode::Manual)).await;

        assert!(toggle_configuring(&state).accepted);
        update_config(
            &state,
            ConfigUpdateRequest {
                operation_mode: Some(OperationMode::FullAuto),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert!(toggle_configuring(&state).accepted);

        wait_for(&state, DrawState::Operating(OperatingMode::Auto)).await;
        assert_eq!(describe(&state).await.operating_mode, OperatingMode::Auto);
    }

    #[tokio::test(start_paused = true)]
    async fn data_loaded_while_configuring_is_used_on_close() {
        let state = session(test_config(OperationMode::SemiAuto));
        assert!(toggle_configuring(&state).accepted);
        load(&state, 1, 3).await;
        assert_eq!(state.state(), DrawState::Configuring);

        assert!(toggle_configuring(&state).accepted);
        wait_for(&state, DrawState::Operating(OperatingMode::Manual)).await;
        assert_eq!(describe(&state).await.eligible_participants, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn loading_twice_is_rejected() {
        let state = session(test_config(OperationMode::SemiAuto));
        load(&state, 1, 3).await;
        wait_for(&state, DrawState::Operating(OperatingMode::Manual)).await;

        let again = load_data(
            &state,
            LoadDataRequest {
                prizes: names("Prize", 1),
                participants: names("Guest", 2),
            },
        )
        .await;
        assert!(matches!(again, Err(ServiceError::InvalidState(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn shortcuts_pause_and_resume() {
        let state = session(test_config(OperationMode::SemiAuto));
        load(&state, 1, 3).await;
        wait_for(&state, DrawState::Operating(OperatingMode::Manual)).await;

        let pause = InputRequest {
            chord: KeyChord {
                code: "KeyP".into(),
                alt: true,
                ..Default::default()
            },
            typing: false,
        };
        let paused = handle_input(&state, pause);
        assert!(paused.accepted);
        assert_eq!(paused.state, VisibleDrawState::Paused);

        let resume = InputRequest {
            chord: KeyChord {
                code: "KeyP".into(),
                alt: true,
                ..Default::default()
            },
            typing: false,
        };
        let resumed = handle_input(&state, resume);
        assert!(resumed.accepted);
        assert_eq!(resumed.state, VisibleDrawState::OperatingManual);
    }

    #[tokio::test(start_paused = true)]
    async fn freezing_everyone_finishes_on_the_next_spin() {
        let state = session(test_config(OperationMode::SemiAuto));
        load(&state, 2, 2).await;
        wait_for(&state, DrawState::Operating(OperatingMode::Manual)).await;

        for participant in participants(&state).await {
            set_participant_frozen(&state, participant.id, true)
                .await
                .unwrap();
        }
        assert!(!describe(&state).await.prizes_available);

        assert!(trigger_spin(&state).accepted);
        wait_for(&state, DrawState::Finished).await;
        assert_eq!(state.read_roster(|roster| roster.used_prizes().len()).await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn unknown_ids_are_not_found() {
        let state = session(test_config(OperationMode::SemiAuto));
        load(&state, 1, 2).await;

        let frozen = set_prize_frozen(&state, Uuid::new_v4(), true).await;
        assert!(matches!(frozen, Err(ServiceError::NotFound(_))));
        let cleared = clear_reservation(&state, Uuid::new_v4()).await;
        assert!(matches!(cleared, Err(ServiceError::NotFound(_))));
    }
}
