pub mod events;
pub mod roster;
pub mod state_machine;

use std::{
    sync::{
        Arc, Mutex as StdMutex, MutexGuard, PoisonError,
        atomic::{AtomicBool, AtomicU64, Ordering},
    },
    time::Duration,
};

use tokio::{
    sync::{Mutex, RwLock, mpsc},
    task::JoinHandle,
    time::timeout,
};
use tracing::{debug, warn};

use crate::{
    animation::{FrameScheduler, ListScroller, ScrollSurface, WheelAnimator, WheelSurface},
    audio::AudioCue,
    config::ConfigStore,
    dao::{history_store::HistoryStore, reservation_store::ReservationStore},
    dto::events::DrawEvent,
    error::ServiceError,
    input::InputRouter,
};

pub use self::events::EventHub;
pub use self::state_machine::{AbortError, ApplyError, Plan, PlanError, PlanId, Snapshot};
use self::{
    roster::Roster,
    state_machine::{DrawState, DrawStateMachine, EffectError, GuardFlags, OperatingMode, StateHooks},
};

pub type SharedState = Arc<DrawSession>;
pub const DEFAULT_TRANSITION_TIMEOUT: Duration = Duration::from_secs(5);
const EVENT_CAPACITY: usize = 64;

/// Work queued by state effects and timers, processed one at a time by the session driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionCommand {
    /// Request a transition outside of the effect that asked for it.
    Transition(DrawState),
    /// Run the draw for the `spinning` state.
    RunDraw,
    /// Start the auto-mode countdown.
    ArmCountdown,
    /// Stop the auto-mode countdown.
    DisarmCountdown,
    /// Announce the current draw and schedule its end if the celebration closes by itself.
    CelebrationStarted,
}

/// Collaborators a session is built from.
pub struct SessionParts {
    pub config: ConfigStore,
    pub wheel_surface: Arc<dyn WheelSurface>,
    pub list_surface: Arc<dyn ScrollSurface>,
    pub frames: Arc<dyn FrameScheduler>,
    pub audio: Arc<dyn AudioCue>,
    pub history: Arc<dyn HistoryStore>,
    pub reservations: Arc<dyn ReservationStore>,
}

/// Effects attached to draw states: they only emit events and queue commands.
struct SessionHooks {
    events: EventHub,
    commands: mpsc::UnboundedSender<SessionCommand>,
}

impl SessionHooks {
    fn queue(&self, command: SessionCommand) -> Result<(), EffectError> {
        self.commands
            .send(command)
            .map_err(|_| EffectError::new(format!("session driver stopped; dropped {command:?}")))
    }
}

impl StateHooks for SessionHooks {
    fn on_enter(&self, state: DrawState, flags: &mut GuardFlags) -> Result<(), EffectError> {
        match state {
            DrawState::DataLoaded => {
                self.queue(SessionCommand::Transition(DrawState::Operating(flags.operating_mode)))
            }
            DrawState::Operating(mode) => {
                flags.operating_mode = mode;
                flags.spin_completed = false;
                if !flags.prizes_available {
                    return self.queue(SessionCommand::Transition(DrawState::Finished));
                }
                if mode == OperatingMode::Auto {
                    self.queue(SessionCommand::ArmCountdown)?;
                }
                Ok(())
            }
            DrawState::Spinning => {
                flags.countdown_expired = false;
                self.events.emit(DrawEvent::SpinRequested);
                self.queue(SessionCommand::RunDraw)
            }
            DrawState::Celebrating => self.queue(SessionCommand::CelebrationStarted),
            DrawState::Finished => {
                self.events.emit(DrawEvent::notice(
                    "the draw is over: no prize or eligible participant left",
                ));
                Ok(())
            }
            DrawState::Idle | DrawState::Paused | DrawState::Configuring => Ok(()),
        }
    }

    fn on_exit(&self, state: DrawState, _flags: &mut GuardFlags) -> Result<(), EffectError> {
        match state {
            DrawState::Operating(OperatingMode::Auto) => self.queue(SessionCommand::DisarmCountdown),
            _ => Ok(()),
        }
    }

    fn on_state_changed(&self, from: DrawState, to: DrawState) {
        self.events.emit(DrawEvent::StateChanged {
            from: from.into(),
            to: to.into(),
        });
    }
}

#[derive(Default)]
struct SessionTimers {
    countdown: Option<JoinHandle<()>>,
    celebration: Option<JoinHandle<()>>,
    draw: Option<JoinHandle<()>>,
}

/// Why a draw could not take the slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawBusy {
    /// Another draw holds the slot.
    InFlight,
    /// The wheel or the list is still animating.
    Animating,
}

/// Keeps the draw slot taken; releasing it also clears the pending spin request.
///
/// A guard outlived by [`DrawSession::invalidate_draw`] releases nothing: the slot already
/// belongs to the next draw.
pub struct DrawGuard<'a> {
    session: &'a DrawSession,
    epoch: u64,
}

impl DrawGuard<'_> {
    /// Whether the session was not reset since the guard was taken.
    pub fn is_current(&self) -> bool {
        self.session.draw_epoch.load(Ordering::SeqCst) == self.epoch
    }
}

impl Drop for DrawGuard<'_> {
    fn drop(&mut self) {
        if !self.is_current() {
            return;
        }
        self.session.spin_guard.store(false, Ordering::SeqCst);
        self.session.spin_requested.store(false, Ordering::SeqCst);
    }
}

/// Central state of one raffle session.
pub struct DrawSession {
    config: ConfigStore,
    machine: StdMutex<DrawStateMachine>,
    roster: RwLock<Roster>,
    events: EventHub,
    wheel: WheelAnimator,
    scroll: ListScroller,
    wheel_surface: Arc<dyn WheelSurface>,
    list_surface: Arc<dyn ScrollSurface>,
    audio: Arc<dyn AudioCue>,
    history: Arc<dyn HistoryStore>,
    reservations: Arc<dyn ReservationStore>,
    input: InputRouter,
    spin_guard: AtomicBool,
    spin_requested: AtomicBool,
    draw_epoch: AtomicU64,
    timers: StdMutex<SessionTimers>,
    commands: mpsc::UnboundedSender<SessionCommand>,
    transition_gate: Mutex<()>,
    transition_timeout: Option<Duration>,
}

impl DrawSession {
    /// Build a session and the command queue its driver has to consume.
    pub fn new(parts: SessionParts) -> (SharedState, mpsc::UnboundedReceiver<SessionCommand>) {
        let (commands, receiver) = mpsc::unbounded_channel();
        let events = EventHub::new(EVENT_CAPACITY);
        let hooks = SessionHooks {
            events: events.clone(),
            commands: commands.clone(),
        };

        let session = Arc::new(Self {
            config: parts.config,
            machine: StdMutex::new(DrawStateMachine::new(Arc::new(hooks))),
            roster: RwLock::new(Roster::default()),
            events,
            wheel: WheelAnimator::new(Arc::clone(&parts.wheel_surface), Arc::clone(&parts.frames)),
            scroll: ListScroller::new(Arc::clone(&parts.list_surface), parts.frames),
            wheel_surface: parts.wheel_surface,
            list_surface: parts.list_surface,
            audio: parts.audio,
            history: parts.history,
            reservations: parts.reservations,
            input: InputRouter::new(),
            spin_guard: AtomicBool::new(false),
            spin_requested: AtomicBool::new(false),
            draw_epoch: AtomicU64::new(0),
            timers: StdMutex::new(SessionTimers::default()),
            commands,
            transition_gate: Mutex::new(()),
            transition_timeout: Some(DEFAULT_TRANSITION_TIMEOUT),
        });

        (session, receiver)
    }

    /// Live configuration.
    pub fn config(&self) -> &ConfigStore {
        &self.config
    }

    /// Lifecycle event hub.
    pub fn events(&self) -> &EventHub {
        &self.events
    }

    /// Wheel animator.
    pub fn wheel(&self) -> &WheelAnimator {
        &self.wheel
    }

    /// Looping list animator.
    pub fn scroll(&self) -> &ListScroller {
        &self.scroll
    }

    /// Surface the wheel is drawn on.
    pub fn wheel_surface(&self) -> &Arc<dyn WheelSurface> {
        &self.wheel_surface
    }

    /// Surface the list is rendered on.
    pub fn list_surface(&self) -> &Arc<dyn ScrollSurface> {
        &self.list_surface
    }

    /// Audio cues.
    pub fn audio(&self) -> &Arc<dyn AudioCue> {
        &self.audio
    }

    /// Draw history store.
    pub fn history(&self) -> &Arc<dyn HistoryStore> {
        &self.history
    }

    /// Reservation store.
    pub fn reservations(&self) -> &Arc<dyn ReservationStore> {
        &self.reservations
    }

    /// Keyboard shortcut router.
    pub fn input(&self) -> &InputRouter {
        &self.input
    }

    fn machine(&self) -> MutexGuard<'_, DrawStateMachine> {
        self.machine.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn timers(&self) -> MutexGuard<'_, SessionTimers> {
        self.timers.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Current draw state.
    pub fn state(&self) -> DrawState {
        self.machine().state()
    }

    /// Snapshot of the state machine.
    pub fn snapshot(&self) -> Snapshot {
        self.machine().snapshot()
    }

    /// Run `f` against the state machine.
    pub fn with_machine<R>(&self, f: impl FnOnce(&mut DrawStateMachine) -> R) -> R {
        f(&mut self.machine())
    }

    /// Request a transition. Rejections are routine and return `false`.
    pub fn transition(&self, to: DrawState) -> bool {
        self.machine().transition(to)
    }

    /// Plan `to`, run `work`, then apply on success or abort on failure or timeout.
    ///
    /// While `work` runs the plan stays pending, so every other transition is rejected.
    pub async fn run_transition<F, Fut, T>(
        &self,
        to: DrawState,
        work: F,
    ) -> Result<(T, DrawState), ServiceError>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<T, ServiceError>>,
    {
        let gate = self.transition_gate.lock().await;
        let Plan { id: plan_id, .. } = self.machine().plan(to)?;

        let work_future = work();
        let outcome = if let Some(limit) = self.transition_timeout {
            match timeout(limit, work_future).await {
                Ok(result) => result,
                Err(_) => {
                    self.abort_planned(plan_id, to, "timeout");
                    drop(gate);
                    return Err(ServiceError::Timeout);
                }
            }
        } else {
            work_future.await
        };

        match outcome {
            Ok(value) => {
                let transitioned = self.machine().apply(plan_id)?;
                drop(gate);
                Ok((value, transitioned.to))
            }
            Err(err) => {
                self.abort_planned(plan_id, to, "work error");
                drop(gate);
                Err(err)
            }
        }
    }

    fn abort_planned(&self, plan_id: PlanId, to: DrawState, reason: &str) {
        if let Err(abort_err) = self.machine().abort(plan_id) {
            warn!(
                target_state = %to,
                plan_id = %plan_id,
                error = ?abort_err,
                reason,
                "failed to abort transition"
            );
        }
    }

    /// Read the roster.
    pub async fn read_roster<R>(&self, f: impl FnOnce(&Roster) -> R) -> R {
        let roster = self.roster.read().await;
        f(&roster)
    }

    /// Mutate the roster.
    pub async fn with_roster_mut<R>(&self, f: impl FnOnce(&mut Roster) -> R) -> R {
        let mut roster = self.roster.write().await;
        f(&mut roster)
    }

    /// Mark a spin as requested. Returns `false` when one already was.
    pub fn request_spin(&self) -> bool {
        !self.spin_requested.swap(true, Ordering::SeqCst)
    }

    /// Forget a spin request that did not lead to `spinning`.
    pub fn withdraw_spin_request(&self) {
        self.spin_requested.store(false, Ordering::SeqCst);
    }

    /// Whether a spin was requested and not yet finished.
    pub fn is_spin_requested(&self) -> bool {
        self.spin_requested.load(Ordering::SeqCst)
    }

    /// Take the draw slot, unless a draw or an animation is already running.
    pub fn try_acquire_draw(&self) -> Result<DrawGuard<'_>, DrawBusy> {
        let epoch = self.draw_epoch.load(Ordering::SeqCst);
        if self
            .spin_guard
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(DrawBusy::InFlight);
        }
        let guard = DrawGuard {
            session: self,
            epoch,
        };
        if self.wheel.is_running() || self.scroll.is_running() {
            return Err(DrawBusy::Animating);
        }
        Ok(guard)
    }

    /// Abort the running draw task and free the draw slot for the next session.
    ///
    /// Guards taken before the call stop touching the slot.
    pub fn invalidate_draw(&self) {
        self.draw_epoch.fetch_add(1, Ordering::SeqCst);
        if let Some(handle) = self.timers().draw.take() {
            handle.abort();
        }
        self.spin_guard.store(false, Ordering::SeqCst);
        self.spin_requested.store(false, Ordering::SeqCst);
        debug!("in-flight draw invalidated");
    }

    /// Remember the task running the current draw so a reset can abort it.
    pub fn set_draw_task(&self, handle: JoinHandle<()>) {
        self.timers().draw = Some(handle);
    }

    /// Whether a draw holds the slot.
    pub fn is_draw_in_flight(&self) -> bool {
        self.spin_guard.load(Ordering::SeqCst)
    }

    /// Queue work for the session driver.
    pub fn send(&self, command: SessionCommand) {
        if self.commands.send(command).is_err() {
            warn!(?command, "session driver stopped; command dropped");
        }
    }

    /// Replace the countdown timer, aborting the previous one.
    pub fn set_countdown(&self, handle: JoinHandle<()>) {
        if let Some(previous) = self.timers().countdown.replace(handle) {
            previous.abort();
        }
    }

    /// Abort the countdown timer, if any.
    pub fn disarm_countdown(&self) {
        if let Some(handle) = self.timers().countdown.take() {
            debug!("countdown disarmed");
            handle.abort();
        }
    }

    /// Replace the celebration timer, aborting the previous one.
    pub fn set_celebration_timer(&self, handle: JoinHandle<()>) {
        if let Some(previous) = self.timers().celebration.replace(handle) {
            previous.abort();
        }
    }

    /// Abort the celebration timer, if any.
    pub fn cancel_celebration_timer(&self) {
        if let Some(handle) = self.timers().celebration.take() {
            handle.abort();
        }
    }
}
