use std::{fmt, sync::Arc, time::Instant};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};
use utoipa::ToSchema;
use uuid::Uuid;

/// How the operating state triggers spins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum OperatingMode {
    /// A countdown triggers each spin.
    Auto,
    /// Spins are triggered explicitly by the operator.
    Manual,
}

impl OperatingMode {
    /// The other mode.
    pub fn other(self) -> Self {
        match self {
            Self::Auto => Self::Manual,
            Self::Manual => Self::Auto,
        }
    }
}

/// States the draw can be in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DrawState {
    /// Nothing loaded yet.
    Idle,
    /// Participants and prizes were loaded; waiting for a mode.
    DataLoaded,
    /// Waiting for the next spin.
    Operating(OperatingMode),
    /// A draw is in flight.
    Spinning,
    /// The winner is being presented.
    Celebrating,
    /// Operator paused the session.
    Paused,
    /// Operator is editing the configuration.
    Configuring,
    /// Every prize was drawn (or nobody is left). Terminal until reset.
    Finished,
}

impl DrawState {
    /// Every state, in table order.
    pub const ALL: [DrawState; 9] = [
        DrawState::Idle,
        DrawState::DataLoaded,
        DrawState::Operating(OperatingMode::Auto),
        DrawState::Operating(OperatingMode::Manual),
        DrawState::Spinning,
        DrawState::Celebrating,
        DrawState::Paused,
        DrawState::Configuring,
        DrawState::Finished,
    ];
}

impl fmt::Display for DrawState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => f.write_str("idle"),
            Self::DataLoaded => f.write_str("data_loaded"),
            Self::Operating(OperatingMode::Auto) => f.write_str("operating(auto)"),
            Self::Operating(OperatingMode::Manual) => f.write_str("operating(manual)"),
            Self::Spinning => f.write_str("spinning"),
            Self::Celebrating => f.write_str("celebrating"),
            Self::Paused => f.write_str("paused"),
            Self::Configuring => f.write_str("configuring"),
            Self::Finished => f.write_str("finished"),
        }
    }
}

/// Flags set from outside the machine and read by guarded transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GuardFlags {
    /// Participants and prizes are loaded.
    pub data_loaded: bool,
    /// At least one prize can still be drawn for someone.
    pub prizes_available: bool,
    /// The countdown (or an explicit trigger) asked for a spin.
    pub countdown_expired: bool,
    /// The last draw committed its result.
    pub spin_completed: bool,
    /// Mode to return to after spinning or celebrating.
    pub operating_mode: OperatingMode,
}

impl Default for GuardFlags {
    fn default() -> Self {
        Self {
            data_loaded: false,
            prizes_available: true,
            countdown_expired: false,
            spin_completed: false,
            operating_mode: OperatingMode::Manual,
        }
    }
}

/// Rule attached to a table entry.
#[derive(Clone, Copy)]
enum Rule {
    Always,
    When(fn(&GuardFlags) -> bool),
}

impl Rule {
    fn allows(self, flags: &GuardFlags) -> bool {
        match self {
            Rule::Always => true,
            Rule::When(predicate) => predicate(flags),
        }
    }
}

fn rule_for(from: DrawState, to: DrawState) -> Option<Rule> {
    use DrawState::*;

    let rule = match (from, to) {
        (Idle, DataLoaded | Configuring) => Rule::Always,
        (DataLoaded, Operating(_) | Configuring) => Rule::Always,
        (Operating(_), Spinning) => Rule::When(|flags| flags.countdown_expired),
        (Operating(current), Operating(next)) if current != next => Rule::Always,
        (Operating(_), Paused | Configuring) => Rule::Always,
        (Operating(_), Finished) => Rule::When(|flags| !flags.prizes_available),
        (Spinning, Celebrating) => Rule::When(|flags| flags.spin_completed),
        (Spinning, Finished) => Rule::When(|flags| !flags.prizes_available),
        (Spinning, Operating(OperatingMode::Auto)) => {
            Rule::When(|flags| flags.operating_mode == OperatingMode::Auto)
        }
        (Spinning, Operating(OperatingMode::Manual)) => {
            Rule::When(|flags| flags.operating_mode == OperatingMode::Manual)
        }
        (Celebrating, Operating(OperatingMode::Auto)) => {
            Rule::When(|flags| flags.operating_mode == OperatingMode::Auto)
        }
        (Celebrating, Operating(OperatingMode::Manual)) => {
            Rule::When(|flags| flags.operating_mode == OperatingMode::Manual)
        }
        (Celebrating, Finished) => Rule::When(|flags| !flags.prizes_available),
        (Paused, Operating(_) | Configuring) => Rule::Always,
        (Configuring, Idle) => Rule::Always,
        (Configuring, DataLoaded | Operating(_)) => Rule::When(|flags| flags.data_loaded),
        (Finished, Idle | Configuring) => Rule::Always,
        _ => return None,
    };

    Some(rule)
}

/// Failure reported by an enter or exit effect.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct EffectError {
    /// Human readable reason.
    pub message: String,
}

impl EffectError {
    /// Build an effect error from any message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Side effects attached to states.
///
/// Hooks run while the machine is mid-transition: they must not call back into the
/// machine. Anything that wants another transition has to queue it.
pub trait StateHooks: Send + Sync {
    /// Runs after `state` became current.
    fn on_enter(&self, _state: DrawState, _flags: &mut GuardFlags) -> Result<(), EffectError> {
        Ok(())
    }

    /// Runs before `state` stops being current.
    fn on_exit(&self, _state: DrawState, _flags: &mut GuardFlags) -> Result<(), EffectError> {
        Ok(())
    }

    /// Runs once per committed transition, and on reset.
    fn on_state_changed(&self, _from: DrawState, _to: DrawState) {}
}

/// Hooks that do nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopHooks;

impl StateHooks for NoopHooks {}

/// Error returned when the target is not reachable from the current state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("invalid transition: {to} is not reachable from {from}")]
pub struct InvalidTransition {
    /// State the machine was in.
    pub from: DrawState,
    /// Requested target.
    pub to: DrawState,
}

/// Errors that can occur when planning a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PlanError {
    /// A transition is already pending and must be applied or aborted.
    #[error("a transition is already in progress")]
    AlreadyPending,
    /// The target is not in the current state's table.
    #[error(transparent)]
    InvalidTransition(InvalidTransition),
    /// The table entry exists but its guard rejected the current flags.
    #[error("guard rejected transition from {from} to {to}")]
    GuardRejected {
        /// State the machine was in.
        from: DrawState,
        /// Requested target.
        to: DrawState,
    },
}

/// Errors that can occur when applying a planned transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ApplyError {
    /// No transition is currently pending.
    #[error("no transition is pending")]
    NoPending,
    /// Plan ID does not match the pending plan.
    #[error("plan {got} does not match pending plan {expected}")]
    IdMismatch {
        /// Expected plan ID.
        expected: PlanId,
        /// Provided plan ID.
        got: PlanId,
    },
    /// State changed since the plan was created.
    #[error("state moved from {expected} to {actual} since planning")]
    StateMismatch {
        /// State when the plan was created.
        expected: DrawState,
        /// Current state.
        actual: DrawState,
    },
    /// Version changed since the plan was created.
    #[error("version moved from {expected} to {actual} since planning")]
    VersionMismatch {
        /// Version the plan expected to produce.
        expected: usize,
        /// Version applying now would produce.
        actual: usize,
    },
}

/// Errors that can occur when aborting a planned transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AbortError {
    /// No transition is currently pending.
    #[error("no transition is pending")]
    NoPending,
    /// Plan ID does not match the pending plan.
    #[error("plan {got} does not match pending plan {expected}")]
    IdMismatch {
        /// Expected plan ID.
        expected: PlanId,
        /// Provided plan ID.
        got: PlanId,
    },
}

/// Unique identifier for a planned state transition.
pub type PlanId = Uuid;

/// A validated transition that has not been applied yet.
#[derive(Debug, Clone)]
pub struct Plan {
    /// Unique identifier for this plan.
    pub id: PlanId,
    /// State the machine is currently in.
    pub from: DrawState,
    /// State the machine will move to.
    pub to: DrawState,
    /// Version number after applying this transition.
    pub version_next: usize,
    /// Timestamp when this plan was created.
    pub pending_since: Instant,
}

/// Outcome of an applied transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transitioned {
    /// Previous state.
    pub from: DrawState,
    /// New current state.
    pub to: DrawState,
    /// Effect failures; the state was committed regardless.
    pub effect_errors: Vec<EffectError>,
}

/// Snapshot of the current state machine state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Snapshot {
    /// Current state.
    pub state: DrawState,
    /// Increments on each committed transition.
    pub version: usize,
    /// Target of a planned but not yet applied transition.
    pub pending: Option<DrawState>,
    /// Guard flags at snapshot time.
    pub flags: GuardFlags,
}

/// Guarded, non-reentrant state machine driving the draw session.
pub struct DrawStateMachine {
    state: DrawState,
    version: usize,
    pending: Option<Plan>,
    flags: GuardFlags,
    hooks: Arc<dyn StateHooks>,
}

impl fmt::Debug for DrawStateMachine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DrawStateMachine")
            .field("state", &self.state)
            .field("version", &self.version)
            .field("pending", &self.pending)
            .field("flags", &self.flags)
            .finish_non_exhaustive()
    }
}

impl Default for DrawStateMachine {
    fn default() -> Self {
        Self::new(Arc::new(NoopHooks))
    }
}

impl DrawStateMachine {
    /// Create a machine in `idle` with the given effects.
    pub fn new(hooks: Arc<dyn StateHooks>) -> Self {
        Self {
            state: DrawState::Idle,
            version: 0,
            pending: None,
            flags: GuardFlags::default(),
            hooks,
        }
    }

    /// Inspect the current state.
    pub fn state(&self) -> DrawState {
        self.state
    }

    /// Current guard flags.
    pub fn flags(&self) -> GuardFlags {
        self.flags
    }

    /// Mutable access to the guard flags.
    pub fn flags_mut(&mut self) -> &mut GuardFlags {
        &mut self.flags
    }

    /// True while a plan is waiting to be applied or aborted.
    pub fn is_transitioning(&self) -> bool {
        self.pending.is_some()
    }

    /// Create a snapshot of the current state machine state.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            state: self.state,
            version: self.version,
            pending: self.pending.as_ref().map(|plan| plan.to),
            flags: self.flags,
        }
    }

    /// Validate `to` against the table and the guard flags, and reserve it.
    pub fn plan(&mut self, to: DrawState) -> Result<Plan, PlanError> {
        if self.pending.is_some() {
            return Err(PlanError::AlreadyPending);
        }

        let from = self.state;
        let rule = rule_for(from, to)
            .ok_or(PlanError::InvalidTransition(InvalidTransition { from, to }))?;
        if !rule.allows(&self.flags) {
            return Err(PlanError::GuardRejected { from, to });
        }

        let plan = Plan {
            id: Uuid::new_v4(),
            from,
            to,
            version_next: self.version + 1,
            pending_since: Instant::now(),
        };

        self.pending = Some(plan.clone());

        Ok(plan)
    }

    /// Apply a planned transition: exit effect, commit, enter effect, notify.
    ///
    /// Effect failures are collected and logged; the new state is committed anyway.
    pub fn apply(&mut self, plan_id: PlanId) -> Result<Transitioned, ApplyError> {
        let plan = self.pending.as_ref().ok_or(ApplyError::NoPending)?;

        if plan.id != plan_id {
            return Err(ApplyError::IdMismatch {
                expected: plan.id,
                got: plan_id,
            });
        }

        if self.state != plan.from {
            let expected = plan.from;
            self.pending = None;
            return Err(ApplyError::StateMismatch {
                expected,
                actual: self.state,
            });
        }

        if self.version + 1 != plan.version_next {
            let expected = plan.version_next;
            self.pending = None;
            return Err(ApplyError::VersionMismatch {
                expected,
                actual: self.version + 1,
            });
        }

        // pending stays set while effects run so nested requests are rejected
        let (from, to, version_next) = (plan.from, plan.to, plan.version_next);
        let mut effect_errors = Vec::new();

        if let Err(err) = self.hooks.on_exit(from, &mut self.flags) {
            warn!(state = %from, error = %err, "exit effect failed");
            effect_errors.push(err);
        }

        self.state = to;
        self.version = version_next;

        if let Err(err) = self.hooks.on_enter(to, &mut self.flags) {
            warn!(state = %to, error = %err, "enter effect failed");
            effect_errors.push(err);
        }

        self.hooks.on_state_changed(from, to);
        self.pending = None;

        Ok(Transitioned {
            from,
            to,
            effect_errors,
        })
    }

    /// Abort a planned transition without applying it.
    pub fn abort(&mut self, plan_id: PlanId) -> Result<(), AbortError> {
        let plan = self.pending.as_ref().ok_or(AbortError::NoPending)?;

        if plan.id != plan_id {
            return Err(AbortError::IdMismatch {
                expected: plan.id,
                got: plan_id,
            });
        }

        self.pending = None;
        Ok(())
    }

    /// Plan and apply in one step. Rejections are routine: they return `false`.
    pub fn transition(&mut self, to: DrawState) -> bool {
        let plan = match self.plan(to) {
            Ok(plan) => plan,
            Err(PlanError::AlreadyPending) => {
                warn!(target_state = %to, "transition rejected: another transition is in progress");
                return false;
            }
            Err(err) => {
                debug!(error = %err, "transition rejected");
                return false;
            }
        };

        match self.apply(plan.id) {
            Ok(transitioned) => {
                debug!(from = %transitioned.from, to = %transitioned.to, "state changed");
                true
            }
            Err(err) => {
                warn!(error = %err, "failed to apply planned transition");
                false
            }
        }
    }

    /// Whether `to` is reachable right now with the current flags.
    pub fn can_transition_to(&self, to: DrawState) -> bool {
        self.pending.is_none()
            && rule_for(self.state, to).is_some_and(|rule| rule.allows(&self.flags))
    }

    /// Every state reachable right now with the current flags.
    pub fn available_transitions(&self) -> Vec<DrawState> {
        DrawState::ALL
            .into_iter()
            .filter(|target| self.can_transition_to(*target))
            .collect()
    }

    /// Return to `idle` with default flags, dropping any pending plan.
    pub fn reset(&mut self) {
        let from = self.state;
        self.state = DrawState::Idle;
        self.version += 1;
        self.pending = None;
        self.flags = GuardFlags::default();
        if from != DrawState::Idle {
            self.hooks.on_state_changed(from, DrawState::Idle);
        }
    }
}
