use std::{
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use tokio::time::Instant;
use tracing::{debug, trace};

use crate::{
    animation::frame::{FrameScheduler, FrameToken},
    geometry::ease_out_cubic,
};

/// Shortest spin the wheel accepts.
pub const MIN_SPIN_DURATION: Duration = Duration::from_millis(50);

/// Where the wheel is drawn.
pub trait WheelSurface: Send + Sync {
    /// Current drawable size `(width, height)`. Zero means not laid out yet.
    fn size(&self) -> (f64, f64);

    /// Draw the wheel rotated by `angle` radians.
    fn draw(&self, angle: f64);

    /// Angle of the last frame drawn, for surfaces that keep it.
    fn last_angle(&self) -> Option<f64> {
        None
    }
}

#[derive(Debug, Default)]
struct WheelState {
    angle: f64,
    from: f64,
    to: f64,
    started_at: Option<Instant>,
    duration: Duration,
    running: bool,
    generation: u64,
    frame: Option<FrameToken>,
}

struct WheelShared {
    state: Mutex<WheelState>,
    surface: Arc<dyn WheelSurface>,
    frames: Arc<dyn FrameScheduler>,
}

impl WheelShared {
    fn lock(&self) -> MutexGuard<'_, WheelState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn draw_if_ready(&self, angle: f64) {
        let (width, height) = self.surface.size();
        if width <= 0.0 || height <= 0.0 {
            trace!("wheel surface has no size yet, skipping frame");
            return;
        }
        self.surface.draw(angle);
    }

    fn stop_locked(&self, state: &mut WheelState) {
        state.generation += 1;
        state.running = false;
        if let Some(token) = state.frame.take() {
            self.frames.cancel_frame(token);
        }
    }
}

/// Rotates the wheel towards a target angle with a cubic ease-out.
///
/// The angle is unbounded and only grows across spins.
#[derive(Clone)]
pub struct WheelAnimator {
    shared: Arc<WheelShared>,
}

impl WheelAnimator {
    /// Bind an animator to a surface and a frame source.
    pub fn new(surface: Arc<dyn WheelSurface>, frames: Arc<dyn FrameScheduler>) -> Self {
        Self {
            shared: Arc::new(WheelShared {
                state: Mutex::new(WheelState::default()),
                surface,
                frames,
            }),
        }
    }

    /// Current accumulated angle in radians.
    pub fn angle(&self) -> f64 {
        self.shared.lock().angle
    }

    /// Whether a spin is in flight.
    pub fn is_running(&self) -> bool {
        self.shared.lock().running
    }

    /// Generation of the latest run; bumps on every start and cancel.
    pub fn generation(&self) -> u64 {
        self.shared.lock().generation
    }

    /// Spin from the current angle to `target` over `duration`, superseding any run.
    pub fn start_spin(&self, target: f64, duration: Duration) {
        let mut state = self.shared.lock();
        self.shared.stop_locked(&mut state);

        state.from = state.angle;
        state.to = target;
        state.duration = duration.max(MIN_SPIN_DURATION);
        state.started_at = Some(self.shared.frames.now());
        state.running = true;

        let generation = state.generation;
        state.frame = Some(schedule_step(&self.shared, generation));
        debug!(
            from = state.from,
            to = target,
            duration_ms = state.duration.as_millis() as u64,
            "wheel spin started"
        );
    }

    /// Cancel any run and jump straight to `angle`.
    pub fn set_rotation(&self, angle: f64) {
        let mut state = self.shared.lock();
        self.shared.stop_locked(&mut state);
        state.angle = angle;
        drop(state);
        self.shared.draw_if_ready(angle);
    }

    /// Stop the current run where it is.
    pub fn cancel(&self) {
        let mut state = self.shared.lock();
        if state.running {
            debug!(angle = state.angle, "wheel spin cancelled");
        }
        self.shared.stop_locked(&mut state);
    }
}

fn schedule_step(shared: &Arc<WheelShared>, generation: u64) -> FrameToken {
    let next = Arc::clone(shared);
    shared
        .frames
        .schedule_frame(Box::new(move |now| step(&next, generation, now)))
}

fn step(shared: &Arc<WheelShared>, generation: u64, now: Instant) {
    let mut state = shared.lock();
    if state.generation != generation || !state.running {
        return;
    }
    let Some(started_at) = state.started_at else {
        return;
    };

    let elapsed = now.saturating_duration_since(started_at);
    let t = (elapsed.as_secs_f64() / state.duration.as_secs_f64()).clamp(0.0, 1.0);

    if t < 1.0 {
        state.angle = state.from + (state.to - state.from) * ease_out_cubic(t);
        state.frame = Some(schedule_step(shared, generation));
    } else {
        state.angle = state.to;
        state.running = false;
        state.frame = None;
        debug!(angle = state.angle, "wheel spin settled");
    }

    let angle = state.angle;
    drop(state);
    shared.draw_if_ready(angle);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::frame::ManualFrameScheduler;

    #[derive(Default)]
    struct RecordingSurface {
        size: Mutex<(f64, f64)>,
        draws: Mutex<Vec<f64>>,
    }

    impl RecordingSurface {
        fn sized(width: f64, height: f64) -> Arc<Self> {
            let surface = Self::default();
            *surface.size.lock().unwrap() = (width, height);
            Arc::new(surface)
        }
    }

    impl WheelSurface for RecordingSurface {
        fn size(&self) -> (f64, f64) {
            *self.size.lock().unwrap()
        }

        fn draw(&self, angle: f64) {
            self.draws.lock().unwrap().push(angle);
        }
    }

    const FRAME: Duration = Duration::from_millis(16);

    #[test]
    fn spin_follows_cubic_curve_and_snaps_to_target() {
        let frames = Arc::new(ManualFrameScheduler::new());
        let surface = RecordingSurface::sized(400.0, 400.0);
        let wheel = WheelAnimator::new(surface.clone(), frames.clone());

        wheel.start_spin(10.0, Duration::from_millis(1000));
        assert!(wheel.is_running());

        frames.advance(Duration::from_millis(500));
        assert!((wheel.angle() - 10.0 * 0.875).abs() < 1e-9);

        frames.run_until_idle(FRAME, 1000);
        assert!(!wheel.is_running());
        assert_eq!(wheel.angle(), 10.0);
        assert_eq!(surface.draws.lock().unwrap().last().copied(), Some(10.0));
    }

    #[test]
    fn zero_sized_surface_skips_draws_but_keeps_animating() {
        let frames = Arc::new(ManualFrameScheduler::new());
        let surface = RecordingSurface::sized(0.0, 0.0);
        let wheel = WheelAnimator::new(surface.clone(), frames.clone());

        wheel.start_spin(3.0, Duration::from_millis(200));
        frames.advance(FRAME);
        frames.advance(FRAME);
        assert!(surface.draws.lock().unwrap().is_empty());

        *surface.size.lock().unwrap() = (200.0, 200.0);
        frames.run_until_idle(FRAME, 100);
        assert_eq!(surface.draws.lock().unwrap().last().copied(), Some(3.0));
    }

    #[test]
    fn new_spin_supersedes_previous_and_starts_from_current_angle() {
        let frames = Arc::new(ManualFrameScheduler::new());
        let surface = RecordingSurface::sized(100.0, 100.0);
        let wheel = WheelAnimator::new(surface, frames.clone());

        wheel.start_spin(100.0, Duration::from_secs(1));
        frames.advance(Duration::from_millis(100));
        let midway = wheel.angle();
        let first_generation = wheel.generation();

        wheel.start_spin(midway + 5.0, Duration::from_secs(1));
        assert!(wheel.generation() > first_generation);
        assert_eq!(frames.pending_frames(), 1);

        frames.run_until_idle(FRAME, 1000);
        assert_eq!(wheel.angle(), midway + 5.0);
    }

    #[test]
    fn durations_are_floored() {
        let frames = Arc::new(ManualFrameScheduler::new());
        let wheel = WheelAnimator::new(RecordingSurface::sized(10.0, 10.0), frames.clone());

        wheel.start_spin(1.0, Duration::ZERO);
        frames.advance(Duration::from_millis(25));
        assert!(wheel.is_running());
        frames.advance(Duration::from_millis(25));
        assert!(!wheel.is_running());
        assert_eq!(wheel.angle(), 1.0);
    }

    #[test]
    fn set_rotation_cancels_and_jumps() {
        let frames = Arc::new(ManualFrameScheduler::new());
        let surface = RecordingSurface::sized(10.0, 10.0);
        let wheel = WheelAnimator::new(surface.clone(), frames.clone());

        wheel.start_spin(50.0, Duration::from_secs(1));
        wheel.set_rotation(2.5);

        assert!(!wheel.is_running());
        assert_eq!(frames.pending_frames(), 0);
        assert_eq!(wheel.angle(), 2.5);
        assert_eq!(*surface.draws.lock().unwrap(), vec![2.5]);
    }
}
