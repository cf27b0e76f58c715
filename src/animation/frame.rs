use std::{
    sync::{
        Arc, Mutex, MutexGuard, PoisonError,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use dashmap::DashMap;
use tokio::{
    sync::oneshot,
    task::AbortHandle,
    time::Instant,
};

/// Callback invoked once with the frame timestamp.
pub type FrameCallback = Box<dyn FnOnce(Instant) + Send + 'static>;

/// Handle returned by [`FrameScheduler::schedule_frame`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameToken(u64);

/// Source of animation frames and of the clock they are stamped with.
pub trait FrameScheduler: Send + Sync + 'static {
    /// Current time on the scheduler's clock.
    fn now(&self) -> Instant;

    /// Run `callback` once on the next frame.
    fn schedule_frame(&self, callback: FrameCallback) -> FrameToken;

    /// Drop a scheduled callback. Unknown or already-run tokens are ignored.
    fn cancel_frame(&self, token: FrameToken);
}

/// Default frame spacing (~60 Hz).
pub const DEFAULT_FRAME_INTERVAL: Duration = Duration::from_millis(16);

/// Frame scheduler backed by Tokio timers.
///
/// Uses `tokio::time`, so a paused test clock drives it deterministically.
pub struct TokioFrameScheduler {
    interval: Duration,
    next_token: AtomicU64,
    pending: Arc<DashMap<u64, AbortHandle>>,
}

impl TokioFrameScheduler {
    /// Build a scheduler ticking every `interval` (floored at 1 ms).
    pub fn new(interval: Duration) -> Self {
        Self {
            interval: interval.max(Duration::from_millis(1)),
            next_token: AtomicU64::new(1),
            pending: Arc::new(DashMap::new()),
        }
    }

    /// Number of frames scheduled but not yet run.
    pub fn pending_frames(&self) -> usize {
        self.pending.len()
    }
}

impl Default for TokioFrameScheduler {
    fn default() -> Self {
        Self::new(DEFAULT_FRAME_INTERVAL)
    }
}

impl FrameScheduler for TokioFrameScheduler {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn schedule_frame(&self, callback: FrameCallback) -> FrameToken {
        let id = self.next_token.fetch_add(1, Ordering::Relaxed);
        let interval = self.interval;
        let pending = Arc::clone(&self.pending);

        // the task waits until its abort handle is registered
        let (registered, gate) = oneshot::channel::<()>();
        let handle = tokio::spawn(async move {
            if gate.await.is_err() {
                return;
            }
            tokio::time::sleep(interval).await;
            pending.remove(&id);
            callback(Instant::now());
        });

        self.pending.insert(id, handle.abort_handle());
        let _ = registered.send(());

        FrameToken(id)
    }

    fn cancel_frame(&self, token: FrameToken) {
        if let Some((_, handle)) = self.pending.remove(&token.0) {
            handle.abort();
        }
    }
}

struct ManualState {
    elapsed: Duration,
    next_token: u64,
    queue: Vec<(u64, FrameCallback)>,
}

/// Frame scheduler whose clock only moves when [`ManualFrameScheduler::advance`] is called.
pub struct ManualFrameScheduler {
    origin: Instant,
    state: Mutex<ManualState>,
}

impl Default for ManualFrameScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl ManualFrameScheduler {
    /// Create a scheduler with its clock at zero.
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            state: Mutex::new(ManualState {
                elapsed: Duration::ZERO,
                next_token: 1,
                queue: Vec::new(),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, ManualState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Move the clock forward by `by` and run every callback queued before the call.
    ///
    /// Callbacks scheduled while running land on the next frame. Returns how many ran.
    pub fn advance(&self, by: Duration) -> usize {
        let (now, due) = {
            let mut state = self.lock();
            state.elapsed += by;
            (self.origin + state.elapsed, std::mem::take(&mut state.queue))
        };

        let count = due.len();
        for (_, callback) in due {
            callback(now);
        }
        count
    }

    /// Advance frame by frame until nothing is queued or `max_frames` ran.
    pub fn run_until_idle(&self, frame: Duration, max_frames: usize) -> usize {
        let mut frames = 0;
        while frames < max_frames && self.pending_frames() > 0 {
            self.advance(frame);
            frames += 1;
        }
        frames
    }

    /// Number of callbacks waiting for the next frame.
    pub fn pending_frames(&self) -> usize {
        self.lock().queue.len()
    }
}

impl FrameScheduler for ManualFrameScheduler {
    fn now(&self) -> Instant {
        self.origin + self.lock().elapsed
    }

    fn schedule_frame(&self, callback: FrameCallback) -> FrameToken {
        let mut state = self.lock();
        let id = state.next_token;
        state.next_token += 1;
        state.queue.push((id, callback));
        FrameToken(id)
    }

    fn cancel_frame(&self, token: FrameToken) {
        self.lock().queue.retain(|(id, _)| *id != token.0);
    }
}
