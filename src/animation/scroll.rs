use std::{
    ops::Range,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use thiserror::Error;
use tokio::{sync::oneshot, time::Instant};
use tracing::{debug, trace, warn};
use uuid::Uuid;

use crate::{
    animation::{
        frame::{FrameScheduler, FrameToken},
        headless::ListFrame,
    },
    geometry,
};

/// Floor on rendered copies of the list.
pub const MIN_COPIES: usize = 5;
/// Shortest scroll the list accepts.
pub const MIN_SCROLL_DURATION: Duration = Duration::from_millis(50);
const MAX_COPY_PASSES: usize = 32;

/// One entry of the base sequence shown by the list.
#[derive(Debug, Clone, PartialEq)]
pub struct ListRow {
    /// Participant the row stands for.
    pub participant_id: Uuid,
    /// Label shown in the row.
    pub label: String,
}

/// Where the looping list is rendered.
pub trait ScrollSurface: Send + Sync {
    /// Visible height of the list viewport.
    fn viewport_height(&self) -> f64;

    /// Vertical centre of the highlight band, in viewport coordinates.
    fn band_center(&self) -> f64;

    /// Tops of two adjacent rendered rows, used to measure the row step.
    fn sample_row_tops(&self) -> (f64, f64);

    /// Replace the content with `copies` concatenated copies of `rows`. Clears row styles.
    fn render(&self, rows: &[ListRow], copies: usize);

    /// Scroll the content so `offset` sits at the viewport top.
    fn apply_offset(&self, offset: f64);

    /// Highlight the rows in `highlighted` and revert `reverted` to the plain style.
    fn restyle(&self, highlighted: Range<usize>, reverted: &[usize]);

    /// Mark the winner once the list settled.
    fn highlight_winner(&self, _participant_id: Uuid) {}

    /// What the surface shows right now, for surfaces that keep it.
    fn last_frame(&self) -> Option<ListFrame> {
        None
    }
}

/// How a scroll run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollOutcome {
    /// Reached its target.
    Completed,
    /// A newer run took over.
    Superseded,
    /// Stopped by [`ListScroller::cancel`] or a re-render.
    Cancelled,
}

/// Resolves when a scroll run ends.
#[derive(Debug)]
pub struct ScrollCompletion(oneshot::Receiver<ScrollOutcome>);

impl ScrollCompletion {
    /// Wait for the run to end.
    pub async fn wait(self) -> ScrollOutcome {
        self.0.await.unwrap_or(ScrollOutcome::Cancelled)
    }
}

/// A scroll run that was started.
#[derive(Debug)]
pub struct ScrollRun {
    /// Distance the list will travel.
    pub travel: f64,
    /// Resolves when the run ends.
    pub completion: ScrollCompletion,
}

/// Reasons a scroll cannot start.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScrollError {
    /// The list has no rows.
    #[error("the participant list is empty")]
    EmptyList,
    /// The winner is not one of the rendered rows.
    #[error("participant {0} is not in the list")]
    WinnerNotFound(Uuid),
}

/// Read-only view of the scroller for snapshots.
#[derive(Debug, Clone, PartialEq)]
pub struct ScrollView {
    /// Current offset.
    pub offset: f64,
    /// Offset every run starts from.
    pub base_start: f64,
    /// Height of one copy of the list.
    pub copy_height: f64,
    /// Measured distance between row tops.
    pub row_step: f64,
    /// Rendered copies.
    pub copies: usize,
    /// Rows in the base sequence.
    pub rows: usize,
    /// Rows currently highlighted.
    pub highlighted: Range<usize>,
    /// Whether a run is in flight.
    pub running: bool,
}

#[derive(Debug, Default)]
struct ScrollState {
    rows: Vec<ListRow>,
    copies: usize,
    row_step: f64,
    copy_height: f64,
    base_start: f64,
    offset: f64,
    travel: f64,
    started_at: Option<Instant>,
    duration: Duration,
    running: bool,
    generation: u64,
    frame: Option<FrameToken>,
    painted: Range<usize>,
    winner: Option<Uuid>,
    completion: Option<oneshot::Sender<ScrollOutcome>>,
}

struct ScrollShared {
    state: Mutex<ScrollState>,
    surface: Arc<dyn ScrollSurface>,
    frames: Arc<dyn FrameScheduler>,
}

impl ScrollShared {
    fn lock(&self) -> MutexGuard<'_, ScrollState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn render_locked(&self, state: &mut ScrollState) {
        state.painted = 0..0;
        if state.rows.is_empty() {
            state.copies = 0;
            state.copy_height = 0.0;
            state.base_start = 0.0;
            state.offset = 0.0;
            self.surface.render(&[], 0);
            self.surface.apply_offset(0.0);
            return;
        }

        let (first, second) = self.surface.sample_row_tops();
        state.row_step = (second - first).round().max(1.0);
        state.copy_height = state.rows.len() as f64 * state.row_step;

        let viewport = self.surface.viewport_height().max(1.0);
        let base_copies = MIN_COPIES.max(1 + (2.0 * viewport / state.copy_height).ceil() as usize + 2);
        state.copies = state.copies.max(base_copies);

        self.surface.render(&state.rows, state.copies);

        let total = state.copies as f64 * state.copy_height;
        let centered = (state.copies / 2) as f64 * state.copy_height;
        let high = viewport.max(total - state.copy_height - viewport);
        state.base_start = centered.clamp(viewport, high);
        state.offset = state.base_start;
        self.surface.apply_offset(state.offset);
        self.paint_locked(state);
    }

    fn ensure_copies_locked(&self, state: &mut ScrollState, travel: f64) {
        let viewport = self.surface.viewport_height().max(1.0);
        for _ in 0..MAX_COPY_PASSES {
            let required =
                geometry::required_copies(state.base_start, travel, viewport, state.copy_height);
            if required <= state.copies {
                return;
            }
            debug!(from = state.copies, to = required, "growing rendered list copies");
            state.copies = required.max(MIN_COPIES);
            self.render_locked(state);
        }
        warn!(copies = state.copies, travel, "list copies did not converge");
    }

    fn paint_locked(&self, state: &mut ScrollState) {
        let total_rows = state.copies * state.rows.len();
        if total_rows == 0 {
            return;
        }
        let center =
            geometry::row_under_band(state.offset, self.surface.band_center(), state.row_step);
        let window = geometry::highlight_window(center, total_rows);
        if window == state.painted {
            return;
        }
        let reverted: Vec<usize> = state
            .painted
            .clone()
            .filter(|row| !window.contains(row))
            .collect();
        self.surface.restyle(window.clone(), &reverted);
        state.painted = window;
    }

    fn normalize_locked(&self, state: &mut ScrollState) {
        if state.copy_height <= 0.0 {
            return;
        }
        state.offset = geometry::normalize_offset(state.offset, state.base_start, state.copy_height);
        self.surface.apply_offset(state.offset);
        self.paint_locked(state);
    }

    /// Stop the in-flight run, if any, resolving its completion with `outcome`.
    fn stop_locked(&self, state: &mut ScrollState, outcome: ScrollOutcome) {
        state.generation += 1;
        if let Some(token) = state.frame.take() {
            self.frames.cancel_frame(token);
        }
        if state.running {
            state.running = false;
            self.normalize_locked(state);
            debug!(?outcome, offset = state.offset, "list scroll stopped early");
        }
        if let Some(sender) = state.completion.take() {
            let _ = sender.send(outcome);
        }
    }
}

/// Scrolls a looping list of participants so the winner lands under the band.
#[derive(Clone)]
pub struct ListScroller {
    shared: Arc<ScrollShared>,
}

impl ListScroller {
    /// Bind a scroller to a surface and a frame source.
    pub fn new(surface: Arc<dyn ScrollSurface>, frames: Arc<dyn FrameScheduler>) -> Self {
        Self {
            shared: Arc::new(ScrollShared {
                state: Mutex::new(ScrollState::default()),
                surface,
                frames,
            }),
        }
    }

    /// Replace the base sequence and re-render. Stops any run in flight.
    pub fn set_rows(&self, rows: Vec<ListRow>) {
        let mut state = self.shared.lock();
        self.shared.stop_locked(&mut state, ScrollOutcome::Cancelled);
        state.rows = rows;
        state.copies = 0;
        self.shared.render_locked(&mut state);
        debug!(rows = state.rows.len(), copies = state.copies, "participant list rendered");
    }

    /// Drop one participant from the base sequence. Returns whether it was present.
    pub fn remove_row(&self, participant_id: Uuid) -> bool {
        let mut state = self.shared.lock();
        let before = state.rows.len();
        state.rows.retain(|row| row.participant_id != participant_id);
        if state.rows.len() == before {
            return false;
        }
        self.shared.stop_locked(&mut state, ScrollOutcome::Cancelled);
        self.shared.render_locked(&mut state);
        true
    }

    /// Start scrolling towards `winner` over `duration`, passing `extra_full_loops` whole
    /// list heights first. Supersedes any run in flight.
    pub fn start(
        &self,
        winner: Uuid,
        duration: Duration,
        extra_full_loops: u32,
    ) -> Result<ScrollRun, ScrollError> {
        let mut state = self.shared.lock();
        if state.rows.is_empty() {
            return Err(ScrollError::EmptyList);
        }
        let index = state
            .rows
            .iter()
            .position(|row| row.participant_id == winner)
            .ok_or(ScrollError::WinnerNotFound(winner))?;

        self.shared.stop_locked(&mut state, ScrollOutcome::Superseded);

        let travel = geometry::scroll_travel(
            index,
            state.row_step,
            state.rows.len(),
            extra_full_loops.max(1),
            self.shared.surface.band_center(),
        )
        .travel;
        self.shared.ensure_copies_locked(&mut state, travel);

        let (sender, receiver) = oneshot::channel();
        state.offset = state.base_start;
        state.travel = travel;
        state.duration = duration.max(MIN_SCROLL_DURATION);
        state.started_at = Some(self.shared.frames.now());
        state.running = true;
        state.winner = Some(winner);
        state.completion = Some(sender);

        let generation = state.generation;
        state.frame = Some(schedule_step(&self.shared, generation));
        debug!(
            winner = %winner,
            index,
            travel,
            copies = state.copies,
            "list scroll started"
        );

        Ok(ScrollRun {
            travel,
            completion: ScrollCompletion(receiver),
        })
    }

    /// Stop the in-flight run and normalise the offset.
    pub fn cancel(&self) {
        let mut state = self.shared.lock();
        self.shared.stop_locked(&mut state, ScrollOutcome::Cancelled);
    }

    /// Whether a run is in flight.
    pub fn is_running(&self) -> bool {
        self.shared.lock().running
    }

    /// Generation of the latest run.
    pub fn generation(&self) -> u64 {
        self.shared.lock().generation
    }

    /// Current geometry and animation flags.
    pub fn view(&self) -> ScrollView {
        let state = self.shared.lock();
        ScrollView {
            offset: state.offset,
            base_start: state.base_start,
            copy_height: state.copy_height,
            row_step: state.row_step,
            copies: state.copies,
            rows: state.rows.len(),
            highlighted: state.painted.clone(),
            running: state.running,
        }
    }
}

fn schedule_step(shared: &Arc<ScrollShared>, generation: u64) -> FrameToken {
    let next = Arc::clone(shared);
    shared
        .frames
        .schedule_frame(Box::new(move |now| step(&next, generation, now)))
}

fn step(shared: &Arc<ScrollShared>, generation: u64, now: Instant) {
    let mut state = shared.lock();
    if state.generation != generation || !state.running {
        return;
    }
    let Some(started_at) = state.started_at else {
        return;
    };

    let elapsed = now.saturating_duration_since(started_at);
    let t = (elapsed.as_secs_f64() / state.duration.as_secs_f64()).clamp(0.0, 1.0);

    state.offset = state.base_start + state.travel * geometry::list_scroll_ease(t);
    shared.surface.apply_offset(state.offset);
    shared.paint_locked(&mut state);
    trace!(t, offset = state.offset, "list scroll frame");

    if t < 1.0 {
        state.frame = Some(schedule_step(shared, generation));
        return;
    }

    state.running = false;
    state.frame = None;
    shared.normalize_locked(&mut state);
    if let Some(winner) = state.winner {
        shared.surface.highlight_winner(winner);
    }
    if let Some(sender) = state.completion.take() {
        let _ = sender.send(ScrollOutcome::Completed);
    }
    debug!(offset = state.offset, "list scroll settled");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::frame::ManualFrameScheduler;

    const FRAME: Duration = Duration::from_millis(16);

    struct FakeList {
        viewport: f64,
        band_center: f64,
        row_step: f64,
        rendered: Mutex<Vec<(usize, usize)>>,
        offsets: Mutex<Vec<f64>>,
        winners: Mutex<Vec<Uuid>>,
    }

    impl FakeList {
        fn new(viewport: f64, band_center: f64, row_step: f64) -> Arc<Self> {
            Arc::new(Self {
                viewport,
                band_center,
                row_step,
                rendered: Mutex::new(Vec::new()),
                offsets: Mutex::new(Vec::new()),
                winners: Mutex::new(Vec::new()),
            })
        }

        fn max_rendered_height(&self) -> f64 {
            self.rendered
                .lock()
                .unwrap()
                .last()
                .map(|(rows, copies)| (rows * copies) as f64 * self.row_step)
                .unwrap_or_default()
        }
    }

    impl ScrollSurface for FakeList {
        fn viewport_height(&self) -> f64 {
            self.viewport
        }

        fn band_center(&self) -> f64 {
            self.band_center
        }

        fn sample_row_tops(&self) -> (f64, f64) {
            (8.0, 8.0 + self.row_step + 0.4)
        }

        fn render(&self, rows: &[ListRow], copies: usize) {
            self.rendered.lock().unwrap().push((rows.len(), copies));
        }

        fn apply_offset(&self, offset: f64) {
            self.offsets.lock().unwrap().push(offset);
        }

        fn restyle(&self, _highlighted: Range<usize>, _reverted: &[usize]) {}

        fn highlight_winner(&self, participant_id: Uuid) {
            self.winners.lock().unwrap().push(participant_id);
        }
    }

    fn rows(count: usize) -> Vec<ListRow> {
        (0..count)
            .map(|index| ListRow {
                participant_id: Uuid::new_v4(),
                label: format!("participant {index}"),
            })
            .collect()
    }

    fn scroller(surface: Arc<FakeList>, frames: Arc<ManualFrameScheduler>) -> ListScroller {
        ListScroller::new(surface, frames)
    }

    #[tokio::test]
    async fn scroll_lands_winner_under_band_and_normalises() {
        let frames = Arc::new(ManualFrameScheduler::new());
        let surface = FakeList::new(400.0, 200.0, 60.0);
        let list = scroller(surface.clone(), frames.clone());
        let rows = rows(10);
        let winner = rows[3].participant_id;
        list.set_rows(rows);

        let view = list.view();
        assert_eq!(view.row_step, 60.0);
        assert_eq!(view.copy_height, 600.0);
        assert!(view.copies >= MIN_COPIES);

        let run = list.start(winner, Duration::from_secs(1), 3).unwrap();
        assert_eq!(run.travel, 1810.0);

        let base = list.view().base_start;
        assert!(surface.max_rendered_height() >= base + run.travel + 400.0);

        frames.run_until_idle(FRAME, 500);
        assert_eq!(run.completion.wait().await, ScrollOutcome::Completed);

        let view = list.view();
        assert!(!view.running);
        let landed = view.offset - view.base_start;
        assert!((0.0..view.copy_height).contains(&landed));
        // winner row (index 3) sits under the band after folding
        assert_eq!(
            geometry::row_under_band(view.offset, 200.0, 60.0).rem_euclid(10),
            3
        );
        assert_eq!(*surface.winners.lock().unwrap(), vec![winner]);
    }

    #[tokio::test]
    async fn new_run_supersedes_previous_completion() {
        let frames = Arc::new(ManualFrameScheduler::new());
        let surface = FakeList::new(300.0, 150.0, 40.0);
        let list = scroller(surface, frames.clone());
        let rows = rows(6);
        let (first, second) = (rows[1].participant_id, rows[4].participant_id);
        list.set_rows(rows);

        let run = list.start(first, Duration::from_secs(1), 3).unwrap();
        frames.advance(Duration::from_millis(300));
        let next = list.start(second, Duration::from_secs(1), 3).unwrap();

        assert_eq!(run.completion.wait().await, ScrollOutcome::Superseded);
        frames.run_until_idle(FRAME, 500);
        assert_eq!(next.completion.wait().await, ScrollOutcome::Completed);
    }

    #[test]
    fn repeated_draws_keep_offset_bounded() {
        let frames = Arc::new(ManualFrameScheduler::new());
        let surface = FakeList::new(480.0, 240.0, 68.0);
        let list = scroller(surface, frames.clone());
        let rows = rows(12);
        let ids: Vec<Uuid> = rows.iter().map(|row| row.participant_id).collect();
        list.set_rows(rows);

        for draw in 0..1000 {
            list.start(ids[draw % ids.len()], Duration::from_millis(100), 3)
                .unwrap();
            frames.advance(Duration::from_millis(200));
            frames.advance(FRAME);
            let view = list.view();
            assert!(!view.running);
            let landed = view.offset - view.base_start;
            assert!((0.0..view.copy_height).contains(&landed), "draw {draw} landed at {landed}");
        }
    }

    #[test]
    fn cancel_normalises_mid_flight() {
        let frames = Arc::new(ManualFrameScheduler::new());
        let surface = FakeList::new(400.0, 200.0, 50.0);
        let list = scroller(surface, frames.clone());
        let rows = rows(8);
        let winner = rows[7].participant_id;
        list.set_rows(rows);

        list.start(winner, Duration::from_secs(2), 3).unwrap();
        frames.advance(Duration::from_millis(900));
        list.cancel();

        let view = list.view();
        assert!(!view.running);
        assert!((0.0..view.copy_height).contains(&(view.offset - view.base_start)));
        assert_eq!(frames.pending_frames(), 0);
    }

    #[test]
    fn unknown_winner_and_empty_list_are_rejected() {
        let frames = Arc::new(ManualFrameScheduler::new());
        let list = scroller(FakeList::new(400.0, 200.0, 60.0), frames);
        let stranger = Uuid::new_v4();

        assert_eq!(
            list.start(stranger, Duration::from_secs(1), 3).unwrap_err(),
            ScrollError::EmptyList
        );
        list.set_rows(rows(3));
        assert_eq!(
            list.start(stranger, Duration::from_secs(1), 3).unwrap_err(),
            ScrollError::WinnerNotFound(stranger)
        );
        assert!(!list.is_running());
    }

    #[test]
    fn removing_rows_rerenders_smaller_copy() {
        let frames = Arc::new(ManualFrameScheduler::new());
        let list = scroller(FakeList::new(400.0, 200.0, 60.0), frames);
        let rows = rows(4);
        let gone = rows[2].participant_id;
        list.set_rows(rows);

        assert!(list.remove_row(gone));
        assert!(!list.remove_row(gone));
        let view = list.view();
        assert_eq!(view.rows, 3);
        assert_eq!(view.copy_height, 180.0);
    }
}
