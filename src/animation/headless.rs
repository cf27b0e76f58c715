use std::{
    ops::Range,
    sync::{Mutex, MutexGuard, PoisonError},
};

use uuid::Uuid;

use crate::{
    animation::{scroll::ListRow, ScrollSurface, WheelSurface},
    config::ListGeometry,
};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Wheel surface that only remembers what it was asked to draw.
#[derive(Debug)]
pub struct HeadlessWheelSurface {
    size: (f64, f64),
    last_angle: Mutex<Option<f64>>,
}

impl HeadlessWheelSurface {
    /// A square surface with side `diameter`.
    pub fn new(diameter: f64) -> Self {
        Self {
            size: (diameter, diameter),
            last_angle: Mutex::new(None),
        }
    }
}

impl WheelSurface for HeadlessWheelSurface {
    fn size(&self) -> (f64, f64) {
        self.size
    }

    fn draw(&self, angle: f64) {
        *lock(&self.last_angle) = Some(angle);
    }

    fn last_angle(&self) -> Option<f64> {
        *lock(&self.last_angle)
    }
}

/// What the headless list currently shows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListFrame {
    /// Labels of the base sequence.
    pub labels: Vec<String>,
    /// Copies rendered.
    pub copies: usize,
    /// Last applied offset.
    pub offset: f64,
    /// Rows currently painted as highlighted.
    pub highlighted: Vec<usize>,
    /// Participant marked as winner after the last run.
    pub winner: Option<Uuid>,
}

/// List surface with fixed geometry that records the last frame.
#[derive(Debug)]
pub struct HeadlessListSurface {
    geometry: ListGeometry,
    frame: Mutex<ListFrame>,
}

impl HeadlessListSurface {
    /// Build a surface laid out with `geometry`.
    pub fn new(geometry: ListGeometry) -> Self {
        Self {
            geometry,
            frame: Mutex::new(ListFrame::default()),
        }
    }
}

impl ScrollSurface for HeadlessListSurface {
    fn viewport_height(&self) -> f64 {
        self.geometry.viewport_height
    }

    fn band_center(&self) -> f64 {
        self.geometry.viewport_height / 2.0 + self.geometry.band_offset
    }

    fn sample_row_tops(&self) -> (f64, f64) {
        let first = self.geometry.row_gap / 2.0;
        (first, first + self.geometry.row_height + self.geometry.row_gap)
    }

    fn render(&self, rows: &[ListRow], copies: usize) {
        let mut frame = lock(&self.frame);
        frame.labels = rows.iter().map(|row| row.label.clone()).collect();
        frame.copies = copies;
        frame.highlighted.clear();
        frame.winner = None;
    }

    fn apply_offset(&self, offset: f64) {
        lock(&self.frame).offset = offset;
    }

    fn restyle(&self, highlighted: Range<usize>, reverted: &[usize]) {
        let mut frame = lock(&self.frame);
        frame.highlighted.retain(|row| !reverted.contains(row));
        for row in highlighted {
            if !frame.highlighted.contains(&row) {
                frame.highlighted.push(row);
            }
        }
        frame.highlighted.sort_unstable();
    }

    fn highlight_winner(&self, participant_id: Uuid) {
        lock(&self.frame).winner = Some(participant_id);
    }

    fn last_frame(&self) -> Option<ListFrame> {
        Some(lock(&self.frame).clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_surface_tracks_highlight_window() {
        let surface = HeadlessListSurface::new(ListGeometry {
            row_height: 60.0,
            row_gap: 8.0,
            viewport_height: 400.0,
            band_offset: 10.0,
        });

        assert_eq!(surface.band_center(), 210.0);
        let (a, b) = surface.sample_row_tops();
        assert_eq!(b - a, 68.0);

        surface.restyle(3..8, &[]);
        surface.restyle(4..9, &[3]);
        assert_eq!(surface.last_frame().unwrap().highlighted, vec![4, 5, 6, 7, 8]);

        surface.render(&[], 0);
        assert!(surface.last_frame().unwrap().highlighted.is_empty());
    }

    #[test]
    fn wheel_surface_remembers_last_angle() {
        let surface = HeadlessWheelSurface::new(320.0);
        assert_eq!(surface.last_angle(), None);
        surface.draw(1.25);
        assert_eq!(surface.last_angle(), Some(1.25));
    }
}
