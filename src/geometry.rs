//! Pure geometry shared by the wheel and list animators.
//!
//! Everything here is deterministic: the callers own randomness, clocks and
//! surfaces, and feed plain numbers in.

use std::{f64::consts::TAU, ops::Range};

/// Portion of normalised time the list scroll spends in its near-linear phase.
pub const LIST_FAST_PHASE: f64 = 0.7;
/// Progress reached by the list scroll at the end of the near-linear phase.
pub const LIST_FAST_PHASE_PROGRESS: f64 = 0.85;
/// Rows highlighted on each side of the row under the band.
pub const BAND_WINDOW_RADIUS: usize = 2;

/// Result of the centering formula for a winner row.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollTravel {
    /// Vertical centre of the winner row inside one copy of the list.
    pub winner_row_center: f64,
    /// Distance the list has to travel so the winner row lands on the band.
    pub travel: f64,
}

/// Compute how far the looping list must scroll so `winner_index` lands under the band.
///
/// Travel is always positive: whole copy-heights are added when the band centre sits
/// further down than the loops cover.
pub fn scroll_travel(
    winner_index: usize,
    row_step: f64,
    participant_count: usize,
    extra_full_loops: u32,
    band_center: f64,
) -> ScrollTravel {
    let copy_height = participant_count as f64 * row_step;
    let winner_row_center = winner_index as f64 * row_step + row_step / 2.0;
    let mut travel = f64::from(extra_full_loops) * copy_height + (winner_row_center - band_center);

    if copy_height > 0.0 {
        while travel <= 0.0 {
            travel += copy_height;
        }
    }

    ScrollTravel {
        winner_row_center,
        travel,
    }
}

/// Target wheel angle: current angle plus whole turns plus a sub-turn offset.
///
/// The offset is folded into `[0, 2π)` so callers can pass any random value.
pub fn wheel_target(current: f64, full_turns: u32, sub_turn_offset: f64) -> f64 {
    current + f64::from(full_turns) * TAU + sub_turn_offset.rem_euclid(TAU)
}

/// Number of list copies needed so `base_offset + travel` plus one and a half
/// viewports never runs past the rendered content.
pub fn required_copies(base_offset: f64, travel: f64, viewport_height: f64, copy_height: f64) -> usize {
    if copy_height <= 0.0 {
        return 0;
    }
    let needed = base_offset + travel + viewport_height * 1.5;
    (needed / copy_height).ceil().max(0.0) as usize + 1
}

/// Fold `offset` back into `[base_start, base_start + copy_height)`.
pub fn normalize_offset(offset: f64, base_start: f64, copy_height: f64) -> f64 {
    if copy_height <= 0.0 {
        return base_start;
    }
    let mut reduced = (offset - base_start).rem_euclid(copy_height);
    // rem_euclid may round up to the modulus itself for tiny negative inputs
    if reduced >= copy_height {
        reduced = 0.0;
    }
    base_start + reduced
}

/// Index of the rendered row whose span contains `offset + band_center`.
pub fn row_under_band(offset: f64, band_center: f64, row_step: f64) -> i64 {
    ((offset + band_center - row_step / 2.0) / row_step).round() as i64
}

/// Rows to restyle around `center`, clamped to the rendered rows.
pub fn highlight_window(center: i64, total_rows: usize) -> Range<usize> {
    if total_rows == 0 {
        return 0..0;
    }
    let last = total_rows as i64 - 1;
    let radius = BAND_WINDOW_RADIUS as i64;
    let start = (center - radius).clamp(0, last) as usize;
    let end = (center + radius).clamp(0, last) as usize;
    start..end + 1
}

/// Cubic ease-out used by the wheel.
pub fn ease_out_cubic(t: f64) -> f64 {
    1.0 - (1.0 - t).powi(3)
}

/// Quartic ease-out used for the list's deceleration tail.
pub fn ease_out_quartic(t: f64) -> f64 {
    1.0 - (1.0 - t).powi(4)
}

/// Two-segment list curve: linear to 85% over the first 70% of time, then a quartic tail.
pub fn list_scroll_ease(t: f64) -> f64 {
    let t = t.clamp(0.0, 1.0);
    if t < LIST_FAST_PHASE {
        return LIST_FAST_PHASE_PROGRESS * t / LIST_FAST_PHASE;
    }
    let r = (t - LIST_FAST_PHASE) / (1.0 - LIST_FAST_PHASE);
    LIST_FAST_PHASE_PROGRESS + (1.0 - LIST_FAST_PHASE_PROGRESS) * ease_out_quartic(r)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn centering_formula_matches_reference_values() {
        for _ in 0..3 {
            let result = scroll_travel(3, 60.0, 10, 3, 200.0);
            assert_eq!(result.winner_row_center, 210.0);
            assert_eq!(result.travel, 1810.0);
        }
    }

    #[test]
    fn travel_stays_positive_for_low_band() {
        let result = scroll_travel(0, 10.0, 2, 1, 500.0);
        assert!(result.travel > 0.0);
        // stays aligned on the winner row modulo one copy
        let aligned = (result.travel - (result.winner_row_center - 500.0)).rem_euclid(20.0);
        assert!(aligned.abs() < 1e-9);
    }

    #[test]
    fn wheel_target_ignores_whole_turns_in_offset() {
        let base = wheel_target(1.0, 6, 0.5);
        let wrapped = wheel_target(1.0, 6, 0.5 + TAU);
        assert!((base - wrapped).abs() < 1e-9);
        assert!((base - (1.0 + 6.0 * TAU + 0.5)).abs() < 1e-9);
    }

    #[test]
    fn required_copies_covers_travel_and_viewport() {
        let copies = required_copies(600.0, 1810.0, 400.0, 600.0);
        assert_eq!(copies, 7);
        assert!(copies as f64 * 600.0 >= 600.0 + 1810.0 + 400.0);
        assert_eq!(required_copies(0.0, 10.0, 10.0, 0.0), 0);
    }

    #[test]
    fn normalize_offset_folds_into_one_copy() {
        assert_eq!(normalize_offset(2410.0, 600.0, 600.0), 610.0);
        let folded = normalize_offset(-50.0, 600.0, 600.0);
        assert!((600.0..1200.0).contains(&folded));
        assert_eq!(normalize_offset(1200.0, 600.0, 600.0), 600.0);
    }

    #[test]
    fn band_row_and_window_are_clamped() {
        assert_eq!(row_under_band(0.0, 200.0, 60.0), 3);
        assert_eq!(row_under_band(1810.0, 200.0, 60.0), 33);
        assert_eq!(highlight_window(33, 100), 31..36);
        assert_eq!(highlight_window(0, 100), 0..3);
        assert_eq!(highlight_window(99, 100), 97..100);
        assert!(highlight_window(5, 0).is_empty());
    }

    #[test]
    fn list_curve_is_continuous_and_lands_on_one() {
        assert_eq!(list_scroll_ease(0.0), 0.0);
        let before = list_scroll_ease(LIST_FAST_PHASE - 1e-9);
        let after = list_scroll_ease(LIST_FAST_PHASE);
        assert!((before - after).abs() < 1e-6);
        assert_eq!(list_scroll_ease(1.0), 1.0);
        assert!(list_scroll_ease(0.9) < 1.0);
        assert_eq!(ease_out_cubic(1.0), 1.0);
        assert!((ease_out_cubic(0.5) - 0.875).abs() < 1e-12);
    }
}
