// SPDX-License-Identifier: MIT
//
// Scroll detection for the diff engine.
//
// When a block of rows moved vertically between two frames (a log view
// appending a line, an editor scrolling), redrawing every moved cell costs
// far more than asking the terminal to move them: DECSTBM to fence the
// region, SU/SD to shift it, then redraw only the rows the shift exposed.
//
// Detection tries every shift distance in both directions and keeps the
// longest run of rows where `next[y]` equals `prev[y ± delta]`. Small wins
// are ignored since the three control sequences aren't free.

/// Frames with fewer dirty rows than this are never scrolled.
pub const MIN_DIRTY_LINES: usize = 4;

/// Largest shift considered.
pub const MAX_DELTA: u16 = 64;

/// A plan must move at least this many rows...
pub const MIN_MOVED_LINES: u16 = 4;

/// ...and at least this many cells.
pub const MIN_SAVED_CELLS: u64 = 256;

/// A scroll of rows `top..=bottom` by `lines`.
///
/// Scrolling up moves row `y + lines` to `y` and exposes the last `lines`
/// rows of the region; scrolling down exposes the first `lines` rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScrollPlan {
    pub up: bool,
    pub top: u16,
    pub bottom: u16,
    pub lines: u16,
    /// Rows carried over by the terminal instead of redrawn.
    pub moved: u16,
}

impl ScrollPlan {
    /// Rows the shift leaves blank, which must be redrawn.
    #[must_use]
    pub fn exposed(&self) -> std::ops::RangeInclusive<u16> {
        if self.up {
            (self.bottom + 1 - self.lines)..=self.bottom
        } else {
            self.top..=(self.top + self.lines - 1)
        }
    }

    /// Whether this plan beats `other`: more moved cells, then more moved
    /// lines, fewer shifted lines, smaller top, smaller bottom, up first.
    fn better_than(&self, other: &Self) -> bool {
        let key = |p: &Self| {
            (
                std::cmp::Reverse(p.moved),
                p.lines,
                p.top,
                p.bottom,
                !p.up,
            )
        };
        key(self) < key(other)
    }
}

/// Find the best scroll turning `prev` into `next`.
///
/// `row_eq(next_y, prev_y)` compares a row of the new frame with a row of
/// the old one. Both frames must be `rows × cols`.
#[must_use]
pub fn detect(
    rows: u16,
    cols: u16,
    dirty_rows: usize,
    row_eq: impl Fn(u16, u16) -> bool,
) -> Option<ScrollPlan> {
    if rows < 2 || cols == 0 || dirty_rows < MIN_DIRTY_LINES {
        return None;
    }

    let mut best: Option<ScrollPlan> = None;
    let mut consider = |cand: ScrollPlan| {
        if u32::from(cand.bottom) >= u32::from(rows) || !saved_enough(cand.moved, cols) {
            return;
        }
        if best.is_none_or(|b| cand.better_than(&b)) {
            best = Some(cand);
        }
    };

    for delta in 1..=(rows - 1).min(MAX_DELTA) {
        for up in [true, false] {
            let mut run_start = 0u16;
            let mut run_len = 0u16;
            for y in 0..rows - delta {
                let (ny, py) = if up { (y, y + delta) } else { (y + delta, y) };
                if row_eq(ny, py) {
                    if run_len == 0 {
                        run_start = y;
                    }
                    run_len += 1;
                    continue;
                }
                if run_len > 0 {
                    consider(candidate(up, run_start, run_len, delta));
                }
                run_len = 0;
            }
            if run_len > 0 {
                consider(candidate(up, run_start, run_len, delta));
            }
        }
    }

    best.filter(|p| p.lines > 0 && p.bottom > p.top && p.bottom - p.top + 1 > p.lines)
}

const fn candidate(up: bool, run_start: u16, run_len: u16, delta: u16) -> ScrollPlan {
    ScrollPlan {
        up,
        top: run_start,
        bottom: run_start + run_len - 1 + delta,
        lines: delta,
        moved: run_len,
    }
}

fn saved_enough(moved: u16, cols: u16) -> bool {
    moved >= MIN_MOVED_LINES && u64::from(moved) * u64::from(cols) >= MIN_SAVED_CELLS
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    /// Rows as plain labels; `detect` only needs equality.
    fn plan(prev: &[u32], next: &[u32], cols: u16) -> Option<ScrollPlan> {
        #[allow(clippy::cast_possible_truncation)]
        let rows = next.len() as u16;
        let dirty = prev.iter().zip(next).filter(|(a, b)| a != b).count();
        detect(rows, cols, dirty, |ny, py| next[usize::from(ny)] == prev[usize::from(py)])
    }

    #[test]
    fn log_append_scrolls_up_by_one() {
        let prev: Vec<u32> = (0..10).collect();
        let next: Vec<u32> = (1..11).collect();
        let p = plan(&prev, &next, 80).unwrap();
        assert_eq!(p, ScrollPlan { up: true, top: 0, bottom: 9, lines: 1, moved: 9 });
        assert_eq!(p.exposed(), 9..=9);
    }

    #[test]
    fn insert_at_top_scrolls_down() {
        let prev: Vec<u32> = (10..20).collect();
        let next: Vec<u32> = [100, 101].into_iter().chain(10..18).collect();
        let p = plan(&prev, &next, 80).unwrap();
        assert_eq!(p, ScrollPlan { up: false, top: 0, bottom: 9, lines: 2, moved: 8 });
        assert_eq!(p.exposed(), 0..=1);
    }

    #[test]
    fn fixed_header_and_footer_stay_outside_region() {
        // Row 0 and 9 static; body scrolls up by 2.
        let prev = [0, 1, 2, 3, 4, 5, 6, 7, 8, 99];
        let next = [0, 3, 4, 5, 6, 7, 8, 50, 51, 99];
        let p = plan(&prev, &next, 80).unwrap();
        assert_eq!(p, ScrollPlan { up: true, top: 1, bottom: 8, lines: 2, moved: 6 });
        assert_eq!(p.exposed(), 7..=8);
    }

    #[test]
    fn too_few_dirty_rows() {
        let prev: Vec<u32> = (0..10).collect();
        let mut next = prev.clone();
        next[2] = 100;
        next[3] = 101;
        assert_eq!(plan(&prev, &next, 80), None);
    }

    #[test]
    fn narrow_grid_needs_enough_cells() {
        let prev: Vec<u32> = (0..10).collect();
        let next: Vec<u32> = (1..11).collect();
        // 9 moved rows × 20 cols = 180 < 256.
        assert_eq!(plan(&prev, &next, 20), None);
        // 9 × 29 = 261.
        assert!(plan(&prev, &next, 29).is_some());
    }

    #[test]
    fn single_row_grid_never_scrolls() {
        assert_eq!(detect(1, 80, 10, |_, _| true), None);
    }

    #[test]
    fn unrelated_frames_do_not_scroll() {
        let prev: Vec<u32> = (0..10).collect();
        let next: Vec<u32> = (100..110).collect();
        assert_eq!(plan(&prev, &next, 80), None);
    }

    #[test]
    fn uniform_frame_prefers_smallest_shift_up() {
        // Every row equal: every delta matches; fewest lines wins, up first.
        let prev = [7u32; 12];
        let mut next = [7u32; 12];
        next[11] = 8;
        let p = detect(12, 80, 4, |ny, py| next[usize::from(ny)] == prev[usize::from(py)]).unwrap();
        assert_eq!(p, ScrollPlan { up: true, top: 0, bottom: 11, lines: 1, moved: 11 });
    }

    #[test]
    fn ordering_prefers_moved_then_lines() {
        let a = ScrollPlan { up: true, top: 0, bottom: 9, lines: 1, moved: 9 };
        let b = ScrollPlan { up: true, top: 0, bottom: 9, lines: 2, moved: 8 };
        assert!(a.better_than(&b));
        let c = ScrollPlan { up: false, ..a };
        assert!(a.better_than(&c));
        assert!(!c.better_than(&a));
    }
}
