// SPDX-License-Identifier: MIT
//
// FrameBuffer — the 2D cell grid that everything paints to.
//
// Blitters, text drawing, and box drawing all paint here through a
// `Painter`. The diff renderer then compares this frame against the
// previous one and emits minimal escape sequences for the changes.
//
// Design:
//
//   - Flat `Vec<Cell>` with row-major indexing for cache efficiency.
//     A row's cells are contiguous in memory, so left-to-right iteration
//     (which the renderer does) is a linear scan.
//
//   - Wide characters occupy two columns: a width-2 lead followed by a
//     width-0 continuation. The low-level writers here keep that pairing
//     intact. Overwriting either half of a wide glyph turns the other half
//     into a space, so no half-glyph ever survives a write.
//
//   - Hyperlinks are interned per framebuffer. Cells carry a small id and
//     the table maps it back to the URI. Ids stay stable until
//     `reset_links`, so a retained snapshot compares links by URI.
//
//   - Rectangles use signed 32-bit coordinates so UI code can position
//     things partly off-screen. Intersections are computed in 64 bits and
//     clamped, so no combination of inputs overflows.

use crate::cell::{Cell, Style};
use crate::error::{Error, Result};

/// Maximum number of distinct hyperlinks per framebuffer.
pub const MAX_LINKS: usize = 4096;

/// Maximum hyperlink URI length in bytes.
pub const MAX_LINK_URI: usize = 2083;

// ─── Rect ────────────────────────────────────────────────────────────────────

/// A rectangle in cell coordinates. Non-positive `w` or `h` is empty.
///
/// ```
/// use n_term::buffer::Rect;
///
/// let clip = Rect::new(10, 5, 80, 24);
/// assert!(clip.contains(10, 5));
/// assert!(clip.contains(89, 28));
/// assert!(!clip.contains(9, 5));
/// assert!(!clip.contains(90, 5));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
}

impl Rect {
    /// The empty rectangle at the origin.
    pub const EMPTY: Self = Self::new(0, 0, 0, 0);

    #[inline]
    #[must_use]
    pub const fn new(x: i32, y: i32, w: i32, h: i32) -> Self {
        Self { x, y, w, h }
    }

    /// Right edge (exclusive), widened so it can't overflow.
    #[inline]
    #[must_use]
    pub const fn right(self) -> i64 {
        self.x as i64 + self.w as i64
    }

    /// Bottom edge (exclusive), widened so it can't overflow.
    #[inline]
    #[must_use]
    pub const fn bottom(self) -> i64 {
        self.y as i64 + self.h as i64
    }

    #[inline]
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.w <= 0 || self.h <= 0
    }

    /// Whether `(px, py)` lies inside.
    #[inline]
    #[must_use]
    pub const fn contains(self, px: i32, py: i32) -> bool {
        !self.is_empty()
            && px >= self.x
            && py >= self.y
            && (px as i64) < self.right()
            && (py as i64) < self.bottom()
    }

    /// Overlap of two rectangles. Empty inputs or no overlap give
    /// [`Rect::EMPTY`]-sized results (w or h is 0).
    #[must_use]
    #[allow(clippy::cast_possible_truncation)] // Clamped to i32::MAX first.
    pub fn intersect(self, other: Self) -> Self {
        if self.is_empty() || other.is_empty() {
            return Self::EMPTY;
        }
        let x1 = self.x.max(other.x);
        let y1 = self.y.max(other.y);
        let x2 = self.right().min(other.right());
        let y2 = self.bottom().min(other.bottom());
        let w = (x2 - i64::from(x1)).clamp(0, i64::from(i32::MAX));
        let h = (y2 - i64::from(y1)).clamp(0, i64::from(i32::MAX));
        Self::new(x1, y1, w as i32, h as i32)
    }
}

// ─── FrameBuffer ─────────────────────────────────────────────────────────────

/// A 2D buffer of terminal cells.
///
/// Flat `Vec<Cell>` with row-major indexing: `index = y * width + x`.
///
/// # Examples
///
/// ```
/// use n_term::buffer::FrameBuffer;
///
/// let buf = FrameBuffer::new(80, 24);
/// assert_eq!(buf.width(), 80);
/// assert_eq!(buf.cell(5, 3).unwrap().as_str(), " ");
/// assert!(buf.cell(80, 0).is_none());
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct FrameBuffer {
    width: u16,
    height: u16,
    cells: Vec<Cell>,
    links: Vec<String>,
}

impl FrameBuffer {
    // ─── Construction ────────────────────────────────────────────────────

    /// Create a buffer filled with default-style spaces.
    #[must_use]
    pub fn new(width: u16, height: u16) -> Self {
        let size = usize::from(width) * usize::from(height);
        Self {
            width,
            height,
            cells: vec![Cell::EMPTY; size],
            links: Vec::new(),
        }
    }

    // ─── Accessors ───────────────────────────────────────────────────────

    #[inline]
    #[must_use]
    pub const fn width(&self) -> u16 {
        self.width
    }

    #[inline]
    #[must_use]
    pub const fn height(&self) -> u16 {
        self.height
    }

    /// The full buffer as a [`Rect`].
    #[inline]
    #[must_use]
    pub const fn bounds(&self) -> Rect {
        Rect::new(0, 0, self.width as i32, self.height as i32)
    }

    #[inline]
    #[must_use]
    pub const fn in_bounds(&self, x: u16, y: u16) -> bool {
        x < self.width && y < self.height
    }

    #[inline]
    const fn index(&self, x: u16, y: u16) -> usize {
        y as usize * self.width as usize + x as usize
    }

    /// The cell at `(x, y)`, or `None` outside the grid.
    #[inline]
    #[must_use]
    pub fn cell(&self, x: u16, y: u16) -> Option<&Cell> {
        if self.in_bounds(x, y) {
            Some(&self.cells[self.index(x, y)])
        } else {
            None
        }
    }

    /// Mutable cell access. Writes through this bypass wide-glyph repair;
    /// callers that care about the invariant should paint with a `Painter`.
    #[inline]
    pub fn cell_mut(&mut self, x: u16, y: u16) -> Option<&mut Cell> {
        if self.in_bounds(x, y) {
            let idx = self.index(x, y);
            Some(&mut self.cells[idx])
        } else {
            None
        }
    }

    /// The raw cell slice (for the diff renderer's hot loop).
    #[inline]
    #[must_use]
    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    /// A single row as a slice. Returns `None` if `y` is out of bounds.
    #[inline]
    #[must_use]
    pub fn row(&self, y: u16) -> Option<&[Cell]> {
        if y < self.height {
            let start = self.index(0, y);
            Some(&self.cells[start..start + usize::from(self.width)])
        } else {
            None
        }
    }

    /// The text of row `y` with continuations skipped (for tests and logs).
    #[must_use]
    pub fn row_text(&self, y: u16) -> String {
        self.row(y)
            .map(|row| row.iter().map(Cell::as_str).collect())
            .unwrap_or_default()
    }

    // ─── Clear & Resize ──────────────────────────────────────────────────

    /// Every cell becomes a space with `style`. Ignores any clip.
    /// The link table is kept.
    pub fn clear(&mut self, style: Style) {
        self.cells.fill(Cell::blank(style));
    }

    /// Change dimensions, keeping the overlapping region.
    ///
    /// New cells are default spaces. Each kept row is then repaired: an
    /// orphaned continuation becomes a space and a lead that lost its
    /// continuation becomes U+FFFD at width 1.
    pub fn resize(&mut self, width: u16, height: u16) {
        if width == self.width && height == self.height {
            return;
        }
        let mut next = Self::new(width, height);
        next.links = std::mem::take(&mut self.links);
        let copy_w = usize::from(width.min(self.width));
        for y in 0..height.min(self.height) {
            let src = self.index(0, y);
            let dst = next.index(0, y);
            next.cells[dst..dst + copy_w].copy_from_slice(&self.cells[src..src + copy_w]);
            next.repair_row(y);
        }
        *self = next;
    }

    fn repair_row(&mut self, y: u16) {
        for x in 0..self.width {
            let idx = self.index(x, y);
            let cell = self.cells[idx];
            if cell.is_continuation() {
                if x == 0 || !self.cells[idx - 1].is_wide() {
                    self.cells[idx] = Cell::blank(cell.style);
                }
            } else if cell.is_wide() {
                let has_cont = x + 1 < self.width && self.cells[idx + 1].is_continuation();
                if !has_cont {
                    self.cells[idx] = Cell::replacement(cell.style);
                    if x + 1 < self.width {
                        self.cells[idx + 1] = Cell::blank(cell.style);
                    }
                }
            }
        }
    }

    /// Replace this buffer's contents with `other`'s, reusing allocations.
    pub fn copy_from(&mut self, other: &Self) {
        self.width = other.width;
        self.height = other.height;
        self.cells.clear();
        self.cells.extend_from_slice(&other.cells);
        self.links.clone_from(&other.links);
    }

    // ─── Hyperlinks ──────────────────────────────────────────────────────

    /// Intern `uri` and return its id (≥ 1). Identical URIs share an id.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidArgument`] for an empty URI, [`Error::Limit`] when
    /// the URI is too long or the table is full.
    pub fn intern_link(&mut self, uri: &str) -> Result<u32> {
        if uri.is_empty() {
            return Err(Error::InvalidArgument("empty hyperlink uri"));
        }
        if uri.len() > MAX_LINK_URI {
            return Err(Error::Limit("hyperlink uri too long"));
        }
        if !crate::cell::is_safe_glyph(uri.as_bytes()) {
            return Err(Error::InvalidArgument("hyperlink uri contains control bytes"));
        }
        if let Some(pos) = self.links.iter().position(|l| l == uri) {
            return link_id(pos);
        }
        if self.links.len() >= MAX_LINKS {
            return Err(Error::Limit("hyperlink table full"));
        }
        self.links.push(uri.to_owned());
        link_id(self.links.len() - 1)
    }

    /// The URI for a link id, or `None` for 0 and unknown ids.
    #[must_use]
    pub fn link_uri(&self, id: u32) -> Option<&str> {
        let idx = usize::try_from(id).ok()?.checked_sub(1)?;
        self.links.get(idx).map(String::as_str)
    }

    /// Forget every interned link. Cells keep their ids, which now resolve
    /// to nothing until re-interned.
    pub fn reset_links(&mut self) {
        self.links.clear();
    }

    #[must_use]
    pub fn link_count(&self) -> usize {
        self.links.len()
    }

    /// Whether both buffers map every link id to the same URI, so cells can
    /// be compared by id alone.
    #[must_use]
    pub fn same_links(&self, other: &Self) -> bool {
        self.links == other.links
    }

    // ─── Invariant ───────────────────────────────────────────────────────

    /// First `(x, y)` where the lead/continuation pairing is broken.
    #[must_use]
    pub fn find_invariant_violation(&self) -> Option<(u16, u16)> {
        for y in 0..self.height {
            let row = self.row(y)?;
            for (x, cell) in row.iter().enumerate() {
                let ok = match cell.width() {
                    0 => x > 0 && row[x - 1].is_wide() && cell.is_empty(),
                    1 => true,
                    2 => row.get(x + 1).is_some_and(Cell::is_continuation),
                    _ => false,
                };
                if !ok {
                    #[allow(clippy::cast_possible_truncation)] // x < width (u16)
                    return Some((x as u16, y));
                }
            }
        }
        None
    }

    /// Whether every wide lead has its continuation and vice versa.
    #[must_use]
    pub fn validate(&self) -> bool {
        self.find_invariant_violation().is_none()
    }

    // ─── Repairing Writers ───────────────────────────────────────────────
    //
    // No clip checks here; the painter decides what may be touched. These
    // may repair one neighbor (x-1 or x+1) outside the caller's clip.

    /// Write a width-1 cell at `(x, y)`, breaking any wide glyph it lands on.
    pub(crate) fn write_width1(&mut self, x: u16, y: u16, cell: Cell) -> bool {
        if !self.in_bounds(x, y) {
            return false;
        }
        let idx = self.index(x, y);
        let style = cell.style;
        let current = self.cells[idx];

        if current.is_continuation() {
            if x == 0 {
                return false;
            }
            self.cells[idx - 1] = Cell::blank(style);
        }
        if current.is_wide() {
            if x + 1 >= self.width {
                return false;
            }
            self.cells[idx + 1] = Cell::blank(style);
        }
        if x + 1 < self.width && self.cells[idx + 1].is_continuation() {
            self.cells[idx + 1] = Cell::blank(style);
        }
        self.cells[idx] = cell;
        true
    }

    /// Write a wide lead at `(x, y)` and its continuation at `(x+1, y)`.
    pub(crate) fn write_width2(&mut self, x: u16, y: u16, lead: Cell) -> bool {
        if x.checked_add(1).is_none_or(|x1| x1 >= self.width) || y >= self.height {
            return false;
        }
        let style = lead.style;
        if !self.write_width1(x, y, Cell::blank(style)) || !self.write_width1(x + 1, y, Cell::blank(style)) {
            return false;
        }
        let idx = self.index(x, y);
        self.cells[idx] = lead;
        self.cells[idx + 1] = Cell::continuation(style);
        true
    }
}

#[allow(clippy::cast_possible_truncation)] // pos < MAX_LINKS
const fn link_id(pos: usize) -> Result<u32> {
    Ok(pos as u32 + 1)
}

impl std::fmt::Debug for FrameBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "FrameBuffer({}x{})", self.width, self.height)
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const BLUE: Style = Style::colors(0xFF_FFFF, 0x00_00FF);

    fn wide(style: Style) -> Cell {
        Cell::grapheme("日".as_bytes(), 2, style)
    }

    // ── Rect ────────────────────────────────────────────────────────────

    #[test]
    fn rect_intersect_overlap() {
        let a = Rect::new(0, 0, 10, 10);
        let b = Rect::new(5, 5, 10, 10);
        assert_eq!(a.intersect(b), Rect::new(5, 5, 5, 5));
    }

    #[test]
    fn rect_intersect_no_overlap_is_empty() {
        let a = Rect::new(0, 0, 5, 5);
        let b = Rect::new(10, 10, 5, 5);
        assert!(a.intersect(b).is_empty());
    }

    #[test]
    fn rect_intersect_adjacent_is_empty() {
        let a = Rect::new(0, 0, 5, 5);
        let b = Rect::new(5, 0, 5, 5);
        assert!(a.intersect(b).is_empty());
    }

    #[test]
    fn rect_intersect_extreme_values_do_not_overflow() {
        let a = Rect::new(i32::MAX - 1, i32::MAX - 1, i32::MAX, i32::MAX);
        let b = Rect::new(i32::MIN, i32::MIN, i32::MAX, i32::MAX);
        assert!(a.intersect(b).is_empty());

        let c = Rect::new(-5, -5, i32::MAX, i32::MAX);
        let r = c.intersect(Rect::new(0, 0, 3, 3));
        assert_eq!(r, Rect::new(0, 0, 3, 3));
    }

    #[test]
    fn rect_negative_size_is_empty() {
        assert!(Rect::new(0, 0, -1, 5).is_empty());
        assert!(!Rect::new(0, 0, -1, 5).contains(0, 0));
    }

    #[test]
    fn rect_contains_with_negative_origin() {
        let r = Rect::new(-5, -5, 10, 10);
        assert!(r.contains(0, 0));
        assert!(r.contains(4, 4));
        assert!(!r.contains(5, 5));
    }

    // ── Construction ────────────────────────────────────────────────────

    #[test]
    fn new_cells_are_default_spaces() {
        let buf = FrameBuffer::new(4, 3);
        assert_eq!(buf.cells().len(), 12);
        assert!(buf.cells().iter().all(|c| *c == Cell::EMPTY));
        assert!(buf.validate());
    }

    #[test]
    fn zero_size_buffer() {
        let buf = FrameBuffer::new(0, 0);
        assert!(buf.cells().is_empty());
        assert!(buf.cell(0, 0).is_none());
        assert!(buf.bounds().is_empty());
    }

    #[test]
    fn cell_out_of_bounds_is_none() {
        let mut buf = FrameBuffer::new(3, 2);
        assert!(buf.cell(3, 0).is_none());
        assert!(buf.cell(0, 2).is_none());
        assert!(buf.cell_mut(3, 1).is_none());
    }

    #[test]
    fn row_returns_correct_slice() {
        let mut buf = FrameBuffer::new(3, 2);
        *buf.cell_mut(1, 1).unwrap() = Cell::grapheme(b"x", 1, Style::DEFAULT);
        assert_eq!(buf.row_text(1), " x ");
        assert!(buf.row(2).is_none());
    }

    // ── Clear ───────────────────────────────────────────────────────────

    #[test]
    fn clear_applies_style_everywhere() {
        let mut buf = FrameBuffer::new(3, 2);
        buf.write_width2(0, 0, wide(Style::DEFAULT));
        buf.clear(BLUE);
        assert!(buf.cells().iter().all(|c| *c == Cell::blank(BLUE)));
    }

    // ── Resize ──────────────────────────────────────────────────────────

    #[test]
    fn resize_keeps_overlap() {
        let mut buf = FrameBuffer::new(3, 2);
        *buf.cell_mut(0, 0).unwrap() = Cell::grapheme(b"a", 1, BLUE);
        *buf.cell_mut(2, 1).unwrap() = Cell::grapheme(b"b", 1, BLUE);
        buf.resize(5, 1);
        assert_eq!(buf.width(), 5);
        assert_eq!(buf.height(), 1);
        assert_eq!(buf.row_text(0), "a    ");
        assert_eq!(*buf.cell(3, 0).unwrap(), Cell::EMPTY);
    }

    #[test]
    fn resize_cutting_wide_glyph_repairs_lead() {
        let mut buf = FrameBuffer::new(4, 1);
        buf.write_width2(2, 0, wide(BLUE));
        buf.resize(3, 1);
        let lead = buf.cell(2, 0).unwrap();
        assert_eq!(lead.as_str(), "\u{FFFD}");
        assert_eq!(lead.width(), 1);
        assert_eq!(lead.style, BLUE);
        assert!(buf.validate());
    }

    #[test]
    fn resize_keeps_link_table() {
        let mut buf = FrameBuffer::new(2, 2);
        let id = buf.intern_link("https://example.com").unwrap();
        buf.resize(4, 4);
        assert_eq!(buf.link_uri(id), Some("https://example.com"));
    }

    // ── Repairing Writers ───────────────────────────────────────────────

    #[test]
    fn write_over_continuation_breaks_lead() {
        let mut buf = FrameBuffer::new(4, 1);
        buf.write_width2(1, 0, wide(Style::DEFAULT));
        assert!(buf.write_width1(2, 0, Cell::grapheme(b"x", 1, BLUE)));
        assert_eq!(buf.row_text(0), "  x ");
        assert_eq!(buf.cell(1, 0).unwrap().style, BLUE);
        assert!(buf.validate());
    }

    #[test]
    fn write_over_lead_clears_continuation() {
        let mut buf = FrameBuffer::new(4, 1);
        buf.write_width2(1, 0, wide(Style::DEFAULT));
        assert!(buf.write_width1(1, 0, Cell::grapheme(b"x", 1, BLUE)));
        assert_eq!(buf.row_text(0), " x  ");
        assert!(buf.validate());
    }

    #[test]
    fn wide_over_wide_shifted_by_one() {
        let mut buf = FrameBuffer::new(5, 1);
        buf.write_width2(0, 0, wide(Style::DEFAULT));
        assert!(buf.write_width2(1, 0, wide(BLUE)));
        assert_eq!(buf.row_text(0), " 日  ");
        assert!(buf.validate());
    }

    #[test]
    fn wide_at_last_column_refused() {
        let mut buf = FrameBuffer::new(3, 1);
        assert!(!buf.write_width2(2, 0, wide(Style::DEFAULT)));
        assert_eq!(buf.row_text(0), "   ");
    }

    // ── Hyperlinks ──────────────────────────────────────────────────────

    #[test]
    fn intern_link_dedupes() {
        let mut buf = FrameBuffer::new(1, 1);
        let a = buf.intern_link("https://a.example").unwrap();
        let b = buf.intern_link("https://b.example").unwrap();
        let a2 = buf.intern_link("https://a.example").unwrap();
        assert_eq!(a, 1);
        assert_eq!(b, 2);
        assert_eq!(a, a2);
        assert_eq!(buf.link_count(), 2);
    }

    #[test]
    fn intern_link_rejects_bad_input() {
        let mut buf = FrameBuffer::new(1, 1);
        assert!(matches!(buf.intern_link(""), Err(Error::InvalidArgument(_))));
        assert!(matches!(buf.intern_link("a\x1bb"), Err(Error::InvalidArgument(_))));
        let long = "x".repeat(MAX_LINK_URI + 1);
        assert!(matches!(buf.intern_link(&long), Err(Error::Limit(_))));
    }

    #[test]
    fn link_table_fills_up() {
        let mut buf = FrameBuffer::new(1, 1);
        for i in 0..MAX_LINKS {
            buf.intern_link(&format!("u{i}")).unwrap();
        }
        assert!(matches!(buf.intern_link("one-more"), Err(Error::Limit(_))));
        // Existing URIs still resolve.
        assert_eq!(buf.intern_link("u0").unwrap(), 1);
    }

    #[test]
    fn link_uri_unknown_ids() {
        let mut buf = FrameBuffer::new(1, 1);
        assert_eq!(buf.link_uri(0), None);
        assert_eq!(buf.link_uri(1), None);
        let id = buf.intern_link("https://x").unwrap();
        buf.reset_links();
        assert_eq!(buf.link_uri(id), None);
    }

    // ── Invariant ───────────────────────────────────────────────────────

    #[test]
    fn validate_detects_orphan_continuation() {
        let mut buf = FrameBuffer::new(3, 1);
        *buf.cell_mut(1, 0).unwrap() = Cell::continuation(Style::DEFAULT);
        assert_eq!(buf.find_invariant_violation(), Some((1, 0)));
    }

    #[test]
    fn validate_detects_lead_without_continuation() {
        let mut buf = FrameBuffer::new(3, 1);
        *buf.cell_mut(2, 0).unwrap() = wide(Style::DEFAULT);
        assert!(!buf.validate());
    }

    // ── Copy ────────────────────────────────────────────────────────────

    #[test]
    fn copy_from_matches_source() {
        let mut src = FrameBuffer::new(3, 2);
        src.write_width2(0, 1, wide(BLUE));
        src.intern_link("https://x").unwrap();
        let mut dst = FrameBuffer::new(1, 1);
        dst.copy_from(&src);
        assert_eq!(dst, src);
    }

    #[test]
    fn debug_format() {
        assert_eq!(format!("{:?}", FrameBuffer::new(80, 24)), "FrameBuffer(80x24)");
    }
}
