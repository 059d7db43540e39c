// SPDX-License-Identifier: MIT
//
// Painter — clipped drawing onto a FrameBuffer.
//
// A painter is a short-lived view for one render pass: a mutable borrow of
// the framebuffer plus a caller-supplied clip stack. The stack is a fixed
// slice, so nesting depth is bounded by the caller and pushing never
// allocates. Entry 0 always holds the grid bounds; every push stores
// `rect ∩ bounds ∩ top`, so the top of the stack is always the effective
// clip.
//
// Every write keeps the wide-glyph invariant. A wide glyph is placed
// atomically: if either of its columns falls outside the clip, nothing is
// written. Overwriting half of an existing wide glyph repairs the other
// half to a space, and that repair may touch one neighbor outside the clip.

use unicode_segmentation::UnicodeSegmentation;
use unicode_width::UnicodeWidthStr;

use crate::buffer::{FrameBuffer, Rect};
use crate::cell::{Cell, Style};
use crate::error::{Error, Result};

/// Clipped drawing onto a [`FrameBuffer`].
///
/// ```
/// use n_term::buffer::{FrameBuffer, Rect};
/// use n_term::cell::Style;
/// use n_term::painter::Painter;
///
/// let mut fb = FrameBuffer::new(10, 2);
/// let mut stack = [Rect::EMPTY; 4];
/// let mut p = Painter::begin(&mut fb, &mut stack).unwrap();
/// p.clip_push(Rect::new(0, 0, 3, 1)).unwrap();
/// p.draw_text(0, 0, "hello", Style::DEFAULT);
/// assert_eq!(fb.row_text(0), "hel       ");
/// ```
pub struct Painter<'a> {
    fb: &'a mut FrameBuffer,
    stack: &'a mut [Rect],
    len: usize,
}

impl<'a> Painter<'a> {
    /// Start painting. `stack[0]` becomes the grid bounds.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidArgument`] if `stack` is empty.
    pub fn begin(fb: &'a mut FrameBuffer, stack: &'a mut [Rect]) -> Result<Self> {
        let Some(base) = stack.first_mut() else {
            return Err(Error::InvalidArgument("clip stack capacity is zero"));
        };
        *base = fb.bounds();
        Ok(Self { fb, stack, len: 1 })
    }

    /// The framebuffer being painted.
    #[must_use]
    pub fn framebuffer(&self) -> &FrameBuffer {
        &*self.fb
    }

    // ─── Clip Stack ──────────────────────────────────────────────────────

    /// The effective clip: the top of the stack.
    #[inline]
    #[must_use]
    pub fn clip(&self) -> Rect {
        self.stack[self.len - 1]
    }

    /// Current stack depth (1 = only the base).
    #[inline]
    #[must_use]
    pub const fn depth(&self) -> usize {
        self.len
    }

    /// Narrow the clip to `rect ∩ bounds ∩ current`.
    ///
    /// # Errors
    ///
    /// [`Error::Limit`] when the stack is full.
    pub fn clip_push(&mut self, rect: Rect) -> Result<()> {
        if self.len >= self.stack.len() {
            return Err(Error::Limit("clip stack full"));
        }
        let next = self.fb.bounds().intersect(rect).intersect(self.clip());
        self.stack[self.len] = next;
        self.len += 1;
        Ok(())
    }

    /// Restore the previous clip.
    ///
    /// # Errors
    ///
    /// [`Error::Limit`] when only the base entry remains.
    pub fn clip_pop(&mut self) -> Result<()> {
        if self.len <= 1 {
            return Err(Error::Limit("clip stack at base"));
        }
        self.len -= 1;
        Ok(())
    }

    /// Whether `(x, y)` is inside both the grid and the clip.
    #[inline]
    fn can_touch(&self, x: i32, y: i32) -> Option<(u16, u16)> {
        if !self.clip().contains(x, y) {
            return None;
        }
        let ux = u16::try_from(x).ok()?;
        let uy = u16::try_from(y).ok()?;
        self.fb.in_bounds(ux, uy).then_some((ux, uy))
    }

    // ─── Fill ────────────────────────────────────────────────────────────

    /// Every cell in `rect ∩ clip` becomes a space with `style`.
    pub fn fill_rect(&mut self, rect: Rect, style: Style) {
        let area = rect.intersect(self.fb.bounds()).intersect(self.clip());
        if area.is_empty() {
            return;
        }
        let blank = Cell::blank(style);
        for y in area.y..area.y.saturating_add(area.h) {
            for x in area.x..area.x.saturating_add(area.w) {
                if let Some((ux, uy)) = self.can_touch(x, y) {
                    self.fb.write_width1(ux, uy, blank);
                }
            }
        }
    }

    // ─── Graphemes ───────────────────────────────────────────────────────

    /// Place one grapheme cluster at `(x, y)`.
    ///
    /// Empty `bytes` writes a space. Oversized or unsafe bytes write U+FFFD
    /// at width 1. A width-2 glyph needs both columns inside the clip;
    /// otherwise nothing is written. Positions outside the clip are a
    /// silent no-op.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidArgument`] unless `width` is 1 or 2.
    pub fn put_grapheme(&mut self, x: i32, y: i32, bytes: &[u8], width: u8, style: Style) -> Result<()> {
        if width != 1 && width != 2 {
            return Err(Error::InvalidArgument("grapheme width must be 1 or 2"));
        }
        let cell = Cell::grapheme(bytes, width, style);
        let Some((ux, uy)) = self.can_touch(x, y) else {
            return Ok(());
        };
        if cell.is_wide() {
            if self.can_touch(x.saturating_add(1), y).is_some() {
                self.fb.write_width2(ux, uy, cell);
            }
        } else {
            self.fb.write_width1(ux, uy, cell);
        }
        Ok(())
    }

    /// Draw `text` left to right starting at `(x, y)`.
    ///
    /// Text is split into extended grapheme clusters. Zero-width clusters
    /// are skipped and anything wider than 2 is drawn at width 2. The
    /// column always advances by the cluster's width, even where clipping
    /// dropped the glyph, so layout does not depend on the clip.
    ///
    /// Returns the column after the last cluster.
    pub fn draw_text(&mut self, x: i32, y: i32, text: &str, style: Style) -> i32 {
        let mut col = x;
        for g in text.graphemes(true) {
            let w = g.width().min(2);
            if w == 0 {
                continue;
            }
            #[allow(clippy::cast_possible_truncation)] // w is 1 or 2
            let w = w as u8;
            // Width is already validated, so this never fails.
            let _ = self.put_grapheme(col, y, g.as_bytes(), w, style);
            col = col.saturating_add(i32::from(w));
        }
        col
    }

    // ─── Lines & Boxes ───────────────────────────────────────────────────

    fn put_ascii(&mut self, x: i32, y: i32, ch: u8, style: Style) {
        if let Some((ux, uy)) = self.can_touch(x, y) {
            self.fb.write_width1(ux, uy, Cell::grapheme(&[ch], 1, style));
        }
    }

    /// A row of `-` starting at `(x, y)`.
    pub fn draw_hline(&mut self, x: i32, y: i32, len: i32, style: Style) {
        for i in 0..len.max(0) {
            self.put_ascii(x.saturating_add(i), y, b'-', style);
        }
    }

    /// A column of `|` starting at `(x, y)`.
    pub fn draw_vline(&mut self, x: i32, y: i32, len: i32, style: Style) {
        for i in 0..len.max(0) {
            self.put_ascii(x, y.saturating_add(i), b'|', style);
        }
    }

    /// An ASCII outline: `+` corners, `-` top and bottom, `|` sides.
    pub fn draw_box(&mut self, rect: Rect, style: Style) {
        if rect.is_empty() {
            return;
        }
        let x2 = rect.x.saturating_add(rect.w - 1);
        let y2 = rect.y.saturating_add(rect.h - 1);
        for (cx, cy) in [(rect.x, rect.y), (x2, rect.y), (rect.x, y2), (x2, y2)] {
            self.put_ascii(cx, cy, b'+', style);
        }
        for x in rect.x.saturating_add(1)..x2 {
            self.put_ascii(x, rect.y, b'-', style);
            self.put_ascii(x, y2, b'-', style);
        }
        for y in rect.y.saturating_add(1)..y2 {
            self.put_ascii(rect.x, y, b'|', style);
            self.put_ascii(x2, y, b'|', style);
        }
    }

    // ─── Blit ────────────────────────────────────────────────────────────

    /// Copy cells from `src` to `dst` inside the same framebuffer.
    ///
    /// The copied area is the smaller of the two sizes. Overlapping copies
    /// iterate in the direction that reads each source cell before it is
    /// overwritten. Continuations are skipped; their leads re-place the
    /// whole wide glyph through [`put_grapheme`](Self::put_grapheme), so the
    /// clip applies at the destination and wide glyphs stay atomic.
    pub fn blit_rect(&mut self, dst: Rect, src: Rect) {
        let w = dst.w.min(src.w);
        let h = dst.h.min(src.h);
        if w <= 0 || h <= 0 {
            return;
        }
        let dst = Rect::new(dst.x, dst.y, w, h);
        let src = Rect::new(src.x, src.y, w, h);
        let overlap = !dst.intersect(src).is_empty();

        let rev_y = overlap && dst.y > src.y;
        let rev_x = overlap && dst.y == src.y && dst.x > src.x;
        let clip = self.clip();

        for oy in 0..h {
            let oy = if rev_y { h - 1 - oy } else { oy };
            for ox in 0..w {
                let ox = if rev_x { w - 1 - ox } else { ox };
                let (sx, sy) = (src.x.saturating_add(ox), src.y.saturating_add(oy));
                let (dx, dy) = (dst.x.saturating_add(ox), dst.y.saturating_add(oy));
                if !clip.contains(dx, dy) {
                    continue;
                }
                let (Ok(usx), Ok(usy)) = (u16::try_from(sx), u16::try_from(sy)) else {
                    continue;
                };
                let Some(&cell) = self.fb.cell(usx, usy) else {
                    continue;
                };
                if cell.is_continuation() {
                    continue;
                }
                let _ = self.put_grapheme(dx, dy, cell.glyph(), cell.width(), cell.style);
            }
        }
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
