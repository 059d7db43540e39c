// SPDX-License-Identifier: MIT
//
// Differential renderer: turns the next frame into the fewest bytes that move
// the terminal from the previous one.
//
// Instead of redrawing the entire screen every frame, we compare the new
// FrameBuffer against the previous one and emit escape sequences only for
// cells that actually changed.
//
// The pipeline per frame:
//
//   1. The caller paints a FrameBuffer (the "next" frame).
//   2. RenderSession::render() compares it with the retained previous frame
//      and builds, per row, runs of changed columns.
//   3. Each run is written with the fewest bytes the tracked terminal state
//      allows: CUP only when the cursor isn't already there, SGR only when
//      the style differs (and as a delta when nothing must be removed).
//   4. Rows that merely moved up or down are shifted by the terminal itself
//      (DECSTBM + SU/SD) and only the exposed rows are redrawn.
//   5. The frame lands in OutputBuffer in one piece, optionally wrapped in
//      synchronized-update markers, or not at all.
//
// Session state (previous frame, TermState) only changes after a frame was
// built completely and fit its byte budget. A failed render leaves the
// session exactly as it was, so retrying is always safe.
//
// Optimizations:
//
//   - Row-level skip: unchanged rows are detected with one slice comparison.
//   - Zero allocation in steady state: the previous frame is reused via
//     copy_from() and the frame scratch buffer keeps its capacity.

use std::io::{self, Write};

use crate::ansi::{self, CursorShape, SgrStyle};
use crate::buffer::FrameBuffer;
use crate::caps::{RenderOptions, TermCaps};
use crate::cell::{Cell, Style};
use crate::error::{Error, Result};
use crate::output::OutputBuffer;
use crate::scroll::{self, ScrollPlan};

// ─── RenderStats ─────────────────────────────────────────────────────────────

/// What a render pass did, for profiling and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RenderStats {
    /// Rows that had at least one cell written.
    pub dirty_lines: usize,
    /// Cells covered by written runs.
    pub dirty_cells: usize,
    /// The screen was cleared and every cell written.
    pub full_redraw: bool,
    /// Scroll detection ran.
    pub scroll_attempted: bool,
    /// A scroll region was used.
    pub scroll_hit: bool,
    /// Bytes appended to the output buffer.
    pub bytes: usize,
}

// ─── Terminal State ──────────────────────────────────────────────────────────

/// What the renderer believes the terminal currently looks like.
///
/// `None` means unknown: the next frame must emit the corresponding
/// sequence before relying on it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TermState {
    /// Cursor column and row. The column may equal the width right after a
    /// glyph was written in the last column.
    pub cursor: Option<(u16, u16)>,
    /// Last style emitted.
    pub style: Option<SgrStyle>,
    /// URI of the OSC 8 link currently open. `None` is "no link".
    pub link: Option<String>,
    pub cursor_visible: Option<bool>,
    pub cursor_shape: Option<CursorShape>,
}

/// Where the caller wants the hardware cursor after the frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CursorRequest {
    /// Column, or -1 to keep the current one. Clamped to the grid.
    pub x: i32,
    /// Row, or -1 to keep the current one. Clamped to the grid.
    pub y: i32,
    pub visible: bool,
    pub shape: CursorShape,
}

impl CursorRequest {
    /// A visible default-shape cursor at `(x, y)`.
    #[must_use]
    pub const fn at(x: i32, y: i32) -> Self {
        Self {
            x,
            y,
            visible: true,
            shape: CursorShape::Default,
        }
    }

    /// A hidden cursor left where it is.
    #[must_use]
    pub const fn hidden() -> Self {
        Self {
            x: -1,
            y: -1,
            visible: false,
            shape: CursorShape::Default,
        }
    }

    #[must_use]
    pub const fn with_shape(self, shape: CursorShape) -> Self {
        Self { shape, ..self }
    }
}

impl Default for CursorRequest {
    fn default() -> Self {
        Self::at(-1, -1)
    }
}

// ─── RenderSession ───────────────────────────────────────────────────────────

/// Differential renderer that emits escape sequences only for changed cells.
///
/// Owns the previous frame, the tracked [`TermState`], and the
/// [`OutputBuffer`] frames are appended to. Independent sessions never share
/// state.
///
/// # Usage
///
/// ```no_run
/// use n_term::buffer::FrameBuffer;
/// use n_term::caps::{RenderOptions, TermCaps};
/// use n_term::diff::RenderSession;
///
/// let mut session = RenderSession::new(RenderOptions::default());
/// let caps = TermCaps::default();
/// let frame = FrameBuffer::new(80, 24);
///
/// // Paint your UI into `frame`...
///
/// let stats = session.render(&frame, &caps, None).unwrap();
/// session.flush().unwrap();
/// // stats.dirty_cells tells you how much work was done.
/// ```
#[derive(Debug)]
pub struct RenderSession {
    output: OutputBuffer,
    previous: Option<FrameBuffer>,
    state: TermState,
    options: RenderOptions,
    scratch: Vec<u8>,
}

impl RenderSession {
    /// A session with no previous frame (the first render draws everything).
    #[must_use]
    pub fn new(options: RenderOptions) -> Self {
        Self::with_output(options, OutputBuffer::new())
    }

    /// A session that appends to `output`, which may carry a hard limit.
    #[must_use]
    pub fn with_output(options: RenderOptions, output: OutputBuffer) -> Self {
        Self {
            output,
            previous: None,
            state: TermState::default(),
            options,
            scratch: Vec::new(),
        }
    }

    #[must_use]
    pub const fn options(&self) -> &RenderOptions {
        &self.options
    }

    /// The tracked terminal state after the last successful render.
    #[must_use]
    pub const fn state(&self) -> &TermState {
        &self.state
    }

    /// The frame the terminal is believed to show.
    #[must_use]
    pub const fn previous(&self) -> Option<&FrameBuffer> {
        self.previous.as_ref()
    }

    /// Bytes rendered since the last flush.
    #[must_use]
    pub fn output_bytes(&self) -> &[u8] {
        self.output.as_bytes()
    }

    /// Take the pending bytes without writing them anywhere.
    pub fn take_output(&mut self) -> Vec<u8> {
        self.output.take()
    }

    /// Write pending output to stdout.
    ///
    /// # Errors
    ///
    /// Returns an error if writing to stdout fails.
    pub fn flush(&mut self) -> io::Result<()> {
        self.output.flush_stdout()
    }

    /// Write pending output to `w`.
    ///
    /// # Errors
    ///
    /// Returns an error if writing to `w` fails.
    pub fn flush_to(&mut self, w: &mut impl Write) -> io::Result<()> {
        self.output.flush_to(w)
    }

    /// Forget the previous frame and everything known about the terminal,
    /// so the next render clears and draws everything.
    pub fn force_redraw(&mut self) {
        self.previous = None;
        self.state = TermState::default();
    }

    /// Diff `next` against the previous frame and append the bytes that
    /// turn one into the other.
    ///
    /// # Errors
    ///
    /// [`Error::Limit`] when the frame exceeds `max_frame_bytes` or doesn't
    /// fit the output buffer. Nothing is appended and the session is
    /// unchanged.
    pub fn render(
        &mut self,
        next: &FrameBuffer,
        caps: &TermCaps,
        cursor: Option<&CursorRequest>,
    ) -> Result<RenderStats> {
        let scratch = std::mem::take(&mut self.scratch);
        let mut writer = FrameWriter::new(scratch, self.state.clone(), caps, next, self.options.max_frame_bytes);
        let built = writer.frame(self.previous.as_ref(), self.options.scroll_optimization, cursor);
        let FrameWriter { buf, state, stats, .. } = writer;

        let committed = built.and_then(|()| self.commit_bytes(&buf));
        self.scratch = buf;
        committed?;

        self.state = state;
        self.store_frame(next);
        tracing::trace!(
            dirty_lines = stats.dirty_lines,
            dirty_cells = stats.dirty_cells,
            scroll_hit = stats.scroll_hit,
            bytes = stats.bytes,
            "frame rendered"
        );
        Ok(stats)
    }

    fn commit_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        if bytes.len() > self.options.max_frame_bytes {
            tracing::warn!(
                bytes = bytes.len(),
                budget = self.options.max_frame_bytes,
                "frame exceeds byte budget"
            );
            return Err(Error::Limit("frame exceeds max_frame_bytes"));
        }
        self.output.append(bytes)
    }

    /// Store the frame for the next diff, reusing the allocation when the
    /// size matches.
    fn store_frame(&mut self, current: &FrameBuffer) {
        match &mut self.previous {
            Some(prev) if prev.width() == current.width() && prev.height() == current.height() => {
                prev.copy_from(current);
            }
            _ => self.previous = Some(current.clone()),
        }
    }
}

impl Default for RenderSession {
    fn default() -> Self {
        Self::new(RenderOptions::default())
    }
}

// ─── Cell Comparison ─────────────────────────────────────────────────────────

/// Compares cells across two frames. Link ids are frame-local, so when the
/// link tables differ, linked cells compare by URI.
struct CellCompare<'a> {
    prev: &'a FrameBuffer,
    next: &'a FrameBuffer,
    same_links: bool,
}

impl<'a> CellCompare<'a> {
    fn new(prev: &'a FrameBuffer, next: &'a FrameBuffer) -> Self {
        Self {
            prev,
            next,
            same_links: prev.same_links(next),
        }
    }

    fn cell_eq(&self, old: &Cell, new: &Cell) -> bool {
        if self.same_links || (old.style.link == 0 && new.style.link == 0) {
            return old == new;
        }
        let unlinked = |c: &Cell| c.with_style(Style { link: 0, ..c.style });
        unlinked(old) == unlinked(new)
            && self.prev.link_uri(old.style.link) == self.next.link_uri(new.style.link)
    }

    /// Row `ny` of the next frame against row `py` of the previous one.
    fn row_eq(&self, ny: u16, py: u16) -> bool {
        match (self.next.row(ny), self.prev.row(py)) {
            (Some(n), Some(p)) if self.same_links => n == p,
            (Some(n), Some(p)) => n.len() == p.len() && p.iter().zip(n).all(|(a, b)| self.cell_eq(a, b)),
            _ => false,
        }
    }

    /// Whether `(x, y)` must be rewritten. A lead is dirty when its
    /// continuation changed, since the continuation is never written alone.
    fn dirty_at(&self, x: u16, y: u16) -> bool {
        let (Some(old), Some(new)) = (self.prev.cell(x, y), self.next.cell(x, y)) else {
            return false;
        };
        if !self.cell_eq(old, new) {
            return true;
        }
        let Some(x1) = x.checked_add(1) else {
            return false;
        };
        match (self.prev.cell(x1, y), self.next.cell(x1, y)) {
            (Some(old1), Some(new1)) => {
                (old1.is_continuation() || new1.is_continuation()) && !self.cell_eq(old1, new1)
            }
            _ => false,
        }
    }
}

/// Widen `[start, end]` so it never starts on a continuation and never ends
/// between a lead and its continuation.
fn expand_span_for_wide(next: &FrameBuffer, y: u16, start: u16, end: u16) -> (u16, u16) {
    let mut start = start;
    let mut end = end;
    if start > 0 && next.cell(start, y).is_some_and(Cell::is_continuation) {
        start -= 1;
    }
    if next.cell(end, y).is_some_and(Cell::is_wide) && end + 1 < next.width() {
        end += 1;
    }
    (start, end)
}

// ─── Frame Writer ────────────────────────────────────────────────────────────

/// Builds one frame into a scratch buffer against a working copy of the
/// terminal state. Dropped without effect when anything fails.
struct FrameWriter<'a> {
    buf: Vec<u8>,
    state: TermState,
    stats: RenderStats,
    caps: &'a TermCaps,
    next: &'a FrameBuffer,
    budget: usize,
}

impl<'a> FrameWriter<'a> {
    fn new(mut buf: Vec<u8>, state: TermState, caps: &'a TermCaps, next: &'a FrameBuffer, budget: usize) -> Self {
        buf.clear();
        Self {
            buf,
            state,
            stats: RenderStats::default(),
            caps,
            next,
            budget,
        }
    }

    fn frame(
        &mut self,
        previous: Option<&FrameBuffer>,
        scroll_optimization: bool,
        cursor: Option<&CursorRequest>,
    ) -> Result<()> {
        let (w, h) = (self.next.width(), self.next.height());
        if w == 0 || h == 0 {
            return Ok(());
        }

        let sync = self.caps.supports_sync_update;
        if sync {
            ansi::begin_sync(&mut self.buf)?;
        }
        let body_start = self.buf.len();

        match previous.filter(|p| p.width() == w && p.height() == h) {
            Some(prev) => self.diff(prev, scroll_optimization)?,
            None => self.full_redraw()?,
        }
        self.apply_cursor(cursor)?;
        self.close_link()?;

        if self.buf.len() == body_start {
            self.buf.clear();
        } else if sync {
            ansi::end_sync(&mut self.buf)?;
        }
        self.stats.bytes = self.buf.len();
        Ok(())
    }

    fn check_budget(&self) -> Result<()> {
        if self.buf.len() > self.budget {
            return Err(Error::Limit("frame exceeds max_frame_bytes"));
        }
        Ok(())
    }

    // ── Passes ──────────────────────────────────────────────────────────

    fn full_redraw(&mut self) -> Result<()> {
        let (w, h) = (self.next.width(), self.next.height());
        tracing::debug!(w, h, "full redraw");
        ansi::reset(&mut self.buf)?;
        ansi::clear_screen(&mut self.buf)?;
        self.state.style = None;
        self.state.cursor = None;
        self.stats.full_redraw = true;
        for y in 0..h {
            self.render_full_line(y)?;
            self.check_budget()?;
        }
        Ok(())
    }

    fn diff(&mut self, prev: &FrameBuffer, scroll_optimization: bool) -> Result<()> {
        let (w, h) = (self.next.width(), self.next.height());
        let cmp = CellCompare::new(prev, self.next);
        let dirty_rows = (0..h).filter(|&y| !cmp.row_eq(y, y)).count();
        if dirty_rows == 0 {
            return Ok(());
        }

        let mut skip = None;
        if scroll_optimization && self.caps.supports_scroll_region {
            self.stats.scroll_attempted = true;
            if let Some(plan) = scroll::detect(h, w, dirty_rows, |ny, py| cmp.row_eq(ny, py)) {
                self.apply_scroll(&plan)?;
                skip = Some(plan.top..=plan.bottom);
            }
        }

        for y in 0..h {
            if skip.as_ref().is_some_and(|r| r.contains(&y)) || cmp.row_eq(y, y) {
                continue;
            }
            self.render_line(&cmp, y)?;
            self.check_budget()?;
        }
        Ok(())
    }

    fn apply_scroll(&mut self, plan: &ScrollPlan) -> Result<()> {
        tracing::debug!(?plan, "scroll region");
        self.stats.scroll_hit = true;
        ansi::set_scroll_region(&mut self.buf, plan.top, plan.bottom)?;
        if plan.up {
            ansi::scroll_up(&mut self.buf, plan.lines)?;
        } else {
            ansi::scroll_down(&mut self.buf, plan.lines)?;
        }
        ansi::reset_scroll_region(&mut self.buf)?;
        // DECSTBM homes the cursor.
        self.state.cursor = None;
        for y in plan.exposed() {
            self.render_full_line(y)?;
        }
        self.check_budget()
    }

    // ── Rows & Spans ────────────────────────────────────────────────────

    fn render_full_line(&mut self, y: u16) -> Result<()> {
        let w = self.next.width();
        self.render_span(y, 0, w - 1)?;
        self.stats.dirty_lines += 1;
        self.stats.dirty_cells += usize::from(w);
        Ok(())
    }

    fn render_line(&mut self, cmp: &CellCompare<'_>, y: u16) -> Result<()> {
        let w = self.next.width();
        let mut dirty = false;
        let mut x = 0;
        while x < w {
            if !cmp.dirty_at(x, y) {
                x += 1;
                continue;
            }
            let run_start = x;
            while x < w && cmp.dirty_at(x, y) {
                x += 1;
            }
            let (start, end) = expand_span_for_wide(self.next, y, run_start, x - 1);
            self.render_span(y, start, end)?;
            self.stats.dirty_cells += usize::from(end - start) + 1;
            dirty = true;
            x = x.max(end + 1);
        }
        if dirty {
            self.stats.dirty_lines += 1;
        }
        Ok(())
    }

    /// Write columns `start..=end` of row `y`. Continuations are implied by
    /// their lead and skipped.
    fn render_span(&mut self, y: u16, start: u16, end: u16) -> Result<()> {
        let next = self.next;
        for x in start..=end {
            let Some(cell) = next.cell(x, y) else {
                continue;
            };
            if cell.is_continuation() {
                continue;
            }
            self.move_to(x, y)?;
            self.set_style(&cell.style)?;
            self.set_link(cell.style.link)?;
            self.buf.write_all(cell.glyph())?;
            self.state.cursor = Some((x.saturating_add(u16::from(cell.width())), y));
        }
        Ok(())
    }

    // ── Terminal State ──────────────────────────────────────────────────

    fn move_to(&mut self, x: u16, y: u16) -> Result<()> {
        if self.state.cursor != Some((x, y)) {
            ansi::cursor_to(&mut self.buf, x, y)?;
            self.state.cursor = Some((x, y));
        }
        Ok(())
    }

    fn set_style(&mut self, style: &Style) -> Result<()> {
        let desired = self.caps.resolve(style);
        match self.state.style {
            Some(current) if current == desired => return Ok(()),
            Some(current) => ansi::sgr_delta(&mut self.buf, &current, &desired)?,
            None => ansi::sgr_absolute(&mut self.buf, &desired)?,
        }
        self.state.style = Some(desired);
        Ok(())
    }

    fn set_link(&mut self, id: u32) -> Result<()> {
        if !self.caps.supports_hyperlinks {
            return Ok(());
        }
        let uri = self.next.link_uri(id);
        if self.state.link.as_deref() == uri {
            return Ok(());
        }
        if self.state.link.is_some() {
            ansi::hyperlink_close(&mut self.buf)?;
        }
        if let Some(uri) = uri {
            ansi::hyperlink_open(&mut self.buf, uri)?;
        }
        self.state.link = uri.map(str::to_owned);
        Ok(())
    }

    fn close_link(&mut self) -> Result<()> {
        if self.state.link.take().is_some() {
            ansi::hyperlink_close(&mut self.buf)?;
        }
        Ok(())
    }

    fn apply_cursor(&mut self, req: Option<&CursorRequest>) -> Result<()> {
        let Some(req) = req else {
            return Ok(());
        };
        if self.caps.supports_cursor_shape && self.state.cursor_shape != Some(req.shape) {
            ansi::set_cursor_shape(&mut self.buf, req.shape)?;
            self.state.cursor_shape = Some(req.shape);
        }
        if self.state.cursor_visible != Some(req.visible) {
            if req.visible {
                ansi::cursor_show(&mut self.buf)?;
            } else {
                ansi::cursor_hide(&mut self.buf)?;
            }
            self.state.cursor_visible = Some(req.visible);
        }

        if req.x == -1 && req.y == -1 && self.state.cursor.is_none() {
            return Ok(());
        }
        let (cx, cy) = self.state.cursor.unwrap_or((0, 0));
        let x = if req.x == -1 { cx } else { clamp_axis(req.x, self.next.width()) };
        let y = if req.y == -1 { cy } else { clamp_axis(req.y, self.next.height()) };
        self.move_to(x, y)
    }
}

/// Clamp `v` into `0..len`. `len` is non-zero.
fn clamp_axis(v: i32, len: u16) -> u16 {
    u16::try_from(v.clamp(0, i32::from(len) - 1)).unwrap_or(0)
}

// ─── Tests ───────────────────────────────────────────────────────────────────
