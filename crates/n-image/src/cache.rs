// SPDX-License-Identifier: MIT
//
// Image frames and the presenter.
//
// Images live outside the cell grid: each frame the caller collects
// `ImageCommand`s (with their pixel or PNG bytes) into an `ImageFrame` and
// hands it to `ImagePresenter::present`, which emits whatever the chosen
// protocols need.
//
// Kitty images are stateful on the terminal side, so the presenter keeps a
// small cache of what it transmitted. An image whose bytes and dimensions
// match a resident one is only re-placed; an image that wasn't placed in a
// frame is deleted at the end of it. When all slots are taken, the least
// recently placed image is evicted.
//
// Sixel and iTerm2 are stateless: their images are scaled to the target
// cell area and re-sent every frame.
//
// A frame is all-or-nothing. Bytes are built in a private buffer and the
// cache is updated on a copy; both are committed only if every command
// succeeded and the result fit the caller's output buffer.

use std::ops::Range;

use n_term::caps::{DEFAULT_CELL_HEIGHT_PX, DEFAULT_CELL_WIDTH_PX, ImageCaps};
use n_term::error::{Error, Result, checked_add};
use n_term::output::OutputBuffer;

use crate::hash::fnv1a64;
use crate::protocol::{ImageProtocol, select_protocol};
use crate::scale::{FitMode, scale_into_arena};
use crate::scratch::ScratchArena;
use crate::{iterm2, kitty, sixel};

/// Kitty images kept resident at once.
pub const CACHE_SLOTS: usize = 64;

// ─── Commands & Frames ───────────────────────────────────────────────────────

/// What an image command's bytes are.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ImageFormat {
    /// Tightly packed RGBA8, `px_w × px_h × 4` bytes.
    #[default]
    Rgba,
    /// A PNG file. Only iTerm2 can show it as-is.
    Png,
}

/// One image to show this frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ImageCommand {
    /// Top-left cell.
    pub col: u16,
    pub row: u16,
    /// Cell area covered.
    pub cols: u16,
    pub rows: u16,
    /// Caller's id for the image; 0 means anonymous.
    pub image_id: u32,
    /// Source size in pixels.
    pub px_w: u16,
    pub px_h: u16,
    pub format: ImageFormat,
    pub protocol: ImageProtocol,
    /// Kitty z-index: below text when negative.
    pub z: i8,
    pub fit: FitMode,
}

/// A frame's worth of image commands with their bytes.
#[derive(Debug, Clone, Default)]
pub struct ImageFrame {
    commands: Vec<(ImageCommand, Range<usize>)>,
    blob: Vec<u8>,
}

impl ImageFrame {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a command, copying its bytes into the frame.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidArgument`] for a zero cell area or empty bytes.
    pub fn push(&mut self, cmd: ImageCommand, bytes: &[u8]) -> Result<()> {
        if cmd.cols == 0 || cmd.rows == 0 {
            return Err(Error::InvalidArgument("zero cell area"));
        }
        if bytes.is_empty() {
            return Err(Error::InvalidArgument("empty image payload"));
        }
        let start = self.blob.len();
        let end = checked_add(start, bytes.len())?;
        self.blob.extend_from_slice(bytes);
        self.commands.push((cmd, start..end));
        Ok(())
    }

    /// Drop all commands, keeping the allocations.
    pub fn clear(&mut self) {
        self.commands.clear();
        self.blob.clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Commands in push order with their bytes.
    pub fn iter(&self) -> impl Iterator<Item = (&ImageCommand, &[u8])> {
        self.commands.iter().map(|(cmd, range)| (cmd, &self.blob[range.clone()]))
    }
}

// ─── Kitty Cache ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default)]
struct Slot {
    kitty_id: u32,
    image_id: u32,
    hash: u64,
    px_w: u16,
    px_h: u16,
    transmitted: bool,
    placed: bool,
    tick: u64,
}

#[derive(Debug, Clone)]
struct CacheState {
    slots: Vec<Slot>,
    next_kitty_id: u32,
    tick: u64,
}

impl Default for CacheState {
    fn default() -> Self {
        Self {
            slots: Vec::with_capacity(CACHE_SLOTS),
            next_kitty_id: 1,
            tick: 0,
        }
    }
}

impl CacheState {
    fn begin_frame(&mut self) {
        for slot in &mut self.slots {
            slot.placed = false;
        }
    }

    fn find(&self, image_id: u32, hash: u64, px_w: u16, px_h: u16) -> Option<usize> {
        let same_pixels = |s: &Slot| s.transmitted && s.hash == hash && s.px_w == px_w && s.px_h == px_h;
        let by_id = (image_id != 0)
            .then(|| self.slots.iter().position(|s| same_pixels(s) && s.image_id == image_id))
            .flatten();
        by_id.or_else(|| self.slots.iter().position(same_pixels))
    }

    /// A free slot, the first untransmitted one, or the least recently used.
    fn choose_slot(&mut self) -> usize {
        if self.slots.len() < CACHE_SLOTS {
            self.slots.push(Slot::default());
            return self.slots.len() - 1;
        }
        if let Some(i) = self.slots.iter().position(|s| !s.transmitted) {
            return i;
        }
        self.slots
            .iter()
            .enumerate()
            .min_by_key(|(_, s)| s.tick)
            .map_or(0, |(i, _)| i)
    }

    fn next_id(&mut self) -> u32 {
        let id = self.next_kitty_id;
        self.next_kitty_id = self.next_kitty_id.checked_add(1).unwrap_or(1);
        id
    }

    fn mark_placed(&mut self, i: usize) {
        self.tick += 1;
        let slot = &mut self.slots[i];
        slot.placed = true;
        slot.tick = self.tick;
    }
}

// ─── Presenter ───────────────────────────────────────────────────────────────

/// What a `present` call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PresentStats {
    /// Kitty images sent in full.
    pub transmitted: usize,
    /// Kitty images re-placed from the cache.
    pub reused: usize,
    /// Kitty images deleted (evicted or no longer shown).
    pub deleted: usize,
    /// Sixel and iTerm2 images encoded.
    pub encoded: usize,
    /// Commands with no usable protocol.
    pub skipped: usize,
}

/// Emits image frames and tracks which Kitty images the terminal holds.
#[derive(Debug, Clone, Default)]
pub struct ImagePresenter {
    state: CacheState,
    arena: ScratchArena,
}

impl ImagePresenter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A presenter whose scaling and encoding scratch is capped at `budget`
    /// bytes.
    #[must_use]
    pub fn with_scratch_budget(budget: usize) -> Self {
        Self {
            state: CacheState::default(),
            arena: ScratchArena::new(budget),
        }
    }

    /// Kitty images currently resident on the terminal.
    #[must_use]
    pub fn cached(&self) -> usize {
        self.state.slots.iter().filter(|s| s.transmitted).count()
    }

    /// Forget every resident image without deleting anything, for when the
    /// terminal itself was reset.
    pub fn forget(&mut self) {
        self.state = CacheState::default();
    }

    /// Emit `frame` into `out`.
    ///
    /// # Errors
    ///
    /// [`Error::Unsupported`] for a PNG command routed to Kitty or Sixel,
    /// [`Error::InvalidArgument`] for a malformed command, [`Error::Limit`]
    /// when the target size, the scratch budget, or `out` is exceeded. On
    /// error nothing is appended and the cache is unchanged.
    pub fn present(&mut self, frame: &ImageFrame, caps: &ImageCaps, out: &mut OutputBuffer) -> Result<PresentStats> {
        let mut work = self.state.clone();
        let mut buf = OutputBuffer::with_limit(out.remaining());
        let mut stats = PresentStats::default();

        work.begin_frame();
        for (cmd, blob) in frame.iter() {
            match select_protocol(cmd.protocol, caps) {
                ImageProtocol::Kitty => present_kitty(&mut work, &mut buf, cmd, blob, &mut stats)?,
                ImageProtocol::Sixel => {
                    self.present_sixel(&mut buf, cmd, blob, caps)?;
                    stats.encoded += 1;
                }
                ImageProtocol::Iterm2 => {
                    self.present_iterm2(&mut buf, cmd, blob, caps)?;
                    stats.encoded += 1;
                }
                ImageProtocol::Auto | ImageProtocol::None => stats.skipped += 1,
            }
        }
        delete_unplaced(&mut work, &mut buf, &mut stats)?;

        out.append(buf.as_bytes())?;
        self.state = work;
        tracing::trace!(
            transmitted = stats.transmitted,
            reused = stats.reused,
            deleted = stats.deleted,
            encoded = stats.encoded,
            "images presented"
        );
        Ok(stats)
    }

    fn present_sixel(&mut self, buf: &mut OutputBuffer, cmd: &ImageCommand, blob: &[u8], caps: &ImageCaps) -> Result<()> {
        if cmd.format != ImageFormat::Rgba {
            return Err(Error::Unsupported("sixel needs RGBA pixels"));
        }
        let target = target_px(cmd, caps)?;
        self.arena.scope(|arena| {
            let scaled = scale_into_arena(arena, blob, (cmd.px_w, cmd.px_h), cmd.fit, target)?;
            sixel::encode(buf, arena, &scaled, target.0, target.1, cmd.col, cmd.row)
        })
    }

    fn present_iterm2(&mut self, buf: &mut OutputBuffer, cmd: &ImageCommand, blob: &[u8], caps: &ImageCaps) -> Result<()> {
        if cmd.format == ImageFormat::Png {
            return iterm2::emit_png(buf, blob, cmd.col, cmd.row, cmd.cols, cmd.rows);
        }
        let target = target_px(cmd, caps)?;
        self.arena.scope(|arena| {
            let scaled = scale_into_arena(arena, blob, (cmd.px_w, cmd.px_h), cmd.fit, target)?;
            iterm2::emit_rgba(buf, arena, &scaled, target.0, target.1, cmd.col, cmd.row, cmd.cols, cmd.rows)
        })
    }
}

/// Pixel size of the command's cell area.
fn target_px(cmd: &ImageCommand, caps: &ImageCaps) -> Result<(u16, u16)> {
    let cell_w = if caps.cell_width_px == 0 { DEFAULT_CELL_WIDTH_PX } else { caps.cell_width_px };
    let cell_h = if caps.cell_height_px == 0 { DEFAULT_CELL_HEIGHT_PX } else { caps.cell_height_px };
    let w = u32::from(cmd.cols).checked_mul(cell_w).and_then(|v| u16::try_from(v).ok());
    let h = u32::from(cmd.rows).checked_mul(cell_h).and_then(|v| u16::try_from(v).ok());
    match (w, h) {
        (Some(w), Some(h)) if w > 0 && h > 0 => Ok((w, h)),
        _ => Err(Error::Limit("image target size exceeds 65535 pixels")),
    }
}

fn present_kitty(
    state: &mut CacheState,
    buf: &mut OutputBuffer,
    cmd: &ImageCommand,
    blob: &[u8],
    stats: &mut PresentStats,
) -> Result<()> {
    if cmd.format != ImageFormat::Rgba {
        return Err(Error::Unsupported("kitty transmit needs RGBA pixels"));
    }
    let hash = fnv1a64(blob);

    if let Some(i) = state.find(cmd.image_id, hash, cmd.px_w, cmd.px_h) {
        tracing::debug!(kitty_id = state.slots[i].kitty_id, "kitty cache hit");
        kitty::place(buf, state.slots[i].kitty_id, cmd.col, cmd.row, cmd.cols, cmd.rows, i32::from(cmd.z))?;
        state.mark_placed(i);
        stats.reused += 1;
        return Ok(());
    }

    let i = state.choose_slot();
    if state.slots[i].transmitted {
        tracing::debug!(kitty_id = state.slots[i].kitty_id, "evicting kitty image");
        kitty::delete(buf, state.slots[i].kitty_id)?;
        stats.deleted += 1;
    }
    let kitty_id = state.next_id();
    state.slots[i] = Slot {
        kitty_id,
        image_id: cmd.image_id,
        hash,
        px_w: cmd.px_w,
        px_h: cmd.px_h,
        ..Slot::default()
    };

    kitty::transmit(buf, kitty_id, blob, cmd.px_w, cmd.px_h, cmd.cols, cmd.rows)?;
    kitty::place(buf, kitty_id, cmd.col, cmd.row, cmd.cols, cmd.rows, i32::from(cmd.z))?;
    state.slots[i].transmitted = true;
    state.mark_placed(i);
    stats.transmitted += 1;
    Ok(())
}

fn delete_unplaced(state: &mut CacheState, buf: &mut OutputBuffer, stats: &mut PresentStats) -> Result<()> {
    for slot in &mut state.slots {
        if slot.transmitted && !slot.placed {
            kitty::delete(buf, slot.kitty_id)?;
            *slot = Slot::default();
            stats.deleted += 1;
        }
    }
    Ok(())
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn kitty_caps() -> ImageCaps {
        ImageCaps {
            supports_kitty: true,
            ..ImageCaps::default()
        }
    }

    fn rgba_cmd(col: u16, image_id: u32) -> ImageCommand {
        ImageCommand {
            col,
            cols: 2,
            rows: 1,
            image_id,
            px_w: 2,
            px_h: 2,
            ..ImageCommand::default()
        }
    }

    fn pixels(seed: u8) -> Vec<u8> {
        (0..16).map(|i| seed.wrapping_add(i)).collect()
    }

    fn frame(cmds: &[(ImageCommand, Vec<u8>)]) -> ImageFrame {
        let mut f = ImageFrame::new();
        for (cmd, bytes) in cmds {
            f.push(*cmd, bytes).unwrap();
        }
        f
    }

    fn present(p: &mut ImagePresenter, f: &ImageFrame, caps: &ImageCaps) -> (PresentStats, String) {
        let mut out = OutputBuffer::new();
        let stats = p.present(f, caps, &mut out).unwrap();
        (stats, String::from_utf8(out.take()).unwrap())
    }

    // ── Frames ──────────────────────────────────────────────────────────

    #[test]
    fn frame_keeps_bytes_per_command() {
        let f = frame(&[(rgba_cmd(0, 1), pixels(0)), (rgba_cmd(4, 2), pixels(100))]);
        let items: Vec<_> = f.iter().collect();
        assert_eq!(items.len(), 2);
        assert_eq!(items[1].1, pixels(100).as_slice());
        assert_eq!(items[1].0.col, 4);
    }

    #[test]
    fn frame_rejects_empty_area() {
        let mut f = ImageFrame::new();
        let cmd = ImageCommand { cols: 0, ..rgba_cmd(0, 1) };
        assert!(matches!(f.push(cmd, &pixels(0)), Err(Error::InvalidArgument(_))));
        assert!(matches!(f.push(rgba_cmd(0, 1), &[]), Err(Error::InvalidArgument(_))));
        assert!(f.is_empty());
    }

    // ── Kitty Cache ─────────────────────────────────────────────────────

    #[test]
    fn second_frame_places_without_retransmitting() {
        let mut p = ImagePresenter::new();
        let f = frame(&[(rgba_cmd(0, 1), pixels(0))]);

        let (stats, out) = present(&mut p, &f, &kitty_caps());
        assert_eq!(stats.transmitted, 1);
        assert!(out.contains("a=t,f=32,s=2,v=2,i=1,"));
        assert!(out.ends_with("\x1b[1;1H\x1b_Ga=p,i=1,c=2,r=1,z=0\x1b\\"));

        let (stats, out) = present(&mut p, &f, &kitty_caps());
        assert_eq!(stats, PresentStats { reused: 1, ..PresentStats::default() });
        assert_eq!(out, "\x1b[1;1H\x1b_Ga=p,i=1,c=2,r=1,z=0\x1b\\");
    }

    #[test]
    fn same_pixels_under_another_id_reuse_the_image() {
        let mut p = ImagePresenter::new();
        present(&mut p, &frame(&[(rgba_cmd(0, 1), pixels(0))]), &kitty_caps());
        let (stats, _) = present(&mut p, &frame(&[(rgba_cmd(3, 9), pixels(0))]), &kitty_caps());
        assert_eq!(stats.reused, 1);
        assert_eq!(stats.transmitted, 0);
    }

    #[test]
    fn images_not_placed_are_deleted() {
        let mut p = ImagePresenter::new();
        present(&mut p, &frame(&[(rgba_cmd(0, 1), pixels(0))]), &kitty_caps());
        assert_eq!(p.cached(), 1);

        let (stats, out) = present(&mut p, &ImageFrame::new(), &kitty_caps());
        assert_eq!(stats.deleted, 1);
        assert_eq!(out, "\x1b_Ga=d,d=i,i=1\x1b\\");
        assert_eq!(p.cached(), 0);
    }

    #[test]
    fn changed_pixels_get_a_fresh_id() {
        let mut p = ImagePresenter::new();
        present(&mut p, &frame(&[(rgba_cmd(0, 1), pixels(0))]), &kitty_caps());
        let (stats, out) = present(&mut p, &frame(&[(rgba_cmd(0, 1), pixels(50))]), &kitty_caps());
        assert_eq!(stats.transmitted, 1);
        assert_eq!(stats.deleted, 1);
        assert!(out.contains("i=2,"));
        assert!(out.ends_with("\x1b_Ga=d,d=i,i=1\x1b\\"));
    }

    #[test]
    fn full_cache_evicts_least_recently_placed() {
        let mut p = ImagePresenter::new();
        let cmds: Vec<_> = (0..=CACHE_SLOTS)
            .map(|i| {
                let seed = u8::try_from(i).unwrap();
                (rgba_cmd(0, u32::from(seed) + 1), vec![seed; 16])
            })
            .collect();
        let (stats, out) = present(&mut p, &frame(&cmds), &kitty_caps());
        assert_eq!(stats.transmitted, CACHE_SLOTS + 1);
        assert_eq!(stats.deleted, 1);
        assert!(out.contains("\x1b_Ga=d,d=i,i=1\x1b\\"));
        assert_eq!(p.cached(), CACHE_SLOTS);
    }

    #[test]
    fn png_cannot_go_to_kitty() {
        let mut p = ImagePresenter::new();
        let cmd = ImageCommand { format: ImageFormat::Png, ..rgba_cmd(0, 1) };
        let f = frame(&[(rgba_cmd(0, 1), pixels(0)), (cmd, b"png".to_vec())]);
        let mut out = OutputBuffer::new();
        assert!(matches!(p.present(&f, &kitty_caps(), &mut out), Err(Error::Unsupported(_))));
        assert!(out.is_empty());
        assert_eq!(p.cached(), 0);
    }

    #[test]
    fn full_output_leaves_cache_untouched() {
        let mut p = ImagePresenter::new();
        let f = frame(&[(rgba_cmd(0, 1), pixels(0))]);
        let mut out = OutputBuffer::with_limit(20);
        assert!(matches!(p.present(&f, &kitty_caps(), &mut out), Err(Error::Limit(_))));
        assert!(out.is_empty());
        assert_eq!(p.cached(), 0);

        // Retrying with room transmits from scratch.
        let (stats, _) = present(&mut p, &f, &kitty_caps());
        assert_eq!(stats.transmitted, 1);
    }

    // ── Stateless Protocols ─────────────────────────────────────────────

    #[test]
    fn sixel_scales_to_cell_area() {
        let caps = ImageCaps {
            supports_sixel: true,
            ..ImageCaps::default()
        };
        let mut p = ImagePresenter::new();
        let (stats, out) = present(&mut p, &frame(&[(rgba_cmd(1, 0), pixels(0))]), &caps);
        assert_eq!(stats.encoded, 1);
        // 2×1 cells at 8×16 px.
        assert!(out.starts_with("\x1b[1;2H\x1bP0;1;0q\"1;1;16;16"));
        assert_eq!(p.cached(), 0);
    }

    #[test]
    fn iterm2_passes_png_through() {
        let caps = ImageCaps {
            supports_iterm2: true,
            ..ImageCaps::default()
        };
        let mut p = ImagePresenter::new();
        let cmd = ImageCommand { format: ImageFormat::Png, ..rgba_cmd(0, 0) };
        let (_, out) = present(&mut p, &frame(&[(cmd, b"abc".to_vec())]), &caps);
        assert_eq!(out, "\x1b[1;1H\x1b]1337;File=inline=1;width=2;height=1;preserveAspectRatio=1;size=3:YWJj\x07");
    }

    #[test]
    fn iterm2_encodes_rgba_at_target_size() {
        let caps = ImageCaps {
            supports_iterm2: true,
            cell_width_px: 4,
            cell_height_px: 4,
            ..ImageCaps::default()
        };
        let mut p = ImagePresenter::new();
        let (stats, out) = present(&mut p, &frame(&[(rgba_cmd(0, 0), pixels(0))]), &caps);
        assert_eq!(stats.encoded, 1);
        assert!(out.contains("width=2;height=1;preserveAspectRatio=1;size="));
    }

    #[test]
    fn no_protocol_skips() {
        let mut p = ImagePresenter::new();
        let (stats, out) = present(&mut p, &frame(&[(rgba_cmd(0, 0), pixels(0))]), &ImageCaps::default());
        assert_eq!(stats.skipped, 1);
        assert_eq!(out, "");
    }

    #[test]
    fn oversized_target_is_limit() {
        let caps = ImageCaps {
            supports_sixel: true,
            ..ImageCaps::default()
        };
        let cmd = ImageCommand { cols: 9000, ..rgba_cmd(0, 0) };
        let mut p = ImagePresenter::new();
        let mut out = OutputBuffer::new();
        assert!(matches!(p.present(&frame(&[(cmd, pixels(0))]), &caps, &mut out), Err(Error::Limit(_))));
    }
}
