// SPDX-License-Identifier: MIT
//
// ANSI escape sequence generation.
//
// Pure functions that write escape sequences to any `impl Write`. No state,
// no decisions about when to emit. Deciding is the `RenderSession`'s job;
// this module only knows the byte-level encoding of every terminal command
// the engine needs.
//
// All positions are 0-indexed in our API and converted to 1-indexed for the
// terminal (CUP and DECSTBM are 1-based).
//
// Writers are `OutputBuffer` or a plain `Vec<u8>`; errors only surface when
// a bounded buffer is full.

use std::io::{self, Write};

use crate::cell::Attr;
use crate::color::CellColor;

// ─── Cursor ──────────────────────────────────────────────────────────────────

/// Move the cursor to `(x, y)` (CUP).
#[inline]
pub fn cursor_to(w: &mut impl Write, x: u16, y: u16) -> io::Result<()> {
    write!(w, "\x1b[{};{}H", u32::from(y) + 1, u32::from(x) + 1)
}

/// Hide the cursor (DECTCEM reset).
#[inline]
pub fn cursor_hide(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[?25l")
}

/// Show the cursor (DECTCEM set).
#[inline]
pub fn cursor_show(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[?25h")
}

/// Terminal cursor shape (DECSCUSR).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CursorShape {
    /// Terminal default (usually blinking block).
    #[default]
    Default,
    BlinkBlock,
    SteadyBlock,
    BlinkUnderline,
    SteadyUnderline,
    BlinkBar,
    SteadyBar,
}

impl CursorShape {
    /// The DECSCUSR parameter.
    #[must_use]
    pub const fn ps(self) -> u8 {
        match self {
            Self::Default => 0,
            Self::BlinkBlock => 1,
            Self::SteadyBlock => 2,
            Self::BlinkUnderline => 3,
            Self::SteadyUnderline => 4,
            Self::BlinkBar => 5,
            Self::SteadyBar => 6,
        }
    }
}

/// Set the cursor shape (`ESC[<n> q`).
#[inline]
pub fn set_cursor_shape(w: &mut impl Write, shape: CursorShape) -> io::Result<()> {
    write!(w, "\x1b[{} q", shape.ps())
}

// ─── Screen ──────────────────────────────────────────────────────────────────

/// Clear the entire screen (ED 2).
#[inline]
pub fn clear_screen(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[2J")
}

/// Reset all SGR attributes to terminal defaults (SGR 0).
///
/// The renderer must forget its tracked style after calling this.
#[inline]
pub fn reset(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[0m")
}

// ─── Scrolling ───────────────────────────────────────────────────────────────

/// Restrict scrolling to rows `top..=bottom` (DECSTBM). Homes the cursor.
#[inline]
pub fn set_scroll_region(w: &mut impl Write, top: u16, bottom: u16) -> io::Result<()> {
    write!(w, "\x1b[{};{}r", u32::from(top) + 1, u32::from(bottom) + 1)
}

/// Restore the full-screen scroll region. Homes the cursor.
#[inline]
pub fn reset_scroll_region(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[r")
}

/// Scroll the region up by `n` lines (SU). New lines appear at the bottom.
#[inline]
pub fn scroll_up(w: &mut impl Write, n: u16) -> io::Result<()> {
    write!(w, "\x1b[{n}S")
}

/// Scroll the region down by `n` lines (SD). New lines appear at the top.
#[inline]
pub fn scroll_down(w: &mut impl Write, n: u16) -> io::Result<()> {
    write!(w, "\x1b[{n}T")
}

// ─── Colors ──────────────────────────────────────────────────────────────────

/// Write the SGR parameters selecting `color` without the CSI wrapper.
///
/// `base` is 30 for foreground and 40 for background. Palette indices 0–7
/// use `base + idx`, 8–15 the bright range `base + 60 + (idx − 8)`, and the
/// rest the extended `base+8;5;n` form. RGB uses `base+8;2;r;g;b`.
fn color_params(w: &mut impl Write, color: CellColor, base: u8) -> io::Result<()> {
    let base = u16::from(base);
    match color {
        CellColor::Ansi256(idx) if idx < 8 => write!(w, "{}", base + u16::from(idx)),
        CellColor::Ansi256(idx) if idx < 16 => write!(w, "{}", base + 52 + u16::from(idx)),
        CellColor::Ansi256(idx) => write!(w, "{};5;{idx}", base + 8),
        CellColor::Rgb(r, g, b) => write!(w, "{};2;{r};{g};{b}", base + 8),
    }
}

fn underline_color_params(w: &mut impl Write, rgb: u32) -> io::Result<()> {
    let [_, r, g, b] = rgb.to_be_bytes();
    write!(w, "58:2::{r}:{g}:{b}")
}

// ─── SGR ─────────────────────────────────────────────────────────────────────

/// A style as the terminal sees it: colors already degraded to the color
/// mode, attributes already masked to what the terminal supports.
///
/// `underline_rgb` of 0 means "terminal default underline color".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SgrStyle {
    pub fg: CellColor,
    pub bg: CellColor,
    pub attrs: Attr,
    pub underline_rgb: u32,
}

/// Establish `style` from scratch: `ESC[0;<attrs>;<fg>;<bg>[;58:2::r:g:b]m`.
pub fn sgr_absolute(w: &mut impl Write, style: &SgrStyle) -> io::Result<()> {
    w.write_all(b"\x1b[0")?;
    for (flag, code) in Attr::SGR_CODES {
        if style.attrs.contains(flag) {
            write!(w, ";{code}")?;
        }
    }
    w.write_all(b";")?;
    color_params(w, style.fg, 30)?;
    w.write_all(b";")?;
    color_params(w, style.bg, 40)?;
    if style.underline_rgb != 0 {
        w.write_all(b";")?;
        underline_color_params(w, style.underline_rgb)?;
    }
    w.write_all(b"m")
}

/// `;`-separated parameter list of one CSI sequence.
struct Params<'a, W> {
    w: &'a mut W,
    first: bool,
}

impl<W: Write> Params<'_, W> {
    /// The writer, positioned for the next parameter.
    fn param(&mut self) -> io::Result<&mut W> {
        if !self.first {
            self.w.write_all(b";")?;
        }
        self.first = false;
        Ok(&mut *self.w)
    }
}

/// Move the terminal from `from` to `to` with as few parameters as possible.
///
/// Only additions are expressed as deltas. Removing an attribute needs a
/// reset, so any removal falls back to [`sgr_absolute`]. Writes nothing when
/// the styles are equal.
pub fn sgr_delta(w: &mut impl Write, from: &SgrStyle, to: &SgrStyle) -> io::Result<()> {
    if from == to {
        return Ok(());
    }
    if !(from.attrs - to.attrs).is_empty() {
        return sgr_absolute(w, to);
    }

    w.write_all(b"\x1b[")?;
    let mut p = Params { w, first: true };
    let added = to.attrs - from.attrs;
    for (flag, code) in Attr::SGR_CODES {
        if added.contains(flag) {
            write!(p.param()?, "{code}")?;
        }
    }
    if from.fg != to.fg {
        color_params(p.param()?, to.fg, 30)?;
    }
    if from.bg != to.bg {
        color_params(p.param()?, to.bg, 40)?;
    }
    if from.underline_rgb != to.underline_rgb {
        if to.underline_rgb == 0 {
            p.param()?.write_all(b"59")?;
        } else {
            underline_color_params(p.param()?, to.underline_rgb)?;
        }
    }
    p.w.write_all(b"m")
}

// ─── Hyperlinks ──────────────────────────────────────────────────────────────

/// Start an OSC 8 hyperlink. Text written until [`hyperlink_close`] links
/// to `uri`.
#[inline]
pub fn hyperlink_open(w: &mut impl Write, uri: &str) -> io::Result<()> {
    write!(w, "\x1b]8;;{uri}\x1b\\")
}

/// End the current OSC 8 hyperlink.
#[inline]
pub fn hyperlink_close(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b]8;;\x1b\\")
}

// ─── Synchronized Output ─────────────────────────────────────────────────────

/// Begin synchronized output (DEC Private Mode 2026).
///
/// The terminal buffers everything until [`end_sync`], so a half-written
/// frame is never shown.
#[inline]
pub fn begin_sync(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[?2026h")
}

/// End synchronized output; the terminal presents the buffered frame.
#[inline]
pub fn end_sync(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[?2026l")
}

// ─── Alternate Screen ───────────────────────────────────────────────────────

/// Enter the alternate screen buffer (DEC Private Mode 1049).
#[inline]
pub fn enter_alt_screen(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[?1049h")
}

/// Exit the alternate screen buffer and restore the original content.
#[inline]
pub fn exit_alt_screen(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[?1049l")
}

// ─── Tests ───────────────────────────────────────────────────────────────────
