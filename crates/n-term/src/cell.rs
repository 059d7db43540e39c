// SPDX-License-Identifier: MIT
//
// Cell — the atomic unit of terminal rendering.
//
// Every column on screen is a Cell. It holds one grapheme cluster as UTF-8
// bytes (inline, no allocation), the display width, and a Style. The entire
// rendering pipeline exists to produce, diff, and output these.
//
// Colors are packed `0x00RRGGBB` values. Cells never store degraded colors:
// the diff engine degrades per terminal at emit time, so one grid can be
// rendered to any color mode.
//
// Wide characters (CJK, most emoji) occupy two columns. The first cell is
// the lead (width 2) holding the bytes; the second is a continuation cell
// (width 0, no bytes). The renderer skips continuation cells when
// outputting characters. A continuation never exists without its lead.
//
// Glyph bytes are sanitized on the way in: anything that is not valid UTF-8
// or carries C0/C1 controls or DEL becomes U+FFFD, so a cell can never
// smuggle an escape sequence into the output stream.

use std::fmt;

use serde::Deserialize;

/// Maximum number of UTF-8 bytes stored for one grapheme cluster.
pub const GLYPH_MAX: usize = 32;

/// UTF-8 encoding of U+FFFD REPLACEMENT CHARACTER.
pub const REPLACEMENT: &[u8] = "\u{FFFD}".as_bytes();

// ─── Text Attributes ─────────────────────────────────────────────────────────

bitflags::bitflags! {
    /// Text attributes stored as a compact bitfield.
    ///
    /// These map to SGR (Select Graphic Rendition) parameters. Combine with
    /// bitwise OR:
    ///
    /// ```
    /// use n_term::cell::Attr;
    ///
    /// let style = Attr::BOLD | Attr::ITALIC;
    /// assert!(style.contains(Attr::BOLD));
    /// assert!(!style.contains(Attr::DIM));
    /// ```
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash, Deserialize)]
    #[serde(transparent)]
    pub struct Attr: u8 {
        /// SGR 1: increased intensity.
        const BOLD          = 1 << 0;
        /// SGR 3: italic or oblique.
        const ITALIC        = 1 << 1;
        /// SGR 4: single underline.
        const UNDERLINE     = 1 << 2;
        /// SGR 7: swap foreground and background.
        const REVERSE       = 1 << 3;
        /// SGR 9: crossed-out text.
        const STRIKETHROUGH = 1 << 4;
        /// SGR 2: decreased intensity (faint).
        const DIM           = 1 << 5;
        /// SGR 5: slow blink.
        const BLINK         = 1 << 6;
    }
}

impl Attr {
    /// Attribute bits in SGR emission order, with their SGR codes.
    pub const SGR_CODES: [(Self, u8); 7] = [
        (Self::BOLD, 1),
        (Self::DIM, 2),
        (Self::ITALIC, 3),
        (Self::UNDERLINE, 4),
        (Self::BLINK, 5),
        (Self::REVERSE, 7),
        (Self::STRIKETHROUGH, 9),
    ];
}

// ─── Style ───────────────────────────────────────────────────────────────────

/// Everything about a cell except its glyph.
///
/// Equality is field-wise and drives SGR coalescing in the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct Style {
    /// Foreground, packed `0x00RRGGBB`.
    pub fg: u32,
    /// Background, packed `0x00RRGGBB`.
    pub bg: u32,
    /// Text attributes.
    pub attrs: Attr,
    /// Underline color, packed. 0 means the terminal default.
    pub underline_rgb: u32,
    /// Hyperlink id into the framebuffer's link table. 0 means no link.
    pub link: u32,
}

impl Style {
    /// fg 0, bg 0, nothing else.
    pub const DEFAULT: Self = Self {
        fg: 0,
        bg: 0,
        attrs: Attr::empty(),
        underline_rgb: 0,
        link: 0,
    };

    /// A plain colored style with no attributes and no link.
    #[inline]
    #[must_use]
    pub const fn colors(fg: u32, bg: u32) -> Self {
        Self {
            fg,
            bg,
            ..Self::DEFAULT
        }
    }

    #[inline]
    #[must_use]
    pub const fn with_attrs(self, attrs: Attr) -> Self {
        Self { attrs, ..self }
    }

    #[inline]
    #[must_use]
    pub const fn with_link(self, link: u32) -> Self {
        Self { link, ..self }
    }

    #[inline]
    #[must_use]
    pub const fn with_underline_rgb(self, underline_rgb: u32) -> Self {
        Self {
            underline_rgb,
            ..self
        }
    }
}

// ─── Cell ────────────────────────────────────────────────────────────────────

/// A single terminal cell.
///
/// # Layout
///
/// ```text
/// ┌────────────────┬─────┬───────┬────────────────────────────────┐
/// │ glyph: [u8;32] │ len │ width │ style (fg, bg, attrs, ul, link)│
/// └────────────────┴─────┴───────┴────────────────────────────────┘
/// ```
///
/// Bytes past `len` are always zero, so derived equality is exact.
///
/// # Widths
///
/// - `1`: a normal cell.
/// - `2`: the lead of a wide glyph. The next column is a continuation.
/// - `0`: a continuation. `len` is 0.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Cell {
    glyph: [u8; GLYPH_MAX],
    len: u8,
    width: u8,
    /// Colors, attributes, and hyperlink.
    pub style: Style,
}

impl Cell {
    /// A space with the default style.
    pub const EMPTY: Self = Self::blank(Style::DEFAULT);

    /// A width-1 space with the given style.
    #[inline]
    #[must_use]
    pub const fn blank(style: Style) -> Self {
        let mut glyph = [0u8; GLYPH_MAX];
        glyph[0] = b' ';
        Self {
            glyph,
            len: 1,
            width: 1,
            style,
        }
    }

    /// The right half of a wide glyph.
    #[inline]
    #[must_use]
    pub const fn continuation(style: Style) -> Self {
        Self {
            glyph: [0u8; GLYPH_MAX],
            len: 0,
            width: 0,
            style,
        }
    }

    /// U+FFFD at width 1.
    #[must_use]
    pub fn replacement(style: Style) -> Self {
        Self::from_raw(REPLACEMENT, 1, style)
    }

    /// Build a cell from caller-supplied grapheme bytes.
    ///
    /// Empty input becomes a space. Input longer than [`GLYPH_MAX`] or with
    /// unsafe bytes becomes U+FFFD and the width drops to 1. `width` must
    /// already be 1 or 2.
    #[must_use]
    pub fn grapheme(bytes: &[u8], width: u8, style: Style) -> Self {
        if bytes.is_empty() {
            return Self::blank(style);
        }
        if bytes.len() > GLYPH_MAX || !is_safe_glyph(bytes) {
            return Self::replacement(style);
        }
        Self::from_raw(bytes, width, style)
    }

    #[allow(clippy::cast_possible_truncation)] // len ≤ GLYPH_MAX
    fn from_raw(bytes: &[u8], width: u8, style: Style) -> Self {
        let mut glyph = [0u8; GLYPH_MAX];
        glyph[..bytes.len()].copy_from_slice(bytes);
        Self {
            glyph,
            len: bytes.len() as u8,
            width,
            style,
        }
    }

    // ─── Queries ──────────────────────────────────────────────────────────

    /// The grapheme bytes (empty for a continuation).
    #[inline]
    #[must_use]
    pub fn glyph(&self) -> &[u8] {
        &self.glyph[..usize::from(self.len)]
    }

    /// The grapheme as text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        std::str::from_utf8(self.glyph()).unwrap_or("\u{FFFD}")
    }

    /// Display width: 0, 1, or 2.
    #[inline]
    #[must_use]
    pub const fn width(&self) -> u8 {
        self.width
    }

    /// Number of glyph bytes.
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len as usize
    }

    /// Whether this cell stores no bytes (only continuations).
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    #[must_use]
    pub const fn is_continuation(&self) -> bool {
        self.width == 0
    }

    #[inline]
    #[must_use]
    pub const fn is_wide(&self) -> bool {
        self.width == 2
    }

    /// Whether this is a width-1 space.
    #[inline]
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.width == 1 && self.glyph() == b" "
    }

    /// Same glyph and width, different style.
    #[inline]
    #[must_use]
    pub const fn with_style(self, style: Style) -> Self {
        Self { style, ..self }
    }
}

impl Default for Cell {
    #[inline]
    fn default() -> Self {
        Self::EMPTY
    }
}

impl fmt::Debug for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_continuation() {
            return write!(f, "Cell(continuation)");
        }
        write!(f, "Cell({:?}", self.as_str())?;
        if self.width == 2 {
            write!(f, ", wide")?;
        }
        if self.style.fg != 0 {
            write!(f, ", fg=#{:06x}", self.style.fg)?;
        }
        if self.style.bg != 0 {
            write!(f, ", bg=#{:06x}", self.style.bg)?;
        }
        if !self.style.attrs.is_empty() {
            write!(f, ", {:?}", self.style.attrs)?;
        }
        if self.style.link != 0 {
            write!(f, ", link={}", self.style.link)?;
        }
        write!(f, ")")
    }
}

// ─── Sanitizing ──────────────────────────────────────────────────────────────

/// Whether `bytes` is UTF-8 free of C0 controls, DEL, and C1 controls.
#[must_use]
pub fn is_safe_glyph(bytes: &[u8]) -> bool {
    let Ok(s) = std::str::from_utf8(bytes) else {
        return false;
    };
    !s.chars()
        .any(|c| c < ' ' || c == '\u{7F}' || ('\u{80}'..='\u{9F}').contains(&c))
}

// ─── Tests ───────────────────────────────────────────────────────────────────
