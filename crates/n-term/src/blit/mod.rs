// SPDX-License-Identifier: MIT
//
// Sub-cell blitters — draw an RGBA raster with text glyphs.
//
// Every blitter divides each destination cell into a small grid of
// sub-pixels, samples the source with deterministic nearest-neighbor
// mapping, and picks one glyph plus a foreground/background pair that best
// represents those samples:
//
//   Ascii      1×1   space with the sample as background
//   Halfblock  1×2   ▀ / ▄ / space
//   Quadrant   2×2   the 16 quadrant blocks
//   Sextant    2×3   the 64 sextant blocks (Unicode 13)
//   Braille    2×4   luma-thresholded dots with one ink color
//
// Alpha is binary: 128 and above is opaque. Transparent sub-pixels take
// the background of the cell already under them, so a sprite with a
// transparent border blends into whatever was painted before. A cell whose
// samples are all transparent is left alone.
//
// Glyphs go through `Painter::put_grapheme`, so clipping and wide-glyph
// repair work exactly as for text.

mod ascii;
mod braille;
mod halfblock;
mod quadrant;
mod sextant;

use serde::Deserialize;

use crate::buffer::Rect;
use crate::cell::Style;
use crate::color::{distance_sq, is_opaque, pack_rgb};
use crate::error::{Error, Result, checked_add, checked_mul};
use crate::painter::Painter;

// ─── Raster Input ────────────────────────────────────────────────────────────

/// A borrowed RGBA8 raster, row-major, with an explicit row stride.
#[derive(Debug, Clone, Copy)]
pub struct RgbaImage<'a> {
    pixels: &'a [u8],
    width: u32,
    height: u32,
    stride: usize,
}

impl<'a> RgbaImage<'a> {
    /// Wrap `pixels` after checking that every row fits.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidArgument`] for a zero dimension, a stride shorter
    /// than `width × 4`, or a buffer shorter than
    /// `stride × (height − 1) + width × 4`.
    pub fn new(pixels: &'a [u8], width: u32, height: u32, stride: usize) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(Error::InvalidArgument("raster dimension is zero"));
        }
        let row_bytes = checked_mul(width as usize, 4)?;
        if stride < row_bytes {
            return Err(Error::InvalidArgument("raster stride shorter than a row"));
        }
        let needed = checked_add(checked_mul(stride, height as usize - 1)?, row_bytes)?;
        if pixels.len() < needed {
            return Err(Error::InvalidArgument("raster buffer too short"));
        }
        Ok(Self {
            pixels,
            width,
            height,
            stride,
        })
    }

    /// Wrap a tightly packed raster (`stride = width × 4`).
    ///
    /// # Errors
    ///
    /// Same as [`RgbaImage::new`].
    pub fn packed(pixels: &'a [u8], width: u32, height: u32) -> Result<Self> {
        Self::new(pixels, width, height, checked_mul(width as usize, 4)?)
    }

    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// RGBA at `(x, y)`. Coordinates must be in range.
    #[inline]
    fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let off = y as usize * self.stride + x as usize * 4;
        let p = &self.pixels[off..off + 4];
        [p[0], p[1], p[2], p[3]]
    }
}

// ─── Sampling ────────────────────────────────────────────────────────────────

/// Map a destination sub-pixel coordinate to a source index.
///
/// `floor(sub × src_len / (cells × sub_per_cell))`, clamped to
/// `src_len − 1`. Returns 0 when any extent is zero.
///
/// ```
/// use n_term::blit::sample_axis;
///
/// assert_eq!(sample_axis(7, 8, 4, 2), 7);
/// assert_eq!(sample_axis(2, 5, 3, 1), 3);
/// ```
#[must_use]
#[allow(clippy::cast_possible_truncation)] // Clamped below src_len.
pub const fn sample_axis(sub: u32, src_len: u32, cells: u32, sub_per_cell: u32) -> u32 {
    if src_len == 0 || cells == 0 || sub_per_cell == 0 {
        return 0;
    }
    let numer = sub as u64 * src_len as u64;
    let denom = cells as u64 * sub_per_cell as u64;
    let idx = numer / denom;
    if idx >= src_len as u64 {
        src_len - 1
    } else {
        idx as u32
    }
}

/// One sampled sub-pixel. Transparent samples already carry the
/// underlying cell's background as `rgb`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Subpixel {
    pub rgb: u32,
    pub opaque: bool,
}

/// What a blitter decided for one cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct CellGlyph {
    pub ch: char,
    pub fg: u32,
    pub bg: u32,
}

/// Sample every cell of `dst` on a `sub_w × sub_h` grid and paint whatever
/// `shade` returns. Sub-pixels are passed row-major along with the
/// background of the cell being replaced. Cells outside the clip
/// are skipped without sampling since the painter would drop them anyway.
pub(crate) fn shade_cells<const N: usize>(
    painter: &mut Painter<'_>,
    dst: Rect,
    img: &RgbaImage<'_>,
    sub_w: u32,
    sub_h: u32,
    mut shade: impl FnMut(&[Subpixel; N], u32) -> Option<CellGlyph>,
) {
    debug_assert_eq!(N, (sub_w * sub_h) as usize);
    #[allow(clippy::cast_sign_loss)] // dst.w and dst.h are positive here.
    let (cells_w, cells_h) = (dst.w as u32, dst.h as u32);
    let clip = painter.clip();

    for cy in 0..cells_h {
        for cx in 0..cells_w {
            #[allow(clippy::cast_possible_wrap)] // cx < dst.w ≤ i32::MAX
            let (dx, dy) = (dst.x.saturating_add(cx as i32), dst.y.saturating_add(cy as i32));
            if !clip.contains(dx, dy) {
                continue;
            }
            let under_bg = under_bg(painter, dx, dy);

            let mut subs = [Subpixel { rgb: 0, opaque: false }; N];
            for (i, sub) in subs.iter_mut().enumerate() {
                #[allow(clippy::cast_possible_truncation)] // i < N ≤ 8
                let i = i as u32;
                let sx = sample_axis(cx * sub_w + i % sub_w, img.width, cells_w, sub_w);
                let sy = sample_axis(cy * sub_h + i / sub_w, img.height, cells_h, sub_h);
                let [r, g, b, a] = img.pixel(sx, sy);
                *sub = if is_opaque(a) {
                    Subpixel { rgb: pack_rgb(r, g, b), opaque: true }
                } else {
                    Subpixel { rgb: under_bg, opaque: false }
                };
            }
            if !subs.iter().any(|s| s.opaque) {
                continue;
            }

            if let Some(glyph) = shade(&subs, under_bg) {
                let mut utf8 = [0u8; 4];
                let bytes = glyph.ch.encode_utf8(&mut utf8).as_bytes();
                // Width 1 is always valid.
                let _ = painter.put_grapheme(dx, dy, bytes, 1, Style::colors(glyph.fg, glyph.bg));
            }
        }
    }
}

fn under_bg(painter: &Painter<'_>, x: i32, y: i32) -> u32 {
    let (Ok(ux), Ok(uy)) = (u16::try_from(x), u16::try_from(y)) else {
        return 0;
    };
    painter.framebuffer().cell(ux, uy).map_or(0, |c| c.style.bg)
}

// ─── Two-Color Partition ─────────────────────────────────────────────────────

/// Best split of `colors` into a foreground set (mask bits) and background.
///
/// Every mask is tried. Each group's color is its per-channel integer mean
/// (0 for an empty group while scoring); the error is the summed squared
/// distance of each sub-pixel to its group color. After scoring, an empty
/// group takes the other group's color. The lowest error wins and ties go
/// to the lower mask.
pub(crate) fn best_partition(colors: &[u32]) -> (u32, u32, u32) {
    let n = colors.len();
    let mut best = (u64::MAX, 0u32, 0u32, 0u32);
    for mask in 0..(1u32 << n) {
        let in_fg = |i: usize| (mask >> i) & 1 == 1;
        let fg_mean = crate::color::mean_rgb((0..n).filter(|&i| in_fg(i)).map(|i| colors[i]));
        let bg_mean = crate::color::mean_rgb((0..n).filter(|&i| !in_fg(i)).map(|i| colors[i]));
        let (fg0, bg0) = (fg_mean.unwrap_or(0), bg_mean.unwrap_or(0));
        let err: u64 = (0..n)
            .map(|i| u64::from(distance_sq(colors[i], if in_fg(i) { fg0 } else { bg0 })))
            .sum();
        if err < best.0 {
            let fg = fg_mean.unwrap_or(bg0);
            let bg = bg_mean.unwrap_or(fg0);
            best = (err, mask, fg, bg);
        }
    }
    (best.1, best.2, best.3)
}

// ─── Blitter Selection ───────────────────────────────────────────────────────

/// Which blitter to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum Blitter {
    /// Pick from capabilities.
    #[default]
    Auto = 0,
    /// Reserved for image protocols; never served by the glyph path.
    Pixel = 1,
    Braille = 2,
    Sextant = 3,
    Quadrant = 4,
    Halfblock = 5,
    Ascii = 6,
}

impl Blitter {
    /// Decode a wire value.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidArgument`] for values above 6.
    pub const fn from_u8(v: u8) -> Result<Self> {
        Ok(match v {
            0 => Self::Auto,
            1 => Self::Pixel,
            2 => Self::Braille,
            3 => Self::Sextant,
            4 => Self::Quadrant,
            5 => Self::Halfblock,
            6 => Self::Ascii,
            _ => return Err(Error::InvalidArgument("unknown blitter")),
        })
    }

    /// Sub-pixel grid `(w, h)` per cell.
    #[must_use]
    pub const fn subpixels(self) -> (u32, u32) {
        match self {
            Self::Braille => (2, 4),
            Self::Sextant => (2, 3),
            Self::Quadrant => (2, 2),
            Self::Halfblock => (1, 2),
            Self::Ascii | Self::Auto | Self::Pixel => (1, 1),
        }
    }
}

/// What the terminal can draw, as far as blitting is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
#[allow(clippy::struct_excessive_bools)]
pub struct BlitCaps {
    pub is_dumb: bool,
    pub is_pipe: bool,
    pub supports_unicode: bool,
    pub supports_halfblock: bool,
    pub supports_quadrant: bool,
    pub supports_sextant: bool,
    pub supports_braille: bool,
    pub include_braille_in_auto: bool,
}

impl Default for BlitCaps {
    /// A Unicode terminal without sextant glyphs.
    fn default() -> Self {
        Self {
            is_dumb: false,
            is_pipe: false,
            supports_unicode: true,
            supports_halfblock: true,
            supports_quadrant: true,
            supports_sextant: false,
            supports_braille: true,
            include_braille_in_auto: false,
        }
    }
}

/// Resolve `requested` against `caps`.
///
/// Explicit glyph blitters pass through unchanged. `Auto` falls back from
/// braille (only when opted in) through sextant, quadrant, and halfblock to
/// ASCII.
///
/// # Errors
///
/// [`Error::Unsupported`] for [`Blitter::Pixel`].
pub const fn select(requested: Blitter, caps: &BlitCaps) -> Result<Blitter> {
    Ok(match requested {
        Blitter::Pixel => return Err(Error::Unsupported("pixel blitter")),
        Blitter::Auto => {
            if caps.is_dumb || caps.is_pipe || !caps.supports_unicode {
                Blitter::Ascii
            } else if caps.include_braille_in_auto && caps.supports_braille {
                Blitter::Braille
            } else if caps.supports_sextant {
                Blitter::Sextant
            } else if caps.supports_quadrant {
                Blitter::Quadrant
            } else if caps.supports_halfblock {
                Blitter::Halfblock
            } else {
                Blitter::Ascii
            }
        }
        explicit => explicit,
    })
}

/// Draw `img` scaled into `dst` and return the blitter actually used.
///
/// A `dst` with zero width or height draws nothing.
///
/// # Errors
///
/// [`Error::InvalidArgument`] for a negative `dst` size,
/// [`Error::Unsupported`] for [`Blitter::Pixel`].
pub fn blit(
    painter: &mut Painter<'_>,
    dst: Rect,
    img: &RgbaImage<'_>,
    requested: Blitter,
    caps: &BlitCaps,
) -> Result<Blitter> {
    if dst.w < 0 || dst.h < 0 {
        return Err(Error::InvalidArgument("negative blit destination"));
    }
    let effective = select(requested, caps)?;
    if dst.w == 0 || dst.h == 0 {
        return Ok(effective);
    }
    match effective {
        Blitter::Ascii => ascii::blit(painter, dst, img),
        Blitter::Halfblock => halfblock::blit(painter, dst, img),
        Blitter::Quadrant => quadrant::blit(painter, dst, img),
        Blitter::Sextant => sextant::blit(painter, dst, img),
        Blitter::Braille => braille::blit(painter, dst, img),
        Blitter::Auto | Blitter::Pixel => return Err(Error::Unsupported("unresolved blitter")),
    }
    tracing::trace!(?effective, w = dst.w, h = dst.h, "blit");
    Ok(effective)
}

// ─── Tests ───────────────────────────────────────────────────────────────────
