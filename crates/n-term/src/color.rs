// SPDX-License-Identifier: MIT
//
// n-term color system — packed 24-bit RGB with deterministic quantization.
//
// Cells store colors as packed `0x00RRGGBB` values. Everything that needs
// a color decision works on that representation with integer math only, so
// every result is bit-for-bit reproducible across platforms:
//
//   - Blitters compare sub-pixel colors with squared RGB distance and split
//     them by BT.709 luma.
//   - The diff renderer degrades packed colors to whatever the terminal can
//     show (TrueColor → xterm-256 → ANSI-16) right before emitting SGR.
//
// Degraded colors are represented by `CellColor`, the value the ANSI
// emitters actually encode.
//
// Single-character variable names (r, g, b) are the standard convention in
// color math.
#![allow(clippy::many_single_char_names)]

use std::fmt;

use serde::Deserialize;

// ─── Packed RGB Primitives ───────────────────────────────────────────────────

/// Pack three 8-bit channels into `0x00RRGGBB`.
///
/// ```
/// use n_term::color::pack_rgb;
///
/// assert_eq!(pack_rgb(0x12, 0x34, 0x56), 0x0012_3456);
/// ```
#[inline]
#[must_use]
pub const fn pack_rgb(r: u8, g: u8, b: u8) -> u32 {
    ((r as u32) << 16) | ((g as u32) << 8) | (b as u32)
}

/// Split a packed color into `(r, g, b)`. Bits above 24 are ignored.
#[inline]
#[must_use]
#[allow(clippy::cast_possible_truncation)] // Masked to 8 bits first.
pub const fn unpack_rgb(rgb: u32) -> (u8, u8, u8) {
    (
        ((rgb >> 16) & 0xFF) as u8,
        ((rgb >> 8) & 0xFF) as u8,
        (rgb & 0xFF) as u8,
    )
}

/// Squared Euclidean distance between two packed colors.
///
/// Black to white is `3 × 255² = 195075`.
#[inline]
#[must_use]
pub const fn distance_sq(a: u32, b: u32) -> u32 {
    let (ar, ag, ab) = unpack_rgb(a);
    let (br, bg, bb) = unpack_rgb(b);
    channel_dist_sq(ar, br) + channel_dist_sq(ag, bg) + channel_dist_sq(ab, bb)
}

#[inline]
const fn channel_dist_sq(a: u8, b: u8) -> u32 {
    let d = a.abs_diff(b) as u32;
    d * d
}

/// BT.709 luma, rounded to the nearest integer in `0..=255`.
///
/// `0.2126 R + 0.7152 G + 0.0722 B`, computed in fixed point so that pure
/// red yields 54 and white yields exactly 255.
#[inline]
#[must_use]
#[allow(clippy::cast_possible_truncation)] // Max is (10000*255 + 5000) / 10000 = 255.
pub const fn luma(rgb: u32) -> u8 {
    let (r, g, b) = unpack_rgb(rgb);
    let y = 2126 * r as u32 + 7152 * g as u32 + 722 * b as u32;
    ((y + 5000) / 10000) as u8
}

/// Alpha threshold: 128 and above is fully opaque, below is fully
/// transparent. There is no blending.
pub const ALPHA_THRESHOLD: u8 = 128;

/// Whether an alpha value counts as opaque.
#[inline]
#[must_use]
pub const fn is_opaque(alpha: u8) -> bool {
    alpha >= ALPHA_THRESHOLD
}

/// Per-channel integer mean of a set of packed colors (floor division).
///
/// Returns `None` for an empty set.
#[must_use]
#[allow(clippy::cast_possible_truncation)] // Mean of u8 values fits in u8.
pub fn mean_rgb(colors: impl IntoIterator<Item = u32>) -> Option<u32> {
    let (mut r, mut g, mut b, mut n) = (0u32, 0u32, 0u32, 0u32);
    for c in colors {
        let (cr, cg, cb) = unpack_rgb(c);
        r += u32::from(cr);
        g += u32::from(cg);
        b += u32::from(cb);
        n += 1;
    }
    if n == 0 {
        return None;
    }
    Some(pack_rgb((r / n) as u8, (g / n) as u8, (b / n) as u8))
}

// ─── Color Mode ──────────────────────────────────────────────────────────────

/// How many colors the terminal can show.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorMode {
    /// 24-bit `TrueColor` (`38;2;r;g;b`).
    #[default]
    #[serde(alias = "truecolor")]
    Rgb,
    /// xterm 256-color palette (`38;5;n`).
    #[serde(alias = "256")]
    Xterm256,
    /// The 16 classic ANSI colors (30–37, 90–97).
    #[serde(alias = "16")]
    Ansi16,
}

// ─── CellColor ───────────────────────────────────────────────────────────────

/// A color after degradation to the terminal's color mode.
///
/// This is what the ANSI emitters encode. It's small and fast to compare,
/// which matters because the SGR tracker compares it for every emitted cell.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub enum CellColor {
    /// 24-bit `TrueColor`.
    Rgb(u8, u8, u8),

    /// Palette index. 0–15 encode as classic/bright SGR codes, 16–255 as
    /// the extended `38;5;n` form.
    Ansi256(u8),
}

impl CellColor {
    /// Degrade a packed color for the given mode.
    #[must_use]
    pub fn degrade(rgb: u32, mode: ColorMode) -> Self {
        match mode {
            ColorMode::Rgb => {
                let (r, g, b) = unpack_rgb(rgb);
                Self::Rgb(r, g, b)
            }
            ColorMode::Xterm256 => Self::Ansi256(to_xterm256(rgb)),
            ColorMode::Ansi16 => Self::Ansi256(to_ansi16(rgb)),
        }
    }

    /// The RGB value this color displays as under the xterm default palette.
    #[must_use]
    pub const fn to_rgb(self) -> (u8, u8, u8) {
        match self {
            Self::Rgb(r, g, b) => (r, g, b),
            Self::Ansi256(idx) => ansi::ansi256_to_rgb(idx),
        }
    }
}

impl fmt::Debug for CellColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rgb(r, g, b) => write!(f, "#{r:02x}{g:02x}{b:02x}"),
            Self::Ansi256(idx) => write!(f, "ansi({idx})"),
        }
    }
}

// ─── Degradation ─────────────────────────────────────────────────────────────

/// Nearest xterm-256 index for a packed color.
///
/// The 6×6×6 cube candidate picks the nearest level per component; the
/// gray-ramp candidate is the nearest of 232–255. The closer one wins and a
/// tie goes to the smaller index.
#[must_use]
#[allow(clippy::cast_possible_truncation)] // Indices are bounded by the palette size.
pub fn to_xterm256(rgb: u32) -> u8 {
    let (r, g, b) = unpack_rgb(rgb);

    let ri = ansi::nearest_cube_level(r);
    let gi = ansi::nearest_cube_level(g);
    let bi = ansi::nearest_cube_level(b);
    let cube_idx = 16 + 36 * ri + 6 * gi + bi;
    let cube_rgb = pack_rgb(
        ansi::CUBE_LEVELS[ri as usize],
        ansi::CUBE_LEVELS[gi as usize],
        ansi::CUBE_LEVELS[bi as usize],
    );
    let cube_d = distance_sq(rgb, cube_rgb);

    let (gray_i, gray_d) = (0u8..24)
        .map(|i| {
            let v = 8 + 10 * i;
            (i, distance_sq(rgb, pack_rgb(v, v, v)))
        })
        .fold((0u8, u32::MAX), |best, cand| if cand.1 < best.1 { cand } else { best });
    let gray_idx = 232 + gray_i;

    match gray_d.cmp(&cube_d) {
        std::cmp::Ordering::Less => gray_idx,
        std::cmp::Ordering::Greater => cube_idx,
        std::cmp::Ordering::Equal => gray_idx.min(cube_idx),
    }
}

/// Nearest classic ANSI-16 index for a packed color (ties to the lower index).
#[must_use]
#[allow(clippy::cast_possible_truncation)] // 16 entries.
pub fn to_ansi16(rgb: u32) -> u8 {
    let mut best = 0usize;
    let mut best_d = u32::MAX;
    for (i, &(r, g, b)) in ansi::ANSI16_RGB.iter().enumerate() {
        let d = distance_sq(rgb, pack_rgb(r, g, b));
        if d < best_d {
            best_d = d;
            best = i;
        }
    }
    best as u8
}

// ─── ANSI Palette ────────────────────────────────────────────────────────────

pub mod ansi {
    //! xterm default palette definitions.
    //!
    //! The 256-color palette consists of:
    //! - Colors 0–7: Standard colors (black, red, green, yellow, blue, magenta, cyan, white)
    //! - Colors 8–15: Bright variants of the standard colors
    //! - Colors 16–231: A 6×6×6 RGB color cube
    //! - Colors 232–255: A 24-step grayscale ramp

    /// The xterm default ANSI-16 palette.
    pub const ANSI16_RGB: [(u8, u8, u8); 16] = [
        (0, 0, 0),       // 0: Black
        (205, 0, 0),     // 1: Red
        (0, 205, 0),     // 2: Green
        (205, 205, 0),   // 3: Yellow
        (0, 0, 238),     // 4: Blue
        (205, 0, 205),   // 5: Magenta
        (0, 205, 205),   // 6: Cyan
        (229, 229, 229), // 7: White
        (127, 127, 127), // 8: Bright Black
        (255, 0, 0),     // 9: Bright Red
        (0, 255, 0),     // 10: Bright Green
        (255, 255, 0),   // 11: Bright Yellow
        (92, 92, 255),   // 12: Bright Blue
        (255, 0, 255),   // 13: Bright Magenta
        (0, 255, 255),   // 14: Bright Cyan
        (255, 255, 255), // 15: Bright White
    ];

    /// Component values of the 6×6×6 cube.
    pub const CUBE_LEVELS: [u8; 6] = [0, 95, 135, 175, 215, 255];

    /// Index (0–5) of the cube level closest to `v`; the lower level wins a tie.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)] // 6 levels.
    pub fn nearest_cube_level(v: u8) -> u8 {
        let mut best = 0usize;
        let mut best_d = u8::MAX;
        for (i, &level) in CUBE_LEVELS.iter().enumerate() {
            let d = v.abs_diff(level);
            if d < best_d {
                best_d = d;
                best = i;
            }
        }
        best as u8
    }

    /// Convert an ANSI-256 palette index to RGB values.
    #[must_use]
    pub const fn ansi256_to_rgb(idx: u8) -> (u8, u8, u8) {
        match idx {
            0..=15 => ANSI16_RGB[idx as usize],
            16..=231 => {
                let idx = idx - 16;
                (
                    CUBE_LEVELS[(idx / 36) as usize],
                    CUBE_LEVELS[((idx % 36) / 6) as usize],
                    CUBE_LEVELS[(idx % 6) as usize],
                )
            }
            232..=255 => {
                let v = 8 + 10 * (idx - 232);
                (v, v, v)
            }
        }
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
