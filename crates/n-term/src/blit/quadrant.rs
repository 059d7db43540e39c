// SPDX-License-Identifier: MIT
//
// Quadrant blitter: 2×2 samples per cell, split into two colors.
//
// Mask bit i covers sub-pixel (i & 1, i >> 1): bit 0 top-left, bit 1
// top-right, bit 2 bottom-left, bit 3 bottom-right.

use super::{CellGlyph, RgbaImage, best_partition, shade_cells};
use crate::buffer::Rect;
use crate::painter::Painter;

/// Glyph for each 4-bit mask.
pub(crate) const GLYPHS: [char; 16] = [
    ' ', '\u{2598}', '\u{259D}', '\u{2580}', '\u{2596}', '\u{258C}', '\u{259E}', '\u{259B}',
    '\u{2597}', '\u{259A}', '\u{2590}', '\u{259C}', '\u{2584}', '\u{2599}', '\u{259F}', '\u{2588}',
];

pub(super) fn blit(painter: &mut Painter<'_>, dst: Rect, img: &RgbaImage<'_>) {
    shade_cells::<4>(painter, dst, img, 2, 2, |subs, _| {
        let colors = subs.map(|s| s.rgb);
        let (mask, fg, bg) = best_partition(&colors);
        Some(CellGlyph {
            ch: GLYPHS[mask as usize],
            fg,
            bg,
        })
    });
}
