// SPDX-License-Identifier: MIT
//
// Sextant blitter: 2×3 samples per cell, split into two colors.
//
// Bit i covers sub-pixel (i & 1, i / 2). The Unicode sextant block leaves
// out the four patterns that already exist elsewhere (blank, full, left
// half, right half), so those map to the older block elements.

use super::{CellGlyph, RgbaImage, best_partition, shade_cells};
use crate::buffer::Rect;
use crate::painter::Painter;

const LEFT_HALF: u32 = 0b01_0101;
const RIGHT_HALF: u32 = 0b10_1010;
const FULL: u32 = 0b11_1111;

/// Glyph for a 6-bit mask.
#[must_use]
pub(crate) fn glyph(mask: u32) -> char {
    let cp = match mask {
        0 => 0x20,
        FULL => 0x2588,
        LEFT_HALF => 0x258C,
        RIGHT_HALF => 0x2590,
        m => 0x1FB00 + m - 1 - u32::from(m > LEFT_HALF) - u32::from(m > RIGHT_HALF),
    };
    char::from_u32(cp).unwrap_or('\u{FFFD}')
}

pub(super) fn blit(painter: &mut Painter<'_>, dst: Rect, img: &RgbaImage<'_>) {
    shade_cells::<6>(painter, dst, img, 2, 3, |subs, _| {
        let colors = subs.map(|s| s.rgb);
        let (mask, fg, bg) = best_partition(&colors);
        Some(CellGlyph {
            ch: glyph(mask),
            fg,
            bg,
        })
    });
}
