// SPDX-License-Identifier: MIT
//
// Braille blitter: 2×4 samples per cell, one ink color.
//
// A dot is lit when its sample is opaque and at least as bright as the
// cell's mean luma. Transparent samples count toward the mean with the
// underlying background but never light a dot.

use super::{CellGlyph, RgbaImage, shade_cells};
use crate::buffer::Rect;
use crate::color::{luma, mean_rgb};
use crate::painter::Painter;

/// Braille dot bit for sub-pixel `[row][col]`.
const DOT_BIT: [[u8; 2]; 4] = [[0, 3], [1, 4], [2, 5], [6, 7]];

const BRAILLE_BASE: u32 = 0x2800;

pub(super) fn blit(painter: &mut Painter<'_>, dst: Rect, img: &RgbaImage<'_>) {
    shade_cells::<8>(painter, dst, img, 2, 4, |subs, under_bg| {
        let threshold = subs.iter().map(|s| u32::from(luma(s.rgb))).sum::<u32>() / 8;

        let mut pattern = 0u32;
        for (i, s) in subs.iter().enumerate() {
            if s.opaque && u32::from(luma(s.rgb)) >= threshold {
                pattern |= 1 << DOT_BIT[i / 2][i % 2];
            }
        }
        let lit = |i: usize| pattern & (1 << DOT_BIT[i / 2][i % 2]) != 0;
        let fg = mean_rgb((0..8).filter(|&i| lit(i)).map(|i| subs[i].rgb)).unwrap_or(under_bg);
        let bg = mean_rgb((0..8).filter(|&i| !lit(i)).map(|i| subs[i].rgb)).unwrap_or(under_bg);

        Some(CellGlyph {
            ch: char::from_u32(BRAILLE_BASE + pattern).unwrap_or('\u{FFFD}'),
            fg,
            bg,
        })
    });
}
