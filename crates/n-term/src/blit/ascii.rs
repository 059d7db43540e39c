// SPDX-License-Identifier: MIT
//
// ASCII blitter: one sample per cell, painted as a background-colored space.

use super::{CellGlyph, RgbaImage, shade_cells};
use crate::buffer::Rect;
use crate::painter::Painter;

pub(super) fn blit(painter: &mut Painter<'_>, dst: Rect, img: &RgbaImage<'_>) {
    shade_cells::<1>(painter, dst, img, 1, 1, |[s], _| {
        Some(CellGlyph {
            ch: ' ',
            fg: s.rgb,
            bg: s.rgb,
        })
    });
}
