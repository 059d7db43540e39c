// SPDX-License-Identifier: MIT
//
// Halfblock blitter: two vertical samples per cell, drawn with ▀ or ▄.

use super::{CellGlyph, RgbaImage, shade_cells};
use crate::buffer::Rect;
use crate::color::{distance_sq, luma};
use crate::painter::Painter;

const UPPER: char = '\u{2580}';
const LOWER: char = '\u{2584}';

/// Colors this close are drawn as a single flat cell.
const EQUAL_TOLERANCE_SQ: u32 = 256;

pub(super) fn blit(painter: &mut Painter<'_>, dst: Rect, img: &RgbaImage<'_>) {
    shade_cells::<2>(painter, dst, img, 1, 2, |[top, bot], _| {
        let (t, b) = (top.rgb, bot.rgb);
        let glyph = |ch, fg, bg| Some(CellGlyph { ch, fg, bg });
        if distance_sq(t, b) <= EQUAL_TOLERANCE_SQ {
            return glyph(' ', t, t);
        }
        match (top.opaque, bot.opaque) {
            (false, true) => glyph(LOWER, b, t),
            (true, false) => glyph(UPPER, t, b),
            _ if luma(t) >= luma(b) => glyph(UPPER, t, b),
            _ => glyph(LOWER, b, t),
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blit::tests::{paint, raster};
    use crate::buffer::FrameBuffer;
    use crate::cell::Style;
    use pretty_assertions::assert_eq;

    fn one_cell(top: [u8; 4], bot: [u8; 4], under_bg: u32) -> (String, Style) {
        let mut fb = FrameBuffer::new(1, 1);
        paint(&mut fb, |p| p.fill_rect(Rect::new(0, 0, 1, 1), Style::colors(0, under_bg)));
        let px = raster(&[top, bot]);
        let img = RgbaImage::packed(&px, 1, 2).unwrap();
        paint(&mut fb, |p| blit(p, Rect::new(0, 0, 1, 1), &img));
        let c = fb.cell(0, 0).unwrap();
        (c.as_str().to_owned(), c.style)
    }

    #[test]
    fn bright_top_uses_upper_half() {
        let (g, s) = one_cell([255, 255, 255, 255], [0, 0, 0, 255], 0);
        assert_eq!(g, "▀");
        assert_eq!(s, Style::colors(0xFF_FFFF, 0));
    }

    #[test]
    fn bright_bottom_uses_lower_half() {
        let (g, s) = one_cell([0, 0, 0, 255], [255, 0, 0, 255], 0);
        assert_eq!(g, "▄");
        assert_eq!(s, Style::colors(0xFF_0000, 0));
    }

    #[test]
    fn near_equal_colors_flatten() {
        let (g, s) = one_cell([100, 100, 100, 255], [108, 108, 110, 255], 0);
        assert_eq!(g, " ");
        assert_eq!(s, Style::colors(0x64_6464, 0x64_6464));
    }

    #[test]
    fn transparent_top_shows_underlying_bg() {
        let (g, s) = one_cell([0, 0, 0, 0], [255, 255, 0, 255], 0x00_0080);
        assert_eq!(g, "▄");
        assert_eq!(s, Style::colors(0xFF_FF00, 0x00_0080));
    }

    #[test]
    fn transparent_bottom_keeps_upper() {
        // Dark top over a bright background still draws the upper half.
        let (g, s) = one_cell([10, 10, 10, 255], [0, 0, 0, 0], 0xFF_FFFF);
        assert_eq!(g, "▀");
        assert_eq!(s, Style::colors(0x0A_0A0A, 0xFF_FFFF));
    }

    #[test]
    fn both_transparent_untouched() {
        let (g, s) = one_cell([255, 0, 0, 10], [0, 255, 0, 10], 0x12_3456);
        assert_eq!(g, " ");
        assert_eq!(s, Style::colors(0, 0x12_3456));
    }
}
