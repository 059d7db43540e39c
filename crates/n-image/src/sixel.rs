// SPDX-License-Identifier: MIT
//
// Sixel encoder.
//
// Sixel paints six pixel rows at a time ("bands"). Each band is sent once
// per color register: `#<reg>` selects the color, then one character per
// column whose low six bits say which of the six pixels take that color.
// `$` returns to the band's left edge for the next color, `-` moves down
// to the next band.
//
// Colors are quantized to a 6×6×6 cube, so the palette never exceeds 216
// registers and needs no search. Registers are numbered in order of first
// appearance (row-major), which keeps output deterministic. Pixels with
// alpha below `ALPHA_THRESHOLD` are never painted.

use std::io::Write;

use n_term::ansi;
use n_term::error::{Error, Result, rgba_len};
use n_term::output::OutputBuffer;

use crate::ALPHA_THRESHOLD;
use crate::scratch::ScratchArena;

const LEVELS: u32 = 6;
const CUBE: usize = 216;
const TRANSPARENT: u8 = u8::MAX;

/// Runs at least this long are written as `!<n><ch>`.
const MIN_RLE_RUN: u32 = 4;

const fn quantize(c: u8) -> u32 {
    (c as u32 * (LEVELS - 1) + 127) / 255
}

const fn level_to_rgb(q: u32) -> u32 {
    q * 255 / (LEVELS - 1)
}

const fn rgb_to_percent(v: u32) -> u32 {
    (v * 100 + 127) / 255
}

/// An indexed copy of the image plus its palette (cube keys in register
/// order).
struct Indexed {
    pixels: Vec<u8>,
    palette: Vec<usize>,
}

fn quantize_image(arena: &mut ScratchArena, rgba: &[u8], len: usize) -> Result<Indexed> {
    let mut pixels = arena.alloc_bytes(len / 4)?;
    let mut register = [TRANSPARENT; CUBE];
    let mut palette = Vec::new();

    for (slot, px) in pixels.iter_mut().zip(rgba[..len].chunks_exact(4)) {
        if px[3] < ALPHA_THRESHOLD {
            *slot = TRANSPARENT;
            continue;
        }
        let key = (quantize(px[0]) * 36 + quantize(px[1]) * 6 + quantize(px[2])) as usize;
        if register[key] == TRANSPARENT {
            #[allow(clippy::cast_possible_truncation)] // palette.len() < 216
            let reg = palette.len() as u8;
            register[key] = reg;
            palette.push(key);
        }
        *slot = register[key];
    }
    Ok(Indexed { pixels, palette })
}

fn write_run(buf: &mut Vec<u8>, ch: u8, run: u32) -> Result<()> {
    if run >= MIN_RLE_RUN {
        write!(buf, "!{run}")?;
        buf.push(ch);
    } else {
        buf.extend(std::iter::repeat_n(ch, run as usize));
    }
    Ok(())
}

fn write_band(buf: &mut Vec<u8>, img: &Indexed, w: usize, h: usize, band_y: usize) -> Result<()> {
    let rows = band_y..(band_y + 6).min(h);
    let mut present = [false; CUBE];
    for y in rows.clone() {
        for &reg in &img.pixels[y * w..(y + 1) * w] {
            if reg != TRANSPARENT {
                present[usize::from(reg)] = true;
            }
        }
    }

    for reg in 0..img.palette.len() {
        if !present[reg] {
            continue;
        }
        write!(buf, "#{reg}")?;
        let mut prev = 0u8;
        let mut run = 0u32;
        for x in 0..w {
            let mut bits = 0u8;
            for (bit, y) in rows.clone().enumerate() {
                if usize::from(img.pixels[y * w + x]) == reg {
                    bits |= 1 << bit;
                }
            }
            let ch = 0x3F + bits;
            if run > 0 && ch == prev {
                run += 1;
                continue;
            }
            if run > 0 {
                write_run(buf, prev, run)?;
            }
            prev = ch;
            run = 1;
        }
        write_run(buf, prev, run)?;
        buf.push(b'$');
    }
    buf.push(b'-');
    Ok(())
}

/// Encode `rgba` (`w × h`) as a Sixel image with its top-left corner at
/// cell `(col, row)`.
///
/// # Errors
///
/// [`Error::InvalidArgument`] for a zero dimension or a short pixel buffer,
/// [`Error::Limit`] when the arena or `out` runs out (nothing is appended).
pub fn encode(
    out: &mut OutputBuffer,
    arena: &mut ScratchArena,
    rgba: &[u8],
    w: u16,
    h: u16,
    col: u16,
    row: u16,
) -> Result<()> {
    if w == 0 || h == 0 {
        return Err(Error::InvalidArgument("zero image dimension"));
    }
    let len = rgba_len(usize::from(w), usize::from(h))?;
    if rgba.len() < len {
        return Err(Error::InvalidArgument("pixel buffer shorter than width * height * 4"));
    }

    arena.scope(|arena| {
        let img = quantize_image(arena, rgba, len)?;
        let (wu, hu) = (usize::from(w), usize::from(h));

        let mut buf = Vec::with_capacity(64 + img.palette.len() * 20 + wu * hu.div_ceil(6) * 2);
        ansi::cursor_to(&mut buf, col, row)?;
        write!(buf, "\x1bP0;1;0q\"1;1;{w};{h}")?;
        for (reg, &key) in img.palette.iter().enumerate() {
            #[allow(clippy::cast_possible_truncation)] // key < 216
            let key = key as u32;
            let (r, g, b) = (key / 36, key / 6 % 6, key % 6);
            write!(
                buf,
                "#{reg};2;{};{};{}",
                rgb_to_percent(level_to_rgb(r)),
                rgb_to_percent(level_to_rgb(g)),
                rgb_to_percent(level_to_rgb(b)),
            )?;
        }
        for band_y in (0..hu).step_by(6) {
            write_band(&mut buf, &img, wu, hu, band_y)?;
        }
        buf.extend_from_slice(b"\x1b\\");
        tracing::trace!(w, h, colors = img.palette.len(), bytes = buf.len(), "sixel encoded");
        out.append(&buf)
    })
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const RED: [u8; 4] = [255, 0, 0, 255];
    const BLUE: [u8; 4] = [0, 0, 255, 255];
    const CLEAR: [u8; 4] = [0, 0, 0, 0];

    fn sixel(px: &[[u8; 4]], w: u16, h: u16) -> String {
        let rgba: Vec<u8> = px.iter().flatten().copied().collect();
        let mut out = OutputBuffer::new();
        let mut arena = ScratchArena::new(1024);
        encode(&mut out, &mut arena, &rgba, w, h, 0, 0).unwrap();
        assert_eq!(arena.used(), 0);
        String::from_utf8(out.as_bytes().to_vec()).unwrap()
    }

    // ── Quantization ────────────────────────────────────────────────────

    #[test]
    fn quantization_levels() {
        assert_eq!(quantize(0), 0);
        assert_eq!(quantize(25), 0);
        assert_eq!(quantize(26), 1);
        assert_eq!(quantize(255), 5);
        assert_eq!(level_to_rgb(3), 153);
        assert_eq!(rgb_to_percent(255), 100);
        assert_eq!(rgb_to_percent(153), 60);
    }

    // ── Output ──────────────────────────────────────────────────────────

    #[test]
    fn single_red_pixel() {
        assert_eq!(
            sixel(&[RED], 1, 1),
            "\x1b[1;1H\x1bP0;1;0q\"1;1;1;1#0;2;100;0;0#0@$-\x1b\\"
        );
    }

    #[test]
    fn two_colors_in_first_appearance_order() {
        // Column 0 blue, column 1 red.
        let s = sixel(&[BLUE, RED], 2, 1);
        assert!(s.contains("#0;2;0;0;100#1;2;100;0;0"));
        assert!(s.contains("#0@?$#1?@$-"));
    }

    #[test]
    fn long_runs_are_compressed() {
        let s = sixel(&[RED; 8], 8, 1);
        assert!(s.contains("#0!8@$-"));
        let s = sixel(&[RED; 3], 3, 1);
        assert!(s.contains("#0@@@$-"));
    }

    #[test]
    fn bands_cover_six_rows() {
        // 1×7: first band has all six bits, second band one.
        let s = sixel(&[RED; 7], 1, 7);
        assert!(s.contains("#0~$-#0@$-"));
    }

    #[test]
    fn transparent_pixels_are_never_painted() {
        let s = sixel(&[CLEAR, RED], 2, 1);
        assert!(s.contains("#0?@$-"));
        assert!(!s.contains("#1"));

        let s = sixel(&[CLEAR], 1, 1);
        assert!(s.ends_with("\"1;1;1;1-\x1b\\"));
    }

    #[test]
    fn positions_at_cell() {
        let mut out = OutputBuffer::new();
        let mut arena = ScratchArena::default();
        encode(&mut out, &mut arena, &RED, 1, 1, 4, 2).unwrap();
        assert!(out.as_bytes().starts_with(b"\x1b[3;5H\x1bP0;1;0q"));
    }

    // ── Errors ──────────────────────────────────────────────────────────

    #[test]
    fn rejects_bad_input() {
        let mut out = OutputBuffer::new();
        let mut arena = ScratchArena::default();
        assert!(matches!(encode(&mut out, &mut arena, &RED, 0, 1, 0, 0), Err(Error::InvalidArgument(_))));
        assert!(matches!(encode(&mut out, &mut arena, &RED, 2, 1, 0, 0), Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn small_arena_is_limit() {
        let mut out = OutputBuffer::new();
        let mut arena = ScratchArena::new(1);
        let rgba = [RED, RED].concat();
        assert!(matches!(encode(&mut out, &mut arena, &rgba, 2, 1, 0, 0), Err(Error::Limit(_))));
        assert!(out.is_empty());
        assert_eq!(arena.used(), 0);
    }
}
