// SPDX-License-Identifier: MIT
//
// iTerm2 inline images (OSC 1337).
//
// The protocol carries a whole image file, base64-encoded, in a single OSC:
//
//   ESC ] 1337 ; File=inline=1;width=<cols>;height=<rows>;
//       preserveAspectRatio=1;size=<bytes> : <base64> BEL
//
// Raw rasters are PNG-encoded first. Width and height are in cells, so the
// terminal does the final scaling.

use std::io::Write;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder};
use n_term::ansi;
use n_term::error::{Error, Result, rgba_len};
use n_term::output::OutputBuffer;

use crate::scratch::ScratchArena;

/// Emit already-encoded PNG bytes at cell `(col, row)`, sized `cols × rows`.
///
/// # Errors
///
/// [`Error::InvalidArgument`] for empty PNG bytes or a zero cell area,
/// [`Error::Limit`] when `out` can't hold the sequence.
pub fn emit_png(out: &mut OutputBuffer, png: &[u8], col: u16, row: u16, cols: u16, rows: u16) -> Result<()> {
    if png.is_empty() {
        return Err(Error::InvalidArgument("empty PNG payload"));
    }
    if cols == 0 || rows == 0 {
        return Err(Error::InvalidArgument("zero cell area"));
    }
    let b64_len = png.len().div_ceil(3) * 4;
    let mut buf = Vec::with_capacity(b64_len + 96);
    ansi::cursor_to(&mut buf, col, row)?;
    write!(
        buf,
        "\x1b]1337;File=inline=1;width={cols};height={rows};preserveAspectRatio=1;size={}:",
        png.len()
    )?;
    let mut b64 = String::with_capacity(b64_len);
    STANDARD.encode_string(png, &mut b64);
    buf.extend_from_slice(b64.as_bytes());
    buf.push(0x07);
    out.append(&buf)
}

/// PNG-encode `rgba` (`w × h`) into a buffer charged to `arena`.
///
/// # Errors
///
/// [`Error::InvalidArgument`] for a zero dimension or short buffer,
/// [`Error::Limit`] when the arena is exhausted, [`Error::Encode`] when the
/// PNG encoder fails.
pub fn encode_png(arena: &mut ScratchArena, rgba: &[u8], w: u16, h: u16) -> Result<Vec<u8>> {
    if w == 0 || h == 0 {
        return Err(Error::InvalidArgument("zero image dimension"));
    }
    let len = rgba_len(usize::from(w), usize::from(h))?;
    if rgba.len() < len {
        return Err(Error::InvalidArgument("pixel buffer shorter than width * height * 4"));
    }
    // Worst case for incompressible data is a little over the raw size.
    let mut png = arena.alloc_capacity(len + usize::from(h) + 1024)?;
    PngEncoder::new(&mut png)
        .write_image(&rgba[..len], u32::from(w), u32::from(h), ExtendedColorType::Rgba8)
        .map_err(|e| Error::Encode(e.to_string()))?;
    Ok(png)
}

/// PNG-encode `rgba` and emit it like [`emit_png`].
///
/// # Errors
///
/// As [`encode_png`] and [`emit_png`].
#[allow(clippy::too_many_arguments)]
pub fn emit_rgba(
    out: &mut OutputBuffer,
    arena: &mut ScratchArena,
    rgba: &[u8],
    w: u16,
    h: u16,
    col: u16,
    row: u16,
    cols: u16,
    rows: u16,
) -> Result<()> {
    arena.scope(|arena| {
        let png = encode_png(arena, rgba, w, h)?;
        tracing::trace!(w, h, png_bytes = png.len(), "iterm2 image encoded");
        emit_png(out, &png, col, row, cols, rows)
    })
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const PNG_SIGNATURE: &[u8] = b"\x89PNG\r\n\x1a\n";

    #[test]
    fn emit_png_framing() {
        let mut out = OutputBuffer::new();
        emit_png(&mut out, b"abc", 1, 2, 3, 4).unwrap();
        assert_eq!(
            out.as_bytes(),
            b"\x1b[3;2H\x1b]1337;File=inline=1;width=3;height=4;preserveAspectRatio=1;size=3:YWJj\x07"
        );
    }

    #[test]
    fn emit_png_rejects_bad_input() {
        let mut out = OutputBuffer::new();
        assert!(matches!(emit_png(&mut out, b"", 0, 0, 1, 1), Err(Error::InvalidArgument(_))));
        assert!(matches!(emit_png(&mut out, b"x", 0, 0, 0, 1), Err(Error::InvalidArgument(_))));
        let mut small = OutputBuffer::with_limit(16);
        assert!(matches!(emit_png(&mut small, b"x", 0, 0, 1, 1), Err(Error::Limit(_))));
        assert!(small.is_empty());
    }

    #[test]
    fn rgba_round_trips_through_png() {
        let rgba = [255, 0, 0, 255, 0, 255, 0, 128];
        let mut arena = ScratchArena::default();
        let png = encode_png(&mut arena, &rgba, 2, 1).unwrap();
        assert!(png.starts_with(PNG_SIGNATURE));

        let decoded = image::load_from_memory_with_format(&png, image::ImageFormat::Png)
            .unwrap()
            .to_rgba8();
        assert_eq!(decoded.dimensions(), (2, 1));
        assert_eq!(decoded.as_raw().as_slice(), &rgba);
    }

    #[test]
    fn emit_rgba_payload_is_png() {
        let rgba = [10, 20, 30, 255];
        let mut out = OutputBuffer::new();
        let mut arena = ScratchArena::default();
        emit_rgba(&mut out, &mut arena, &rgba, 1, 1, 0, 0, 1, 1).unwrap();
        assert_eq!(arena.used(), 0);

        let s = std::str::from_utf8(out.as_bytes()).unwrap();
        let b64 = s.split_once(':').unwrap().1.trim_end_matches('\x07');
        let png = STANDARD.decode(b64).unwrap();
        assert!(png.starts_with(PNG_SIGNATURE));
        assert!(s.contains(&format!("size={}:", png.len())));
    }

    #[test]
    fn encode_png_rejects_short_buffer() {
        let mut arena = ScratchArena::default();
        assert!(matches!(encode_png(&mut arena, &[0; 4], 2, 1), Err(Error::InvalidArgument(_))));
    }
}
