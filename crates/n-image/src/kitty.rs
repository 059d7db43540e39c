// SPDX-License-Identifier: MIT
//
// Kitty graphics protocol.
//
// Images are transmitted once under a numeric id (`a=t`), then placed as
// often as needed (`a=p`) and deleted when no longer shown (`a=d`). The
// payload is raw RGBA (`f=32`), base64-encoded and split into chunks; every
// chunk but the last carries `m=1`.
//
//   ESC _G a=t,f=32,s=<w>,v=<h>,i=<id>,m=1 ; <base64> ESC \
//   ESC _G m=1 ; <base64> ESC \
//   ESC _G m=0 ; <base64> ESC \

use std::io::Write;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use n_term::ansi;
use n_term::error::{Error, Result, rgba_len};
use n_term::output::OutputBuffer;

/// Raw bytes per transmit chunk. Encodes to 4096 base64 characters, the
/// largest payload the protocol allows per escape sequence.
pub const KITTY_CHUNK_RAW: usize = 3072;

const APC_START: &[u8] = b"\x1b_G";
const ST: &[u8] = b"\x1b\\";

/// Transmit an RGBA image under `id`, chunked at [`KITTY_CHUNK_RAW`].
///
/// `cols × rows` is the cell area the image is meant for; it must be
/// non-zero but isn't part of the transmit sequence.
///
/// # Errors
///
/// [`Error::InvalidArgument`] for id 0, a zero dimension, or a pixel buffer
/// shorter than `w × h × 4`. [`Error::Limit`] when `out` can't hold the
/// whole sequence (nothing is appended).
pub fn transmit(out: &mut OutputBuffer, id: u32, rgba: &[u8], w: u16, h: u16, cols: u16, rows: u16) -> Result<()> {
    transmit_chunked(out, id, rgba, (w, h), (cols, rows), KITTY_CHUNK_RAW)
}

/// [`transmit`] with an explicit raw chunk size (a multiple of 3 keeps
/// every chunk but the last free of base64 padding).
///
/// # Errors
///
/// As [`transmit`], plus [`Error::InvalidArgument`] for a zero chunk size.
pub fn transmit_chunked(
    out: &mut OutputBuffer,
    id: u32,
    rgba: &[u8],
    (w, h): (u16, u16),
    (cols, rows): (u16, u16),
    chunk: usize,
) -> Result<()> {
    if id == 0 {
        return Err(Error::InvalidArgument("kitty image id must be non-zero"));
    }
    if w == 0 || h == 0 || cols == 0 || rows == 0 || chunk == 0 {
        return Err(Error::InvalidArgument("zero image dimension"));
    }
    let len = rgba_len(usize::from(w), usize::from(h))?;
    if rgba.len() < len {
        return Err(Error::InvalidArgument("pixel buffer shorter than width * height * 4"));
    }
    let payload = &rgba[..len];

    let chunks = len.div_ceil(chunk);
    let mut buf = Vec::with_capacity(len / 3 * 4 + chunks * 48);
    let mut b64 = String::with_capacity(chunk / 3 * 4 + 4);
    for (i, part) in payload.chunks(chunk).enumerate() {
        let more = u8::from(i + 1 < chunks);
        buf.extend_from_slice(APC_START);
        if i == 0 {
            write!(buf, "a=t,f=32,s={w},v={h},i={id},m={more};")?;
        } else {
            write!(buf, "m={more};")?;
        }
        b64.clear();
        STANDARD.encode_string(part, &mut b64);
        buf.extend_from_slice(b64.as_bytes());
        buf.extend_from_slice(ST);
    }
    out.append(&buf)
}

/// Place a transmitted image with its top-left cell at `(col, row)`.
///
/// # Errors
///
/// [`Error::InvalidArgument`] for id 0 or a zero cell area,
/// [`Error::Limit`] when `out` is full.
pub fn place(out: &mut OutputBuffer, id: u32, col: u16, row: u16, cols: u16, rows: u16, z: i32) -> Result<()> {
    if id == 0 {
        return Err(Error::InvalidArgument("kitty image id must be non-zero"));
    }
    if cols == 0 || rows == 0 {
        return Err(Error::InvalidArgument("zero cell area"));
    }
    let mut buf = Vec::with_capacity(48);
    ansi::cursor_to(&mut buf, col, row)?;
    buf.extend_from_slice(APC_START);
    write!(buf, "a=p,i={id},c={cols},r={rows},z={z}")?;
    buf.extend_from_slice(ST);
    out.append(&buf)
}

/// Delete image `id` and all its placements.
///
/// # Errors
///
/// [`Error::InvalidArgument`] for id 0, [`Error::Limit`] when `out` is
/// full.
pub fn delete(out: &mut OutputBuffer, id: u32) -> Result<()> {
    if id == 0 {
        return Err(Error::InvalidArgument("kitty image id must be non-zero"));
    }
    let mut buf = Vec::with_capacity(24);
    buf.extend_from_slice(APC_START);
    write!(buf, "a=d,d=i,i={id}")?;
    buf.extend_from_slice(ST);
    out.append(&buf)
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn text(out: &OutputBuffer) -> String {
        String::from_utf8(out.as_bytes().to_vec()).unwrap()
    }

    // ── Transmit ────────────────────────────────────────────────────────

    #[test]
    fn transmit_single_pixel() {
        let mut out = OutputBuffer::new();
        transmit(&mut out, 7, &[1, 2, 3, 255], 1, 1, 1, 1).unwrap();
        assert_eq!(text(&out), "\x1b_Ga=t,f=32,s=1,v=1,i=7,m=0;AQID/w==\x1b\\");
    }

    #[test]
    fn large_payload_is_chunked() {
        // 40×40 RGBA = 6400 bytes → three chunks of 3072, 3072, 256.
        let rgba = vec![0x80; 40 * 40 * 4];
        let mut out = OutputBuffer::new();
        transmit(&mut out, 1, &rgba, 40, 40, 5, 3).unwrap();
        let s = text(&out);
        assert!(s.starts_with("\x1b_Ga=t,f=32,s=40,v=40,i=1,m=1;"));
        assert!(s.contains(",m=1;"));
        assert!(s.contains("\x1b\\\x1b_Gm=1;"));
        assert!(s.contains("\x1b\\\x1b_Gm=0;"));
        assert_eq!(s.matches("\x1b_G").count(), 3);
        assert!(s.ends_with("\x1b\\"));
    }

    #[test]
    fn chunk_payloads_stay_under_4096_chars() {
        let rgba = vec![7; 64 * 64 * 4];
        let mut out = OutputBuffer::new();
        transmit(&mut out, 3, &rgba, 64, 64, 8, 4).unwrap();
        for seq in text(&out).split("\x1b_G").skip(1) {
            let payload = seq.split_once(';').unwrap().1.trim_end_matches("\x1b\\");
            assert!(payload.len() <= 4096);
        }
    }

    #[test]
    fn explicit_chunk_size() {
        let rgba = [1, 2, 3, 255, 4, 5, 6, 255];
        let mut out = OutputBuffer::new();
        transmit_chunked(&mut out, 2, &rgba, (2, 1), (1, 1), 3).unwrap();
        assert_eq!(text(&out).matches("\x1b_G").count(), 3);
    }

    #[test]
    fn transmit_rejects_bad_arguments() {
        let mut out = OutputBuffer::new();
        let px = [0u8; 4];
        assert!(matches!(transmit(&mut out, 0, &px, 1, 1, 1, 1), Err(Error::InvalidArgument(_))));
        assert!(matches!(transmit(&mut out, 1, &px, 2, 1, 1, 1), Err(Error::InvalidArgument(_))));
        assert!(matches!(transmit(&mut out, 1, &px, 1, 1, 0, 1), Err(Error::InvalidArgument(_))));
        assert!(matches!(transmit(&mut out, 1, &[], 1, 1, 1, 1), Err(Error::InvalidArgument(_))));
        assert!(out.is_empty());
    }

    #[test]
    fn transmit_into_full_buffer_appends_nothing() {
        let mut out = OutputBuffer::with_limit(10);
        assert!(matches!(
            transmit(&mut out, 1, &[1, 2, 3, 4], 1, 1, 1, 1),
            Err(Error::Limit(_))
        ));
        assert!(out.is_empty());
    }

    // ── Place & Delete ──────────────────────────────────────────────────

    #[test]
    fn place_positions_then_places() {
        let mut out = OutputBuffer::new();
        place(&mut out, 7, 2, 3, 10, 5, -1).unwrap();
        assert_eq!(text(&out), "\x1b[4;3H\x1b_Ga=p,i=7,c=10,r=5,z=-1\x1b\\");
    }

    #[test]
    fn delete_by_id() {
        let mut out = OutputBuffer::new();
        delete(&mut out, 7).unwrap();
        assert_eq!(text(&out), "\x1b_Ga=d,d=i,i=7\x1b\\");
        assert!(matches!(delete(&mut out, 0), Err(Error::InvalidArgument(_))));
        assert!(matches!(place(&mut out, 0, 0, 0, 1, 1, 0), Err(Error::InvalidArgument(_))));
    }
}
