// SPDX-License-Identifier: MIT
//
// Nearest-neighbor fit/scale for RGBA rasters.
//
// Sixel and iTerm2 take pixels at the size they should appear, so a source
// raster is first mapped onto `cols × cell_w` by `rows × cell_h` pixels.
// Every destination pixel picks exactly one source pixel through the same
// proportional integer mapping the blitters use (`pos * src / dst`), so the
// result is deterministic and never blends.

use n_term::error::{Error, Result, rgba_len};

/// How a source raster maps onto a destination of a different shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FitMode {
    /// Stretch to the destination, ignoring aspect ratio.
    #[default]
    Fill,
    /// Keep aspect ratio, fit inside, letterbox with transparent pixels.
    Contain,
    /// Keep aspect ratio, cover everything, crop the centered excess.
    Cover,
}

impl FitMode {
    /// Decode the wire value (0 fill, 1 contain, 2 cover).
    ///
    /// # Errors
    ///
    /// [`Error::InvalidArgument`] for any other value.
    pub const fn from_u8(v: u8) -> Result<Self> {
        match v {
            0 => Ok(Self::Fill),
            1 => Ok(Self::Contain),
            2 => Ok(Self::Cover),
            _ => Err(Error::InvalidArgument("unknown fit mode")),
        }
    }
}

impl std::str::FromStr for FitMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "fill" => Ok(Self::Fill),
            "contain" => Ok(Self::Contain),
            "cover" => Ok(Self::Cover),
            _ => Err(Error::InvalidArgument("unknown fit mode")),
        }
    }
}

/// `pos * src / dst`, clamped to the last source index.
const fn map_axis(pos: u32, src: u32, dst: u32) -> u32 {
    let v = (pos as u64 * src as u64 / dst as u64) as u32;
    if v >= src { src - 1 } else { v }
}

const fn div_ceil(num: u64, den: u64) -> u32 {
    #[allow(clippy::cast_possible_truncation)]
    let q = num.div_ceil(den) as u32;
    q
}

/// Contain: the largest aspect-preserving size that fits.
fn contain_dims(sw: u32, sh: u32, dw: u32, dh: u32) -> (u32, u32) {
    let (w, h) = if u64::from(sw) * u64::from(dh) >= u64::from(sh) * u64::from(dw) {
        #[allow(clippy::cast_possible_truncation)]
        let h = (u64::from(sh) * u64::from(dw) / u64::from(sw)) as u32;
        (dw, h)
    } else {
        #[allow(clippy::cast_possible_truncation)]
        let w = (u64::from(sw) * u64::from(dh) / u64::from(sh)) as u32;
        (w, dh)
    };
    (w.max(1), h.max(1))
}

/// Cover: the smallest aspect-preserving size that covers.
fn cover_dims(sw: u32, sh: u32, dw: u32, dh: u32) -> (u32, u32) {
    let (w, h) = if u64::from(sw) * u64::from(dh) >= u64::from(sh) * u64::from(dw) {
        (div_ceil(u64::from(sw) * u64::from(dh), u64::from(sh)), dh)
    } else {
        (dw, div_ceil(u64::from(sh) * u64::from(dw), u64::from(sw)))
    };
    (w.max(1), h.max(1))
}

struct Mapper<'a> {
    src: &'a [u8],
    sw: u32,
    sh: u32,
    dw: u32,
}

impl Mapper<'_> {
    /// Copy the source pixel for `(sx, sy)` of a `scaled_w × scaled_h`
    /// virtual image into destination `(x, y)`.
    fn copy(&self, out: &mut [u8], (x, y): (u32, u32), (sx, sy): (u32, u32), (scaled_w, scaled_h): (u32, u32)) {
        let src_x = map_axis(sx, self.sw, scaled_w) as usize;
        let src_y = map_axis(sy, self.sh, scaled_h) as usize;
        let s = (src_y * self.sw as usize + src_x) * 4;
        let d = (y as usize * self.dw as usize + x as usize) * 4;
        out[d..d + 4].copy_from_slice(&self.src[s..s + 4]);
    }
}

/// Scale `src` (`sw × sh` RGBA) into the first `dw × dh × 4` bytes of `out`.
///
/// # Errors
///
/// - [`Error::InvalidArgument`] for a zero dimension or a source shorter
///   than `sw × sh × 4`.
/// - [`Error::Limit`] when `out` is shorter than `dw × dh × 4`; nothing is
///   written.
pub fn scale_rgba(src: &[u8], sw: u16, sh: u16, mode: FitMode, dw: u16, dh: u16, out: &mut [u8]) -> Result<()> {
    if sw == 0 || sh == 0 || dw == 0 || dh == 0 {
        return Err(Error::InvalidArgument("zero image dimension"));
    }
    if src.len() < rgba_len(usize::from(sw), usize::from(sh))? {
        return Err(Error::InvalidArgument("source shorter than width * height * 4"));
    }
    let need = rgba_len(usize::from(dw), usize::from(dh))?;
    if out.len() < need {
        return Err(Error::Limit("destination shorter than width * height * 4"));
    }
    let out = &mut out[..need];

    let (sw, sh, dw, dh) = (u32::from(sw), u32::from(sh), u32::from(dw), u32::from(dh));
    let m = Mapper { src, sw, sh, dw };

    match mode {
        FitMode::Fill => {
            for y in 0..dh {
                for x in 0..dw {
                    m.copy(out, (x, y), (x, y), (dw, dh));
                }
            }
        }
        FitMode::Contain => {
            out.fill(0);
            let (w, h) = contain_dims(sw, sh, dw, dh);
            let (off_x, off_y) = ((dw - w) / 2, (dh - h) / 2);
            for y in 0..h {
                for x in 0..w {
                    m.copy(out, (x + off_x, y + off_y), (x, y), (w, h));
                }
            }
        }
        FitMode::Cover => {
            let (w, h) = cover_dims(sw, sh, dw, dh);
            let (crop_x, crop_y) = (w.saturating_sub(dw) / 2, h.saturating_sub(dh) / 2);
            for y in 0..dh {
                for x in 0..dw {
                    m.copy(out, (x, y), (x + crop_x, y + crop_y), (w, h));
                }
            }
        }
    }
    Ok(())
}

/// [`scale_rgba`] into a fresh buffer charged to `arena`.
///
/// # Errors
///
/// As [`scale_rgba`], plus [`Error::Limit`] when the arena can't hold the
/// result.
pub fn scale_into_arena(
    arena: &mut crate::ScratchArena,
    src: &[u8],
    (sw, sh): (u16, u16),
    mode: FitMode,
    (dw, dh): (u16, u16),
) -> Result<Vec<u8>> {
    let mut out = arena.alloc_bytes(rgba_len(usize::from(dw), usize::from(dh))?)?;
    scale_rgba(src, sw, sh, mode, dw, dh, &mut out)?;
    Ok(out)
}

// ─── Tests ───────────────────────────────────────────────────────────────────
