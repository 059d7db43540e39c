// SPDX-License-Identifier: MIT
//
// Error taxonomy shared by every n-term operation (and by n-image).
//
// Failures are local and synchronous. An operation that returns `Err` has
// left every output in its pre-call state: no half-painted glyph, no
// truncated escape sequence, no advanced session state. Callers can retry
// (for example with a larger output budget) without cleanup.

use std::io;

/// Everything that can go wrong while painting, diffing, or encoding.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A required input was empty, a dimension was zero, an id was zero,
    /// or an enumerator was out of range. Checked before any work starts.
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),

    /// A bounded resource (clip stack, output budget, scratch arena, link
    /// table) could not hold the complete result.
    #[error("limit reached: {0}")]
    Limit(&'static str),

    /// The request is well-formed but this engine cannot serve it.
    #[error("unsupported: {0}")]
    Unsupported(&'static str),

    /// A size computation would overflow.
    #[error("arithmetic overflow in size computation")]
    Overflow,

    /// Writing the finished frame to the terminal failed.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Capability or option file could not be parsed.
    #[error("config error: {0}")]
    Config(String),

    /// An external encoder (PNG) rejected its input.
    #[error("encode error: {0}")]
    Encode(String),
}

impl From<toml::de::Error> for Error {
    fn from(e: toml::de::Error) -> Self {
        Self::Config(e.to_string())
    }
}

/// Result alias used across n-term and n-image.
pub type Result<T> = std::result::Result<T, Error>;

// ─── Checked Size Helpers ────────────────────────────────────────────────────

/// `a * b`, or [`Error::Overflow`].
#[inline]
pub fn checked_mul(a: usize, b: usize) -> Result<usize> {
    a.checked_mul(b).ok_or(Error::Overflow)
}

/// `a + b`, or [`Error::Overflow`].
#[inline]
pub fn checked_add(a: usize, b: usize) -> Result<usize> {
    a.checked_add(b).ok_or(Error::Overflow)
}

/// Byte length of a tightly packed RGBA8 raster.
#[inline]
pub fn rgba_len(width: usize, height: usize) -> Result<usize> {
    checked_mul(checked_mul(width, height)?, 4)
}
