// SPDX-License-Identifier: MIT
//
// Image protocol selection. The set is closed: a command either names a
// protocol or asks for the best one the terminal supports.

use std::fmt;
use std::str::FromStr;

use n_term::caps::ImageCaps;
use n_term::error::Error;

/// A requested or resolved image protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ImageProtocol {
    /// Pick from capabilities (requests only).
    #[default]
    Auto,
    Kitty,
    Sixel,
    Iterm2,
    /// No protocol: the image is skipped.
    None,
}

impl ImageProtocol {
    /// Decode the wire value: 0 auto, 1 Kitty, 2 Sixel, 3 iTerm2. Anything
    /// else requests a protocol that doesn't exist, which resolves to none.
    #[must_use]
    pub const fn from_u8(v: u8) -> Self {
        match v {
            0 => Self::Auto,
            1 => Self::Kitty,
            2 => Self::Sixel,
            3 => Self::Iterm2,
            _ => Self::None,
        }
    }
}

impl FromStr for ImageProtocol {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Error> {
        match s {
            "auto" => Ok(Self::Auto),
            "kitty" => Ok(Self::Kitty),
            "sixel" => Ok(Self::Sixel),
            "iterm2" => Ok(Self::Iterm2),
            "none" => Ok(Self::None),
            _ => Err(Error::InvalidArgument("unknown image protocol")),
        }
    }
}

impl fmt::Display for ImageProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Auto => "auto",
            Self::Kitty => "kitty",
            Self::Sixel => "sixel",
            Self::Iterm2 => "iterm2",
            Self::None => "none",
        })
    }
}

/// Resolve a request against the terminal's capabilities.
///
/// Explicit protocols pass through unchecked (the caller knows better).
/// `Auto` prefers Kitty, then Sixel, then iTerm2. Never returns `Auto`.
#[must_use]
pub const fn select_protocol(request: ImageProtocol, caps: &ImageCaps) -> ImageProtocol {
    match request {
        ImageProtocol::Auto if caps.supports_kitty => ImageProtocol::Kitty,
        ImageProtocol::Auto if caps.supports_sixel => ImageProtocol::Sixel,
        ImageProtocol::Auto if caps.supports_iterm2 => ImageProtocol::Iterm2,
        ImageProtocol::Auto => ImageProtocol::None,
        explicit => explicit,
    }
}
